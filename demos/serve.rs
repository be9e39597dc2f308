//! Serves files from a directory with range request support.
//!
//! ```text
//! cargo run --example serve -- ./some/dir
//! curl -i -H 'Range: bytes=0-99' 'http://127.0.0.1:3000/file?path=video.mp4'
//! ```

use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;

use axum_range_request::RangeRequest;

#[tokio::main]
async fn main() -> io::Result<()> {
    tracing_subscriber::fmt::init();

    let root = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
    tracing::info!(addr = %listener.local_addr()?, root = %root.display(), "serving files");

    axum::serve(listener, app(root)).await
}

fn app(root: PathBuf) -> Router {
    Router::new()
        .route("/", get(|| async { "Hello, World!" }))
        .route("/file", get(get_file))
        .with_state(Arc::new(root))
        .layer(RangeRequest::new().layer())
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
struct FileRequest {
    path: String,
}

async fn get_file(State(root): State<Arc<PathBuf>>, Query(request): Query<FileRequest>) -> Response {
    let relative = Path::new(&request.path);
    // only plain names below the root
    if relative.components().any(|component| !matches!(component, Component::Normal(_))) {
        return (StatusCode::BAD_REQUEST, "Invalid path").into_response();
    }

    let path = root.join(relative);
    match tokio::fs::read(&path).await {
        Ok(content) => {
            let content_type = mime_guess::from_path(&path).first_or_octet_stream();
            ([(CONTENT_TYPE, content_type.to_string())], content).into_response()
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            (StatusCode::NOT_FOUND, "File not found").into_response()
        }
        Err(err) => {
            tracing::error!(%err, path = %path.display(), "failed to read file");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {err}")).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use axum_range_request::{digest_sha1, extract_boundary};

    use super::*;

    const ALPHABET: &str = "abcdefghijklmnopqrstuvwxyz";

    #[tokio::test]
    async fn test_get_file_with_range() {
        let _ = tracing_subscriber::fmt::try_init();

        let root = std::env::temp_dir().join(format!("axum-range-request-{}", std::process::id()));
        tokio::fs::create_dir_all(&root).await.unwrap();
        tokio::fs::write(root.join("alphabet.txt"), ALPHABET).await.unwrap();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = app(root.clone());
        let server = tokio::spawn(async move { axum::serve(listener, app).await });

        let client = reqwest::Client::new();
        let url = format!("http://{addr}/file?path=alphabet.txt");

        let response = client.get(&url).header("Range", "bytes=0-4").send().await.unwrap();
        assert_eq!(reqwest::StatusCode::PARTIAL_CONTENT, response.status());
        assert_eq!("bytes 0-4/26", response.headers()["content-range"]);
        assert_eq!("bytes", response.headers()["accept-ranges"]);
        assert_eq!("abcde", response.bytes().await.unwrap());

        let response = client.get(&url).header("Range", "bytes=0-4,-1").send().await.unwrap();
        assert_eq!(reqwest::StatusCode::PARTIAL_CONTENT, response.status());
        let content_type = response.headers()["content-type"].to_str().unwrap().to_string();
        let boundary = extract_boundary(&content_type).unwrap();
        assert_eq!(digest_sha1(ALPHABET.as_bytes()), boundary);
        let body = response.text().await.unwrap();
        assert_eq!(
            format!(
                "--{boundary}\nContent-Type: text/plain\nContent-Range: bytes 0-4/26\n\nabcde\n\
                 --{boundary}\nContent-Type: text/plain\nContent-Range: bytes 25-25/26\n\nz\n\
                 --{boundary}--"
            ),
            body,
        );

        let response = client.get(&url).header("Range", "bytes=1000000-2000000").send().await.unwrap();
        assert_eq!(reqwest::StatusCode::RANGE_NOT_SATISFIABLE, response.status());
        assert_eq!("bytes */26", response.headers()["content-range"]);

        let response = client.get(&url).send().await.unwrap();
        assert_eq!(reqwest::StatusCode::OK, response.status());
        assert_eq!(ALPHABET, response.text().await.unwrap());

        let response = client
            .get(format!("http://{addr}/file?path=missing.txt"))
            .header("Range", "bytes=0-4")
            .send()
            .await
            .unwrap();
        assert_eq!(reqwest::StatusCode::NOT_FOUND, response.status());

        let response = client.get(format!("http://{addr}/file?path=../etc/passwd")).send().await.unwrap();
        assert_eq!(reqwest::StatusCode::BAD_REQUEST, response.status());

        server.abort();
        tokio::fs::remove_dir_all(&root).await.unwrap();
    }
}
