//! ObjectIO storage node
//!
//! The gateway's only dependency on storage nodes is this HTTP
//! contract (spec §6): a dumb per-file key-value store with no
//! erasure, no metadata, no dedup. Shards are written under
//! `{data_dir}/{bucket}/{shard_key}`, with every path component
//! checked for traversal before touching the filesystem.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use clap::Parser;
use std::net::SocketAddr;
use std::path::{Component, Path as FsPath, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "objectio-storage-node")]
#[command(about = "Dumb per-file shard store for ObjectIO")]
#[command(version)]
struct Args {
    #[arg(long, env = "OBJECTIO_NODE_LISTEN", default_value = "0.0.0.0:9100")]
    listen: String,

    #[arg(long, env = "OBJECTIO_DATA_DIR", default_value = "/var/lib/objectio/shards")]
    data_dir: PathBuf,

    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Clone)]
struct NodeState {
    data_dir: Arc<PathBuf>,
}

/// Join `data_dir/bucket/shard_key`, rejecting any component that
/// could escape it (`..`, absolute segments). `shard_key` is itself a
/// path (`{key}/{upload_nonce}/{i}`), so every segment of both inputs
/// is checked, not just the literal string `".."`.
fn object_path(data_dir: &FsPath, bucket: &str, shard_key: &str) -> Result<PathBuf, StatusCode> {
    let mut path = data_dir.to_path_buf();
    for part in [bucket, shard_key] {
        for component in FsPath::new(part).components() {
            match component {
                Component::Normal(segment) => path.push(segment),
                Component::CurDir => {}
                _ => return Err(StatusCode::BAD_REQUEST),
            }
        }
    }
    Ok(path)
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn put_handler(
    State(state): State<NodeState>,
    Path((bucket, shard_key)): Path<(String, String)>,
    mut multipart: Multipart,
) -> Response {
    let path = match object_path(&state.data_dir, &bucket, &shard_key) {
        Ok(p) => p,
        Err(status) => return status.into_response(),
    };

    let field = loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some("file") => break Some(field),
            Ok(Some(_)) => continue,
            Ok(None) => break None,
            Err(_) => return StatusCode::BAD_REQUEST.into_response(),
        }
    };
    let Some(field) = field else {
        return (StatusCode::BAD_REQUEST, "missing multipart field \"file\"").into_response();
    };
    let Ok(bytes) = field.bytes().await else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    let Some(parent) = path.parent() else {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };
    if tokio::fs::create_dir_all(parent).await.is_err() {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    match tokio::fs::write(&path, &bytes).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

async fn get_handler(
    State(state): State<NodeState>,
    Path((bucket, shard_key)): Path<(String, String)>,
) -> Response {
    let path = match object_path(&state.data_dir, &bucket, &shard_key) {
        Ok(p) => p,
        Err(status) => return status.into_response(),
    };
    match tokio::fs::read(&path).await {
        Ok(bytes) => bytes.into_response(),
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn delete_handler(
    State(state): State<NodeState>,
    Path((bucket, shard_key)): Path<(String, String)>,
) -> Response {
    let path = match object_path(&state.data_dir, &bucket, &shard_key) {
        Ok(p) => p,
        Err(status) => return status.into_response(),
    };
    match tokio::fs::remove_file(&path).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => StatusCode::NOT_FOUND.into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

fn router(state: NodeState) -> Router {
    Router::new()
        .route("/internal/health", get(health_handler))
        .route(
            "/internal/objects/{bucket}/{*shard_key}",
            put(put_handler).get(get_handler).delete(delete_handler),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tokio::fs::create_dir_all(&args.data_dir).await?;
    info!(data_dir = %args.data_dir.display(), "storage node data directory ready");

    let state = NodeState {
        data_dir: Arc::new(args.data_dir),
    };
    let app = router(state);

    let addr: SocketAddr = args.listen.parse()?;
    info!(%addr, "starting storage node HTTP server");
    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("shutting down");
        })
        .await?;

    info!("storage node shut down gracefully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_path_joins_clean_segments() {
        let data_dir = PathBuf::from("/data");
        let path = object_path(&data_dir, "bucket1", "key/nonce/0").unwrap();
        assert_eq!(path, PathBuf::from("/data/bucket1/key/nonce/0"));
    }

    #[test]
    fn object_path_rejects_parent_traversal_in_shard_key() {
        let data_dir = PathBuf::from("/data");
        assert_eq!(
            object_path(&data_dir, "bucket1", "../../etc/passwd"),
            Err(StatusCode::BAD_REQUEST)
        );
    }

    #[test]
    fn object_path_rejects_parent_traversal_in_bucket() {
        let data_dir = PathBuf::from("/data");
        assert_eq!(
            object_path(&data_dir, "..", "key/nonce/0"),
            Err(StatusCode::BAD_REQUEST)
        );
    }

    #[test]
    fn object_path_rejects_absolute_shard_key() {
        let data_dir = PathBuf::from("/data");
        assert_eq!(
            object_path(&data_dir, "bucket1", "/etc/passwd"),
            Err(StatusCode::BAD_REQUEST)
        );
    }

    #[tokio::test]
    async fn put_get_delete_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let state = NodeState {
            data_dir: Arc::new(dir.path().to_path_buf()),
        };
        let app = router(state);

        use axum::body::Body;
        use axum::http::Request;
        use tower::ServiceExt;

        let boundary = "X-TEST-BOUNDARY";
        let body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"\r\n\r\nhello shard\r\n--{boundary}--\r\n"
        );
        let put_req = Request::builder()
            .method("PUT")
            .uri("/internal/objects/b1/key1/nonce1/0")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();
        let resp = app.clone().oneshot(put_req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let get_req = Request::builder()
            .method("GET")
            .uri("/internal/objects/b1/key1/nonce1/0")
            .body(Body::empty())
            .unwrap();
        let resp = app.clone().oneshot(get_req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"hello shard");

        let delete_req = Request::builder()
            .method("DELETE")
            .uri("/internal/objects/b1/key1/nonce1/0")
            .body(Body::empty())
            .unwrap();
        let resp = app.clone().oneshot(delete_req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let get_again = Request::builder()
            .method("GET")
            .uri("/internal/objects/b1/key1/nonce1/0")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(get_again).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
