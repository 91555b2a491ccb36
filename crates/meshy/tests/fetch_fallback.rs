//! Polling behavior against a local server serving canned responses:
//! a 404 on the hinted endpoint retries exactly once against the
//! alternate endpoint, and any other failure aborts without retrying.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use mesa_meshy::{Endpoint, MeshyClient, MeshyConfig, MeshyError};

/// Serve one canned HTTP response per connection, chosen by request
/// path. Returns the bound address and a request counter.
async fn spawn_server(
    respond: fn(&str) -> (&'static str, &'static str),
) -> (SocketAddr, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);

    tokio::spawn(async move {
        loop {
            let Ok((mut conn, _)) = listener.accept().await else {
                break;
            };
            counter.fetch_add(1, Ordering::SeqCst);

            let mut buf = vec![0u8; 4096];
            let n = conn.read(&mut buf).await.unwrap_or(0);
            let request = String::from_utf8_lossy(&buf[..n]).into_owned();
            let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();

            let (status_line, body) = respond(&path);
            let response = format!(
                "HTTP/1.1 {status_line}\r\n\
                 content-type: application/json\r\n\
                 content-length: {}\r\n\
                 connection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = conn.write_all(response.as_bytes()).await;
        }
    });

    (addr, hits)
}

fn client(addr: SocketAddr) -> MeshyClient {
    MeshyClient::new(MeshyConfig {
        base_url: format!("http://{addr}"),
        api_key: Some("test-key".to_string()),
        default_model: "meshy-4".to_string(),
    })
}

#[tokio::test]
async fn not_found_retries_once_against_alternate_endpoint() {
    // The task lives on the multi-image endpoint, but the stored hint
    // points at the single-image one (stale or missing hint).
    let (addr, hits) = spawn_server(|path| {
        if path.starts_with("/openapi/v1/multi-image-to-3d/") {
            ("200 OK", r#"{"id":"task-1","status":"SUCCEEDED"}"#)
        } else {
            ("404 Not Found", r#"{"message":"task not found"}"#)
        }
    })
    .await;

    let outcome = client(addr)
        .fetch("task-1", Some(Endpoint::ImageTo3d))
        .await
        .unwrap();

    assert_eq!(outcome.endpoint, Endpoint::MultiImageTo3d);
    assert_eq!(outcome.raw_status, "SUCCEEDED");
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn non_404_failure_aborts_without_retry() {
    let (addr, hits) = spawn_server(|_| ("500 Internal Server Error", r#"{"message":"boom"}"#)).await;

    let err = client(addr)
        .fetch("task-1", Some(Endpoint::ImageTo3d))
        .await
        .unwrap_err();

    assert!(matches!(err, MeshyError::RequestFailed { status: 500, .. }));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn missing_hint_defaults_to_single_image_endpoint_first() {
    let (addr, hits) = spawn_server(|path| {
        if path.starts_with("/openapi/v1/image-to-3d/") {
            ("200 OK", r#"{"id":"task-1","status":"IN_PROGRESS"}"#)
        } else {
            ("404 Not Found", r#"{"message":"task not found"}"#)
        }
    })
    .await;

    let outcome = client(addr).fetch("task-1", None).await.unwrap();

    assert_eq!(outcome.endpoint, Endpoint::ImageTo3d);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}
