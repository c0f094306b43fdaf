//! Integration tests for `RestClient` against an in-process axum server.

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode, header};
use axum::routing::{get, post, put};
use serde::Deserialize;
use serde_json::{Value, json};

use quantforce_client::{
    ClientConfig, ClientError, ClientResult, Method, RequestBody, RestClient, TOKEN_HEADER,
    Transport, TransportExt,
};

/// 3 MiB, well past any single read buffer.
const LARGE_BODY_LEN: usize = 3 * 1024 * 1024;

fn large_body() -> Vec<u8> {
    (0..LARGE_BODY_LEN).map(|i| (i * 31 % 251) as u8).collect()
}

async fn echo(headers: HeaderMap, body: Bytes) -> Json<Value> {
    let value_of = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    Json(json!({
        "contentType": value_of(header::CONTENT_TYPE.as_str()),
        "token": value_of(TOKEN_HEADER),
        "body": String::from_utf8_lossy(&body),
        "len": body.len(),
    }))
}

fn router() -> Router {
    Router::new()
        .route("/missing", get(|| async { (StatusCode::NOT_FOUND, "job not ready") }))
        .route("/boom", get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "db down") }))
        .route("/rejected", post(|| async { (StatusCode::BAD_REQUEST, "column unknown") }))
        .route("/garbage", get(|| async { "{ not json" }))
        .route("/echo", get(echo).post(echo))
        .route("/put", put(echo))
        .route("/files/empty", get(|| async { Vec::<u8>::new() }))
        .route("/files/small", get(|| async { "id,churn\n1,0\n2,1\n" }))
        .route("/files/large", get(|| async { large_body() }))
}

async fn serve() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router()).await.unwrap();
    });
    format!("http://{addr}")
}

fn client() -> RestClient {
    RestClient::new(&ClientConfig::default()).unwrap()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Echo {
    content_type: Option<String>,
    token: Option<String>,
    body: String,
    len: usize,
}

#[tokio::test]
async fn not_found_is_returned_not_raised() {
    let base = serve().await;
    let response = client()
        .send(Method::GET, &format!("{base}/missing"), RequestBody::Empty)
        .await
        .unwrap();
    assert!(response.is_not_found());
    assert_eq!(response.text(), "job not ready");
}

#[tokio::test]
async fn failure_carries_server_text() {
    let base = serve().await;
    let client = client();

    let err = client
        .send(Method::GET, &format!("{base}/boom"), RequestBody::Empty)
        .await
        .unwrap_err();
    match err {
        ClientError::Transport { status, body } => {
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(body, "db down");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let rejected: ClientResult<Value> = client
        .post_typed(&format!("{base}/rejected"), None::<&Value>)
        .await;
    let err = rejected.unwrap_err();
    assert!(matches!(err, ClientError::Transport { ref body, .. } if body == "column unknown"));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn typed_get_distinguishes_failure_kinds() {
    let base = serve().await;
    let client = client();

    let missing: ClientResult<Value> = client.get_typed(&format!("{base}/missing")).await;
    assert!(matches!(missing.unwrap_err(), ClientError::NotFound { .. }));

    let garbage: ClientResult<Value> = client.get_typed(&format!("{base}/garbage")).await;
    let err = garbage.unwrap_err();
    assert!(matches!(err, ClientError::Deserialization { ref body, .. } if body == "{ not json"));

    assert!(client.get_unit(&format!("{base}/echo")).await.is_ok());
    assert!(matches!(
        client.get_unit(&format!("{base}/missing")).await,
        Err(ClientError::NotFound { .. })
    ));
}

#[tokio::test]
async fn json_body_is_sent_as_json() {
    let base = serve().await;
    let echo: Echo = client()
        .post_typed(&format!("{base}/echo"), Some(&json!({ "name": "demo01", "type": 0 })))
        .await
        .unwrap();
    assert_eq!(echo.content_type.as_deref(), Some("application/json"));
    let sent: Value = serde_json::from_str(&echo.body).unwrap();
    assert_eq!(sent, json!({ "name": "demo01", "type": 0 }));
}

#[tokio::test]
async fn put_uses_put() {
    let base = serve().await;
    let echo: Echo = client()
        .put_typed(&format!("{base}/put"), Some(&json!([1, 2, 3])))
        .await
        .unwrap();
    assert_eq!(echo.body, "[1,2,3]");
}

#[tokio::test]
async fn raw_body_is_sent_verbatim() {
    let base = serve().await;
    let csv = "id;name\n1;é\n";
    let echo: Echo = client()
        .post_raw(&format!("{base}/echo"), Bytes::from_static(csv.as_bytes()))
        .await
        .unwrap();
    assert_eq!(echo.body, csv);
    assert_eq!(echo.len, csv.len());
    assert_ne!(echo.content_type.as_deref(), Some("application/json"));
}

#[tokio::test]
async fn configured_headers_ride_on_every_request() {
    let base = serve().await;
    let mut client = client();

    let anonymous: Echo = client.get_typed(&format!("{base}/echo")).await.unwrap();
    assert_eq!(anonymous.token, None);

    client.set_token("tok-123").unwrap();
    let first: Echo = client.get_typed(&format!("{base}/echo")).await.unwrap();
    let second: Echo = client
        .post_raw(&format!("{base}/echo"), Bytes::from_static(b"x"))
        .await
        .unwrap();
    assert_eq!(first.token.as_deref(), Some("tok-123"));
    assert_eq!(second.token.as_deref(), Some("tok-123"));
}

#[tokio::test]
async fn download_writes_identical_bytes() {
    let base = serve().await;
    let dir = tempfile::tempdir().unwrap();
    let client = client();

    let cases: [(&str, Vec<u8>); 3] = [
        ("empty", Vec::new()),
        ("small", b"id,churn\n1,0\n2,1\n".to_vec()),
        ("large", large_body()),
    ];
    for (name, expected) in cases {
        let path = dir.path().join(name);
        let written = client
            .download(&format!("{base}/files/{name}"), &path)
            .await
            .unwrap();
        assert_eq!(written, expected.len() as u64, "{name}");
        assert_eq!(std::fs::read(&path).unwrap(), expected, "{name}");
    }
}

#[tokio::test]
async fn download_truncates_existing_file() {
    let base = serve().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("transform.py");
    std::fs::write(&path, vec![b'#'; 4096]).unwrap();

    client()
        .download(&format!("{base}/files/small"), &path)
        .await
        .unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), b"id,churn\n1,0\n2,1\n");
}

#[tokio::test]
async fn download_failures_leave_no_file() {
    let base = serve().await;
    let dir = tempfile::tempdir().unwrap();
    let client = client();

    let path = dir.path().join("missing.bin");
    let err = client
        .download(&format!("{base}/missing"), &path)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::NotFound { .. }));
    assert!(!path.exists());

    let path = dir.path().join("boom.bin");
    let err = client
        .download(&format!("{base}/boom"), &path)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Transport { .. }));
    assert!(!path.exists());
}

#[tokio::test]
async fn download_into_missing_directory_is_io_error() {
    let base = serve().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("no-such-dir").join("out.csv");
    let err = client()
        .download(&format!("{base}/files/small"), &path)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Io(_)));
}
