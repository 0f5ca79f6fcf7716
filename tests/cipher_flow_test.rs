use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use rust_cipher_backend::config::AppConfig;
use rust_cipher_backend::services::blob_store::BlobStore;
use rust_cipher_backend::services::error::ExchangeError;
use rust_cipher_backend::services::exchange::ExchangeService;
use rust_cipher_backend::services::processor::{PassthroughTransformer, Transformer};
use rust_cipher_backend::services::token_store::TokenStore;
use rust_cipher_backend::{AppState, create_app};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

fn setup_state(ttl: chrono::Duration, transformer: Arc<dyn Transformer>) -> (AppState, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig {
        storage_root: dir.path().join("uploads"),
        staging_root: dir.path().join("staging"),
        key_dir: dir.path().join("keys"),
        ..AppConfig::development()
    };
    std::fs::create_dir_all(&config.key_dir).unwrap();

    let tokens = Arc::new(TokenStore::new(
        BlobStore::new(config.storage_root.clone()),
        ttl,
    ));
    let exchange = Arc::new(ExchangeService::new(
        tokens.clone(),
        transformer,
        config.clone(),
    ));

    (
        AppState {
            tokens,
            exchange,
            config,
        },
        dir,
    )
}

fn multipart_upload(filename: &str, content: &str) -> Request<Body> {
    let boundary = "---------------------------123456789012345678901234567";
    let body = format!(
        "--{boundary}\r\n\
        Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
        Content-Type: text/plain\r\n\r\n\
        {content}\r\n\
        --{boundary}--\r\n",
        boundary = boundary,
        filename = filename,
        content = content
    );

    Request::builder()
        .method("POST")
        .uri("/api/cipher/encrypt")
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap()
}

fn assert_no_staging_leftovers(dir: &TempDir) {
    let staging = dir.path().join("staging");
    if staging.exists() {
        let leftovers: Vec<_> = std::fs::read_dir(&staging).unwrap().flatten().collect();
        assert!(
            leftovers.is_empty(),
            "staged artifacts leaked: {leftovers:?}"
        );
    }
}

#[tokio::test]
async fn test_encrypt_download_flow() {
    let (state, dir) = setup_state(chrono::Duration::hours(24), Arc::new(PassthroughTransformer));
    let app = create_app(state);

    // Health first
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // 1. Encrypt
    let content = "Hello, this is a secret report!";
    let response = app
        .clone()
        .oneshot(multipart_upload("report.txt", content))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["success"], true);
    assert_eq!(json["original_file_name"], "report.txt");
    assert_eq!(json["encrypted_file_name"], "report.cif");
    assert_eq!(json["valid_for"], "24 hours");
    let token = json["token"].as_str().unwrap().to_string();
    assert_eq!(
        json["download_url"].as_str().unwrap(),
        format!("/api/cipher/download/{}", token)
    );

    assert_no_staging_leftovers(&dir);

    // 2. Download
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/api/cipher/download/{}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "application/octet-stream"
    );
    assert!(
        response.headers()["content-disposition"]
            .to_str()
            .unwrap()
            .contains("report.cif")
    );
    let downloaded = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(String::from_utf8_lossy(&downloaded), content);

    // 3. Info (download did not consume the token)
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/api/cipher/info/{}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["original_file_name"], "report.txt");
    assert_eq!(json["expired"], false);

    // 4. Revoke, then the token is gone
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/cipher/{}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/api/cipher/download/{}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_two_uploads_get_distinct_tokens() {
    let (state, _dir) = setup_state(chrono::Duration::hours(24), Arc::new(PassthroughTransformer));
    let app = create_app(state);

    let mut tokens = Vec::new();
    for content in ["first", "second"] {
        let response = app
            .clone()
            .oneshot(multipart_upload("same_name.txt", content))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: Value = serde_json::from_slice(&body).unwrap();
        tokens.push(json["token"].as_str().unwrap().to_string());
    }
    assert_ne!(tokens[0], tokens[1]);
}

#[tokio::test]
async fn test_rejects_invalid_submissions() {
    let (state, dir) = setup_state(chrono::Duration::hours(24), Arc::new(PassthroughTransformer));
    let app = create_app(state);

    // Wrong extension
    let response = app
        .clone()
        .oneshot(multipart_upload("report.pdf", "not text"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Empty payload
    let response = app
        .clone()
        .oneshot(multipart_upload("report.txt", ""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Missing file field entirely
    let boundary = "---------------------------123456789012345678901234567";
    let body = format!(
        "--{boundary}\r\n\
        Content-Disposition: form-data; name=\"other\"\r\n\r\n\
        hello\r\n\
        --{boundary}--\r\n"
    );
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/cipher/encrypt")
                .header(
                    "Content-Type",
                    format!("multipart/form-data; boundary={}", boundary),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert_no_staging_leftovers(&dir);
}

#[tokio::test]
async fn test_unknown_token_is_not_found() {
    let (state, _dir) = setup_state(chrono::Duration::hours(24), Arc::new(PassthroughTransformer));
    let app = create_app(state);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/cipher/download/no-such-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/cipher/info/no-such-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Revoking an absent token still succeeds
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/cipher/no-such-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_expired_token_is_gone_with_its_blob() {
    let (state, dir) = setup_state(
        chrono::Duration::milliseconds(30),
        Arc::new(PassthroughTransformer),
    );
    let app = create_app(state);

    let response = app
        .clone()
        .oneshot(multipart_upload("fleeting.txt", "soon gone"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap();
    let token = json["token"].as_str().unwrap().to_string();

    tokio::time::sleep(std::time::Duration::from_millis(80)).await;

    // Expired reads as never-existed...
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/api/cipher/download/{}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // ...and the blob is gone from the repository
    let uploads: Vec<_> = std::fs::read_dir(dir.path().join("uploads"))
        .unwrap()
        .flatten()
        .collect();
    assert!(uploads.is_empty(), "expired blob leaked: {uploads:?}");
}

struct FailingTransformer;

#[async_trait::async_trait]
impl Transformer for FailingTransformer {
    async fn transform(
        &self,
        _extension: &str,
        _base_name: &str,
        _key_dir: &Path,
        _work_dir: &Path,
    ) -> Result<(), ExchangeError> {
        Err(ExchangeError::Processing("tool exited with 1".to_string()))
    }
}

#[tokio::test]
async fn test_failed_encryption_cleans_up_staging() {
    let (state, dir) = setup_state(chrono::Duration::hours(24), Arc::new(FailingTransformer));
    let app = create_app(state.clone());

    let response = app
        .clone()
        .oneshot(multipart_upload("report.txt", "doomed"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    assert_no_staging_leftovers(&dir);
    assert!(state.tokens.is_empty());
}
