//! S3 adapter tests against a local mock endpoint.

use stowage_cache::S3ObjectStore;
use stowage_core::{CacheMetadata, Error, ObjectLocation, ObjectStore, StoreSettings};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KEY: &str = "ci/repo/main/deps.tar.gz";
const OBJECT_PATH: &str = "/bucket/ci/repo/main/deps.tar.gz";

fn store(server: &MockServer, part_size: u64) -> S3ObjectStore {
    let settings = StoreSettings::new("test-id", "test-secret", "us-east-1")
        .with_endpoint(server.uri())
        .with_transfer(part_size, 2);
    S3ObjectStore::new(&settings, "bucket").unwrap()
}

fn location() -> ObjectLocation {
    ObjectLocation::new(KEY)
}

async fn mock_head(server: &MockServer, body: &[u8]) {
    Mock::given(method("HEAD"))
        .and(path(OBJECT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_exists_true_on_head_ok() {
    let server = MockServer::start().await;
    mock_head(&server, b"0123456789").await;

    assert!(store(&server, 4).exists(&location()).await.unwrap());
}

#[tokio::test]
async fn test_exists_false_on_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path(OBJECT_PATH))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    assert!(!store(&server, 4).exists(&location()).await.unwrap());
}

#[tokio::test]
async fn test_exists_propagates_other_failures() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path(OBJECT_PATH))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let err = store(&server, 4).exists(&location()).await.unwrap_err();
    assert!(matches!(err, Error::Store { ref operation, .. } if operation == "exists"));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_download_fetches_each_range() {
    let server = MockServer::start().await;
    let data = b"0123456789";
    mock_head(&server, data).await;

    for (range, slice) in [
        ("bytes=0-3", &data[0..4]),
        ("bytes=4-7", &data[4..8]),
        ("bytes=8-9", &data[8..10]),
    ] {
        Mock::given(method("GET"))
            .and(path(OBJECT_PATH))
            .and(header("range", range))
            .respond_with(ResponseTemplate::new(206).set_body_bytes(slice.to_vec()))
            .expect(1)
            .mount(&server)
            .await;
    }

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("cache.tar.gz");
    store(&server, 4).download(&location(), &dest).await.unwrap();

    assert_eq!(std::fs::read(&dest).unwrap(), data);
}

#[tokio::test]
async fn test_download_fails_when_a_range_fails() {
    let server = MockServer::start().await;
    let data = b"0123456789";
    mock_head(&server, data).await;

    Mock::given(method("GET"))
        .and(path(OBJECT_PATH))
        .and(header("range", "bytes=4-7"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(OBJECT_PATH))
        .respond_with(ResponseTemplate::new(206).set_body_bytes(&data[0..4]))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("cache.tar.gz");
    let err = store(&server, 4)
        .download(&location(), &dest)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Store { ref operation, .. } if operation == "download"));
}

#[tokio::test]
async fn test_download_missing_object() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path(OBJECT_PATH))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let err = store(&server, 4)
        .download(&location(), &dir.path().join("cache.tar.gz"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Store { ref message, .. } if message.contains("not found")));
}

#[tokio::test]
async fn test_upload_sends_metadata() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(OBJECT_PATH))
        .and(header("x-amz-meta-key", "deps"))
        .and(header("x-amz-meta-repository", "owner/repo"))
        .and(header("x-amz-meta-ref", "main"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("cache.tar.gz");
    std::fs::write(&archive, b"archive bytes").unwrap();

    let metadata = CacheMetadata::now("owner/repo", "main", "deps");
    store(&server, 4)
        .upload(&location(), &archive, Some(&metadata))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_upload_failure_is_store_error() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(OBJECT_PATH))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("cache.tar.gz");
    std::fs::write(&archive, b"archive bytes").unwrap();

    let err = store(&server, 4)
        .upload(&location(), &archive, None)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Store { ref operation, .. } if operation == "upload"));
}

#[tokio::test]
async fn test_upload_missing_file() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    let err = store(&server, 4)
        .upload(&location(), &dir.path().join("absent.tar.gz"), None)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Store { .. }));
}
