//! End-to-end tests for the download route
//!
//! These tests drive the full router against an instrumented in-memory object
//! source and verify that:
//! 1. Archives contain exactly the objects under the folder, named relative to it
//! 2. Empty folders still produce a valid archive
//! 3. Failures before the first byte become a plain 500
//! 4. Failures after the first byte tear the body down
//! 5. A client disconnect stops further fetches

use std::collections::BTreeSet;
use std::io::{Cursor, Read};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use foldzip_domain::{archive::ArchiveService, testing::InMemoryObjectSource};
use foldzip_server::{routes::create_router, AppState};
use futures::StreamExt;
use tower::util::ServiceExt;
use zip::ZipArchive;

fn app(source: Arc<InMemoryObjectSource>, stream_buffer: usize) -> Router {
    create_router(AppState::new(ArchiveService::new(source), stream_buffer))
}

async fn get(app: Router, uri: &str) -> Response {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should complete")
        .to_vec()
}

fn entry_names(bytes: Vec<u8>) -> BTreeSet<String> {
    let zip = ZipArchive::new(Cursor::new(bytes)).expect("valid zip archive");
    zip.file_names().map(str::to_string).collect()
}

#[tokio::test]
async fn test_streams_folder_with_relative_names() {
    let source = Arc::new(InMemoryObjectSource::with_objects([
        ("photosession/u1/f1/a.jpg", "photo a"),
        ("photosession/u1/f1/sub/b.jpg", "photo b"),
        ("photosession/u1/f2/c.jpg", "someone else"),
    ]));

    let response = get(app(source, 4), "/photosession/u1/f1/").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/zip");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"f1.zip\""
    );

    let bytes = body_bytes(response).await;
    let mut zip = ZipArchive::new(Cursor::new(bytes.clone())).unwrap();
    let mut text = String::new();
    zip.by_name("sub/b.jpg")
        .unwrap()
        .read_to_string(&mut text)
        .unwrap();

    assert_eq!(text, "photo b");
    assert_eq!(
        entry_names(bytes),
        BTreeSet::from(["a.jpg".to_string(), "sub/b.jpg".to_string()])
    );
}

#[tokio::test]
async fn test_route_without_trailing_slash() {
    let source = Arc::new(InMemoryObjectSource::with_objects([(
        "photosession/u1/f1/a.jpg",
        "photo a",
    )]));

    let response = get(app(source, 4), "/photosession/u1/f1").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(entry_names(body_bytes(response).await).len(), 1);
}

#[tokio::test]
async fn test_empty_folder_yields_empty_archive() {
    let source = Arc::new(InMemoryObjectSource::with_objects([(
        "photosession/u1/other/a.jpg",
        "photo a",
    )]));

    let response = get(app(source, 4), "/photosession/u1/f1/").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(entry_names(body_bytes(response).await).is_empty());
}

#[tokio::test]
async fn test_listing_failure_before_streaming_is_500() {
    let source = Arc::new(
        InMemoryObjectSource::with_objects([("photosession/u1/f1/a.jpg", "photo a")])
            .fail_listing("photosession/u1/f1/"),
    );

    let response = get(app(source, 4), "/photosession/u1/f1/").await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let text = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(text.starts_with("Error creating ZIP:"));
    assert!(text.contains("Listing failed"));
}

#[tokio::test]
async fn test_first_fetch_failure_is_500() {
    let source = Arc::new(
        InMemoryObjectSource::with_objects([
            ("photosession/u1/f1/a.jpg", "photo a"),
            ("photosession/u1/f1/b.jpg", "photo b"),
        ])
        .fail_fetch_at(1),
    );

    let response = get(app(source.clone(), 4), "/photosession/u1/f1/").await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let text = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(text.contains("injected fetch failure"));
    assert_eq!(source.fetch_calls(), 1);
}

#[tokio::test]
async fn test_failure_after_streaming_started_breaks_body() {
    let source = Arc::new(
        InMemoryObjectSource::with_objects([
            ("photosession/u1/f1/a.jpg", "photo a"),
            ("photosession/u1/f1/b.jpg", "photo b"),
            ("photosession/u1/f1/c.jpg", "photo c"),
        ])
        .fail_fetch_at(2),
    );

    let response = get(app(source.clone(), 4), "/photosession/u1/f1/").await;

    assert_eq!(response.status(), StatusCode::OK);
    let result = axum::body::to_bytes(response.into_body(), usize::MAX).await;
    assert!(result.is_err(), "truncated archive must not end cleanly");
    assert_eq!(source.fetch_calls(), 2);
}

#[tokio::test]
async fn test_invalid_identifier_is_400() {
    let source = Arc::new(InMemoryObjectSource::new());

    let response = get(app(source.clone(), 4), "/photosession/u1/a%22b/").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(source.list_calls(), 0);
}

#[tokio::test]
async fn test_client_disconnect_stops_fetching() {
    let objects: Vec<(String, Vec<u8>)> = (0..50)
        .map(|i| (format!("photosession/u1/f1/img{i:02}.jpg"), vec![7u8; 4096]))
        .collect();
    let source = Arc::new(InMemoryObjectSource::with_objects(objects));

    let response = get(app(source.clone(), 1), "/photosession/u1/f1/").await;
    assert_eq!(response.status(), StatusCode::OK);

    let mut body = response.into_body().into_data_stream();
    body.next().await.unwrap().unwrap();
    drop(body);

    tokio::time::sleep(Duration::from_millis(50)).await;
    let after_disconnect = source.fetch_calls();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(source.fetch_calls(), after_disconnect);
    assert!(after_disconnect < 50, "fetched {after_disconnect} objects");
}

#[tokio::test]
async fn test_health() {
    let response = get(app(Arc::new(InMemoryObjectSource::new()), 4), "/health").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"OK");
}

#[tokio::test]
async fn test_openapi_documents_download_route() {
    let response = get(
        app(Arc::new(InMemoryObjectSource::new()), 4),
        "/api-docs/openapi.json",
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let doc: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert!(doc["paths"]["/photosession/{user_id}/{folder_id}/"]["get"].is_object());
    assert!(doc["paths"]["/health"]["get"].is_object());
}
