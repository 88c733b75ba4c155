//! Static file delivery through the dispatcher, including byte ranges.

use std::sync::Arc;

use axum::http::{Method, StatusCode};

use server_pages::config::PagesConfig;
use server_pages::http::connection::ConnectionRequest;
use server_pages::lifecycle::startup::build_dispatcher;
use server_pages::routing::{Route, RouteTable};
use server_pages::dispatch::{Dispatcher, ServiceProvider};
use server_pages::pages::StaticFilesPage;

mod common;

fn get(target: &str, range: Option<&str>) -> ConnectionRequest {
    let builder = ConnectionRequest::builder(Method::GET, target).header("host", "files.test");
    match range {
        Some(range) => builder.header("range", range).build(),
        None => builder.build(),
    }
}

fn files_dispatcher(root: &std::path::Path) -> Dispatcher {
    let mut config = PagesConfig::default();
    config.files.root = Some(root.to_path_buf());
    build_dispatcher(&config)
}

#[tokio::test]
async fn test_full_file() {
    let dir = tempfile::tempdir().unwrap();
    let data = common::write_fixture(dir.path(), "data.bin", 1000);
    let dispatcher = files_dispatcher(dir.path());

    let exchange = common::exchange(&dispatcher, get("/static/data.bin", None)).await;

    assert_eq!(exchange.parts.status, StatusCode::OK);
    assert_eq!(exchange.header("content-length"), Some("1000"));
    assert_eq!(exchange.header("accept-ranges"), Some("bytes"));
    assert!(exchange.header("content-range").is_none());
    assert_eq!(&exchange.body[..], &data[..]);
}

#[tokio::test]
async fn test_open_ended_range() {
    let dir = tempfile::tempdir().unwrap();
    let data = common::write_fixture(dir.path(), "data.bin", 1000);
    let dispatcher = files_dispatcher(dir.path());

    let exchange = common::exchange(&dispatcher, get("/static/data.bin", Some("bytes=500-"))).await;

    assert_eq!(exchange.parts.status, StatusCode::PARTIAL_CONTENT);
    assert_eq!(exchange.header("content-range"), Some("bytes 500-999/1000"));
    assert_eq!(exchange.header("content-length"), Some("500"));
    assert_eq!(&exchange.body[..], &data[500..]);
}

#[tokio::test]
async fn test_suffix_range() {
    let dir = tempfile::tempdir().unwrap();
    let data = common::write_fixture(dir.path(), "data.bin", 1000);
    let dispatcher = files_dispatcher(dir.path());

    let exchange = common::exchange(&dispatcher, get("/static/data.bin", Some("bytes=-100"))).await;

    assert_eq!(exchange.parts.status, StatusCode::PARTIAL_CONTENT);
    assert_eq!(exchange.header("content-range"), Some("bytes 900-999/1000"));
    assert_eq!(&exchange.body[..], &data[900..]);
}

#[tokio::test]
async fn test_every_window_of_a_small_file() {
    let dir = tempfile::tempdir().unwrap();
    let data = common::write_fixture(dir.path(), "small.bin", 12);
    let dispatcher = files_dispatcher(dir.path());

    for start in 0..12usize {
        for end in start..12usize {
            let range = format!("bytes={start}-{end}");
            let exchange = common::exchange(&dispatcher, get("/static/small.bin", Some(&range))).await;

            assert_eq!(exchange.parts.status, StatusCode::PARTIAL_CONTENT, "{range}");
            let expected = format!("bytes {start}-{end}/12");
            assert_eq!(exchange.header("content-range"), Some(expected.as_str()));
            assert_eq!(exchange.body.len(), end - start + 1);
            assert_eq!(&exchange.body[..], &data[start..=end]);
        }
    }
}

#[tokio::test]
async fn test_unsatisfiable_ranges() {
    let dir = tempfile::tempdir().unwrap();
    common::write_fixture(dir.path(), "data.bin", 1000);
    let dispatcher = files_dispatcher(dir.path());

    for range in ["bytes=1000-", "bytes=10-1000", "bytes=5000-6000"] {
        let exchange = common::exchange(&dispatcher, get("/static/data.bin", Some(range))).await;

        assert_eq!(exchange.parts.status, StatusCode::RANGE_NOT_SATISFIABLE, "{range}");
        assert_eq!(exchange.header("content-range"), Some("bytes */1000"));
        assert!(exchange.body.is_empty());
    }
}

#[tokio::test]
async fn test_multi_range_served_in_full() {
    let dir = tempfile::tempdir().unwrap();
    common::write_fixture(dir.path(), "data.bin", 1000);
    let dispatcher = files_dispatcher(dir.path());

    let exchange =
        common::exchange(&dispatcher, get("/static/data.bin", Some("bytes=0-10,20-30"))).await;

    assert_eq!(exchange.parts.status, StatusCode::OK);
    assert_eq!(exchange.body.len(), 1000);
}

#[tokio::test]
async fn test_content_type_from_extension() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("site.css"), "body{}").unwrap();
    let dispatcher = files_dispatcher(dir.path());

    let exchange = common::exchange(&dispatcher, get("/static/site.css", None)).await;

    assert_eq!(exchange.header("content-type"), Some("text/css"));
    assert_eq!(exchange.text(), "body{}");
}

#[tokio::test]
async fn test_encoded_file_name() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("my file.txt"), "spaced out").unwrap();
    let dispatcher = files_dispatcher(dir.path());

    let exchange = common::exchange(&dispatcher, get("/static/my%20file.txt", None)).await;

    assert_eq!(exchange.parts.status, StatusCode::OK);
    assert_eq!(exchange.header("content-type"), Some("text/plain"));
    assert_eq!(exchange.text(), "spaced out");

    let exchange = common::exchange(&dispatcher, get("/static/%2e%2e/secret", None)).await;
    assert_eq!(exchange.parts.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_missing_file_and_directory_are_not_found() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("nested")).unwrap();
    let dispatcher = files_dispatcher(dir.path());

    for target in ["/static/absent.txt", "/static/nested", "/static"] {
        let exchange = common::exchange(&dispatcher, get(target, None)).await;
        assert_eq!(exchange.parts.status, StatusCode::NOT_FOUND, "{target}");
    }
}

#[tokio::test]
async fn test_cache_headers_from_max_age() {
    let dir = tempfile::tempdir().unwrap();
    common::write_fixture(dir.path(), "logo.png", 64);
    let routes = RouteTable::new().route(Route::new(
        "assets",
        "/assets",
        StaticFilesPage::page_type(dir.path(), Some(86400)),
    ));
    let dispatcher = Dispatcher::new(Arc::new(routes), Arc::new(ServiceProvider::new()));

    let exchange = common::exchange(&dispatcher, get("/assets/logo.png", None)).await;

    assert_eq!(exchange.parts.status, StatusCode::OK);
    assert_eq!(exchange.header("cache-control"), Some("public, max-age=86400"));
    assert_eq!(exchange.header("content-type"), Some("image/png"));
}
