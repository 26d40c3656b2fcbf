//! Catalog and health endpoint tests.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use novel_cart_integration_tests::TestApp;

#[tokio::test]
async fn test_empty_catalog() {
    let mut app = TestApp::new().await;

    let response = app.get("/novels").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json["count"], 0);
    assert_eq!(response.json["results"], serde_json::json!([]));
}

#[tokio::test]
async fn test_list_is_ordered_by_rank() {
    let mut app = TestApp::new().await;
    app.seed_novel("Third", 3, "68.00", "2025").await;
    app.seed_novel("First", 1, "89.00", "2025").await;
    app.seed_novel("Second", 2, "75.00", "2025").await;

    let response = app.get("/novels").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json["count"], 3);

    let results = response.json["results"].as_array().unwrap();
    let names: Vec<&str> = results.iter().map(|n| n["name"].as_str().unwrap()).collect();
    assert_eq!(names, ["First", "Second", "Third"]);

    let first = &results[0];
    assert_eq!(first["price"], "89.00");
    assert_eq!(first["rank"], 1);
    assert_eq!(first["year"], "2025");
    assert_eq!(first["author"], "First author");
    assert_eq!(first["publisher"], "First publisher");
}

#[tokio::test]
async fn test_year_filter() {
    let mut app = TestApp::new().await;
    app.seed_novel("New", 1, "10.00", "2025").await;
    app.seed_novel("Old", 1, "10.00", "2024").await;

    let response = app.get("/novels?year=2024").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json["count"], 1);
    assert_eq!(response.json["results"][0]["name"], "Old");

    let response = app.get("/novels/?year=1999").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json["count"], 0);

    // An empty filter is no filter.
    let response = app.get("/novels?year=").await;
    assert_eq!(response.json["count"], 2);
}

#[tokio::test]
async fn test_novel_detail() {
    let mut app = TestApp::new().await;
    let novel = app.seed_novel("Only", 1, "59", "2025").await;

    let response = app.get(&format!("/novels/{}", novel.id)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json["name"], "Only");
    assert_eq!(response.json["price"], "59.00");

    let response = app.get("/novels/9999").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.error(), "novel does not exist");

    let response = app.get("/novels/not-a-number").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_endpoints() {
    let mut app = TestApp::new().await;

    let response = app.get("/health").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.text, "ok");

    let response = app.get("/health/ready").await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_request_id_header() {
    let mut app = TestApp::new().await;

    let response = app.get("/health").await;
    let request_id = response.headers.get("x-request-id").unwrap();
    assert!(!request_id.is_empty());
}
