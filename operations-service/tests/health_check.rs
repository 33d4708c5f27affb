mod common;

use common::TestApp;
use serde_json::Value;

#[tokio::test]
#[ignore = "requires a running MongoDB"]
async fn health_and_readiness_respond() {
    let app = TestApp::spawn().await;

    let response = app.get("/health").await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "operations-service");

    let response = app.get("/ready").await;
    assert_eq!(response.status(), 200);

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires a running MongoDB"]
async fn responses_echo_the_request_id() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(format!("{}/health", app.address))
        .header("x-request-id", "test-correlation-id")
        .send()
        .await
        .unwrap();

    assert_eq!(
        response.headers().get("x-request-id").unwrap(),
        "test-correlation-id"
    );

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires a running MongoDB"]
async fn unknown_route_returns_404() {
    let app = TestApp::spawn().await;

    let response = app.get("/nope").await;
    assert_eq!(response.status(), 404);

    app.cleanup().await;
}
