mod common;

use std::num::NonZeroU32;
use std::sync::Arc;

use common::*;
use governor::{Quota, RateLimiter};
use serde_json::{json, Value};
use warp::Filter;

use research_orchestrator::api;
use research_orchestrator::error::handle_rejection;

fn app(
    per_minute: u32,
) -> impl warp::Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let model = report_model(vec![("Introduction", false), ("Core Concepts", true)], |_| pass());
    let search = ScriptedSearch::new(|_| vec![source("A", "https://a.edu/x")]);
    let generator = Arc::new(generator(model, search, 1));
    let limiter = Arc::new(RateLimiter::direct(Quota::per_minute(
        NonZeroU32::new(per_minute).unwrap(),
    )));
    api::routes(generator, limiter).recover(handle_rejection)
}

#[tokio::test]
async fn report_endpoint_returns_the_document() {
    let resp = warp::test::request()
        .method("POST")
        .path("/api/v1/report")
        .json(&json!({ "topic": "Quantum Computing" }))
        .reply(&app(10))
        .await;

    assert_eq!(resp.status(), 200);
    let body: Value = serde_json::from_slice(resp.body()).unwrap();
    assert_eq!(body["topic"], "Quantum Computing");
    let report = body["report"].as_str().unwrap();
    assert!(report.contains("## Core Concepts"));
    assert!(report.contains("- [A](https://a.edu/x)"));
    assert_eq!(body["sections"][1]["state"], "graded_pass");
    assert_eq!(body["sources"][0]["url"], "https://a.edu/x");
}

#[tokio::test]
async fn blank_topic_is_a_bad_request() {
    let resp = warp::test::request()
        .method("POST")
        .path("/api/v1/report")
        .json(&json!({ "topic": "" }))
        .reply(&app(10))
        .await;

    assert_eq!(resp.status(), 400);
    let body: Value = serde_json::from_slice(resp.body()).unwrap();
    assert_eq!(body["error"], "Bad request");
}

#[tokio::test]
async fn markdown_endpoint_sends_an_attachment() {
    let resp = warp::test::request()
        .method("POST")
        .path("/api/v1/report/markdown")
        .json(&json!({ "topic": "Quantum Computing", "depth": "in_depth" }))
        .reply(&app(10))
        .await;

    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers()["content-disposition"],
        "attachment; filename=\"report-quantum-computing.md\""
    );
    assert!(resp.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/markdown"));
    let text = std::str::from_utf8(resp.body()).unwrap();
    assert!(text.contains("### Sources\n- [A](https://a.edu/x)"));
}

#[tokio::test]
async fn requests_over_the_quota_are_rejected() {
    let app = app(1);

    let first = warp::test::request()
        .method("POST")
        .path("/api/v1/report")
        .json(&json!({ "topic": "Quantum Computing" }))
        .reply(&app)
        .await;
    let second = warp::test::request()
        .method("POST")
        .path("/api/v1/report")
        .json(&json!({ "topic": "Quantum Computing" }))
        .reply(&app)
        .await;

    assert_eq!(first.status(), 200);
    assert_eq!(second.status(), 429);
}
