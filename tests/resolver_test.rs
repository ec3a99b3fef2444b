//! Resolver behaviour against mock instances

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use url::Url;
use vidrelay::config::ResolverConfig;
use vidrelay::resolver::{ApiVersion, FailureReason, Instance, ResolveOutcome, Resolver};
use wiremock::matchers::{body_json, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{closed_port_instance, instance_for, quick_resolver_config, redirect_body};

const PAGE_URL: &str = "https://www.tiktok.com/@someone/video/7300000000000000000";

async fn failing_server(status: u16) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(status))
        .expect(1)
        .mount(&server)
        .await;
    server
}

async fn redirect_server(direct: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(redirect_body(direct)))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_every_failure_gets_one_line_in_order() {
    let a = failing_server(500).await;
    let b = failing_server(429).await;
    let c = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "error",
            "error": { "code": "error.api.content.video.unavailable" }
        })))
        .expect(1)
        .mount(&c)
        .await;

    let candidates = vec![instance_for(&a), instance_for(&b), instance_for(&c)];
    let resolver = Resolver::new(quick_resolver_config()).unwrap();
    let outcome = resolver.resolve(PAGE_URL, &candidates).await;

    let ResolveOutcome::Failure(report) = outcome else {
        panic!("expected failure, got {:?}", outcome);
    };
    let text = report.to_string();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], format!("{}: HTTP 500 Internal Server Error", candidates[0]));
    assert_eq!(lines[1], format!("{}: HTTP 429 Too Many Requests", candidates[1]));
    assert_eq!(
        lines[2],
        format!(
            "{}: no usable link (status error (error.api.content.video.unavailable))",
            candidates[2]
        )
    );
}

#[tokio::test]
async fn test_stops_at_first_success() {
    let a = failing_server(502).await;
    let b = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(redirect_body("https://cdn.example/v.mp4")))
        .expect(1)
        .mount(&b)
        .await;
    let c = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(redirect_body("https://other.example/v.mp4")))
        .expect(0)
        .mount(&c)
        .await;

    let candidates = vec![instance_for(&a), instance_for(&b), instance_for(&c)];
    let resolver = Resolver::new(quick_resolver_config()).unwrap();
    let outcome = resolver.resolve(PAGE_URL, &candidates).await;

    assert_eq!(outcome.direct_url().map(Url::as_str), Some("https://cdn.example/v.mp4"));
    let failed = outcome.report();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed.attempts()[0].instance, candidates[0].id());
    assert_eq!(
        failed.attempts()[0].reason,
        FailureReason::Rejected(reqwest::StatusCode::BAD_GATEWAY)
    );
}

#[tokio::test]
async fn test_stream_status_is_accepted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "stream",
            "url": "https://tunnel.example/stream?id=1"
        })))
        .mount(&server)
        .await;

    let resolver = Resolver::new(quick_resolver_config()).unwrap();
    let outcome = resolver.resolve(PAGE_URL, &[instance_for(&server)]).await;
    assert_eq!(
        outcome.direct_url().map(Url::as_str),
        Some("https://tunnel.example/stream?id=1")
    );
    assert!(outcome.report().is_empty());
}

#[tokio::test]
async fn test_picker_uses_first_item() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "picker",
            "picker": [
                { "type": "video", "url": "https://cdn.example/first.mp4" },
                { "type": "video", "url": "https://cdn.example/second.mp4" }
            ]
        })))
        .mount(&server)
        .await;

    let resolver = Resolver::new(quick_resolver_config()).unwrap();
    let outcome = resolver.resolve(PAGE_URL, &[instance_for(&server)]).await;
    assert_eq!(outcome.direct_url().map(Url::as_str), Some("https://cdn.example/first.mp4"));
}

#[tokio::test]
async fn test_empty_picker_falls_through() {
    let empty = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "picker", "picker": [] })))
        .mount(&empty)
        .await;
    let good = redirect_server("https://cdn.example/v.mp4").await;

    let candidates = vec![instance_for(&empty), instance_for(&good)];
    let resolver = Resolver::new(quick_resolver_config()).unwrap();
    let outcome = resolver.resolve(PAGE_URL, &candidates).await;

    assert!(outcome.is_success());
    assert_eq!(
        outcome.report().to_string(),
        format!("{}: no usable link (status picker without a usable url)", candidates[0])
    );
}

#[tokio::test]
async fn test_malformed_body_is_recorded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let resolver = Resolver::new(quick_resolver_config()).unwrap();
    let outcome = resolver.resolve(PAGE_URL, &[instance_for(&server)]).await;

    let attempts = outcome.report().attempts();
    assert_eq!(attempts.len(), 1);
    assert!(matches!(attempts[0].reason, FailureReason::Malformed(_)));
}

#[tokio::test]
async fn test_slow_instance_times_out() {
    let slow = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(redirect_body("https://cdn.example/late.mp4"))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&slow)
        .await;
    let fast = redirect_server("https://cdn.example/v.mp4").await;

    let config = ResolverConfig {
        attempt_timeout: Duration::from_millis(300),
        ..quick_resolver_config()
    };
    let resolver = Resolver::new(config).unwrap();
    let started = std::time::Instant::now();
    let outcome = resolver
        .resolve(PAGE_URL, &[instance_for(&slow), instance_for(&fast)])
        .await;

    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(outcome.direct_url().map(Url::as_str), Some("https://cdn.example/v.mp4"));
    assert_eq!(
        outcome.report().attempts()[0].reason,
        FailureReason::TimedOut(Duration::from_millis(300))
    );
}

#[tokio::test]
async fn test_deadline_skips_remaining_instances() {
    let slow = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_delay(Duration::from_secs(3)))
        .mount(&slow)
        .await;
    let never_b = MockServer::start().await;
    let never_c = MockServer::start().await;

    let config = ResolverConfig {
        attempt_timeout: Duration::from_millis(300),
        deadline: Duration::from_millis(300),
        ..quick_resolver_config()
    };
    let candidates = vec![instance_for(&slow), instance_for(&never_b), instance_for(&never_c)];
    let resolver = Resolver::new(config).unwrap();
    let outcome = resolver.resolve(PAGE_URL, &candidates).await;

    let reasons: Vec<FailureReason> = outcome.report().attempts().iter().map(|a| a.reason.clone()).collect();
    assert_eq!(reasons.len(), 3);
    // The first attempt gets whatever is left of the deadline, slightly under 300ms
    assert!(matches!(reasons[0], FailureReason::TimedOut(limit) if limit <= Duration::from_millis(300)));
    assert_eq!(reasons[1], FailureReason::DeadlineReached);
    assert_eq!(reasons[2], FailureReason::DeadlineReached);
    assert!(never_b.received_requests().await.unwrap().is_empty());
    assert!(never_c.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unreachable_instance_is_recorded() {
    let good = redirect_server("https://cdn.example/v.mp4").await;
    let dead = closed_port_instance();

    let resolver = Resolver::new(quick_resolver_config()).unwrap();
    let outcome = resolver.resolve(PAGE_URL, &[dead.clone(), instance_for(&good)]).await;

    assert!(outcome.is_success());
    let attempts = outcome.report().attempts();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].instance, dead.id());
    assert!(matches!(attempts[0].reason, FailureReason::Unreachable(_)));
}

#[tokio::test]
async fn test_v10_request_shape() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/"))
        .and(header("accept", "application/json"))
        .and(header("origin", "https://cobalt.tools"))
        .and(header("referer", "https://cobalt.tools/"))
        .and(body_json(json!({
            "url": PAGE_URL,
            "videoCodec": "h264",
            "filenameStyle": "basic"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(redirect_body("https://cdn.example/v.mp4")))
        .expect(1)
        .mount(&server)
        .await;

    let resolver = Resolver::new(quick_resolver_config()).unwrap();
    let outcome = resolver.resolve(PAGE_URL, &[instance_for(&server)]).await;
    assert!(outcome.is_success(), "{:?}", outcome);
}

#[tokio::test]
async fn test_v7_request_shape() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/json"))
        .and(body_json(json!({
            "url": PAGE_URL,
            "vCodec": "h264",
            "filenamePattern": "basic"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "stream",
            "url": "https://legacy.example/stream"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let instance = Instance::new(Url::parse(&server.uri()).unwrap(), ApiVersion::V7);
    let resolver = Resolver::new(quick_resolver_config()).unwrap();
    let outcome = resolver.resolve(PAGE_URL, &[instance]).await;
    assert_eq!(outcome.direct_url().map(Url::as_str), Some("https://legacy.example/stream"));
}

#[tokio::test]
async fn test_origin_headers_can_be_disabled() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header_exists("origin"))
        .respond_with(ResponseTemplate::new(403))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(redirect_body("https://cdn.example/v.mp4")))
        .expect(1)
        .mount(&server)
        .await;

    let config = ResolverConfig {
        origin: None,
        ..quick_resolver_config()
    };
    let resolver = Resolver::new(config).unwrap();
    let outcome = resolver.resolve(PAGE_URL, &[instance_for(&server)]).await;
    assert!(outcome.is_success(), "{:?}", outcome);
}

#[tokio::test]
async fn test_no_candidates_is_an_empty_failure() {
    let resolver = Resolver::new(quick_resolver_config()).unwrap();
    let outcome = resolver.resolve(PAGE_URL, &[]).await;
    assert_eq!(outcome, ResolveOutcome::Failure(Default::default()));
}
