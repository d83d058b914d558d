//! Tests for the HTTP execution module

use super::*;
use crate::config::{ClientConfig, RateLimitConfig};
use crate::error::{Error, ErrorKind};
use crate::test_support::{
    timeout_error, RecordingLogger, RecordingSleeper, Scripted, ScriptedTransport,
};
use crate::types::{BackoffType, CompletionMode};
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn feed_url() -> Url {
    Url::parse("https://i.example.com/api/v1/feed/timeline/").unwrap()
}

fn executor(
    transport: Arc<ScriptedTransport>,
    sleeper: Arc<RecordingSleeper>,
    config: ClientConfig,
) -> RequestExecutor {
    RequestExecutor::builder()
        .config(config)
        .transport(transport)
        .sleeper(sleeper)
        .build()
        .unwrap()
}

fn retry_config(max_attempts: u32) -> ClientConfig {
    ClientConfig::builder()
        .max_attempts(max_attempts)
        .backoff(
            BackoffType::Exponential,
            Duration::from_millis(100),
            Duration::from_secs(5),
        )
        .build()
}

// ============================================================================
// Pacing
// ============================================================================

#[tokio::test]
async fn test_no_pacing_when_max_delay_is_zero() {
    let transport = ScriptedTransport::new(vec![Scripted::Respond(200, "{}".into())]);
    let sleeper = RecordingSleeper::new();
    let exec = executor(transport.clone(), sleeper.clone(), ClientConfig::default());

    let response = exec
        .dispatch(|| RequestSpec::get(feed_url()), CompletionMode::ContentRead)
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert!(sleeper.sleeps().is_empty());
}

#[tokio::test]
async fn test_pacing_delay_within_bounds() {
    let script = (0..50)
        .map(|_| Scripted::Respond(200, "{}".into()))
        .collect();
    let transport = ScriptedTransport::new(script);
    let sleeper = RecordingSleeper::new();
    let config = ClientConfig::builder()
        .request_delay(Duration::from_millis(10), Duration::from_millis(20))
        .build();
    let exec = executor(transport, sleeper.clone(), config);

    for _ in 0..50 {
        exec.dispatch(|| RequestSpec::get(feed_url()), CompletionMode::ContentRead)
            .await
            .unwrap();
    }

    let sleeps = sleeper.sleeps();
    assert_eq!(sleeps.len(), 50);
    for delay in sleeps {
        assert!(delay >= Duration::from_millis(10), "{delay:?} below minimum");
        assert!(delay < Duration::from_millis(20), "{delay:?} not below maximum");
    }
}

#[tokio::test]
async fn test_sub_millisecond_pacing_still_delays() {
    let transport = ScriptedTransport::new(vec![Scripted::Respond(200, "{}".into())]);
    let sleeper = RecordingSleeper::new();
    let config = ClientConfig::builder()
        .request_delay(Duration::from_micros(200), Duration::from_micros(900))
        .build();
    let exec = executor(transport, sleeper.clone(), config);

    exec.dispatch(|| RequestSpec::get(feed_url()), CompletionMode::ContentRead)
        .await
        .unwrap();

    assert_eq!(sleeper.sleeps(), vec![Duration::from_millis(1)]);
}

#[tokio::test]
async fn test_pacing_applies_once_per_dispatch_not_per_retry() {
    let transport = ScriptedTransport::new(vec![
        Scripted::Fail(timeout_error),
        Scripted::Fail(timeout_error),
        Scripted::Respond(200, "{}".into()),
    ]);
    let sleeper = RecordingSleeper::new();
    let mut config = retry_config(3);
    config.pacing = crate::config::PacingConfig::new(1000, 2000);
    let exec = executor(transport.clone(), sleeper.clone(), config);

    exec.dispatch(|| RequestSpec::get(feed_url()), CompletionMode::ContentRead)
        .await
        .unwrap();

    let sleeps = sleeper.sleeps();
    // one pacing delay, then two backoff delays
    assert_eq!(sleeps.len(), 3);
    assert!(sleeps[0] >= Duration::from_secs(1) && sleeps[0] < Duration::from_secs(2));
    assert_eq!(sleeps[1], Duration::from_millis(100));
    assert_eq!(sleeps[2], Duration::from_millis(200));
}

#[tokio::test]
async fn test_set_delay_affects_next_dispatch() {
    let transport = ScriptedTransport::new(vec![
        Scripted::Respond(200, "{}".into()),
        Scripted::Respond(200, "{}".into()),
    ]);
    let sleeper = RecordingSleeper::new();
    let exec = executor(transport, sleeper.clone(), ClientConfig::default());

    exec.dispatch(|| RequestSpec::get(feed_url()), CompletionMode::ContentRead)
        .await
        .unwrap();
    assert!(sleeper.sleeps().is_empty());

    exec.set_delay(Duration::from_millis(5), Duration::from_millis(6));
    assert_eq!(
        exec.pacing(),
        PacingPolicy::new(Duration::from_millis(5), Duration::from_millis(6))
    );

    exec.dispatch(|| RequestSpec::get(feed_url()), CompletionMode::ContentRead)
        .await
        .unwrap();
    let sleeps = sleeper.sleeps();
    assert_eq!(sleeps.len(), 1);
    assert!(sleeps[0] >= Duration::from_millis(5) && sleeps[0] < Duration::from_millis(6));
}

// ============================================================================
// Retry
// ============================================================================

#[tokio::test]
async fn test_retry_succeeds_on_third_attempt() {
    let transport = ScriptedTransport::new(vec![
        Scripted::Fail(timeout_error),
        Scripted::Fail(timeout_error),
        Scripted::Respond(200, "{\"status\":\"ok\"}".into()),
    ]);
    let sleeper = RecordingSleeper::new();
    let exec = executor(transport.clone(), sleeper, retry_config(3));

    let response = exec
        .dispatch(|| RequestSpec::get(feed_url()), CompletionMode::ContentRead)
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(transport.attempts(), 3);
    assert_eq!(response.text().await.unwrap(), "{\"status\":\"ok\"}");
}

#[tokio::test]
async fn test_retry_exhausted_propagates_last_error() {
    let transport = ScriptedTransport::new(vec![
        Scripted::Fail(timeout_error),
        Scripted::Fail(timeout_error),
        Scripted::Fail(timeout_error),
        Scripted::Respond(200, "{}".into()),
    ]);
    let sleeper = RecordingSleeper::new();
    let exec = executor(transport.clone(), sleeper.clone(), retry_config(3));

    let err = exec
        .dispatch(|| RequestSpec::get(feed_url()), CompletionMode::ContentRead)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
    assert_eq!(transport.attempts(), 3);
    // backoff between attempts only, never after the last one
    assert_eq!(sleeper.sleeps().len(), 2);
}

#[tokio::test]
async fn test_error_status_is_not_retried() {
    let transport = ScriptedTransport::new(vec![
        Scripted::Respond(500, "{\"message\":\"server error\"}".into()),
        Scripted::Respond(200, "{}".into()),
    ]);
    let sleeper = RecordingSleeper::new();
    let exec = executor(transport.clone(), sleeper.clone(), retry_config(3));

    let response = exec
        .dispatch(|| RequestSpec::get(feed_url()), CompletionMode::ContentRead)
        .await
        .unwrap();

    assert_eq!(response.status(), 500);
    assert_eq!(transport.attempts(), 1);
    assert!(sleeper.sleeps().is_empty());
}

#[tokio::test]
async fn test_non_transport_error_is_not_retried() {
    fn bad_request() -> Error {
        Error::invalid_request("bad header")
    }

    let transport = ScriptedTransport::new(vec![
        Scripted::Fail(bad_request),
        Scripted::Respond(200, "{}".into()),
    ]);
    let exec = executor(transport.clone(), RecordingSleeper::new(), retry_config(3));

    let err = exec
        .dispatch(|| RequestSpec::get(feed_url()), CompletionMode::ContentRead)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    assert_eq!(transport.attempts(), 1);
}

#[tokio::test]
async fn test_request_rebuilt_for_every_attempt() {
    let transport = ScriptedTransport::new(vec![
        Scripted::Fail(timeout_error),
        Scripted::Respond(200, "{}".into()),
    ]);
    let exec = executor(transport.clone(), RecordingSleeper::new(), retry_config(2));
    let builds = AtomicUsize::new(0);

    exec.dispatch(
        || {
            let n = builds.fetch_add(1, Ordering::SeqCst);
            RequestSpec::get(feed_url()).header("X-Attempt", n.to_string())
        },
        CompletionMode::ContentRead,
    )
    .await
    .unwrap();

    assert_eq!(builds.load(Ordering::SeqCst), 2);
    let sent = transport.sent();
    assert_eq!(sent[0].header_value("X-Attempt"), Some("0"));
    assert_eq!(sent[1].header_value("X-Attempt"), Some("1"));
}

#[tokio::test]
async fn test_custom_retry_policy_overrides_config() {
    let transport = ScriptedTransport::new(vec![
        Scripted::Fail(timeout_error),
        Scripted::Respond(200, "{}".into()),
    ]);
    let sleeper = RecordingSleeper::new();
    let exec = RequestExecutor::builder()
        .transport(transport.clone())
        .sleeper(sleeper.clone())
        .retry_policy(RetryPolicy::custom(2, |_| Duration::from_secs(7)))
        .build()
        .unwrap();

    exec.dispatch(|| RequestSpec::get(feed_url()), CompletionMode::ContentRead)
        .await
        .unwrap();

    assert_eq!(transport.attempts(), 2);
    assert_eq!(sleeper.sleeps(), vec![Duration::from_secs(7)]);
}

// ============================================================================
// Logging, headers, cancellation
// ============================================================================

#[tokio::test]
async fn test_logger_sees_requests_failures_and_response() {
    let transport = ScriptedTransport::new(vec![
        Scripted::Fail(timeout_error),
        Scripted::Respond(404, "{}".into()),
    ]);
    let logger = RecordingLogger::new();
    let exec = RequestExecutor::builder()
        .config(retry_config(2))
        .transport(transport)
        .sleeper(RecordingSleeper::new())
        .logger(logger.clone())
        .build()
        .unwrap();

    exec.dispatch(|| RequestSpec::get(feed_url()), CompletionMode::ContentRead)
        .await
        .unwrap();

    let url = feed_url();
    assert_eq!(
        logger.events(),
        vec![
            format!("request {url}"),
            "exception transport".to_string(),
            format!("request {url}"),
            "response 404".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_logger_told_about_pacing() {
    let transport = ScriptedTransport::new(vec![Scripted::Respond(200, "{}".into())]);
    let logger = RecordingLogger::new();
    let config = ClientConfig::builder()
        .request_delay(Duration::from_millis(1), Duration::from_millis(2))
        .build();
    let exec = RequestExecutor::builder()
        .config(config)
        .transport(transport)
        .sleeper(RecordingSleeper::new())
        .logger(logger.clone())
        .build()
        .unwrap();

    exec.dispatch(|| RequestSpec::get(feed_url()), CompletionMode::ContentRead)
        .await
        .unwrap();

    let events = logger.events();
    assert_eq!(events.len(), 3);
    assert!(events[0].starts_with("info pacing dispatch by"));
    assert_eq!(events[2], "response 200");
}

#[tokio::test]
async fn test_default_headers_do_not_override_request_headers() {
    let transport = ScriptedTransport::new(vec![Scripted::Respond(200, "{}".into())]);
    let config = ClientConfig::builder()
        .header("X-App-Locale", "en_US")
        .header("X-Device", "default")
        .build();
    let exec = executor(transport.clone(), RecordingSleeper::new(), config);

    exec.dispatch(
        || RequestSpec::get(feed_url()).header("x-device", "phone-1"),
        CompletionMode::ContentRead,
    )
    .await
    .unwrap();

    let sent = &transport.sent()[0];
    assert_eq!(sent.header_value("X-App-Locale"), Some("en_US"));
    assert_eq!(sent.header_value("X-Device"), Some("phone-1"));
    assert_eq!(sent.headers.len(), 2);
}

#[tokio::test]
async fn test_cancelled_before_dispatch_sends_nothing() {
    let transport = ScriptedTransport::new(vec![Scripted::Respond(200, "{}".into())]);
    let exec = executor(transport.clone(), RecordingSleeper::new(), ClientConfig::default());
    let token = CancellationToken::new();
    token.cancel();

    let err = exec
        .dispatch_cancellable(
            || RequestSpec::get(feed_url()),
            CompletionMode::ContentRead,
            &token,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Cancelled));
    assert_eq!(transport.attempts(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_interrupts_pacing_sleep() {
    let transport = ScriptedTransport::new(vec![Scripted::Respond(200, "{}".into())]);
    let config = ClientConfig::builder()
        .request_delay(Duration::from_secs(600), Duration::from_secs(601))
        .build();
    let exec = RequestExecutor::builder()
        .config(config)
        .transport(transport.clone())
        .build()
        .unwrap();

    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let err = exec
        .dispatch_cancellable(
            || RequestSpec::get(feed_url()),
            CompletionMode::ContentRead,
            &token,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Cancelled));
    assert_eq!(transport.attempts(), 0);
}

#[tokio::test]
async fn test_rate_limited_executor_still_dispatches() {
    let transport = ScriptedTransport::new(vec![Scripted::Respond(200, "{}".into())]);
    let config = ClientConfig::builder()
        .rate_limit(RateLimitConfig::new(100, 10))
        .build();
    let exec = executor(transport.clone(), RecordingSleeper::new(), config);

    exec.dispatch(|| RequestSpec::get(feed_url()), CompletionMode::ContentRead)
        .await
        .unwrap();
    assert_eq!(transport.attempts(), 1);
    assert!(format!("{exec:?}").contains("has_rate_limiter: true"));
}

#[test]
fn test_url_resolution() {
    let config = ClientConfig::builder()
        .base_url("https://i.example.com/api/v1/")
        .build();
    let exec = RequestExecutor::builder()
        .config(config)
        .transport(ScriptedTransport::new(vec![]))
        .build()
        .unwrap();

    assert_eq!(
        exec.url("/feed/tag/rust/").unwrap().as_str(),
        "https://i.example.com/api/v1/feed/tag/rust/"
    );
    assert_eq!(
        exec.url("https://other.example.com/x").unwrap().as_str(),
        "https://other.example.com/x"
    );
}

#[test]
fn test_url_resolution_keeps_base_path_without_trailing_slash() {
    let config = ClientConfig::builder()
        .base_url("https://i.example.com/api/v1")
        .build();
    let exec = RequestExecutor::builder()
        .config(config)
        .transport(ScriptedTransport::new(vec![]))
        .build()
        .unwrap();

    assert_eq!(exec.base_url().unwrap().as_str(), "https://i.example.com/api/v1/");
    assert_eq!(
        exec.url("feed/tag/rust/").unwrap().as_str(),
        "https://i.example.com/api/v1/feed/tag/rust/"
    );
    assert_eq!(
        exec.url("/feed/tag/rust/").unwrap().as_str(),
        "https://i.example.com/api/v1/feed/tag/rust/"
    );
}

#[test]
fn test_builder_rejects_invalid_config() {
    let config = ClientConfig::builder().max_attempts(0).build();
    let err = RequestExecutor::builder().config(config).build().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);
}

// ============================================================================
// Real transport against a mock server
// ============================================================================

#[tokio::test]
async fn test_reqwest_transport_get() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/feed/timeline/"))
        .and(header("X-App-Locale", "en_US"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "items": [], "more_available": false
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = ClientConfig::builder()
        .base_url(format!("{}/api/v1/", mock_server.uri()))
        .header("X-App-Locale", "en_US")
        .build();
    let exec = RequestExecutor::from_config(config).unwrap();
    let url = exec.url("feed/timeline/").unwrap();

    let (status, body) = exec
        .send_and_get_text(|| RequestSpec::get(url.clone()))
        .await
        .unwrap();

    assert_eq!(status, 200);
    assert!(body.contains("more_available"));
}

#[tokio::test]
async fn test_reqwest_transport_returns_error_status_once() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/media/1/comment/"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let exec = RequestExecutor::builder()
        .config(retry_config(3))
        .sleeper(RecordingSleeper::new())
        .build()
        .unwrap();
    let url = Url::parse(&format!("{}/api/v1/media/1/comment/", mock_server.uri())).unwrap();

    let response = exec
        .dispatch(
            || RequestSpec::post(url.clone()).form([("comment_text", "hi")]),
            CompletionMode::ContentRead,
        )
        .await
        .unwrap();

    assert_eq!(response.status(), 503);
    assert_eq!(response.text().await.unwrap(), "busy");
}

#[tokio::test]
async fn test_reqwest_transport_headers_read_mode_defers_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/big"))
        .respond_with(ResponseTemplate::new(200).set_body_string("payload"))
        .mount(&mock_server)
        .await;

    let exec = RequestExecutor::from_config(ClientConfig::default()).unwrap();
    let url = Url::parse(&format!("{}/big", mock_server.uri())).unwrap();

    let response = exec
        .dispatch(|| RequestSpec::get(url.clone()), CompletionMode::HeadersRead)
        .await
        .unwrap();

    assert!(!response.is_buffered());
    assert_eq!(response.text().await.unwrap(), "payload");
}

#[tokio::test]
async fn test_reqwest_transport_connection_error_is_retried() {
    let logger = RecordingLogger::new();
    let sleeper = RecordingSleeper::new();
    let exec = RequestExecutor::builder()
        .config(retry_config(3))
        .sleeper(sleeper.clone())
        .logger(logger.clone())
        .build()
        .unwrap();
    // nothing listens on port 1
    let url = Url::parse("http://127.0.0.1:1/feed/").unwrap();

    let err = exec
        .dispatch(|| RequestSpec::get(url.clone()), CompletionMode::ContentRead)
        .await
        .unwrap_err();

    assert!(err.is_retryable());
    let requests = logger
        .events()
        .iter()
        .filter(|e| e.starts_with("request"))
        .count();
    assert_eq!(requests, 3);
    assert_eq!(sleeper.sleeps().len(), 2);
}
