use std::{panic::AssertUnwindSafe, sync::Arc};

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    middleware::from_fn_with_state,
    Router,
};
use futures::FutureExt;
use tower::ServiceExt;

use trafficlog::{
    config::{AppConfig, DebugLogSettings},
    create_app,
    filters::StatusCodeFilter,
    formatter::FormatterOptions,
    message::{REQUEST_CHANNEL, RESPONSE_CHANNEL},
    record::{oversized_placeholder, STREAMING_PLACEHOLDER},
    templates::{BuiltinTemplates, DEFAULT_REQUEST_TEMPLATE, DEFAULT_RESPONSE_TEMPLATE},
    debug_requests_responses, AppState, Channel, DebugLogger, Formatter, MemoryHandler, Message,
};

fn formatter(options: FormatterOptions) -> Formatter {
    Formatter::new(options.colors(false), Arc::new(BuiltinTemplates)).unwrap()
}

/// The demo app with both channels writing to the given handlers.
fn app_with(request: Channel, response: Channel, settings: DebugLogSettings) -> Router {
    let config = AppConfig {
        debug_log: settings,
        ..AppConfig::default()
    };
    create_app(AppState::new(config, DebugLogger::new(request, response)))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, String) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_request_and_response_are_logged() {
    let log = MemoryHandler::new(formatter(FormatterOptions::inline("{{ record.channel }}")));
    let app = app_with(
        Channel::request().with_handler(Arc::new(log.clone())),
        Channel::response().with_handler(Arc::new(log.clone())),
        DebugLogSettings::default(),
    );

    let (status, body) = send(app, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Welcome!");

    let records = log.records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].channel, REQUEST_CHANNEL);
    assert!(matches!(records[0].message, Message::Request(_)));
    assert_eq!(records[1].channel, RESPONSE_CHANNEL);
    assert!(matches!(records[1].message, Message::Response(_)));
    assert_eq!(log.lines(), vec!["request".to_owned(), "response".to_owned()]);
}

#[tokio::test]
async fn test_default_templates_with_pretty_json() {
    let requests = MemoryHandler::new(formatter(
        FormatterOptions::named(DEFAULT_REQUEST_TEMPLATE).pretty(true),
    ));
    let responses = MemoryHandler::new(formatter(
        FormatterOptions::named(DEFAULT_RESPONSE_TEMPLATE).pretty(true),
    ));
    let app = app_with(
        Channel::request().with_handler(Arc::new(requests.clone())),
        Channel::response().with_handler(Arc::new(responses.clone())),
        DebugLogSettings::default(),
    );

    let request = Request::builder()
        .method("POST")
        .uri("/notes?draft=1")
        .header("content-type", "application/json")
        .header("x-request-id", "req-1")
        .body(Body::from(r#"{"title":"hello","body":"world"}"#))
        .unwrap();
    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::CREATED);
    // the handler still received the full body
    assert!(body.contains(r#""title":"hello""#), "{body}");

    let request_line = &requests.lines()[0];
    assert!(request_line.starts_with("--> POST /notes?draft=1\n"), "{request_line}");
    assert!(request_line.contains("Content-Type: application/json\n"), "{request_line}");
    assert!(request_line.contains("X-Request-ID: req-1\n"), "{request_line}");
    assert!(
        request_line.contains("{\n  \"title\": \"hello\",\n  \"body\": \"world\"\n}"),
        "{request_line}"
    );

    let response_line = &responses.lines()[0];
    assert!(response_line.starts_with("<-- POST 201 Created\n"), "{response_line}");
    assert!(response_line.contains("\"message\": \"Note created successfully\""), "{response_line}");
}

#[tokio::test]
async fn test_xml_response_is_pretty_printed() {
    let responses = MemoryHandler::new(formatter(
        FormatterOptions::inline("{{ entry.content }}").pretty(true),
    ));
    let app = app_with(
        Channel::request(),
        Channel::response().with_handler(Arc::new(responses.clone())),
        DebugLogSettings::default(),
    );

    let (status, _) = send(app, get("/xml")).await;
    assert_eq!(status, StatusCode::OK);

    let content = &responses.lines()[0];
    assert!(content.starts_with("<message>\n  <from>John Doe</from>\n  <to>Jane</to>"), "{content}");
}

#[tokio::test]
async fn test_streaming_response_is_not_consumed() {
    let responses = MemoryHandler::new(formatter(FormatterOptions::inline("{{ entry.content }}")));
    let app = app_with(
        Channel::request(),
        Channel::response().with_handler(Arc::new(responses.clone())),
        DebugLogSettings::default(),
    );

    let (status, body) = send(app, get("/stream")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "first chunk\nsecond chunk\nlast chunk\n");
    assert_eq!(responses.lines(), vec![STREAMING_PLACEHOLDER.to_owned()]);
}

#[tokio::test]
async fn test_status_code_filter_on_response_channel() {
    let responses = MemoryHandler::new(formatter(FormatterOptions::inline("{{ entry.status_code }}")));
    let response_channel = Channel::response()
        .with_filter(Arc::new(StatusCodeFilter::parse("401").unwrap()))
        .with_handler(Arc::new(responses.clone()));
    let app = app_with(Channel::request(), response_channel, DebugLogSettings::default());

    let (status, _) = send(app.clone(), get("/unauthorized")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(app, get("/missing")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    assert_eq!(responses.lines(), vec!["404".to_owned()]);
}

#[tokio::test]
async fn test_disabled_request_channel() {
    let log = MemoryHandler::new(formatter(FormatterOptions::inline("{{ record.channel }}")));
    let app = app_with(
        Channel::request().enabled(false).with_handler(Arc::new(log.clone())),
        Channel::response().with_handler(Arc::new(log.clone())),
        DebugLogSettings::default(),
    );

    send(app, get("/")).await;
    assert_eq!(log.lines(), vec!["response".to_owned()]);
}

#[tokio::test]
async fn test_limit_body() {
    let requests = MemoryHandler::new(formatter(
        FormatterOptions::inline("{{ entry.body }}").limit_body(Some(10)),
    ));
    let app = app_with(
        Channel::request().with_handler(Arc::new(requests.clone())),
        Channel::response(),
        DebugLogSettings::default(),
    );

    let request = Request::builder()
        .method("POST")
        .uri("/notes")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"title":"a long title","body":""}"#))
        .unwrap();
    send(app, request).await;

    assert_eq!(requests.lines(), vec![r#"{"title":"..."#.to_owned()]);
}

#[tokio::test]
async fn test_health_reports_logging_settings() {
    let settings = DebugLogSettings {
        pretty_print: true,
        disable_downstream_access_log: true,
        ..DebugLogSettings::default()
    };
    let app = app_with(Channel::request(), Channel::response(), settings);

    let (status, body) = send(app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);

    let body: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["logging"]["pretty_print"], true);
    assert_eq!(body["logging"]["level"], "DEBUG");
}

#[tokio::test]
async fn test_logger_from_settings_serves_requests() {
    let settings = DebugLogSettings {
        request_template: Some("{{ entry.method }} {{ entry.path }}".into()),
        colors: false,
        ..DebugLogSettings::default()
    };
    let logger = DebugLogger::from_settings(&settings).unwrap();
    let config = AppConfig {
        debug_log: settings,
        ..AppConfig::default()
    };
    let app = create_app(AppState::new(config, logger));

    let (status, body) = send(app, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Welcome!");
}

#[tokio::test]
async fn test_large_upload_is_not_buffered() {
    let requests = MemoryHandler::new(formatter(FormatterOptions::inline(
        "{{ entry.body }} {{ request.body_length is none }}",
    )));
    let app = app_with(
        Channel::request().with_handler(Arc::new(requests.clone())),
        Channel::response(),
        DebugLogSettings::default(),
    );

    let size = 8 * 1024 * 1024;
    let request = Request::builder()
        .method("POST")
        .uri("/notes")
        .header("content-type", "application/json")
        .body(Body::from(vec![b' '; size]))
        .unwrap();
    let (status, _) = send(app, request).await;

    // the application's own body limit still applies to the untouched body
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(
        requests.lines(),
        vec![format!("{} true", oversized_placeholder(size as u64))]
    );
}

#[tokio::test]
async fn test_body_over_configured_cap_reaches_application() {
    let requests = MemoryHandler::new(formatter(FormatterOptions::inline("{{ entry.body }}")));
    let responses = MemoryHandler::new(formatter(FormatterOptions::inline("{{ entry.status_code }}")));
    let logger = DebugLogger::new(
        Channel::request().with_handler(Arc::new(requests.clone())),
        Channel::response().with_handler(Arc::new(responses.clone())),
    )
    .with_max_buffered_body(16);
    let app = create_app(AppState::new(AppConfig::default(), logger));

    let note = r#"{"title":"hello","body":"world"}"#;
    let request = Request::builder()
        .method("POST")
        .uri("/notes")
        .header("content-type", "application/json")
        .body(Body::from(note))
        .unwrap();
    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::CREATED);
    assert!(body.contains(r#""title":"hello""#), "{body}");
    assert_eq!(requests.lines(), vec![oversized_placeholder(note.len() as u64)]);
    assert_eq!(responses.lines(), vec!["201".to_owned()]);
}

async fn failing_handler() -> &'static str {
    panic!("handler failed")
}

#[tokio::test]
async fn test_application_panic_skips_response_log() {
    let requests = MemoryHandler::new(formatter(FormatterOptions::inline("{{ entry.path }}")));
    let responses = MemoryHandler::new(formatter(FormatterOptions::inline("{{ entry.status_code }}")));
    let logger = Arc::new(DebugLogger::new(
        Channel::request().with_handler(Arc::new(requests.clone())),
        Channel::response().with_handler(Arc::new(responses.clone())),
    ));
    let app = Router::new()
        .route("/fail", axum::routing::get(failing_handler))
        .layer(from_fn_with_state(logger, debug_requests_responses));

    let outcome = AssertUnwindSafe(app.oneshot(get("/fail"))).catch_unwind().await;

    let panic = outcome.err().expect("the handler panic reaches the caller");
    assert_eq!(panic.downcast_ref::<&str>(), Some(&"handler failed"));
    assert_eq!(requests.lines(), vec!["/fail".to_owned()]);
    assert!(responses.records().is_empty());
}
