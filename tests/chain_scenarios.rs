//! End-to-end scenarios through the public API.

use fluent_expect::{
    AssertionKind, Config, DefaultAssertionHandler, Expect, ExpectError, FnTransport,
    RecordingHandler, Reporter, Request, Response, Severity, StatusRange, TracingPrinter,
};
use serde::Serialize;
use serde_json::json;
use std::sync::{Arc, Mutex};

/// Reporter that keeps messages instead of panicking.
#[derive(Default)]
struct CaptureReporter {
    messages: Mutex<Vec<String>>,
}

impl Reporter for CaptureReporter {
    fn report(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_owned());
    }
}

fn users_api() -> FnTransport<impl Fn(&Request) -> fluent_expect::Result<Response> + Send + Sync> {
    FnTransport::new(|req: &Request| match (req.method(), req.url()) {
        ("GET", "/users/1") => Ok(Response::new(200)
            .with_header("Content-Type", "application/json")
            .with_body(r#"{"id":1,"name":"ann","roles":["admin","dev"],"active":true}"#)),
        ("GET", "/down") => Err(ExpectError::Transport {
            reason: "connection refused".into(),
        }),
        _ => Ok(Response::new(404)),
    })
}

#[test]
fn passing_walk_reports_no_failures() {
    let handler = Arc::new(RecordingHandler::new());
    let expect = Expect::new(
        Config::builder()
            .test_name("users")
            .handler(handler.clone())
            .transport(Arc::new(users_api()))
            .printer(Arc::new(TracingPrinter))
            .build(),
    );

    let resp = expect.perform(Request::new("GET", "/users/1"));
    resp.status(200).status_range(StatusRange::Success);
    resp.header("content-type").has_prefix("application/json");

    let user = resp.json().object();
    user.value("id").number().is_equal(1.0).is_integer();
    user.value("name").string().is_equal("ann");
    user.value("roles").array().contains_all(["dev"]).length().is_equal(2.0);
    user.value("active").boolean().is_true();

    assert_eq!(handler.failure_count(), 0);
    assert!(!resp.chain().tree_failed());
}

#[test]
fn failing_leaf_marks_every_ancestor() {
    let handler = Arc::new(RecordingHandler::new());
    let expect = Expect::new(
        Config::builder()
            .handler(handler.clone())
            .transport(Arc::new(users_api()))
            .build(),
    );

    let resp = expect.perform(Request::new("GET", "/users/1"));
    let body = resp.json();
    let user = body.object();
    user.value("name").string().is_equal("bob");

    let failures = handler.failures();
    assert_eq!(failures.len(), 1);
    let (ctx, failure) = &failures[0];
    assert_eq!(failure.kind(), AssertionKind::Equal);
    assert_eq!(
        ctx.path(),
        ["Request()", "JSON()", "Object()", "Value(\"name\")", "String()", "IsEqual(\"bob\")"]
    );
    assert_eq!(ctx.request().map(|r| r.url()), Some("/users/1"));

    assert!(user.chain().tree_failed());
    assert!(body.chain().tree_failed());
    assert!(resp.chain().tree_failed());
    assert!(!resp.chain().failed());

    // Siblings of the failed branch are unaffected.
    user.value("id").number().is_equal(1.0);
    assert_eq!(handler.failure_count(), 1);
}

#[test]
fn transport_failure_is_reported_once() {
    let handler = Arc::new(RecordingHandler::new());
    let expect = Expect::new(
        Config::builder()
            .handler(handler.clone())
            .transport(Arc::new(users_api()))
            .build(),
    );

    let resp = expect.perform(Request::new("GET", "/down"));
    resp.status(200);
    resp.json().object().value("id").number().is_equal(1.0);

    let failures = handler.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].1.kind(), AssertionKind::Operation);
    assert!(failures[0].1.kind().is_internal());
}

#[test]
fn non_fatal_failures_reach_reporter_and_continue() {
    let reporter = Arc::new(CaptureReporter::default());
    let handler = DefaultAssertionHandler::new(Arc::new(fluent_expect::PanicReporter))
        .with_non_fatal_reporter(reporter.clone());
    let expect = Expect::new(
        Config::builder()
            .test_name("soft")
            .handler(Arc::new(handler))
            .severity(Severity::NonFatal)
            .build(),
    );

    expect.number(3).gt(5.0);
    expect.string("abc").has_suffix("x");

    let messages = reporter.messages.lock().unwrap();
    assert_eq!(messages.len(), 2);
    assert!(messages[0].starts_with("[non-fatal] expected: value is greater than"));
    assert!(messages[0].contains("test: soft"));
    assert!(messages[0].contains("assertion: Number().Gt(5)"));
}

#[test]
#[should_panic(expected = "expected: values are equal")]
fn fatal_failure_panics_with_report() {
    let expect = Expect::new(Config::builder().validation(true).build());
    expect.value(json!({"a": 1})).object().value("a").is_equal(&2);
}

#[test]
fn alias_shows_in_report() {
    let reporter = Arc::new(CaptureReporter::default());
    let expect = Expect::new(Config::builder().reporter(reporter.clone()).build());

    expect
        .value(json!({"order": {"total": 10}}))
        .object()
        .value("order")
        .object()
        .value("total")
        .alias("order total")
        .number()
        .in_range(20.0, 30.0);

    let messages = reporter.messages.lock().unwrap();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("assertion: order total.Number().InRange(20, 30)"));
    assert!(messages[0].contains("expected: [20; 30]"));
}

#[test]
fn typed_values_compare_by_serialized_form() {
    #[derive(Serialize)]
    struct Item {
        sku: &'static str,
        qty: u32,
    }

    let handler = Arc::new(RecordingHandler::new());
    let expect = Expect::new(Config::builder().handler(handler.clone()).build());

    let items = expect.array(vec![Item { sku: "a-1", qty: 2 }, Item { sku: "b-2", qty: 1 }]);
    items.first().object().contains_subset(&json!({"sku": "a-1"}));
    items.element(1).object().value("qty").number().le(1.0);
    items.contains_any([json!({"sku": "b-2", "qty": 1})]);

    assert_eq!(handler.failure_count(), 0);
}

#[test]
fn environment_carries_values_between_requests() {
    let expect = Expect::new(Config::builder().transport(Arc::new(users_api())).build());

    let resp = expect.perform(Request::new("GET", "/users/1"));
    let id = resp.json().object().value("id").raw().clone();
    expect.env().put("user_id", id);

    let ctx = resp.chain().context();
    assert_eq!(ctx.environment().get("user_id"), Some(json!(1)));
}

#[test]
fn request_body_builders() {
    let request = Request::new("POST", "/orders")
        .with_header("Accept", "application/json")
        .with_json(&json!({"sku": "a-1"}))
        .unwrap();
    assert_eq!(request.body(), br#"{"sku":"a-1"}"#);
    assert!(
        request
            .headers()
            .iter()
            .any(|(name, value)| name.eq_ignore_ascii_case("content-type")
                && value == "application/json")
    );
}
