use super::WorkError;
use crate::interceptor::{Next, Request, from_fn, next_fn, recall_middleware};
use crate::{
    CaptureStrategy, Context, LogLevel, MemorySink, PROCEDURE_KEY, REQUEST_ID_KEY, Recaller,
};

use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

fn context_over(sink: &MemorySink) -> Context {
    Context::background().with_sink(Arc::new(sink.clone()))
}

fn failing_handler(calls: Arc<AtomicUsize>) -> Next<(), WorkError> {
    next_fn(move |ctx: Context, _req: Request| {
        let calls = Arc::clone(&calls);
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            ctx.logger().debug("handling", [crate::attr("stage", "lookup")]);
            Err(WorkError::failed("unavailable"))
        }
    })
}

#[test]
fn test_request_path_parts() {
    let req = Request::new("users.get", json!({"id": 1}));
    assert_eq!(req.procedure(), "get");
    assert_eq!(req.request_id(), None);

    let req = req.with_metadata(REQUEST_ID_KEY, "abc");
    assert_eq!(req.request_id(), Some("abc"));
}

#[tokio::test]
async fn test_success_passes_response_through() {
    let sink = MemorySink::new(LogLevel::Info);
    let middleware = recall_middleware(Recaller::<(), WorkError>::new(Context::background()));
    let next = next_fn(|ctx: Context, req: Request| async move {
        ctx.logger().debug("quiet", []);
        Ok(json!({ "echo": req.input }))
    });

    let response = middleware(context_over(&sink), Request::new("echo", json!(5)), next)
        .await
        .unwrap();

    assert_eq!(response, json!({ "echo": 5 }));
    assert!(sink.is_empty());
}

#[tokio::test]
async fn test_failure_recalls_with_request_id() {
    let sink = MemorySink::new(LogLevel::Info);
    let calls = Arc::new(AtomicUsize::new(0));
    let middleware = recall_middleware(Recaller::<(), WorkError>::new(Context::background()));

    let request = Request::new("users.get", json!({})).with_metadata(REQUEST_ID_KEY, "req-1");
    let result = middleware(
        context_over(&sink),
        request,
        failing_handler(Arc::clone(&calls)),
    )
    .await;

    assert_eq!(result, Err(WorkError::failed("unavailable")));
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].message, "[RECALL] handling");
    assert_eq!(records[0].attr(REQUEST_ID_KEY), Some(&json!("req-1")));
    assert_eq!(records[0].attr(PROCEDURE_KEY), Some(&json!("get")));
    assert_eq!(records[0].attr("stage"), Some(&json!("lookup")));
}

#[tokio::test]
async fn test_recording_generates_request_id() {
    let sink = MemorySink::new(LogLevel::Info);
    let calls = Arc::new(AtomicUsize::new(0));
    let policy = Recaller::<(), WorkError>::new(Context::background())
        .with_capture_strategy(CaptureStrategy::Recording);
    let middleware = recall_middleware(policy);

    let result = middleware(
        context_over(&sink),
        Request::new("jobs.run", json!(null)),
        failing_handler(Arc::clone(&calls)),
    )
    .await;

    assert!(result.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let records = sink.records();
    assert_eq!(records.len(), 1);
    let id = records[0].attr(REQUEST_ID_KEY).and_then(|v| v.as_str()).unwrap();
    assert!(uuid::Uuid::parse_str(id).is_ok(), "not a uuid: {}", id);
}

#[tokio::test]
async fn test_error_filter_applies_per_request() {
    let sink = MemorySink::new(LogLevel::Info);
    let calls = Arc::new(AtomicUsize::new(0));
    let policy = Recaller::<(), WorkError>::new(Context::background())
        .with_error_filter(|err| !matches!(err, WorkError::Failed(_)));
    let middleware = recall_middleware(policy);

    let result = middleware(
        context_over(&sink),
        Request::new("users.get", json!({})),
        failing_handler(Arc::clone(&calls)),
    )
    .await;

    assert!(result.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(sink.is_empty());
}

#[tokio::test]
async fn test_composes_with_other_middleware() {
    let sink = MemorySink::new(LogLevel::Info);
    let recall = recall_middleware(
        Recaller::<(), WorkError>::new(Context::background())
            .with_capture_strategy(CaptureStrategy::Recording),
    );
    let outer = from_fn(move |ctx: Context, req: Request, next: Next<(), WorkError>| {
        let recall = Arc::clone(&recall);
        async move {
            let req = req.with_metadata(REQUEST_ID_KEY, "outer-1");
            recall(ctx, req, next).await
        }
    });

    let calls = Arc::new(AtomicUsize::new(0));
    let _ = outer(
        context_over(&sink),
        Request::new("a.b", json!(1)),
        failing_handler(Arc::clone(&calls)),
    )
    .await;

    assert_eq!(sink.records()[0].attr(REQUEST_ID_KEY), Some(&json!("outer-1")));
}
