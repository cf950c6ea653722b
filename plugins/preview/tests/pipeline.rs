mod common;

use common::{editor_page, CountingTypesetter, ScriptedTransport};
use lectern_core::{
    CsrfConfig, Element, LecternError, MemoryElement, MemoryPage, PreviewConfig, Readiness, TypesetConfig,
};
use lectern_preview::{
    PreviewOutcome, PreviewPhase, PreviewPipeline, PreviewResponse, TypesetScheduler, Typesetter,
};
use std::sync::Arc;
use std::time::Duration;

fn pipeline_with(
    transport: Arc<ScriptedTransport>,
    page: Arc<MemoryPage>,
    panel: Arc<dyn Element>,
    typesetter: Arc<CountingTypesetter>,
) -> PreviewPipeline {
    let slot = Readiness::ready(typesetter as Arc<dyn Typesetter>);
    PreviewPipeline::new(
        transport,
        page,
        panel,
        TypesetScheduler::new(slot, TypesetConfig::default()),
        CsrfConfig::default(),
        PreviewConfig::default(),
    )
}

#[tokio::test(start_paused = true)]
async fn test_success_replaces_panel_verbatim_and_typesets() {
    let (page, _field, panel) = editor_page("");
    panel.set_inner_html("<p>stale</p>");
    let (transport, mut calls) = ScriptedTransport::new();
    let typesetter = Arc::new(CountingTypesetter::default());
    let pipeline = pipeline_with(transport, page, panel.clone(), typesetter.clone());

    let running = tokio::spawn({
        let pipeline = pipeline.clone();
        async move { pipeline.preview("# Hi $x^2$".to_string()).await }
    });

    let call = calls.recv().await.unwrap();
    assert_eq!(call.request.content, "# Hi $x^2$");
    let token = call.request.csrf.clone().unwrap();
    assert_eq!(token.header, "X-CSRFToken");
    assert_eq!(token.value, "secret-token");
    call.respond(PreviewResponse::rendered("<h1>Hi <span>x^2</span></h1>"));

    assert_eq!(running.await.unwrap(), PreviewOutcome::Rendered);
    assert_eq!(panel.inner_html(), "<h1>Hi <span>x^2</span></h1>");

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(typesetter.count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_failure_shows_message_without_typesetting() {
    let (page, _field, panel) = editor_page("");
    let (transport, mut calls) = ScriptedTransport::new();
    let typesetter = Arc::new(CountingTypesetter::default());
    let pipeline = pipeline_with(transport, page, panel.clone(), typesetter.clone());

    let running = tokio::spawn({
        let pipeline = pipeline.clone();
        async move { pipeline.preview("$$".to_string()).await }
    });
    calls
        .recv()
        .await
        .unwrap()
        .respond(PreviewResponse::failed("bad markup"));

    let outcome = running.await.unwrap();
    assert!(matches!(outcome, PreviewOutcome::Errored(ref msg) if msg.contains("bad markup")));
    assert!(panel.inner_html().contains("bad markup"));

    tokio::time::sleep(Duration::from_millis(2000)).await;
    assert_eq!(typesetter.count(), 0);
}

#[tokio::test]
async fn test_missing_token_fails_before_any_request() {
    let page = Arc::new(MemoryPage::new());
    let panel = Arc::new(MemoryElement::new());
    page.insert(common::PANEL, panel.clone());
    let (transport, mut calls) = ScriptedTransport::new();
    let pipeline = pipeline_with(transport, page, panel.clone(), Arc::default());

    let outcome = pipeline.preview("text".to_string()).await;

    assert!(matches!(outcome, PreviewOutcome::Errored(ref msg) if msg.contains("Anti-forgery token")));
    assert!(panel.inner_html().contains("Anti-forgery token not found"));
    assert!(calls.try_recv().is_err());
}

#[tokio::test]
async fn test_superseded_response_never_reaches_panel() {
    let (page, _field, panel) = editor_page("");
    let (transport, mut calls) = ScriptedTransport::new();
    let pipeline = pipeline_with(transport, page, panel.clone(), Arc::default());

    let first = tokio::spawn({
        let pipeline = pipeline.clone();
        async move { pipeline.preview("A".to_string()).await }
    });
    let call_a = calls.recv().await.unwrap();

    let second = tokio::spawn({
        let pipeline = pipeline.clone();
        async move { pipeline.preview("B".to_string()).await }
    });
    let call_b = calls.recv().await.unwrap();

    call_b.respond(PreviewResponse::rendered("<p>B</p>"));
    assert_eq!(second.await.unwrap(), PreviewOutcome::Rendered);

    // A was aborted when B started; a late answer goes nowhere.
    call_a.respond(PreviewResponse::rendered("<p>A</p>"));
    assert_eq!(first.await.unwrap(), PreviewOutcome::Cancelled);

    assert_eq!(panel.inner_html(), "<p>B</p>");
    assert_eq!(pipeline.generation(), 2);
    assert_eq!(pipeline.last_outcome(), Some(PreviewOutcome::Rendered));
}

#[tokio::test]
async fn test_loading_indicator_spans_request() {
    let (page, _field, panel) = editor_page("");
    let (transport, mut calls) = ScriptedTransport::new();
    let pipeline = pipeline_with(transport, page, panel.clone(), Arc::default());

    let running = tokio::spawn({
        let pipeline = pipeline.clone();
        async move { pipeline.preview("x".to_string()).await }
    });
    let call = calls.recv().await.unwrap();

    assert!(panel.has_class("is-loading"));
    assert_eq!(panel.attribute("data-status").as_deref(), Some("Updating..."));
    assert_eq!(pipeline.phase(), PreviewPhase::Requesting { generation: 1 });

    call.fail(LecternError::transport("connection reset"));
    running.await.unwrap();

    assert!(!panel.has_class("is-loading"));
    assert!(panel.attribute("data-status").is_none());
    assert_eq!(pipeline.phase(), PreviewPhase::Idle);
}

#[tokio::test]
async fn test_pipeline_recovers_after_network_error() {
    let (page, _field, panel) = editor_page("");
    let (transport, mut calls) = ScriptedTransport::new();
    let pipeline = pipeline_with(transport, page, panel.clone(), Arc::default());

    let failing = tokio::spawn({
        let pipeline = pipeline.clone();
        async move { pipeline.preview("one".to_string()).await }
    });
    calls
        .recv()
        .await
        .unwrap()
        .fail(LecternError::transport("connection refused"));
    assert!(matches!(failing.await.unwrap(), PreviewOutcome::Errored(_)));
    assert!(panel.inner_html().contains("connection refused"));

    let retry = tokio::spawn({
        let pipeline = pipeline.clone();
        async move { pipeline.preview("two".to_string()).await }
    });
    calls
        .recv()
        .await
        .unwrap()
        .respond(PreviewResponse::rendered("<p>two</p>"));

    assert_eq!(retry.await.unwrap(), PreviewOutcome::Rendered);
    assert_eq!(panel.inner_html(), "<p>two</p>");
}

#[tokio::test]
async fn test_error_message_is_escaped() {
    let (page, _field, panel) = editor_page("");
    let (transport, mut calls) = ScriptedTransport::new();
    let pipeline = pipeline_with(transport, page, panel.clone(), Arc::default());

    let running = tokio::spawn({
        let pipeline = pipeline.clone();
        async move { pipeline.preview("x".to_string()).await }
    });
    calls
        .recv()
        .await
        .unwrap()
        .respond(PreviewResponse::failed("<script>alert(1)</script>"));
    running.await.unwrap();

    assert!(!panel.inner_html().contains("<script>"));
    assert!(panel.inner_html().contains("&lt;script&gt;"));
}

#[tokio::test]
async fn test_explicit_cancel_is_silent() {
    let (page, _field, panel) = editor_page("");
    panel.set_inner_html("<p>kept</p>");
    let (transport, mut calls) = ScriptedTransport::new();
    let pipeline = pipeline_with(transport, page, panel.clone(), Arc::default());

    let running = tokio::spawn({
        let pipeline = pipeline.clone();
        async move { pipeline.preview("x".to_string()).await }
    });
    let _call = calls.recv().await.unwrap();
    pipeline.cancel();

    assert_eq!(running.await.unwrap(), PreviewOutcome::Cancelled);
    assert_eq!(panel.inner_html(), "<p>kept</p>");
    assert!(!panel.has_class("is-loading"));
}
