#![allow(dead_code)]

use async_trait::async_trait;
use lectern_core::{Element, LecternError, MemoryElement, MemoryPage, Result};
use lectern_preview::{PreviewRequest, PreviewResponse, RenderTransport, Typesetter};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

pub const FIELD: &str = r#"textarea[name="content_md"]"#;
pub const PANEL: &str = ".preview-content";

/// A render call waiting for the test to answer it
pub struct PendingRender {
    pub request: PreviewRequest,
    reply: oneshot::Sender<Result<PreviewResponse>>,
}

impl PendingRender {
    pub fn respond(self, response: PreviewResponse) {
        let _ = self.reply.send(Ok(response));
    }

    pub fn fail(self, error: LecternError) {
        let _ = self.reply.send(Err(error));
    }
}

/// Transport whose calls are answered by the test, in any order
pub struct ScriptedTransport {
    calls: mpsc::UnboundedSender<PendingRender>,
}

impl ScriptedTransport {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<PendingRender>) {
        let (calls, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { calls }), rx)
    }
}

#[async_trait]
impl RenderTransport for ScriptedTransport {
    async fn render(&self, request: &PreviewRequest) -> Result<PreviewResponse> {
        let (reply, answer) = oneshot::channel();
        self.calls
            .send(PendingRender {
                request: request.clone(),
                reply,
            })
            .map_err(|_| LecternError::transport("test finished"))?;
        answer
            .await
            .map_err(|_| LecternError::transport("no answer"))?
    }
}

/// Transport answering every call immediately with rendered content
#[derive(Default)]
pub struct EchoTransport {
    pub requests: std::sync::Mutex<Vec<String>>,
}

#[async_trait]
impl RenderTransport for EchoTransport {
    async fn render(&self, request: &PreviewRequest) -> Result<PreviewResponse> {
        self.requests.lock().unwrap().push(request.content.clone());
        Ok(PreviewResponse::rendered(format!("<p>{}</p>", request.content)))
    }
}

#[derive(Default)]
pub struct CountingTypesetter {
    pub passes: AtomicUsize,
}

impl CountingTypesetter {
    pub fn count(&self) -> usize {
        self.passes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Typesetter for CountingTypesetter {
    async fn typeset(&self, _target: &dyn Element) -> Result<()> {
        self.passes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Page with an editor field, a preview panel and a token cookie
pub fn editor_page(initial: &str) -> (Arc<MemoryPage>, Arc<MemoryElement>, Arc<MemoryElement>) {
    let page = Arc::new(MemoryPage::new());
    let field = Arc::new(MemoryElement::with_value(initial));
    let panel = Arc::new(MemoryElement::new());
    page.insert(FIELD, field.clone());
    page.insert(PANEL, panel.clone());
    page.set_cookie("csrftoken", "secret-token");
    (page, field, panel)
}
