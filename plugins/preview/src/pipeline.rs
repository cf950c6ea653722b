//! Preview pipeline: one in-flight render request per panel

use lectern_core::{
    resolve_token, CsrfConfig, Element, LecternError, Page, PreviewConfig, RenderFilters, Result,
};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

use crate::transport::{PreviewRequest, PreviewResponse, RenderTransport};
use crate::typeset::TypesetScheduler;

/// Where the panel currently is in its request cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewPhase {
    Idle,
    Requesting { generation: u64 },
}

/// How one call to [`PreviewPipeline::preview`] ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewOutcome {
    /// The panel now shows the response HTML
    Rendered,
    /// The panel shows this error message
    Errored(String),
    /// A newer request took over; the panel was not touched
    Cancelled,
}

#[derive(Debug)]
struct PipelineState {
    generation: u64,
    inflight: Option<CancellationToken>,
    typesetting: Option<CancellationToken>,
    phase: PreviewPhase,
    last_outcome: Option<PreviewOutcome>,
}

struct Inner {
    transport: Arc<dyn RenderTransport>,
    page: Arc<dyn Page>,
    panel: Arc<dyn Element>,
    typesetter: TypesetScheduler,
    csrf: CsrfConfig,
    config: PreviewConfig,
    filters: RenderFilters,
    state: Mutex<PipelineState>,
}

/// Keeps one preview panel in sync with editor content.
///
/// Starting a request cancels the previous one through its token, which drops
/// the transport future and aborts the call. Results are also checked against
/// the request generation, so a response that slips through still cannot
/// overwrite newer content.
#[derive(Clone)]
pub struct PreviewPipeline {
    inner: Arc<Inner>,
}

impl PreviewPipeline {
    pub fn new(
        transport: Arc<dyn RenderTransport>,
        page: Arc<dyn Page>,
        panel: Arc<dyn Element>,
        typesetter: TypesetScheduler,
        csrf: CsrfConfig,
        config: PreviewConfig,
    ) -> Self {
        Self::with_filters(
            transport,
            page,
            panel,
            typesetter,
            csrf,
            config,
            RenderFilters::new(),
        )
    }

    /// Pipeline that runs `filters` over every rendered response before it
    /// is written to the panel
    pub fn with_filters(
        transport: Arc<dyn RenderTransport>,
        page: Arc<dyn Page>,
        panel: Arc<dyn Element>,
        typesetter: TypesetScheduler,
        csrf: CsrfConfig,
        config: PreviewConfig,
        filters: RenderFilters,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                page,
                panel,
                typesetter,
                csrf,
                config,
                filters,
                state: Mutex::new(PipelineState {
                    generation: 0,
                    inflight: None,
                    typesetting: None,
                    phase: PreviewPhase::Idle,
                    last_outcome: None,
                }),
            }),
        }
    }

    /// Render `content` into the panel
    pub async fn preview(&self, content: String) -> PreviewOutcome {
        let (generation, token) = self.begin();
        tracing::debug!(generation, bytes = content.len(), "preview request");
        self.set_loading(true);

        let result = match resolve_token(self.inner.page.as_ref(), &self.inner.csrf) {
            Ok(csrf) => {
                let request = PreviewRequest { content, csrf };
                tokio::select! {
                    biased;
                    _ = token.cancelled() => Err(LecternError::Cancelled),
                    response = self.inner.transport.render(&request) => response,
                }
            }
            Err(e) => Err(e),
        };

        self.finish(generation, result)
    }

    /// Cancel the in-flight request and pending typesetting passes
    pub fn cancel(&self) {
        let mut state = self.state();
        if let Some(token) = state.inflight.take() {
            token.cancel();
        }
        if let Some(token) = state.typesetting.take() {
            token.cancel();
        }
    }

    pub fn phase(&self) -> PreviewPhase {
        self.state().phase
    }

    /// Identifier of the most recently issued request
    pub fn generation(&self) -> u64 {
        self.state().generation
    }

    pub fn last_outcome(&self) -> Option<PreviewOutcome> {
        self.state().last_outcome.clone()
    }

    pub fn panel(&self) -> &Arc<dyn Element> {
        &self.inner.panel
    }

    fn begin(&self) -> (u64, CancellationToken) {
        let mut state = self.state();
        if let Some(previous) = state.inflight.take() {
            tracing::debug!(generation = state.generation, "superseding in-flight preview");
            previous.cancel();
        }
        state.generation += 1;
        let token = CancellationToken::new();
        state.inflight = Some(token.clone());
        state.phase = PreviewPhase::Requesting {
            generation: state.generation,
        };
        (state.generation, token)
    }

    fn finish(&self, generation: u64, result: Result<PreviewResponse>) -> PreviewOutcome {
        let mut state = self.state();
        if state.generation != generation {
            tracing::debug!(
                generation,
                current = state.generation,
                "discarding superseded preview"
            );
            return PreviewOutcome::Cancelled;
        }
        state.inflight = None;
        state.phase = PreviewPhase::Idle;

        // The panel is written under the state lock so no newer request can
        // slip in between the generation check and the write.
        let outcome = match result.and_then(PreviewResponse::into_html) {
            Ok(html) => {
                self.inner.panel.set_inner_html(&self.inner.filters.apply(&html));
                self.schedule_typesetting(&mut state);
                PreviewOutcome::Rendered
            }
            Err(e) if e.is_silent() => PreviewOutcome::Cancelled,
            Err(e) => {
                tracing::warn!("Preview failed: {}", e);
                let message = e.to_string();
                self.inner.panel.set_inner_html(&error_markup(&message));
                PreviewOutcome::Errored(message)
            }
        };
        state.last_outcome = Some(outcome.clone());
        drop(state);

        self.set_loading(false);
        outcome
    }

    fn schedule_typesetting(&self, state: &mut PipelineState) {
        if let Some(previous) = state.typesetting.take() {
            previous.cancel();
        }
        let token = CancellationToken::new();
        state.typesetting = Some(token.clone());

        let scheduler = self.inner.typesetter.clone();
        let panel = self.inner.panel.clone();
        tokio::spawn(async move {
            let report = scheduler.run(panel, token).await;
            tracing::trace!(?report, "typesetting finished");
        });
    }

    fn set_loading(&self, loading: bool) {
        let panel = &self.inner.panel;
        if loading {
            panel.add_class(&self.inner.config.loading_class);
            panel.set_attribute("data-status", Some(&self.inner.config.loading_text));
        } else {
            panel.remove_class(&self.inner.config.loading_class);
            panel.set_attribute("data-status", None);
        }
    }

    fn state(&self) -> MutexGuard<'_, PipelineState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Markup shown in the panel when a preview fails
pub fn error_markup(message: &str) -> String {
    format!(
        r#"<div class="preview-error">Preview error: {}</div>"#,
        html_escape::encode_text(message)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::LocalRenderTransport;
    use crate::typeset::TypesetterSlot;
    use lectern_core::{MemoryElement, MemoryPage, TypesetConfig};

    fn pipeline(panel: Arc<MemoryElement>) -> PreviewPipeline {
        PreviewPipeline::new(
            Arc::new(LocalRenderTransport::new()),
            Arc::new(MemoryPage::new()),
            panel,
            TypesetScheduler::new(TypesetterSlot::new(), TypesetConfig::default()),
            CsrfConfig::default(),
            PreviewConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_stale_generation_leaves_panel_untouched() {
        let panel = Arc::new(MemoryElement::with_html("<p>before</p>"));
        let pipeline = pipeline(panel.clone());

        let (stale, stale_token) = pipeline.begin();
        let (current, _token) = pipeline.begin();
        assert!(stale_token.is_cancelled());

        // A response that finished despite its cancellation
        let outcome = pipeline.finish(stale, Ok(PreviewResponse::rendered("<p>stale</p>")));
        assert_eq!(outcome, PreviewOutcome::Cancelled);
        assert_eq!(panel.inner_html(), "<p>before</p>");
        assert_eq!(pipeline.phase(), PreviewPhase::Requesting { generation: current });
        assert_eq!(pipeline.last_outcome(), None);

        let outcome = pipeline.finish(stale, Err(LecternError::server("late failure")));
        assert_eq!(outcome, PreviewOutcome::Cancelled);
        assert_eq!(panel.inner_html(), "<p>before</p>");

        let outcome = pipeline.finish(current, Ok(PreviewResponse::rendered("<p>fresh</p>")));
        assert_eq!(outcome, PreviewOutcome::Rendered);
        assert_eq!(panel.inner_html(), "<p>fresh</p>");
        assert_eq!(pipeline.phase(), PreviewPhase::Idle);
    }

    #[tokio::test]
    async fn test_filters_apply_to_rendered_html_only() {
        let panel = Arc::new(MemoryElement::new());
        let filters = RenderFilters::new();
        filters.register("wrap", Arc::new(|html: &str| format!("<section>{html}</section>")));
        let pipeline = PreviewPipeline::with_filters(
            Arc::new(LocalRenderTransport::new()),
            Arc::new(MemoryPage::new()),
            panel.clone(),
            TypesetScheduler::new(TypesetterSlot::new(), TypesetConfig::default()),
            CsrfConfig::default(),
            PreviewConfig::default(),
            filters,
        );

        let (generation, _token) = pipeline.begin();
        pipeline.finish(generation, Ok(PreviewResponse::rendered("<p>a</p>")));
        assert_eq!(panel.inner_html(), "<section><p>a</p></section>");

        let (generation, _token) = pipeline.begin();
        pipeline.finish(generation, Err(LecternError::server("boom")));
        assert_eq!(panel.inner_html(), error_markup("Server error: boom"));
    }
}
