//! Preview widget: binds the pipeline to an editor field and a panel

use async_trait::async_trait;
use lectern_core::{
    Element, LecternConfig, MountOutcome, Result, Widget, WidgetContext, WidgetStatus,
};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::debounce::{DebouncedTrigger, TriggerConfig};
use crate::pipeline::PreviewPipeline;
use crate::transport::{HttpRenderTransport, RenderTransport};
use crate::typeset::{TypesetScheduler, TypesetterSlot};

pub struct PreviewWidget {
    transport: Arc<dyn RenderTransport>,
    typesetter: TypesetterSlot,
    pipeline: Option<PreviewPipeline>,
    listener: Option<JoinHandle<()>>,
    status: WidgetStatus,
}

impl PreviewWidget {
    pub fn new(transport: Arc<dyn RenderTransport>, typesetter: TypesetterSlot) -> Self {
        Self {
            transport,
            typesetter,
            pipeline: None,
            listener: None,
            status: WidgetStatus::Pending,
        }
    }

    /// Widget talking to the configured preview endpoint
    pub fn http(config: &LecternConfig, typesetter: TypesetterSlot) -> Self {
        let url = config.endpoint_url(&config.endpoints.preview);
        Self::new(Arc::new(HttpRenderTransport::new(url)), typesetter)
    }

    /// The pipeline, once mounted
    pub fn pipeline(&self) -> Option<&PreviewPipeline> {
        self.pipeline.as_ref()
    }

    fn listen(field: Arc<dyn Element>, pipeline: PreviewPipeline, debounce_ms: u64) -> JoinHandle<()> {
        let mut events = field.subscribe_input();
        tokio::spawn(async move {
            let trigger = DebouncedTrigger::spawn(
                TriggerConfig {
                    debounce_delay_ms: debounce_ms,
                },
                move |content| {
                    let pipeline = pipeline.clone();
                    tokio::spawn(async move {
                        pipeline.preview(content).await;
                    });
                },
            );

            loop {
                match events.recv().await {
                    Ok(()) | Err(RecvError::Lagged(_)) => {
                        // Content is read when the event arrives, not when the window closes.
                        if !trigger.notify(field.value()) {
                            break;
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            trigger.shutdown().await;
        })
    }
}

#[async_trait]
impl Widget for PreviewWidget {
    fn name(&self) -> &str {
        "preview"
    }

    async fn mount(&mut self, context: &WidgetContext) -> Result<MountOutcome> {
        let config = &context.config;
        let field = context.page.query(&config.preview.field_selector);
        let panel = context.page.query(&config.preview.panel_selector);
        let (Some(field), Some(panel)) = (field, panel) else {
            tracing::debug!("Preview elements not found, preview disabled");
            self.status = WidgetStatus::Inactive;
            return Ok(MountOutcome::NotApplicable);
        };

        let pipeline = PreviewPipeline::with_filters(
            self.transport.clone(),
            context.page.clone(),
            panel,
            TypesetScheduler::new(self.typesetter.clone(), config.typeset.clone()),
            config.csrf.clone(),
            config.preview.clone(),
            context.render_filters.clone(),
        );

        // Subscribe before the first request so no edit is missed.
        self.listener = Some(Self::listen(
            field.clone(),
            pipeline.clone(),
            config.preview.debounce_ms,
        ));

        let initial = pipeline.clone();
        let content = field.value();
        tokio::spawn(async move {
            initial.preview(content).await;
        });

        self.pipeline = Some(pipeline);
        self.status = WidgetStatus::Mounted;
        Ok(MountOutcome::Mounted)
    }

    async fn unmount(&mut self) -> Result<()> {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
        if let Some(pipeline) = self.pipeline.take() {
            pipeline.cancel();
        }
        self.status = WidgetStatus::Inactive;
        Ok(())
    }

    fn status(&self) -> WidgetStatus {
        self.status.clone()
    }
}
