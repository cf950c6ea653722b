//! Applies content enhancement to article containers on the page

use async_trait::async_trait;
use lectern_core::{
    Element, MountOutcome, RenderFilters, Result, Widget, WidgetContext, WidgetStatus,
};
use std::sync::Arc;

use crate::enhance::enhance_html;

/// Enhance one element's content in place
pub fn enhance_element(element: &dyn Element) {
    let html = element.inner_html();
    element.set_inner_html(&enhance_html(&html));
}

/// Name the enhancement filter is registered under
pub const FILTER_NAME: &str = "enhance";

pub struct EnhanceWidget {
    enhanced: usize,
    filters: Option<RenderFilters>,
    status: WidgetStatus,
}

impl EnhanceWidget {
    pub fn new() -> Self {
        Self {
            enhanced: 0,
            filters: None,
            status: WidgetStatus::Pending,
        }
    }

    /// Number of containers enhanced by the last mount
    pub fn enhanced(&self) -> usize {
        self.enhanced
    }
}

impl Default for EnhanceWidget {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Widget for EnhanceWidget {
    fn name(&self) -> &str {
        "enhance"
    }

    async fn mount(&mut self, context: &WidgetContext) -> Result<MountOutcome> {
        self.enhanced = 0;
        for selector in &context.config.enhance.container_selectors {
            if let Some(container) = context.page.query(selector) {
                tracing::debug!("Enhancing content in {}", selector);
                enhance_element(container.as_ref());
                self.enhanced += 1;
            }
        }

        if self.enhanced == 0 {
            self.status = WidgetStatus::Inactive;
            return Ok(MountOutcome::NotApplicable);
        }

        // Containers re-rendered later (the live preview) go through the same rules.
        context
            .render_filters
            .register(FILTER_NAME, Arc::new(|html: &str| enhance_html(html)));
        self.filters = Some(context.render_filters.clone());

        self.status = WidgetStatus::Mounted;
        Ok(MountOutcome::Mounted)
    }

    async fn unmount(&mut self) -> Result<()> {
        if let Some(filters) = self.filters.take() {
            filters.remove(FILTER_NAME);
        }
        self.status = WidgetStatus::Inactive;
        Ok(())
    }

    fn status(&self) -> WidgetStatus {
        self.status.clone()
    }
}
