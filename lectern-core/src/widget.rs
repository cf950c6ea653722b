//! Widget lifecycle: components mounted onto a page once it is ready

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::SystemTime;

use crate::config::LecternConfig;
use crate::error::{LecternError, Result};
use crate::filter::RenderFilters;
use crate::page::Page;
use crate::readiness::Readiness;

/// A page component with an explicit mount lifecycle
#[async_trait]
pub trait Widget: Send + Sync {
    /// Get the widget name
    fn name(&self) -> &str;

    /// Attach to the page. Missing elements are not an error: the widget
    /// reports [`MountOutcome::NotApplicable`] and stays inert.
    async fn mount(&mut self, context: &WidgetContext) -> Result<MountOutcome>;

    /// Detach from the page and stop background work
    async fn unmount(&mut self) -> Result<()>;

    /// Get widget status
    fn status(&self) -> WidgetStatus {
        WidgetStatus::Mounted
    }
}

/// Context provided to widgets when they mount
#[derive(Clone)]
pub struct WidgetContext {
    pub page: Arc<dyn Page>,
    pub config: Arc<LecternConfig>,
    /// Resolved once the page content is in place
    pub page_ready: Readiness<()>,
    /// Applied by widgets that write rendered content into the page
    pub render_filters: RenderFilters,
}

impl WidgetContext {
    /// Create a new widget context
    pub fn new(page: Arc<dyn Page>, config: Arc<LecternConfig>, page_ready: Readiness<()>) -> Self {
        Self {
            page,
            config,
            page_ready,
            render_filters: RenderFilters::new(),
        }
    }
}

/// Result of mounting a widget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MountOutcome {
    Mounted,
    /// The page does not contain what the widget needs
    NotApplicable,
}

/// Widget status enumeration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WidgetStatus {
    Pending,
    Mounted,
    Inactive,
    Error(String),
}

/// Information about a registered widget
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WidgetInfo {
    pub name: String,
    pub status: WidgetStatus,
    pub mounted_at: Option<SystemTime>,
}

/// Registry mounting widgets in registration order
pub struct WidgetRegistry {
    widgets: Vec<Box<dyn Widget>>,
    info: Vec<WidgetInfo>,
    mounted: bool,
}

impl WidgetRegistry {
    /// Create a new widget registry
    pub fn new() -> Self {
        Self {
            widgets: Vec::new(),
            info: Vec::new(),
            mounted: false,
        }
    }

    /// Register a widget. Names must be unique.
    pub fn register(&mut self, widget: Box<dyn Widget>) -> Result<()> {
        let name = widget.name().to_string();
        if self.info.iter().any(|info| info.name == name) {
            return Err(LecternError::widget(format!(
                "Widget {} is already registered",
                name
            )));
        }

        tracing::debug!("Registering widget: {}", name);
        self.info.push(WidgetInfo {
            name,
            status: WidgetStatus::Pending,
            mounted_at: None,
        });
        self.widgets.push(widget);
        Ok(())
    }

    /// Wait for the page to signal readiness, then mount every widget once.
    ///
    /// A widget that fails to mount is recorded as errored; the others still
    /// mount.
    pub async fn mount_all(&mut self, context: &WidgetContext) -> Result<()> {
        if self.mounted {
            tracing::warn!("Widgets are already mounted");
            return Ok(());
        }

        context.page_ready.wait().await;
        tracing::info!("Page ready, mounting {} widgets", self.widgets.len());

        for (widget, info) in self.widgets.iter_mut().zip(self.info.iter_mut()) {
            match widget.mount(context).await {
                Ok(MountOutcome::Mounted) => {
                    tracing::debug!("Mounted widget: {}", info.name);
                    info.status = WidgetStatus::Mounted;
                    info.mounted_at = Some(SystemTime::now());
                }
                Ok(MountOutcome::NotApplicable) => {
                    tracing::debug!("Widget {} not applicable on this page", info.name);
                    info.status = WidgetStatus::Inactive;
                }
                Err(e) => {
                    tracing::error!("Failed to mount widget {}: {}", info.name, e);
                    info.status = WidgetStatus::Error(e.to_string());
                }
            }
        }

        self.mounted = true;
        Ok(())
    }

    /// Unmount all widgets in reverse order
    pub async fn unmount_all(&mut self) -> Result<()> {
        for (widget, info) in self.widgets.iter_mut().zip(self.info.iter_mut()).rev() {
            if info.status != WidgetStatus::Mounted {
                continue;
            }
            if let Err(e) = widget.unmount().await {
                tracing::error!("Failed to unmount widget {}: {}", info.name, e);
            }
            info.status = WidgetStatus::Inactive;
        }
        self.mounted = false;
        Ok(())
    }

    /// Get widget information
    pub fn get_info(&self, name: &str) -> Option<&WidgetInfo> {
        self.info.iter().find(|info| info.name == name)
    }

    /// List all registered widgets
    pub fn list(&self) -> &[WidgetInfo] {
        &self.info
    }
}

impl Default for WidgetRegistry {
    fn default() -> Self {
        Self::new()
    }
}
