//! Lectern Core - shared foundation for the Lectern admin tooling
//!
//! This crate provides the error type, configuration, the page model widgets
//! are written against, the anti-forgery token lookup, the readiness signal
//! and the widget lifecycle.

pub mod config;
pub mod csrf;
pub mod error;
pub mod filter;
pub mod media;
pub mod page;
pub mod readiness;
pub mod widget;

// Re-export commonly used types
pub use config::{
    CsrfConfig, EndpointConfig, EnhanceConfig, GalleryConfig, LecternConfig, PreviewConfig,
    TypesetConfig,
};
pub use csrf::{resolve_token, CsrfToken, TokenSource};
pub use error::{ErrorSeverity, LecternError, Result};
pub use filter::{RenderFilter, RenderFilters};
pub use page::{Element, MemoryElement, MemoryPage, Page};
pub use readiness::Readiness;
pub use widget::{MountOutcome, Widget, WidgetContext, WidgetInfo, WidgetRegistry, WidgetStatus};
