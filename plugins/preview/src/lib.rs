//! Live preview for the admin editor
//!
//! Content changes are debounced, sent to a rendering service with at most
//! one request in flight, and the rendered HTML replaces the preview panel.
//! Math in the result is typeset once the typesetting engine is available,
//! with follow-up passes for late layout changes.

pub mod debounce;
pub mod pipeline;
pub mod transport;
pub mod typeset;
pub mod widget;

pub use debounce::{DebouncedTrigger, Debouncer, TriggerConfig};
pub use pipeline::{error_markup, PreviewOutcome, PreviewPhase, PreviewPipeline};
pub use transport::{
    HttpRenderTransport, LocalRenderTransport, PreviewRequest, PreviewResponse, RenderTransport,
};
pub use typeset::{TypesetReport, TypesetScheduler, Typesetter, TypesetterSlot};
pub use widget::PreviewWidget;
