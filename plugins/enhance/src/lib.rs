//! Lectern Enhance - presentation styles for rendered article content
//!
//! Merges inline styles into images and tables: responsive images, figure
//! centering, alignment classes, striped tables with styled header cells.

pub mod enhance;
pub mod markup;
pub mod style;
pub mod widget;

pub use enhance::{enhance_html, CLEARFIX};
pub use markup::Fragment;
pub use style::StyleMap;
pub use widget::{enhance_element, EnhanceWidget, FILTER_NAME};
