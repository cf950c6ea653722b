//! Lectern Gallery - image upload and catalog widget
//!
//! Lists uploaded images as a grid of cards, uploads new images after
//! client-side validation and deletes images through the image catalog
//! service.

pub mod actions;
pub mod catalog;
pub mod grid;
pub mod upload;
pub mod validation;
pub mod widget;

pub use actions::{delete_prompt, ActionOutcome, CardAction};
pub use catalog::{
    guess_content_type, DeleteResult, HttpImageCatalog, ImageCatalog, ImageFile, ImageListing,
    ImageRecord, UploadResult,
};
pub use grid::render_grid;
pub use upload::{UploadGuard, UploadSlot, UploadState};
pub use validation::validate_image;
pub use widget::{Gallery, GalleryWidget};
