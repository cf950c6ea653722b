//! Gallery grid markup

use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::catalog::{ImageListing, ImageRecord};

pub fn loading_markup() -> &'static str {
    r#"<div class="loading-message">Loading image catalog...</div>"#
}

pub fn empty_markup() -> &'static str {
    r#"<div class="empty">No uploaded images</div>"#
}

pub fn error_markup(message: &str) -> String {
    format!(r#"<div class="error">Error: {}</div>"#, encode_text(message))
}

/// Markup for a whole listing, including its failure and empty states
pub fn render_grid(listing: &ImageListing) -> String {
    if !listing.success {
        return error_markup(listing.error.as_deref().unwrap_or("Unknown error"));
    }
    if listing.images.is_empty() {
        return empty_markup().to_string();
    }
    listing.images.iter().map(render_card).collect()
}

pub fn render_card(image: &ImageRecord) -> String {
    let url = encode_double_quoted_attribute(&image.url);
    let name_attr = encode_double_quoted_attribute(&image.filename);
    let name_text = encode_text(&image.filename);
    let markdown = encode_double_quoted_attribute(&image.markdown);

    format!(
        r#"<div class="img-card">
  <div class="img-thumb"><img src="{url}" alt="{name_attr}" loading="lazy"></div>
  <div class="img-meta" title="{name_attr}">
    <div class="filename">{name_text}</div>
    <div class="created">{created}</div>
  </div>
  <div class="img-size">{size}</div>
  <input class="img-md" value="{markdown}" readonly />
  <div class="img-actions">
    <button type="button" class="btn-small btn-copy" data-action="copy" data-filename="{name_attr}" title="Copy markdown">Copy</button>
    <button type="button" class="btn-small btn-delete" data-action="delete" data-filename="{name_attr}" title="Delete image">Delete</button>
  </div>
</div>
"#,
        created = encode_text(&image.created),
        size = encode_text(&image.size),
    )
}
