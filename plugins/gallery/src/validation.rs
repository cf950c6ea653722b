//! Client-side checks before an upload reaches the server

use lectern_core::{GalleryConfig, LecternError, Result};

use crate::catalog::ImageFile;

const MIB: f64 = 1024.0 * 1024.0;

/// Reject empty, oversized or non-image files
pub fn validate_image(file: &ImageFile, config: &GalleryConfig) -> Result<()> {
    if file.filename.trim().is_empty() {
        return Err(LecternError::validation("No file selected"));
    }

    if file.size() > config.max_upload_bytes {
        return Err(LecternError::validation(format!(
            "File is too large ({:.1} MB). Maximum is {:.0} MB.",
            file.size() as f64 / MIB,
            config.max_upload_bytes as f64 / MIB
        )));
    }

    if !config
        .allowed_types
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(&file.mime))
    {
        return Err(LecternError::validation(
            "Unsupported file type. Allowed: JPG, PNG, GIF, WebP, SVG",
        ));
    }

    Ok(())
}
