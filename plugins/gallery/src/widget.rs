//! Gallery widget: image grid, uploads and deletes against one page

use async_trait::async_trait;
use lectern_core::{
    resolve_token, CsrfConfig, CsrfToken, Element, GalleryConfig, LecternConfig, LecternError,
    MountOutcome, Page, Result, Widget, WidgetContext, WidgetStatus,
};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::actions::{delete_prompt, ActionOutcome, CardAction};
use crate::catalog::{
    HttpImageCatalog, ImageCatalog, ImageFile, ImageListing, ImageRecord, UploadResult,
};
use crate::grid::{error_markup, loading_markup, render_grid};
use crate::upload::UploadSlot;
use crate::validation::validate_image;

struct Inner {
    catalog: Arc<dyn ImageCatalog>,
    page: Arc<dyn Page>,
    grid: Arc<dyn Element>,
    config: GalleryConfig,
    csrf: CsrfConfig,
    uploads: UploadSlot,
    last_error: Mutex<Option<String>>,
    listing: Mutex<ListingState>,
}

#[derive(Default)]
struct ListingState {
    /// Bumped by every refresh; only the newest may write the grid
    generation: u64,
    images: Vec<ImageRecord>,
}

/// A mounted gallery. Clones share the grid and the upload slot.
#[derive(Clone)]
pub struct Gallery {
    inner: Arc<Inner>,
}

impl Gallery {
    pub fn new(
        catalog: Arc<dyn ImageCatalog>,
        page: Arc<dyn Page>,
        grid: Arc<dyn Element>,
        config: GalleryConfig,
        csrf: CsrfConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                catalog,
                page,
                grid,
                config,
                csrf,
                uploads: UploadSlot::new(),
                last_error: Mutex::new(None),
                listing: Mutex::new(ListingState::default()),
            }),
        }
    }

    pub fn uploads(&self) -> &UploadSlot {
        &self.inner.uploads
    }

    /// Message of the most recent failed upload or delete
    pub fn last_error(&self) -> Option<String> {
        self.inner
            .last_error
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn report(&self, message: Option<String>) {
        *self
            .inner
            .last_error
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = message;
    }

    /// Markdown snippet of a listed image
    pub fn markdown_for(&self, filename: &str) -> Option<String> {
        self.listing()
            .images
            .iter()
            .find(|image| image.filename == filename)
            .map(|image| image.markdown.clone())
    }

    /// Images shown by the most recent refresh
    pub fn images(&self) -> Vec<ImageRecord> {
        self.listing().images.clone()
    }

    fn listing(&self) -> MutexGuard<'_, ListingState> {
        self.inner
            .listing
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn token(&self) -> Result<Option<CsrfToken>> {
        resolve_token(self.inner.page.as_ref(), &self.inner.csrf)
    }

    /// Reload the grid from the catalog
    ///
    /// When refreshes overlap, only the most recently started one writes the
    /// grid; older listings are returned but not shown.
    pub async fn refresh(&self) -> Result<ImageListing> {
        let grid = &self.inner.grid;
        let generation = {
            let mut state = self.listing();
            state.generation += 1;
            grid.set_inner_html(loading_markup());
            state.generation
        };

        let listing = match self.token() {
            Ok(token) => self.inner.catalog.list(token.as_ref()).await,
            Err(e) => Err(e),
        };

        // The grid is written under the lock so a newer refresh cannot
        // start between the generation check and the write.
        let mut state = self.listing();
        if state.generation != generation {
            tracing::debug!(
                generation,
                current = state.generation,
                "discarding superseded image listing"
            );
            return listing;
        }

        match listing {
            Ok(listing) => {
                tracing::debug!("Loaded {} images", listing.images.len());
                grid.set_inner_html(&render_grid(&listing));
                state.images = if listing.success {
                    listing.images.clone()
                } else {
                    Vec::new()
                };
                Ok(listing)
            }
            Err(e) => {
                tracing::warn!("Failed to load image catalog: {}", e);
                grid.set_inner_html(&error_markup(&e.to_string()));
                Err(e)
            }
        }
    }

    /// Validate and upload one file, then show its snippet and reload the grid
    pub async fn upload(&self, file: ImageFile) -> Result<UploadResult> {
        if let Err(e) = validate_image(&file, &self.inner.config) {
            self.report(Some(e.to_string()));
            return Err(e);
        }

        let Some(_guard) = self.inner.uploads.try_begin(&file.filename) else {
            return Err(LecternError::validation("An upload is already in progress"));
        };

        let progress = self.inner.page.query(&self.inner.config.progress_selector);
        let result_box = self.inner.page.query(&self.inner.config.result_selector);
        if let Some(progress) = &progress {
            progress.set_attribute("data-progress", Some("0"));
            progress.set_visible(true);
        }
        if let Some(result_box) = &result_box {
            result_box.set_visible(false);
        }

        let outcome = match self.token() {
            Ok(token) => self.inner.catalog.upload(&file, token.as_ref()).await,
            Err(e) => Err(e),
        }
        .and_then(|result| {
            if result.success {
                Ok(result)
            } else {
                Err(LecternError::server(
                    result
                        .error
                        .clone()
                        .unwrap_or_else(|| "Unknown server error".to_string()),
                ))
            }
        });

        match outcome {
            Ok(result) => {
                if let Some(progress) = &progress {
                    progress.set_attribute("data-progress", Some("100"));
                    progress.set_visible(false);
                }
                if let Some(result_box) = &result_box {
                    result_box.set_visible(true);
                }
                if let (Some(code), Some(markdown)) = (
                    self.inner.page.query(&self.inner.config.code_selector),
                    result.markdown.as_deref(),
                ) {
                    code.set_value(markdown);
                }
                tracing::info!("Uploaded {}", file.filename);
                self.report(None);

                // A failed reload is already shown in the grid.
                let _ = self.refresh().await;
                Ok(result)
            }
            Err(e) => {
                tracing::warn!("Upload of {} failed: {}", file.filename, e);
                if let Some(progress) = &progress {
                    progress.set_visible(false);
                }
                self.report(Some(e.to_string()));
                Err(e)
            }
        }
    }

    /// Run a card button's action for `filename`.
    ///
    /// Copy puts the image's snippet on the clipboard, or in the code field
    /// when the page has no clipboard. Delete asks `confirm` first and does
    /// nothing if it answers false.
    pub async fn dispatch<F>(
        &self,
        action: CardAction,
        filename: &str,
        confirm: F,
    ) -> Result<ActionOutcome>
    where
        F: FnOnce(&str) -> bool + Send,
    {
        match action {
            CardAction::Copy => {
                let markdown = self.markdown_for(filename).ok_or_else(|| {
                    LecternError::validation(format!("No listed image named {}", filename))
                })?;
                if self.inner.page.write_clipboard(&markdown) {
                    tracing::debug!("Copied snippet for {}", filename);
                    return Ok(ActionOutcome::Copied(markdown));
                }
                let code = self
                    .inner
                    .page
                    .query(&self.inner.config.code_selector)
                    .ok_or_else(|| LecternError::widget("No clipboard and no code field"))?;
                code.set_value(&markdown);
                Ok(ActionOutcome::Placed(markdown))
            }
            CardAction::Delete => {
                if !confirm(&delete_prompt(filename)) {
                    return Ok(ActionOutcome::Declined);
                }
                self.delete(filename).await?;
                Ok(ActionOutcome::Deleted)
            }
        }
    }

    /// Delete an image and reload the grid on success
    pub async fn delete(&self, filename: &str) -> Result<()> {
        let outcome = match self.token() {
            Ok(token) => self.inner.catalog.delete(filename, token.as_ref()).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(result) if result.success => {
                tracing::info!("Deleted {}", filename);
                self.report(None);
                let _ = self.refresh().await;
                Ok(())
            }
            Ok(result) => {
                let e = LecternError::server(
                    result.error.unwrap_or_else(|| "Unknown error".to_string()),
                );
                tracing::warn!("Delete of {} rejected: {}", filename, e);
                self.report(Some(e.to_string()));
                Err(e)
            }
            Err(e) => {
                tracing::warn!("Delete of {} failed: {}", filename, e);
                self.report(Some(e.to_string()));
                Err(e)
            }
        }
    }
}

pub struct GalleryWidget {
    catalog: Arc<dyn ImageCatalog>,
    gallery: Option<Gallery>,
    status: WidgetStatus,
}

impl GalleryWidget {
    pub fn new(catalog: Arc<dyn ImageCatalog>) -> Self {
        Self {
            catalog,
            gallery: None,
            status: WidgetStatus::Pending,
        }
    }

    /// Widget talking to the configured image endpoints
    pub fn http(config: &LecternConfig) -> Self {
        Self::new(Arc::new(HttpImageCatalog::from_config(config)))
    }

    pub fn gallery(&self) -> Option<&Gallery> {
        self.gallery.as_ref()
    }
}

#[async_trait]
impl Widget for GalleryWidget {
    fn name(&self) -> &str {
        "gallery"
    }

    async fn mount(&mut self, context: &WidgetContext) -> Result<MountOutcome> {
        let config = &context.config;
        let Some(grid) = context.page.query(&config.gallery.grid_selector) else {
            tracing::debug!("Image grid not found, gallery disabled");
            self.status = WidgetStatus::Inactive;
            return Ok(MountOutcome::NotApplicable);
        };

        let gallery = Gallery::new(
            self.catalog.clone(),
            context.page.clone(),
            grid,
            config.gallery.clone(),
            config.csrf.clone(),
        );

        let initial = gallery.clone();
        tokio::spawn(async move {
            let _ = initial.refresh().await;
        });

        self.gallery = Some(gallery);
        self.status = WidgetStatus::Mounted;
        Ok(MountOutcome::Mounted)
    }

    async fn unmount(&mut self) -> Result<()> {
        self.gallery = None;
        self.status = WidgetStatus::Inactive;
        Ok(())
    }

    fn status(&self) -> WidgetStatus {
        self.status.clone()
    }
}
