//! Image catalog service client

use async_trait::async_trait;
use lectern_core::{media, CsrfToken, LecternConfig, LecternError, Result};
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One uploaded image as listed by the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub url: String,
    pub filename: String,
    #[serde(default)]
    pub created: String,
    /// Human readable size, formatted by the server
    #[serde(default)]
    pub size: String,
    /// Snippet to paste into an article
    pub markdown: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageListing {
    pub success: bool,
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub images: Vec<ImageRecord>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ImageListing {
    pub fn ok(images: Vec<ImageRecord>) -> Self {
        Self {
            success: true,
            count: images.len(),
            images,
            error: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResult {
    pub success: bool,
    #[serde(default)]
    pub markdown: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResult {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// A file picked for upload
#[derive(Debug, Clone)]
pub struct ImageFile {
    pub filename: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    pub fn new(filename: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            mime: mime.into(),
            bytes,
        }
    }

    /// Read a file from disk, guessing its type from the extension
    pub async fn from_path(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::new(filename, guess_content_type(path), bytes))
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Guess the content type based on file extension
pub fn guess_content_type(path: &Path) -> String {
    if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
        match extension.to_lowercase().as_str() {
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "gif" => "image/gif",
            "svg" => "image/svg+xml",
            "webp" => "image/webp",
            "bmp" => "image/bmp",
            "ico" => "image/x-icon",
            _ => "application/octet-stream",
        }
    } else {
        "application/octet-stream"
    }
    .to_string()
}

/// Catalog of uploaded images
#[async_trait]
pub trait ImageCatalog: Send + Sync {
    async fn list(&self, csrf: Option<&CsrfToken>) -> Result<ImageListing>;

    async fn upload(&self, file: &ImageFile, csrf: Option<&CsrfToken>) -> Result<UploadResult>;

    async fn delete(&self, filename: &str, csrf: Option<&CsrfToken>) -> Result<DeleteResult>;
}

#[derive(Debug, Clone)]
pub struct HttpImageCatalog {
    client: reqwest::Client,
    list_url: String,
    upload_url: String,
    delete_url: String,
}

impl HttpImageCatalog {
    pub fn new(list_url: String, upload_url: String, delete_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            list_url,
            upload_url,
            delete_url,
        }
    }

    /// Catalog for the configured endpoints
    pub fn from_config(config: &LecternConfig) -> Self {
        Self::new(
            config.endpoint_url(&config.endpoints.list_images),
            config.endpoint_url(&config.endpoints.upload_image),
            config.endpoint_url(&config.endpoints.delete_image),
        )
    }

    async fn send<T: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
        csrf: Option<&CsrfToken>,
    ) -> Result<T> {
        let builder = match csrf {
            Some(token) => builder.header(token.header.as_str(), token.value.as_str()),
            None => builder,
        };

        let response = builder
            .send()
            .await
            .map_err(|e| LecternError::transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LecternError::transport(format!(
                "HTTP {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown status")
            )));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !media::is_json(&content_type) {
            return Err(LecternError::malformed(format!(
                "expected a JSON response, got '{}'",
                content_type
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| LecternError::transport(e.to_string()))?;
        serde_json::from_slice(&body).map_err(|e| LecternError::malformed(e.to_string()))
    }
}

#[async_trait]
impl ImageCatalog for HttpImageCatalog {
    async fn list(&self, csrf: Option<&CsrfToken>) -> Result<ImageListing> {
        tracing::debug!("Listing images from {}", self.list_url);
        self.send(self.client.get(&self.list_url), csrf).await
    }

    async fn upload(&self, file: &ImageFile, csrf: Option<&CsrfToken>) -> Result<UploadResult> {
        tracing::debug!(
            "Uploading {} ({} bytes, {})",
            file.filename,
            file.size(),
            file.mime
        );
        let part = reqwest::multipart::Part::bytes(file.bytes.clone())
            .file_name(file.filename.clone())
            .mime_str(&file.mime)
            .map_err(|e| LecternError::validation(format!("Invalid file type: {}", e)))?;
        let form = reqwest::multipart::Form::new().part("image", part);

        self.send(self.client.post(&self.upload_url).multipart(form), csrf)
            .await
    }

    async fn delete(&self, filename: &str, csrf: Option<&CsrfToken>) -> Result<DeleteResult> {
        tracing::debug!("Deleting image {}", filename);
        let body = serde_json::json!({ "filename": filename });
        self.send(self.client.post(&self.delete_url).json(&body), csrf)
            .await
    }
}
