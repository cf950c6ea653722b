//! Configuration management for Lectern

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{LecternError, Result};

/// Main system configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LecternConfig {
    pub endpoints: EndpointConfig,
    pub preview: PreviewConfig,
    pub typeset: TypesetConfig,
    pub csrf: CsrfConfig,
    pub gallery: GalleryConfig,
    pub enhance: EnhanceConfig,
}

/// Backend endpoints, relative to `base_url`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub base_url: String,
    pub preview: String,
    pub list_images: String,
    pub upload_image: String,
    pub delete_image: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            preview: "/theory/admin/preview/".to_string(),
            list_images: "/theory/admin/get-images/".to_string(),
            upload_image: "/theory/admin/upload-image/".to_string(),
            delete_image: "/theory/admin/delete-image/".to_string(),
        }
    }
}

/// Live preview settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Selector of the edited text field
    pub field_selector: String,
    /// Selector of the rendered output container
    pub panel_selector: String,
    /// Quiet period before a change is sent
    pub debounce_ms: u64,
    /// Class set on the panel while a request is in flight
    pub loading_class: String,
    /// Status text shown while a request is in flight
    pub loading_text: String,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            field_selector: r#"textarea[name="content_md"]"#.to_string(),
            panel_selector: ".preview-content".to_string(),
            debounce_ms: 450,
            loading_class: "is-loading".to_string(),
            loading_text: "Updating...".to_string(),
        }
    }
}

impl PreviewConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Typesetting engine discovery and re-run schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TypesetConfig {
    /// How many intervals to wait for the engine before giving up
    pub max_attempts: u32,
    pub retry_interval_ms: u64,
    /// Extra passes after the first one, measured from the first pass
    pub follow_up_delays_ms: Vec<u64>,
}

impl Default for TypesetConfig {
    fn default() -> Self {
        Self {
            max_attempts: 15,
            retry_interval_ms: 300,
            follow_up_delays_ms: vec![400, 1200],
        }
    }
}

impl TypesetConfig {
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    pub fn follow_up_delays(&self) -> Vec<Duration> {
        self.follow_up_delays_ms
            .iter()
            .map(|ms| Duration::from_millis(*ms))
            .collect()
    }
}

/// Anti-forgery token lookup
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CsrfConfig {
    /// Refuse to send state-changing requests without a token
    pub required: bool,
    pub cookie_name: String,
    pub meta_name: String,
    /// Name of the hidden form field
    pub field_name: String,
    pub header_name: String,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            required: true,
            cookie_name: "csrftoken".to_string(),
            meta_name: "csrf-token".to_string(),
            field_name: "csrfmiddlewaretoken".to_string(),
            header_name: "X-CSRFToken".to_string(),
        }
    }
}

impl CsrfConfig {
    /// Selector for the hidden input carrying the token
    pub fn field_selector(&self) -> String {
        format!(r#"input[name="{}"]"#, self.field_name)
    }
}

/// Image gallery settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GalleryConfig {
    pub grid_selector: String,
    pub progress_selector: String,
    pub result_selector: String,
    pub code_selector: String,
    pub max_upload_bytes: u64,
    pub allowed_types: Vec<String>,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            grid_selector: "#uploadedImagesList".to_string(),
            progress_selector: "#uploadProgress".to_string(),
            result_selector: "#uploadResult".to_string(),
            code_selector: "#generatedCode".to_string(),
            max_upload_bytes: 10 * 1024 * 1024,
            allowed_types: vec![
                "image/jpeg".to_string(),
                "image/jpg".to_string(),
                "image/png".to_string(),
                "image/gif".to_string(),
                "image/webp".to_string(),
                "image/svg+xml".to_string(),
            ],
        }
    }
}

/// Rendered content post-processing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhanceConfig {
    pub container_selectors: Vec<String>,
}

impl Default for EnhanceConfig {
    fn default() -> Self {
        Self {
            container_selectors: vec![
                ".article-content".to_string(),
                "#article-content".to_string(),
                ".preview-content".to_string(),
                "#live-preview-content".to_string(),
                ".preview-content-area".to_string(),
            ],
        }
    }
}

impl LecternConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| LecternError::Config(format!("Failed to read config file: {}", e)))?;

        let config: LecternConfig = serde_json::from_str(&content)
            .map_err(|e| LecternError::Config(format!("Failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| LecternError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| LecternError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Load a base file, then apply each existing override file on top.
    /// Override files replace whole sections.
    pub fn load_with_overrides(base_path: &Path, override_paths: &[PathBuf]) -> Result<Self> {
        let mut config = Self::from_file(base_path)?;

        for override_path in override_paths {
            if !override_path.exists() {
                continue;
            }
            let content = std::fs::read_to_string(override_path).map_err(|e| {
                LecternError::Config(format!("Failed to read override file: {}", e))
            })?;
            let overrides: serde_json::Value = serde_json::from_str(&content)
                .map_err(|e| LecternError::Config(format!("Failed to parse override: {}", e)))?;
            config.merge_json(overrides)?;
        }

        Ok(config)
    }

    /// Default location of the user configuration file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("lectern").join("config.json"))
    }

    fn merge_json(&mut self, overrides: serde_json::Value) -> Result<()> {
        let mut current = serde_json::to_value(&*self)?;
        if let (Some(current), serde_json::Value::Object(overrides)) =
            (current.as_object_mut(), overrides)
        {
            for (section, value) in overrides {
                let merged = match (current.remove(&section), value) {
                    (
                        Some(serde_json::Value::Object(mut existing)),
                        serde_json::Value::Object(fields),
                    ) => {
                        existing.extend(fields);
                        serde_json::Value::Object(existing)
                    }
                    (_, value) => value,
                };
                current.insert(section, merged);
            }
        }
        *self = serde_json::from_value(current)
            .map_err(|e| LecternError::Config(format!("Invalid override: {}", e)))?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !(self.endpoints.base_url.starts_with("http://")
            || self.endpoints.base_url.starts_with("https://"))
        {
            return Err(LecternError::Config(format!(
                "Base URL must start with http:// or https://: {}",
                self.endpoints.base_url
            )));
        }

        for (name, path) in [
            ("preview", &self.endpoints.preview),
            ("list_images", &self.endpoints.list_images),
            ("upload_image", &self.endpoints.upload_image),
            ("delete_image", &self.endpoints.delete_image),
        ] {
            if !path.starts_with('/') {
                return Err(LecternError::Config(format!(
                    "Endpoint '{}' must be an absolute path: {}",
                    name, path
                )));
            }
        }

        if self.preview.debounce_ms == 0 {
            return Err(LecternError::Config(
                "Preview debounce must be greater than zero".to_string(),
            ));
        }

        if self.typeset.retry_interval_ms == 0 {
            return Err(LecternError::Config(
                "Typeset retry interval must be greater than zero".to_string(),
            ));
        }

        if self.csrf.header_name.trim().is_empty() {
            return Err(LecternError::Config(
                "Anti-forgery header name cannot be empty".to_string(),
            ));
        }

        if self.gallery.max_upload_bytes == 0 {
            return Err(LecternError::Config(
                "Maximum upload size must be greater than zero".to_string(),
            ));
        }

        if self.gallery.allowed_types.is_empty() {
            return Err(LecternError::Config(
                "At least one image type must be allowed".to_string(),
            ));
        }

        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_environment_overrides(
        &mut self,
        env_overrides: &HashMap<String, String>,
    ) -> Result<()> {
        for (key, value) in env_overrides {
            match key.as_str() {
                "LECTERN_BASE_URL" => self.endpoints.base_url = value.clone(),
                "LECTERN_PREVIEW_ENDPOINT" => self.endpoints.preview = value.clone(),
                "LECTERN_DEBOUNCE_MS" => {
                    self.preview.debounce_ms = value.parse().map_err(|_| {
                        LecternError::Config(format!(
                            "Invalid debounce in environment variable: {}",
                            value
                        ))
                    })?;
                }
                "LECTERN_CSRF_REQUIRED" => {
                    self.csrf.required = value.parse().map_err(|_| {
                        LecternError::Config(format!(
                            "Invalid boolean in environment variable: {}",
                            value
                        ))
                    })?;
                }
                "LECTERN_CSRF_TOKEN_COOKIE" => self.csrf.cookie_name = value.clone(),
                _ => {
                    // Ignore unknown environment variables
                }
            }
        }
        Ok(())
    }

    /// Collect `LECTERN_*` variables from the process environment
    pub fn environment_overrides() -> HashMap<String, String> {
        std::env::vars()
            .filter(|(key, _)| key.starts_with("LECTERN_"))
            .collect()
    }

    /// Join the base URL with an endpoint path
    pub fn endpoint_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.endpoints.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_defaults() {
        let config = LecternConfig::new();
        assert!(config.validate().is_ok());
        assert_eq!(config.preview.debounce_ms, 450);
        assert_eq!(config.typeset.max_attempts, 15);
        assert_eq!(config.typeset.retry_interval_ms, 300);
        assert_eq!(config.typeset.follow_up_delays_ms, vec![400, 1200]);
        assert!(config.csrf.required);
        assert_eq!(config.gallery.max_upload_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn test_config_file_operations() {
        let mut config = LecternConfig::new();
        config.endpoints.base_url = "https://admin.example.org".to_string();

        let temp_file = NamedTempFile::new().unwrap();
        assert!(config.save_to_file(temp_file.path()).is_ok());

        let loaded = LecternConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(loaded.endpoints.base_url, "https://admin.example.org");
        assert_eq!(loaded.preview.panel_selector, ".preview-content");
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp_file = NamedTempFile::new().unwrap();
        std::fs::write(temp_file.path(), r#"{ "preview": { "debounce_ms": 200 } }"#).unwrap();

        let loaded = LecternConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(loaded.preview.debounce_ms, 200);
        assert_eq!(loaded.preview.loading_class, "is-loading");
        assert_eq!(loaded.endpoints.preview, "/theory/admin/preview/");
    }

    #[test]
    fn test_load_with_overrides() {
        let base = NamedTempFile::new().unwrap();
        LecternConfig::new().save_to_file(base.path()).unwrap();

        let overrides = NamedTempFile::new().unwrap();
        std::fs::write(
            overrides.path(),
            r#"{ "csrf": { "required": false }, "endpoints": { "base_url": "http://localhost:9000" } }"#,
        )
        .unwrap();

        let config = LecternConfig::load_with_overrides(
            base.path(),
            &[overrides.path().to_path_buf(), PathBuf::from("/nonexistent/override.json")],
        )
        .unwrap();

        assert!(!config.csrf.required);
        assert_eq!(config.csrf.cookie_name, "csrftoken");
        assert_eq!(config.endpoints.base_url, "http://localhost:9000");
        assert_eq!(config.endpoints.preview, "/theory/admin/preview/");
    }

    #[test]
    fn test_validation_failures() {
        let mut config = LecternConfig::new();
        config.endpoints.base_url = "ftp://example.org".to_string();
        assert!(config.validate().is_err());

        let mut config = LecternConfig::new();
        config.endpoints.preview = "theory/admin/preview/".to_string();
        assert!(config.validate().is_err());

        let mut config = LecternConfig::new();
        config.preview.debounce_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_environment_overrides() {
        let mut config = LecternConfig::new();
        let mut env_overrides = HashMap::new();
        env_overrides.insert("LECTERN_DEBOUNCE_MS".to_string(), "250".to_string());
        env_overrides.insert("LECTERN_CSRF_REQUIRED".to_string(), "false".to_string());

        config.apply_environment_overrides(&env_overrides).unwrap();

        assert_eq!(config.preview.debounce_ms, 250);
        assert!(!config.csrf.required);

        env_overrides.insert("LECTERN_DEBOUNCE_MS".to_string(), "soon".to_string());
        assert!(config.apply_environment_overrides(&env_overrides).is_err());
    }

    #[test]
    fn test_endpoint_url_joining() {
        let mut config = LecternConfig::new();
        config.endpoints.base_url = "https://admin.example.org/".to_string();
        assert_eq!(
            config.endpoint_url(&config.endpoints.preview),
            "https://admin.example.org/theory/admin/preview/"
        );
        assert_eq!(
            config.csrf.field_selector(),
            r#"input[name="csrfmiddlewaretoken"]"#
        );
    }
}
