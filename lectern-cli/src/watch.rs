//! Watch mode: a Markdown file on disk stands in for the editor field and an
//! HTML file for the preview panel.

use anyhow::{Context, Result};
use lectern_core::{
    Element, LecternConfig, MemoryElement, MemoryPage, Readiness, WidgetContext, WidgetRegistry,
};
use lectern_enhance::EnhanceWidget;
use lectern_preview::{
    HttpRenderTransport, LocalRenderTransport, PreviewWidget, RenderTransport, TypesetterSlot,
};
use notify::{EventKind, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    pub offline: bool,
    pub enhance: bool,
    pub token: Option<String>,
    pub cookies: Option<String>,
}

/// Preview panel that mirrors its content into an HTML document on disk.
///
/// Documents go to a writer task over a watch channel, so a burst of renders
/// only writes the latest one and no file I/O runs inside a page callback.
pub struct FilePanel {
    inner: MemoryElement,
    documents: watch::Sender<(u64, String)>,
    written: watch::Receiver<u64>,
}

impl FilePanel {
    /// Create the panel and spawn its writer task on the current runtime
    pub fn new(output: PathBuf) -> Self {
        let (documents, pending) = watch::channel((0, String::new()));
        let (done, written) = watch::channel(0);
        tokio::spawn(write_documents(output, pending, done));
        Self {
            inner: MemoryElement::new(),
            documents,
            written,
        }
    }

    /// Wait until the latest content is on disk
    pub async fn flush(&self) {
        let version = self.documents.borrow().0;
        let mut written = self.written.clone();
        if written.wait_for(|v| *v >= version).await.is_err() {
            warn!("Preview writer stopped before flushing");
        }
    }
}

fn document(body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"></head>\n<body>\n<div class=\"preview-content\">\n{}\n</div>\n</body>\n</html>\n",
        body
    )
}

async fn write_documents(
    output: PathBuf,
    mut pending: watch::Receiver<(u64, String)>,
    done: watch::Sender<u64>,
) {
    while pending.changed().await.is_ok() {
        let (version, body) = pending.borrow_and_update().clone();
        match tokio::fs::write(&output, document(&body)).await {
            Ok(()) => debug!("Wrote preview to {}", output.display()),
            Err(e) => warn!("Failed to write {}: {}", output.display(), e),
        }
        done.send_replace(version);
    }
}

impl Element for FilePanel {
    fn inner_html(&self) -> String {
        self.inner.inner_html()
    }

    fn set_inner_html(&self, html: &str) {
        self.inner.set_inner_html(html);
        self.documents.send_modify(|(version, body)| {
            *version += 1;
            *body = html.to_string();
        });
    }

    fn value(&self) -> String {
        self.inner.value()
    }

    fn set_value(&self, value: &str) {
        self.inner.set_value(value)
    }

    fn add_class(&self, class: &str) {
        self.inner.add_class(class)
    }

    fn remove_class(&self, class: &str) {
        self.inner.remove_class(class)
    }

    fn has_class(&self, class: &str) -> bool {
        self.inner.has_class(class)
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.inner.attribute(name)
    }

    fn set_attribute(&self, name: &str, value: Option<&str>) {
        if let Some(status) = value.filter(|_| name == "data-status") {
            info!("{}", status);
        }
        self.inner.set_attribute(name, value)
    }

    fn set_visible(&self, visible: bool) {
        self.inner.set_visible(visible)
    }

    fn is_visible(&self) -> bool {
        self.inner.is_visible()
    }

    fn subscribe_input(&self) -> broadcast::Receiver<()> {
        self.inner.subscribe_input()
    }
}

/// Build the page the preview widget mounts on
pub fn build_page(
    config: &LecternConfig,
    options: &WatchOptions,
    content: &str,
) -> (Arc<MemoryPage>, Arc<MemoryElement>) {
    let page = Arc::new(MemoryPage::new());
    let field = Arc::new(MemoryElement::with_value(content));
    page.insert(&config.preview.field_selector, field.clone());
    page.insert(
        &config.preview.panel_selector,
        Arc::new(FilePanel::new(options.output.clone())),
    );

    if let Some(cookies) = &options.cookies {
        page.set_cookie_string(cookies);
    }
    if let Some(token) = &options.token {
        page.set_cookie(&config.csrf.cookie_name, token);
    }
    (page, field)
}

fn touches(event: &notify::Event, path: &Path) -> bool {
    matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
        && event.paths.iter().any(|p| p.file_name() == path.file_name())
}

/// Build the page and mount the preview (and, if asked, enhancement) on it
pub async fn mount(
    mut config: LecternConfig,
    options: &WatchOptions,
    content: &str,
) -> Result<(WidgetRegistry, Arc<MemoryElement>)> {
    let transport: Arc<dyn RenderTransport> = if options.offline {
        info!("Rendering locally, no server requests");
        config.csrf.required = false;
        Arc::new(LocalRenderTransport::new())
    } else {
        let url = config.endpoint_url(&config.endpoints.preview);
        info!("Rendering through {}", url);
        Arc::new(HttpRenderTransport::new(url))
    };

    let (page, field) = build_page(&config, options, content);

    let mut registry = WidgetRegistry::new();
    registry.register(Box::new(PreviewWidget::new(transport, TypesetterSlot::new())))?;
    if options.enhance {
        let panel = config.preview.panel_selector.clone();
        if !config.enhance.container_selectors.contains(&panel) {
            config.enhance.container_selectors.push(panel);
        }
        registry.register(Box::new(EnhanceWidget::new()))?;
    }

    let page_ready = Readiness::new();
    let context = WidgetContext::new(page, Arc::new(config), page_ready.clone());
    page_ready.set(());
    registry.mount_all(&context).await?;
    Ok((registry, field))
}

pub async fn run(config: LecternConfig, options: WatchOptions) -> Result<()> {
    let content = tokio::fs::read_to_string(&options.input)
        .await
        .with_context(|| format!("Failed to read {}", options.input.display()))?;

    let (mut registry, field) = mount(config, &options, &content).await?;

    // Watch the directory so editors that replace the file are still seen.
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut watcher = notify::recommended_watcher(move |res| {
        let _ = tx.send(res);
    })?;
    let input = std::fs::canonicalize(&options.input)?;
    let directory = input
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    watcher.watch(&directory, RecursiveMode::NonRecursive)?;

    println!("👀 Watching {}", options.input.display());
    println!("📄 Preview: {}", options.output.display());
    println!("\n✨ Press Ctrl+C to stop.\n");

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    error!("Failed to listen for shutdown signal: {}", e);
                }
                info!("Shutdown signal received");
                break;
            }
            event = rx.recv() => {
                match event {
                    Some(Ok(event)) if touches(&event, &input) => {
                        match tokio::fs::read_to_string(&input).await {
                            Ok(content) if content != field.value() => {
                                debug!("{} changed", input.display());
                                field.type_text(&content);
                            }
                            Ok(_) => {}
                            Err(e) => warn!("Failed to read {}: {}", input.display(), e),
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => warn!("Watch error: {}", e),
                    None => break,
                }
            }
        }
    }

    registry.unmount_all().await?;
    println!("✅ Watch stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn options(dir: &Path, enhance: bool) -> WatchOptions {
        WatchOptions {
            input: dir.join("post.md"),
            output: dir.join("post.html"),
            offline: true,
            enhance,
            token: None,
            cookies: None,
        }
    }

    async fn wait_for_output(path: &Path, needle: &str) -> String {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if let Ok(written) = tokio::fs::read_to_string(path).await {
                    if written.contains(needle) {
                        return written;
                    }
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_file_panel_writes_document() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("preview.html");
        let panel = FilePanel::new(output.clone());

        panel.set_inner_html("<h1>Hi</h1>");
        panel.flush().await;

        let written = std::fs::read_to_string(&output).unwrap();
        assert!(written.contains("<div class=\"preview-content\">\n<h1>Hi</h1>\n</div>"));
        assert_eq!(panel.inner_html(), "<h1>Hi</h1>");
    }

    #[tokio::test]
    async fn test_file_panel_keeps_latest_document() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("preview.html");
        let panel = FilePanel::new(output.clone());

        for body in ["<p>one</p>", "<p>two</p>", "<p>three</p>"] {
            panel.set_inner_html(body);
        }
        panel.flush().await;

        let written = std::fs::read_to_string(&output).unwrap();
        assert!(written.contains("<p>three</p>"));
        assert!(!written.contains("<p>one</p>"));
    }

    #[tokio::test]
    async fn test_offline_watch_enhances_preview() {
        let dir = tempfile::tempdir().unwrap();
        let options = options(dir.path(), true);

        let (mut registry, _field) = mount(LecternConfig::default(), &options, "![a](a.png)")
            .await
            .unwrap();

        let written = wait_for_output(&options.output, "max-width: 100%;").await;
        assert!(written.contains(r#"src="a.png""#));
        registry.unmount_all().await.unwrap();
    }

    #[tokio::test]
    async fn test_offline_watch_without_enhance_keeps_markup() {
        let dir = tempfile::tempdir().unwrap();
        let options = options(dir.path(), false);

        let (mut registry, _field) = mount(LecternConfig::default(), &options, "![a](a.png)")
            .await
            .unwrap();

        let written = wait_for_output(&options.output, r#"src="a.png""#).await;
        assert!(!written.contains("max-width"));
        registry.unmount_all().await.unwrap();
    }

    #[tokio::test]
    async fn test_build_page_places_token_and_elements() {
        let config = LecternConfig::default();
        let options = WatchOptions {
            input: PathBuf::from("post.md"),
            output: PathBuf::from("post.html"),
            offline: false,
            enhance: false,
            token: Some("abc".to_string()),
            cookies: Some("sessionid=1; theme=dark".to_string()),
        };

        let (page, field) = build_page(&config, &options, "# Draft");

        use lectern_core::Page;
        assert_eq!(field.value(), "# Draft");
        assert!(page.query(&config.preview.panel_selector).is_some());
        assert_eq!(page.cookie("csrftoken").as_deref(), Some("abc"));
        assert_eq!(page.cookie("theme").as_deref(), Some("dark"));
    }
}
