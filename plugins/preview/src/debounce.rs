//! Debounced render triggering for live preview

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Configuration for render trigger debouncing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerConfig {
    /// Debounce delay in milliseconds
    pub debounce_delay_ms: u64,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            debounce_delay_ms: 450,
        }
    }
}

impl TriggerConfig {
    fn delay(&self) -> Duration {
        Duration::from_millis(self.debounce_delay_ms)
    }
}

/// State for debounced rendering
#[derive(Debug, Default)]
struct DebounceState {
    last_trigger_time: Option<Instant>,
    pending_content: Option<String>,
}

/// Keeps the latest content of a burst of changes and releases it once
/// the quiet period has elapsed.
#[derive(Debug)]
pub struct Debouncer {
    config: TriggerConfig,
    state: DebounceState,
}

impl Debouncer {
    /// Create a new debouncer
    pub fn new(config: TriggerConfig) -> Self {
        Self {
            config,
            state: DebounceState::default(),
        }
    }

    /// Create with default configuration
    pub fn with_defaults() -> Self {
        Self::new(TriggerConfig::default())
    }

    /// Update configuration
    pub fn update_config(&mut self, config: TriggerConfig) {
        self.config = config;
    }

    /// Record a change. The quiet period restarts and earlier pending
    /// content is dropped. Returns `true` when this change opened a new burst.
    pub fn record(&mut self, content: String, now: Instant) -> bool {
        let new_burst = self.state.pending_content.is_none();
        self.state.pending_content = Some(content);
        self.state.last_trigger_time = Some(now);
        new_burst
    }

    /// When the pending content becomes due, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.state.pending_content.as_ref()?;
        self.state
            .last_trigger_time
            .map(|last| last + self.config.delay())
    }

    /// Release the pending content if the quiet period has elapsed
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        let deadline = self.deadline()?;
        if now >= deadline {
            self.state.last_trigger_time = None;
            return self.state.pending_content.take();
        }
        None
    }

    /// Release the pending content immediately
    pub fn flush(&mut self) -> Option<String> {
        self.state.last_trigger_time = None;
        self.state.pending_content.take()
    }

    /// Drop any pending content
    pub fn clear(&mut self) {
        self.state = DebounceState::default();
    }

    pub fn has_pending(&self) -> bool {
        self.state.pending_content.is_some()
    }
}

enum TriggerCommand {
    Change(String),
    Flush,
}

/// Runs a [`Debouncer`] on the tokio runtime and calls `on_fire` with the
/// last content of every burst.
pub struct DebouncedTrigger {
    tx: mpsc::UnboundedSender<TriggerCommand>,
    task: JoinHandle<()>,
}

impl DebouncedTrigger {
    /// Start the trigger loop
    pub fn spawn<F>(config: TriggerConfig, on_fire: F) -> Self
    where
        F: Fn(String) + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(async move {
            let mut debouncer = Debouncer::new(config);
            loop {
                let command = match debouncer.deadline() {
                    Some(deadline) => tokio::select! {
                        command = rx.recv() => command,
                        _ = tokio::time::sleep_until(deadline) => {
                            if let Some(content) = debouncer.poll(Instant::now()) {
                                tracing::trace!("debounce window elapsed");
                                on_fire(content);
                            }
                            continue;
                        }
                    },
                    None => rx.recv().await,
                };

                match command {
                    Some(TriggerCommand::Change(content)) => {
                        debouncer.record(content, Instant::now());
                    }
                    Some(TriggerCommand::Flush) => {
                        if let Some(content) = debouncer.flush() {
                            on_fire(content);
                        }
                    }
                    None => break,
                }
            }
            tracing::debug!("render trigger stopped");
        });

        Self { tx, task }
    }

    /// Report a content change. Returns `false` once the trigger has stopped.
    pub fn notify(&self, content: String) -> bool {
        self.tx.send(TriggerCommand::Change(content)).is_ok()
    }

    /// Fire pending content without waiting for the quiet period
    pub fn flush(&self) -> bool {
        self.tx.send(TriggerCommand::Flush).is_ok()
    }

    /// Stop the loop, discarding pending content
    pub async fn shutdown(self) {
        drop(self.tx);
        let _ = self.task.await;
    }
}
