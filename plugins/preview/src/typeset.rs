//! Typesetting passes over freshly rendered preview content

use async_trait::async_trait;
use lectern_core::{Element, Readiness, Result, TypesetConfig};
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// External engine rendering math notation inside an element
#[async_trait]
pub trait Typesetter: Send + Sync {
    async fn typeset(&self, target: &dyn Element) -> Result<()>;
}

/// Shared slot the engine loader resolves once the engine is usable
pub type TypesetterSlot = Readiness<Arc<dyn Typesetter>>;

/// What a typesetting run ended up doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypesetReport {
    /// The engine never became available
    Unavailable,
    /// A newer render took over before all passes ran
    Cancelled { passes: usize },
    Completed { passes: usize },
}

/// Waits for the engine, then runs one pass immediately and the follow-up
/// passes at their configured offsets. Late layout shifts inside the engine
/// are caught by the follow-ups.
#[derive(Clone)]
pub struct TypesetScheduler {
    engine: TypesetterSlot,
    config: TypesetConfig,
}

impl TypesetScheduler {
    pub fn new(engine: TypesetterSlot, config: TypesetConfig) -> Self {
        Self { engine, config }
    }

    /// The slot this scheduler reads the engine from
    pub fn engine(&self) -> &TypesetterSlot {
        &self.engine
    }

    pub async fn run(&self, target: Arc<dyn Element>, cancel: CancellationToken) -> TypesetReport {
        let engine = tokio::select! {
            _ = cancel.cancelled() => return TypesetReport::Cancelled { passes: 0 },
            engine = self.engine.wait_bounded(self.config.max_attempts, self.config.retry_interval()) => engine,
        };

        let Some(engine) = engine else {
            tracing::debug!(
                attempts = self.config.max_attempts,
                "typesetting engine unavailable, skipping"
            );
            return TypesetReport::Unavailable;
        };

        let started = Instant::now();
        let mut passes = 0;
        self.pass(engine.as_ref(), target.as_ref()).await;
        passes += 1;

        for delay in self.config.follow_up_delays() {
            tokio::select! {
                _ = cancel.cancelled() => return TypesetReport::Cancelled { passes },
                _ = tokio::time::sleep_until(started + delay) => {}
            }
            self.pass(engine.as_ref(), target.as_ref()).await;
            passes += 1;
        }

        TypesetReport::Completed { passes }
    }

    async fn pass(&self, engine: &dyn Typesetter, target: &dyn Element) {
        if let Err(e) = engine.typeset(target).await {
            tracing::warn!("Typesetting pass failed: {}", e);
        }
    }
}
