//! Per-widget upload state

use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadState {
    Idle,
    Uploading { filename: String },
}

/// Allows one upload at a time. Cloned handles share the same state.
#[derive(Debug, Clone)]
pub struct UploadSlot {
    state: Arc<Mutex<UploadState>>,
}

impl UploadSlot {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(UploadState::Idle)),
        }
    }

    /// Claim the slot for `filename`. Returns `None` while another upload runs.
    pub fn try_begin(&self, filename: &str) -> Option<UploadGuard> {
        let mut state = self.lock();
        if let UploadState::Uploading { filename: current } = &*state {
            tracing::debug!("Upload of {} already in progress, ignoring {}", current, filename);
            return None;
        }
        *state = UploadState::Uploading {
            filename: filename.to_string(),
        };
        Some(UploadGuard { slot: self.clone() })
    }

    pub fn state(&self) -> UploadState {
        self.lock().clone()
    }

    pub fn is_uploading(&self) -> bool {
        matches!(*self.lock(), UploadState::Uploading { .. })
    }

    fn lock(&self) -> MutexGuard<'_, UploadState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for UploadSlot {
    fn default() -> Self {
        Self::new()
    }
}

/// Releases the slot when dropped, whichever way the upload ended
#[derive(Debug)]
pub struct UploadGuard {
    slot: UploadSlot,
}

impl Drop for UploadGuard {
    fn drop(&mut self) {
        *self.slot.lock() = UploadState::Idle;
    }
}
