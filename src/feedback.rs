use crate::controller::LinkController;
use dashmap::DashMap;
use std::{hash::Hash, sync::Arc, time::Duration};
use tokio::time::Instant;

// ── Transient flags ────────────────────────────────────────────────────────

/// Per-key boolean flags that switch themselves off after `lifetime`.
///
/// Each key carries its own deadline; marking a key again replaces its
/// deadline rather than stacking a second flag. Expiry is read against
/// tokio's clock, so nothing has to be cancelled when a flag lapses.
#[derive(Clone, Debug)]
pub struct TransientFlags<K: Eq + Hash> {
    inner: Arc<DashMap<K, Instant>>,
    lifetime: Duration,
}

impl<K: Eq + Hash> TransientFlags<K> {
    pub fn new(lifetime: Duration) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            lifetime,
        }
    }

    pub fn mark(&self, key: K) {
        self.inner.insert(key, Instant::now() + self.lifetime);
    }

    pub fn is_active(&self, key: &K) -> bool {
        let deadline = self.inner.get(key).map(|d| *d);
        match deadline {
            Some(deadline) if Instant::now() < deadline => true,
            Some(_) => {
                self.inner.remove(key);
                false
            }
            None => false,
        }
    }
}

// ── Copy feedback ──────────────────────────────────────────────────────────

/// Destination for copied links.
pub trait Clipboard {
    fn write_text(&self, text: &str) -> std::io::Result<()>;
}

/// "Copied!" indicator keyed by short id.
#[derive(Clone, Debug)]
pub struct CopyFeedback {
    flags: TransientFlags<String>,
}

impl CopyFeedback {
    pub fn new(lifetime: Duration) -> Self {
        Self {
            flags: TransientFlags::new(lifetime),
        }
    }

    pub fn mark_copied(&self, short_id: &str) {
        self.flags.mark(short_id.to_owned());
    }

    pub fn is_copied(&self, short_id: &str) -> bool {
        self.flags.is_active(&short_id.to_owned())
    }

    /// Write the link's public URL to `clipboard`, then flag it as copied.
    /// Nothing is flagged if the clipboard write fails.
    pub fn copy_link(
        &self,
        controller: &LinkController,
        short_id: &str,
        clipboard: &dyn Clipboard,
    ) -> bool {
        let url = controller.public_url(short_id);
        match clipboard.write_text(&url) {
            Ok(()) => {
                self.mark_copied(short_id);
                true
            }
            Err(e) => {
                tracing::warn!("Failed to copy {}: {}", url, e);
                false
            }
        }
    }
}

// ── Delete confirmation ────────────────────────────────────────────────────

/// Two-step delete: `request` captures the target, `confirm` deletes exactly
/// that target. Whatever is selected or hovered at confirm time is irrelevant.
#[derive(Debug, Default)]
pub struct DeleteConfirmation {
    pending: Option<String>,
}

impl DeleteConfirmation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the confirmation for `short_id`, replacing any earlier request.
    pub fn request(&mut self, short_id: &str) {
        self.pending = Some(short_id.to_owned());
    }

    pub fn is_open(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending(&self) -> Option<&str> {
        self.pending.as_deref()
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    /// Delete the captured target. Pending state is cleared whatever the
    /// outcome. Returns `None` when no delete was requested.
    pub async fn confirm(&mut self, controller: &LinkController) -> Option<bool> {
        let short_id = self.pending.take()?;
        Some(controller.delete_link(&short_id).await)
    }
}
