//! Pending screenshot record.
//!
//! The surrounding extension stores the latest capture under three keys
//! (`screenshot`, `timestamp`, `selectedAI`) until a chat page picks it up.
//! The engine's only obligation towards it is to clear it exactly once per
//! capture; [`PendingRecord`] enforces that.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::identifiers::CaptureId;
use crate::platform::PlatformKey;

// ============================================================================
// ScreenshotRecord
// ============================================================================

/// A capture waiting to be delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenshotRecord {
    /// Image payload as a `data:` URL.
    #[serde(rename = "screenshot")]
    pub image_data: String,

    /// Capture time, milliseconds since the Unix epoch.
    #[serde(rename = "timestamp")]
    pub captured_at_ms: u64,

    /// Platform the user picked.
    #[serde(rename = "selectedAI")]
    pub platform: PlatformKey,
}

impl ScreenshotRecord {
    /// Creates a record stamped with the current time.
    #[must_use]
    pub fn new(image_data: impl Into<String>, platform: PlatformKey) -> Self {
        Self {
            image_data: image_data.into(),
            captured_at_ms: now_ms(),
            platform,
        }
    }

    /// Age at `now` (zero for clock skew into the future).
    #[must_use]
    pub fn age(&self, now: u64) -> Duration {
        Duration::from_millis(now.saturating_sub(self.captured_at_ms))
    }

    /// Returns `true` if the record is younger than `max_age` at `now`.
    #[must_use]
    pub fn is_fresh(&self, max_age: Duration, now: u64) -> bool {
        self.age(now) < max_age
    }

    /// Returns `true` if the record was captured for `platform`.
    #[inline]
    #[must_use]
    pub fn applies_to(&self, platform: PlatformKey) -> bool {
        self.platform == platform
    }
}

/// Current wall-clock time in milliseconds since the Unix epoch.
#[must_use]
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| {
            u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
        })
}

// ============================================================================
// PendingStore
// ============================================================================

/// Storage holding at most one pending record.
#[async_trait]
pub trait PendingStore: Send + Sync {
    /// Reads the pending record, if any.
    async fn load(&self) -> Result<Option<ScreenshotRecord>>;

    /// Replaces the pending record.
    async fn save(&self, record: ScreenshotRecord) -> Result<()>;

    /// Removes the pending record.
    async fn clear(&self) -> Result<()>;
}

/// In-process [`PendingStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    record: Mutex<Option<ScreenshotRecord>>,
    clears: AtomicUsize,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store already holding `record`.
    #[must_use]
    pub fn with_record(record: ScreenshotRecord) -> Self {
        Self {
            record: Mutex::new(Some(record)),
            clears: AtomicUsize::new(0),
        }
    }

    /// How many times [`PendingStore::clear`] was called.
    #[must_use]
    pub fn clear_count(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }

    /// Current record without going through the async API.
    #[must_use]
    pub fn peek(&self) -> Option<ScreenshotRecord> {
        self.record.lock().clone()
    }
}

#[async_trait]
impl PendingStore for MemoryStore {
    async fn load(&self) -> Result<Option<ScreenshotRecord>> {
        Ok(self.record.lock().clone())
    }

    async fn save(&self, record: ScreenshotRecord) -> Result<()> {
        *self.record.lock() = Some(record);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.clears.fetch_add(1, Ordering::SeqCst);
        self.record.lock().take();
        Ok(())
    }
}

// ============================================================================
// PendingRecord
// ============================================================================

/// Consume-once handle on the pending record of one capture.
pub struct PendingRecord {
    capture_id: CaptureId,
    store: Arc<dyn PendingStore>,
    consumed: AtomicBool,
}

impl PendingRecord {
    /// Creates a handle for `capture_id`.
    #[must_use]
    pub fn new(capture_id: CaptureId, store: Arc<dyn PendingStore>) -> Self {
        Self {
            capture_id,
            store,
            consumed: AtomicBool::new(false),
        }
    }

    /// Clears the record unless already done; returns `true` the first time.
    ///
    /// A store failure is logged and still counts as consumed.
    pub async fn consume(&self, reason: &'static str) -> bool {
        if self.consumed.swap(true, Ordering::SeqCst) {
            return false;
        }

        match self.store.clear().await {
            Ok(()) => debug!(capture_id = %self.capture_id, reason, "Pending record cleared"),
            Err(e) => warn!(capture_id = %self.capture_id, reason, error = %e, "Failed to clear pending record"),
        }
        true
    }

    /// Returns `true` once [`consume`](Self::consume) has run.
    #[must_use]
    pub fn is_consumed(&self) -> bool {
        self.consumed.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Tests
// ============================================================================
