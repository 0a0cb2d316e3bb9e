//! Retry scheduler.
//!
//! Drives one capture through its state machine:
//!
//! ```text
//! Idle ─► Attempting{1} ─► Attempting{2} ─► … ─► Attempting{max}
//!              │                 │                    │
//!              └────────┬────────┘                    ▼
//!                       ▼                         Exhausted ─► fallback
//!                   Succeeded
//! ```
//!
//! Attempts run strictly one after another; the wait between them is a timer,
//! not a blocking sleep. Cancelling a session while it waits ends it in
//! `Cancelled`.
//!
//! The pending record is cleared exactly once, on `Succeeded` or `Exhausted`.
//! A cancelled capture leaves it in place; the freshness check in
//! [`Uploader::resume`] discards it later.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::capture::{CaptureFile, CaptureRequest, PendingRecord, PendingStore, now_ms};
use crate::discovery::DeepWalker;
use crate::dom::Dom;
use crate::identifiers::CaptureId;
use crate::inject::{Injection, Injector};
use crate::platform::PlatformKey;
use crate::platform::catalog::CompiledCatalog;

use super::builder::UploaderBuilder;
use super::fallback::{FallbackPresenter, FallbackRequest};
use super::options::UploadOptions;

// ============================================================================
// UploadState
// ============================================================================

/// Where a capture is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum UploadState {
    /// Created, not started.
    Idle,
    /// Waiting for or running attempt `attempt` (1-based).
    Attempting {
        /// Current attempt number.
        attempt: u32,
    },
    /// File delivered.
    Succeeded {
        /// Attempt that succeeded.
        attempt: u32,
        /// How it was delivered.
        injection: Injection,
    },
    /// Every attempt failed; the fallback was offered.
    Exhausted {
        /// Attempts made (zero if the payload never decoded).
        attempts: u32,
    },
    /// Stopped by the embedder.
    Cancelled {
        /// Attempts made before cancellation.
        attempts: u32,
    },
}

impl UploadState {
    /// Returns `true` for `Succeeded`, `Exhausted` and `Cancelled`.
    #[inline]
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Succeeded { .. } | Self::Exhausted { .. } | Self::Cancelled { .. }
        )
    }

    /// Attempts made so far.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        match *self {
            Self::Idle => 0,
            Self::Attempting { attempt } | Self::Succeeded { attempt, .. } => attempt,
            Self::Exhausted { attempts } | Self::Cancelled { attempts } => attempts,
        }
    }
}

// ============================================================================
// CaptureSession
// ============================================================================

/// Stops a running capture at its next wait.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    /// Requests cancellation (e.g. the page is being torn down).
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Returns `true` once cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

/// One capture, from request to terminal state.
///
/// Owned by the caller; replaces any page-global "already running" flag.
pub struct CaptureSession {
    id: CaptureId,
    platform: PlatformKey,
    state: Mutex<UploadState>,
    cancel_tx: Arc<watch::Sender<bool>>,
    pending: PendingRecord,
}

impl CaptureSession {
    fn new(platform: PlatformKey, store: Arc<dyn PendingStore>) -> Self {
        let id = CaptureId::generate();
        let (cancel_tx, _) = watch::channel(false);
        Self {
            id,
            platform,
            state: Mutex::new(UploadState::Idle),
            cancel_tx: Arc::new(cancel_tx),
            pending: PendingRecord::new(id, store),
        }
    }

    /// Session id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> CaptureId {
        self.id
    }

    /// Target platform.
    #[inline]
    #[must_use]
    pub fn platform(&self) -> PlatformKey {
        self.platform
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> UploadState {
        *self.state.lock()
    }

    /// Handle for cancelling this session from elsewhere.
    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            tx: Arc::clone(&self.cancel_tx),
        }
    }

    /// Returns `true` once the pending record was cleared for this capture.
    #[must_use]
    pub fn record_consumed(&self) -> bool {
        self.pending.is_consumed()
    }

    /// Claims the session for a run: `Idle` becomes `Attempting { attempt: 1 }`.
    ///
    /// Returns `false` if the session already ran or is running.
    fn begin(&self) -> bool {
        let mut state = self.state.lock();
        if *state != UploadState::Idle {
            return false;
        }
        *state = UploadState::Attempting { attempt: 1 };
        true
    }

    fn set_state(&self, state: UploadState) {
        *self.state.lock() = state;
    }
}

// ============================================================================
// UploadReport
// ============================================================================

/// Outcome of one capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReport {
    /// Session id.
    pub capture_id: CaptureId,
    /// Target platform.
    pub platform: PlatformKey,
    /// Terminal state.
    pub state: UploadState,
    /// Attempts made.
    pub attempts: u32,
    /// Delivery details on success.
    pub injection: Option<Injection>,
}

impl UploadReport {
    fn from_session(session: &CaptureSession) -> Self {
        let state = session.state();
        Self {
            capture_id: session.id,
            platform: session.platform,
            state,
            attempts: state.attempts(),
            injection: match state {
                UploadState::Succeeded { injection, .. } => Some(injection),
                _ => None,
            },
        }
    }

    /// Returns `true` if the file was delivered.
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.injection.is_some()
    }
}

// ============================================================================
// Uploader
// ============================================================================

/// Discovery, injection and retries for one page.
///
/// Build with [`Uploader::builder`].
pub struct Uploader<D: ?Sized> {
    pub(super) walker: DeepWalker<D>,
    pub(super) catalogs: FxHashMap<PlatformKey, CompiledCatalog>,
    pub(super) store: Arc<dyn PendingStore>,
    pub(super) fallback: Arc<dyn FallbackPresenter>,
    pub(super) options: UploadOptions,
}

/// Mutable per-capture data; only `attempt` changes.
struct AttemptState {
    file: CaptureFile,
    platform: PlatformKey,
    attempt: u32,
}

impl<D: Dom + ?Sized> Uploader<D> {
    /// Creates a builder.
    #[inline]
    #[must_use]
    pub fn builder() -> UploaderBuilder<D> {
        UploaderBuilder::new()
    }

    /// Active options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &UploadOptions {
        &self.options
    }

    /// The page's walker.
    #[inline]
    #[must_use]
    pub fn walker(&self) -> &DeepWalker<D> {
        &self.walker
    }

    /// Creates an idle session, e.g. to grab its cancel handle first.
    #[must_use]
    pub fn start(&self, platform: PlatformKey) -> CaptureSession {
        CaptureSession::new(platform, Arc::clone(&self.store))
    }

    /// Runs a capture to a terminal state.
    pub async fn run(&self, request: CaptureRequest) -> UploadReport {
        let session = self.start(request.platform);
        self.run_session(&session, request).await
    }

    /// Runs a capture on an existing idle session.
    ///
    /// A session runs once. Calling this on a session that is running or
    /// finished returns its current report and touches nothing.
    ///
    /// The request's platform wins over the session's if they differ.
    pub async fn run_session(&self, session: &CaptureSession, request: CaptureRequest) -> UploadReport {
        if !session.begin() {
            warn!(capture_id = %session.id, state = ?session.state(), "Session already started");
            return UploadReport::from_session(session);
        }
        let mut cancel_rx = session.cancel_tx.subscribe();

        let file = match request.decode(&self.options.file_name) {
            Ok(file) => file,
            Err(e) => {
                warn!(capture_id = %session.id, error = %e, "Screenshot payload unusable");
                session.set_state(UploadState::Exhausted { attempts: 0 });
                session.pending.consume("undecodable").await;
                self.present_fallback(session, None, request).await;
                return UploadReport::from_session(session);
            }
        };

        let mut state = AttemptState {
            file,
            platform: request.platform,
            attempt: 1,
        };

        if !wait(&mut cancel_rx, self.options.settle_delay).await {
            return self.cancelled(session, 0);
        }

        let Some(catalog) = self.catalogs.get(&state.platform) else {
            // Every platform is compiled at build time.
            warn!(platform = %state.platform, "No catalog for platform");
            return self.exhaust(session, state, request).await;
        };
        let injector = Injector::new(&self.walker, catalog);

        loop {
            session.set_state(UploadState::Attempting {
                attempt: state.attempt,
            });
            debug!(capture_id = %session.id, attempt = state.attempt, "Upload attempt");

            if let Some(injection) = injector.attempt(&state.file) {
                session.set_state(UploadState::Succeeded {
                    attempt: state.attempt,
                    injection,
                });
                session.pending.consume("injected").await;
                info!(
                    capture_id = %session.id,
                    platform = %state.platform,
                    attempt = state.attempt,
                    method = %injection.method,
                    "Screenshot delivered"
                );
                return UploadReport::from_session(session);
            }

            if state.attempt >= self.options.max_attempts {
                return self.exhaust(session, state, request).await;
            }

            if !wait(&mut cancel_rx, self.options.retry_interval).await {
                return self.cancelled(session, state.attempt);
            }
            state.attempt += 1;
        }
    }

    /// Picks up a pending record left by the extension for `platform`.
    ///
    /// Returns `None` without running when there is no record, or when it
    /// is stale or meant for another platform (in which case it is cleared).
    pub async fn resume(&self, platform: PlatformKey) -> Option<UploadReport> {
        let record = match self.store.load().await {
            Ok(Some(record)) => record,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "Failed to load pending record");
                return None;
            }
        };

        if !record.is_fresh(self.options.max_record_age, now_ms()) || !record.applies_to(platform) {
            debug!(
                platform = %platform,
                selected = %record.platform,
                "Discarding pending record"
            );
            if let Err(e) = self.store.clear().await {
                warn!(error = %e, "Failed to clear pending record");
            }
            return None;
        }

        Some(self.run(CaptureRequest::from_record(&record)).await)
    }

    async fn exhaust(&self, session: &CaptureSession, state: AttemptState, request: CaptureRequest) -> UploadReport {
        session.set_state(UploadState::Exhausted {
            attempts: state.attempt,
        });
        session.pending.consume("exhausted").await;
        info!(
            capture_id = %session.id,
            platform = %state.platform,
            attempts = state.attempt,
            "Upload target not found, offering manual upload"
        );
        self.present_fallback(session, Some(state.file), request).await;
        UploadReport::from_session(session)
    }

    fn cancelled(&self, session: &CaptureSession, attempts: u32) -> UploadReport {
        session.set_state(UploadState::Cancelled { attempts });
        info!(capture_id = %session.id, attempts, "Upload cancelled");
        UploadReport::from_session(session)
    }

    async fn present_fallback(&self, session: &CaptureSession, file: Option<CaptureFile>, request: CaptureRequest) {
        let fallback = FallbackRequest {
            capture_id: session.id,
            file,
            platform: request.platform,
            image_data: request.image_data,
        };
        if let Err(e) = self.fallback.present(fallback).await {
            warn!(capture_id = %session.id, error = %e, "Fallback presenter failed");
        }
    }
}

/// Sleeps for `delay`; returns `false` if cancelled first.
async fn wait(cancel_rx: &mut watch::Receiver<bool>, delay: Duration) -> bool {
    if *cancel_rx.borrow() {
        return false;
    }
    tokio::select! {
        () = tokio::time::sleep(delay) => true,
        Ok(_) = cancel_rx.wait_for(|cancelled| *cancelled) => false,
    }
}

// ============================================================================
// Tests
// ============================================================================
