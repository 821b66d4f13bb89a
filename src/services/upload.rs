use std::collections::HashSet;
use std::sync::{
    atomic::{AtomicU8, Ordering},
    Arc,
};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::{
    error::{AppError, Result},
    models::QuotaExceededContext,
    services::naming::resolve_unique_name,
};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;
const PROGRESS_STEP: u8 = 10;
const PROGRESS_HOLD: u8 = 90;

/// Where the single in-flight upload currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum UploadPhase {
    Idle,
    Admitting,
    Rejected,
    Optimistic,
    Confirming,
    Failed,
}

/// The one upload allowed past admission at a time.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingUpload {
    pub file_name: String,
    pub size_mb: f64,
    pub resolved_name: String,
}

/// Gate in front of the upload path: checks the candidate against the
/// available quota, resolves a collision-free name, and tracks the
/// admission state machine
/// `Idle -> Admitting -> (Rejected | Optimistic) -> Confirming -> (Idle | Failed)`.
pub struct UploadAdmissionController {
    phase: UploadPhase,
    pending: Option<PendingUpload>,
    progress: Arc<AtomicU8>,
}

impl Default for UploadAdmissionController {
    fn default() -> Self {
        UploadAdmissionController {
            phase: UploadPhase::Idle,
            pending: None,
            progress: Arc::new(AtomicU8::new(0)),
        }
    }
}

impl UploadAdmissionController {
    pub fn phase(&self) -> UploadPhase {
        self.phase
    }

    pub fn pending(&self) -> Option<&PendingUpload> {
        self.pending.as_ref()
    }

    pub fn progress(&self) -> u8 {
        self.progress.load(Ordering::Relaxed)
    }

    pub fn is_uploading(&self) -> bool {
        matches!(self.phase, UploadPhase::Optimistic | UploadPhase::Confirming)
    }

    /// Admission rule: a file fits iff its size does not exceed the space
    /// left. The boundary case (size == available) admits; zero-byte files
    /// admit. A second upload while one is in flight is refused outright,
    /// attempts are serialized through the Idle gate.
    pub fn admit(
        &mut self,
        file_name: &str,
        size_bytes: u64,
        available_mb: f64,
        existing_names: &HashSet<String>,
    ) -> Result<PendingUpload> {
        if self.is_uploading() {
            return Err(AppError::UploadInProgress);
        }
        self.phase = UploadPhase::Admitting;

        let size_mb = size_bytes as f64 / BYTES_PER_MB;
        if size_mb > available_mb {
            self.phase = UploadPhase::Rejected;
            self.pending = None;
            return Err(AppError::QuotaExceeded(QuotaExceededContext {
                file_name: file_name.to_string(),
                file_size_mb: size_mb,
                available_mb,
            }));
        }

        // The snapshot of names taken here can miss a concurrent upload's
        // placeholder; the next reconciliation converges to the server's
        // view. Known limitation, not hidden.
        let resolved_name = resolve_unique_name(file_name, existing_names);
        let pending = PendingUpload {
            file_name: file_name.to_string(),
            size_mb,
            resolved_name,
        };

        self.phase = UploadPhase::Optimistic;
        self.pending = Some(pending.clone());
        self.progress.store(0, Ordering::Relaxed);
        Ok(pending)
    }

    /// Starts the cosmetic progress ticker: +10 per tick, held at 90 until
    /// the remote call returns. Carries no correctness weight. The returned
    /// token stops the task; it is also cancelled when the ticker parks at
    /// the hold value.
    pub fn start_progress_ticker<F>(&self, tick: Duration, publish: F) -> CancellationToken
    where
        F: Fn(u8) + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let progress = Arc::clone(&self.progress);

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        let current = progress.load(Ordering::Relaxed);
                        if current >= PROGRESS_HOLD {
                            break;
                        }
                        let next = (current + PROGRESS_STEP).min(PROGRESS_HOLD);
                        progress.store(next, Ordering::Relaxed);
                        publish(next);
                    }
                }
            }
        });

        cancel
    }

    pub fn begin_confirming(&mut self) {
        self.phase = UploadPhase::Confirming;
        self.progress.store(100, Ordering::Relaxed);
    }

    /// Confirmed and reconciled; back to the Idle gate.
    pub fn finish(&mut self) {
        self.phase = UploadPhase::Idle;
        self.pending = None;
        self.progress.store(0, Ordering::Relaxed);
    }

    /// The remote call failed; the optimistic record has been rolled back
    /// by the caller's reconciliation.
    pub fn fail(&mut self) {
        self.phase = UploadPhase::Failed;
        self.pending = None;
        self.progress.store(0, Ordering::Relaxed);
    }

    /// Clears a `Rejected` admission once the exceeded-quota dialog closes
    /// or a refresh shows enough space.
    pub fn clear_rejection(&mut self) {
        if self.phase == UploadPhase::Rejected {
            self.phase = UploadPhase::Idle;
        }
    }
}
