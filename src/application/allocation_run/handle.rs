//! Result handle shared by every submission entry point.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::core::run_registry::RunState;
use crate::domain::model::{CompletionState, RunId, RunRecord};
use crate::error::{AllocationError, AllocationResult};

/// Handle to a run in progress or finished.
///
/// Returned synchronously on submission, before execution completes.
/// Allows polling [`status()`](Self::status), blocking on completion via
/// [`result()`](Self::result), and cancelling the run.
pub struct RunHandle {
    run_id: RunId,
    status_rx: watch::Receiver<CompletionState>,
    state: Arc<RunState>,
}

impl RunHandle {
    pub(crate) fn new(
        run_id: RunId,
        status_rx: watch::Receiver<CompletionState>,
        state: Arc<RunState>,
    ) -> Self {
        Self {
            run_id,
            status_rx,
            state,
        }
    }

    /// The run identifier, available immediately without blocking, so a
    /// reference can be persisted before the run finishes.
    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    /// Current completion state (non-blocking).
    pub fn status(&self) -> CompletionState {
        *self.status_rx.borrow()
    }

    /// Block until the run reaches a terminal completion state and return
    /// the merged run record.
    pub async fn result(&self) -> RunRecord {
        let mut rx = self.status_rx.clone();
        loop {
            let status = *rx.borrow();
            if status.is_terminal() {
                return self.state.snapshot();
            }
            if rx.changed().await.is_err() {
                return self.state.snapshot();
            }
        }
    }

    /// Like [`result()`](Self::result), but give up after `timeout`. A
    /// timeout does not cancel the underlying work.
    pub async fn result_timeout(&self, timeout: Duration) -> AllocationResult<RunRecord> {
        tokio::time::timeout(timeout, self.result())
            .await
            .map_err(|_| AllocationError::ResultTimeout)
    }

    /// Mark the run cancelled. Leaves already dispatched run to completion
    /// and their outputs are discarded; no in-flight work is interrupted.
    pub fn cancel(&self) {
        self.state.cancel();
    }
}

impl std::fmt::Debug for RunHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunHandle")
            .field("run_id", &self.run_id)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}
