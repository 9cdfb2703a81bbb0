//! Dispatch machinery shared by the three workflows.
//!
//! One contract for every backend call: validate synchronously, move to
//! pending, run the exchange on a worker thread, and reconcile exactly one
//! completion back into the workflow's state. Completions are tagged with a
//! sequence number so a late response from a superseded dispatch is dropped
//! instead of overwriting newer state.

use std::sync::mpsc::Sender;
use std::thread;

use crate::api::ApiError;

/// Lifecycle of one workflow's current operation.
///
/// Within a single dispatch the status is monotonic
/// (idle → pending → success/error); the next dispatch resets it to pending
/// and clears the previous payload so stale results never render under a
/// fresh pending state.
#[derive(Debug, Default)]
pub enum OperationState<T> {
    #[default]
    Idle,
    Pending {
        seq: u64,
    },
    Success(T),
    Error(String),
}

impl<T> OperationState<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, OperationState::Pending { .. })
    }

    pub fn payload(&self) -> Option<&T> {
        match self {
            OperationState::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            OperationState::Error(message) => Some(message),
            _ => None,
        }
    }

    /// Apply a completion if it belongs to the in-flight dispatch.
    ///
    /// Returns false and leaves the state untouched when the completion is
    /// stale: its sequence number is not the pending one, or the workflow
    /// already left the pending state.
    pub fn apply(&mut self, seq: u64, outcome: Result<T, String>) -> bool {
        match self {
            OperationState::Pending { seq: current } if *current == seq => {
                *self = match outcome {
                    Ok(value) => OperationState::Success(value),
                    Err(message) => OperationState::Error(message),
                };
                true
            }
            _ => false,
        }
    }
}

/// Issues sequence numbers and runs the validate → dispatch → reconcile
/// contract for one workflow. Each workflow owns its own controller; no
/// state is shared across workflows.
#[derive(Debug, Default)]
pub struct Controller {
    next_seq: u64,
}

impl Controller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one dispatch attempt.
    ///
    /// `validate` runs synchronously before any network activity; a failure
    /// lands in `Error` with the validation message and nothing is
    /// dispatched. On success the state moves to `Pending` and `work` runs
    /// on a worker thread that posts exactly one completion event, whichever
    /// branch it takes, so no outcome sequence can leave the workflow
    /// pending forever. A call while the workflow is already pending is
    /// ignored. Returns whether a dispatch actually started.
    pub fn run<T, R, E, V, W, F>(
        &mut self,
        state: &mut OperationState<T>,
        tx: &Sender<E>,
        validate: V,
        work: W,
        wrap: F,
    ) -> bool
    where
        T: Send + 'static,
        R: Send + 'static,
        E: Send + 'static,
        V: FnOnce() -> Result<R, String>,
        W: FnOnce(R) -> Result<T, ApiError> + Send + 'static,
        F: FnOnce(u64, Result<T, ApiError>) -> E + Send + 'static,
    {
        if state.is_pending() {
            return false;
        }

        let request = match validate() {
            Ok(request) => request,
            Err(message) => {
                *state = OperationState::Error(message);
                return false;
            }
        };

        self.next_seq += 1;
        let seq = self.next_seq;
        *state = OperationState::Pending { seq };

        let tx = tx.clone();
        thread::spawn(move || {
            // The receiver is gone only during shutdown; nothing to do then.
            let _ = tx.send(wrap(seq, work(request)));
        });
        true
    }
}
