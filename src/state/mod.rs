// Job progress state
//
// ProgressHandle wraps the per-job ProgressState in Arc<Mutex<T>> and emits change events,
// so the monitor task, the scheduler and status queries never touch raw shared fields.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;

use crate::models::status;

/// Mutable progress of one cracking job.
#[derive(Clone, Debug, PartialEq)]
pub struct ProgressState {
    /// Percentage of the monitored step, 0..=100, never decreasing
    pub progress: f64,
    /// Set once by a cancel request, never cleared
    pub cancelled: bool,
    pub completed: bool,
    pub status: String,
    pub key: Option<String>,
}

impl Default for ProgressState {
    fn default() -> Self {
        Self {
            progress: 0.0,
            cancelled: false,
            completed: false,
            status: status::RUNNING.to_string(),
            key: None,
        }
    }
}

/// Change events emitted when a job's progress state is modified
#[derive(Clone, Debug, PartialEq)]
pub enum ProgressChange {
    ProgressUpdated { progress: f64 },
    CancelRequested,
    StatusChanged { status: String },
    KeyFound,
    Completed { status: String },
}

/// Synchronized handle to a [`ProgressState`].
///
/// Every read and write goes through the mutex:
/// - [`read()`](Self::read) / [`snapshot()`](Self::snapshot) for queries
/// - [`update()`](Self::update) for mutations with change detection
/// - [`subscribe()`](Self::subscribe) for listening to changes
///
/// Clones share the same state.
#[derive(Clone, Debug)]
pub struct ProgressHandle {
    state: Arc<Mutex<ProgressState>>,
    changes_tx: broadcast::Sender<ProgressChange>,
}

impl ProgressHandle {
    pub fn new() -> Self {
        let (changes_tx, _) = broadcast::channel(64);
        Self {
            state: Arc::new(Mutex::new(ProgressState::default())),
            changes_tx,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ProgressState> {
        // a panicking writer leaves plain data behind, still readable
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> ProgressState {
        self.lock().clone()
    }

    /// Execute a function with the lock held
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&ProgressState) -> R,
    {
        let state = self.lock();
        f(&state)
    }

    /// Mutate the state under the lock and emit the resulting change events
    pub fn update<F>(&self, update_fn: F) -> Vec<ProgressChange>
    where
        F: FnOnce(&mut ProgressState),
    {
        let mut state = self.lock();
        let old_state = state.clone();

        update_fn(&mut state);

        let changes = detect_changes(&old_state, &state);
        for change in &changes {
            // nobody listening is fine
            let _ = self.changes_tx.send(change.clone());
        }
        changes
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressChange> {
        self.changes_tx.subscribe()
    }

    /// Record a new percentage. Clamped to 0..=100; lower values than the current one are ignored.
    pub fn record_progress(&self, progress: f64) -> Vec<ProgressChange> {
        if !progress.is_finite() {
            return Vec::new();
        }
        self.update(|state| {
            let clamped = progress.clamp(0.0, 100.0);
            if clamped > state.progress {
                state.progress = clamped;
            }
        })
    }

    pub fn request_cancel(&self) -> Vec<ProgressChange> {
        self.update(|state| state.cancelled = true)
    }

    pub fn is_cancelled(&self) -> bool {
        self.read(|state| state.cancelled)
    }

    pub fn is_completed(&self) -> bool {
        self.read(|state| state.completed)
    }

    /// Store the pipeline's final status and recovered key
    pub fn set_result(&self, status: impl Into<String>, key: Option<String>) -> Vec<ProgressChange> {
        let status = status.into();
        self.update(|state| {
            state.status = status;
            state.key = key;
        })
    }
}

impl Default for ProgressHandle {
    fn default() -> Self {
        Self::new()
    }
}

fn detect_changes(old: &ProgressState, new: &ProgressState) -> Vec<ProgressChange> {
    let mut changes = Vec::new();

    if old.progress != new.progress {
        changes.push(ProgressChange::ProgressUpdated {
            progress: new.progress,
        });
    }

    if !old.cancelled && new.cancelled {
        changes.push(ProgressChange::CancelRequested);
    }

    if old.status != new.status {
        changes.push(ProgressChange::StatusChanged {
            status: new.status.clone(),
        });
    }

    if old.key.is_none() && new.key.is_some() {
        changes.push(ProgressChange::KeyFound);
    }

    if !old.completed && new.completed {
        changes.push(ProgressChange::Completed {
            status: new.status.clone(),
        });
    }

    changes
}
