//! Progress reporting seam.
//!
//! The engine never talks to a terminal directly: it emits lifecycle
//! callbacks through [`Reporter`] and the caller decides how to render
//! them. [`NullReporter`] stands in where no reporting is wanted;
//! [`RecordingReporter`] lets tests assert phase totals.

use std::sync::Mutex;

/// Lifecycle callbacks emitted by the entry reconciler. All methods default
/// to no-ops so implementors only override what they render.
pub trait Reporter: Send + Sync {
    fn on_delete_start(&self, _total: usize) {}
    fn on_delete_progress(&self) {}
    fn on_create_start(&self, _total: usize) {}
    fn on_create_progress(&self) {}
    fn on_update_start(&self, _total: usize) {}
    fn on_update_progress(&self) {}
}

/// Reporter that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {}

/// One observed progress event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressEvent {
    DeleteStart(usize),
    DeleteProgress,
    CreateStart(usize),
    CreateProgress,
    UpdateStart(usize),
    UpdateProgress,
}

/// Reporter that records every event, for tests.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.lock().clone()
    }

    /// The `*Start` totals, in emission order.
    pub fn phase_totals(&self) -> Vec<ProgressEvent> {
        self.lock()
            .iter()
            .filter(|event| {
                matches!(
                    event,
                    ProgressEvent::DeleteStart(_)
                        | ProgressEvent::CreateStart(_)
                        | ProgressEvent::UpdateStart(_)
                )
            })
            .copied()
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ProgressEvent>> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, event: ProgressEvent) {
        self.lock().push(event);
    }
}

impl Reporter for RecordingReporter {
    fn on_delete_start(&self, total: usize) {
        self.record(ProgressEvent::DeleteStart(total));
    }

    fn on_delete_progress(&self) {
        self.record(ProgressEvent::DeleteProgress);
    }

    fn on_create_start(&self, total: usize) {
        self.record(ProgressEvent::CreateStart(total));
    }

    fn on_create_progress(&self) {
        self.record(ProgressEvent::CreateProgress);
    }

    fn on_update_start(&self, total: usize) {
        self.record(ProgressEvent::UpdateStart(total));
    }

    fn on_update_progress(&self) {
        self.record(ProgressEvent::UpdateProgress);
    }
}
