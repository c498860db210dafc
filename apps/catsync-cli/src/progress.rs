//! Terminal progress rendering for entry reconciliation.
//!
//! Implements the reconciler's `Reporter` seam with indicatif bars, one per
//! phase. Zero-length phases print a short confirmation instead of a bar.

use std::sync::Mutex;
use std::time::Duration;

use catsync_reconcile::Reporter;
use indicatif::{ProgressBar, ProgressStyle};

const BAR_TEMPLATE: &str = "{spinner:.green} {msg} [{bar:40.cyan/blue}] {pos}/{len}";

fn phase_bar(total: usize, message: &str) -> ProgressBar {
    let bar = ProgressBar::new(total as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template(BAR_TEMPLATE)
            .expect("progress bar template must parse")
            .progress_chars("█▓▒░"),
    );
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

/// Progress reporter rendering one bar per reconciliation phase.
#[derive(Default)]
pub struct TerminalReporter {
    delete: Mutex<Option<ProgressBar>>,
    create: Mutex<Option<ProgressBar>>,
    update: Mutex<Option<ProgressBar>>,
}

impl TerminalReporter {
    pub fn new() -> Self {
        Self::default()
    }

    fn start(slot: &Mutex<Option<ProgressBar>>, total: usize, label: &str, empty: &str) {
        if total == 0 {
            println!("      ✔ {empty}");
            return;
        }
        println!("      ✔ {label} ({total} entries)");
        let mut slot = slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = Some(phase_bar(total, "        "));
    }

    fn tick(slot: &Mutex<Option<ProgressBar>>) {
        let slot = slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(bar) = slot.as_ref() {
            bar.inc(1);
            if bar.position() >= bar.length().unwrap_or(0) {
                bar.finish_and_clear();
            }
        }
    }
}

impl Reporter for TerminalReporter {
    fn on_delete_start(&self, total: usize) {
        Self::start(
            &self.delete,
            total,
            "Deleting entries no longer in source...",
            "No entries to delete",
        );
    }

    fn on_delete_progress(&self) {
        Self::tick(&self.delete);
    }

    fn on_create_start(&self, total: usize) {
        Self::start(
            &self.create,
            total,
            "Creating new entries in catalog...",
            "No new entries to create",
        );
    }

    fn on_create_progress(&self) {
        Self::tick(&self.create);
    }

    fn on_update_start(&self, total: usize) {
        Self::start(
            &self.update,
            total,
            "Updating existing entries in catalog...",
            "No existing entries to update",
        );
    }

    fn on_update_progress(&self) {
        Self::tick(&self.update);
    }
}
