//! Console progress for a running scan

use std::sync::Mutex;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use crate::scan::{Phase, PhaseOutcome, ScanObserver};

/// Prints scan progress to stderr.
///
/// On a terminal each phase gets a progress bar; otherwise every reading is
/// printed as a `Spider progress %: N` line.
pub struct ConsoleObserver {
    bar: Mutex<Option<ProgressBar>>,
}

impl ConsoleObserver {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn new_bar(phase: Phase) -> Option<ProgressBar> {
        let bar = ProgressBar::new(100);
        if bar.is_hidden() {
            return None;
        }
        let style = ProgressStyle::with_template("{prefix:>7} [{bar:40.cyan/blue}] {pos:>3}%")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        bar.set_style(style);
        bar.set_prefix(phase.to_string());
        Some(bar)
    }
}

impl Default for ConsoleObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanObserver for ConsoleObserver {
    fn target_accessed(&self, target: &str) {
        eprintln!("Accessing target {}", target);
    }

    fn phase_started(&self, phase: Phase, target: &str) {
        match phase {
            Phase::Spider => eprintln!("Spidering target {}", target),
            Phase::ActiveScan => eprintln!("Scanning target {}", target),
        }
        if let Ok(mut slot) = self.bar.lock() {
            *slot = Self::new_bar(phase);
        }
    }

    fn progress(&self, phase: Phase, percent: u8) {
        let slot = self.bar.lock().ok();
        match slot.as_ref().and_then(|s| s.as_ref()) {
            Some(bar) => bar.set_position(u64::from(percent)),
            None => eprintln!("{} progress %: {}", phase, percent),
        }
    }

    fn phase_finished(&self, phase: Phase, outcome: PhaseOutcome) {
        if let Ok(mut slot) = self.bar.lock() {
            if let Some(bar) = slot.take() {
                bar.finish_and_clear();
            }
        }
        match outcome {
            PhaseOutcome::Completed => eprintln!("{} {}", phase, "completed".green()),
            PhaseOutcome::TimedOut { progress } => {
                eprintln!("{} {} at {}%", phase, "timed out".yellow(), progress)
            }
            PhaseOutcome::Skipped => {}
        }
    }
}
