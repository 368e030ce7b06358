//! Spinner and phase-timing helpers for the command line.
//!
//! In log-only mode spinners are hidden and each phase is reported through
//! `tracing` instead, which keeps output tail-friendly.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::info;

/// Global flag for log-only mode (set from args in main)
pub static LOG_ONLY: AtomicBool = AtomicBool::new(false);

pub fn set_log_only(value: bool) {
    LOG_ONLY.store(value, Ordering::Relaxed);
}

pub fn is_log_only() -> bool {
    LOG_ONLY.load(Ordering::Relaxed)
}

/// Format duration in human-readable format
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 1.0 {
        format!("{}ms", d.as_millis())
    } else if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.1}m", secs / 60.0)
    }
}

/// Create a spinner for indeterminate progress.
/// In log-only mode, the spinner is hidden.
pub fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if is_log_only() {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    } else {
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{msg} {spinner} [{elapsed_precise}]")
                .unwrap(),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
    }
    pb.set_message(msg.to_string());
    pb
}

/// A named pipeline phase: a spinner while it runs, one log line when done.
pub struct Phase {
    name: &'static str,
    started: Instant,
    spinner: ProgressBar,
}

impl Phase {
    pub fn start(name: &'static str) -> Self {
        Self {
            name,
            started: Instant::now(),
            spinner: create_spinner(name),
        }
    }

    pub fn finish(self, detail: &str) -> Duration {
        let elapsed = self.started.elapsed();
        self.spinner
            .finish_with_message(format!("{}: {} ({})", self.name, detail, format_duration(elapsed)));
        if is_log_only() {
            info!(phase = self.name, elapsed = %format_duration(elapsed), "{}", detail);
        }
        elapsed
    }
}
