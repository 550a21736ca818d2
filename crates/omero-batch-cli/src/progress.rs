use indicatif::{ProgressBar, ProgressStyle};
use omero_batch_core::ProgressMonitor;
use std::time::Duration;

/// Spinner showing the image being processed and the current step.
///
/// The prefix carries the batch position (`File 2/5, image 1/1`), the
/// message the step (`Saving ROIs...`).
pub struct CliMonitor {
    bar: ProgressBar,
}

impl CliMonitor {
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold} {msg}") {
            bar.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
        }
        bar.enable_steady_tick(Duration::from_millis(80));
        Self { bar }
    }
}

impl ProgressMonitor for CliMonitor {
    fn set_state(&self, text: &str) {
        self.bar.set_message(text.to_string());
    }

    fn set_progress(&self, text: &str) {
        self.bar.set_prefix(text.to_string());
    }

    fn set_done(&self) {
        self.bar.finish_and_clear();
        eprintln!("  \x1b[32m✓\x1b[0m Batch finished");
    }
}
