//! Terminal progress bar for install progress.

use indicatif::{ProgressBar, ProgressStyle};
use managed_sdk_core::{MessageListener, ProgressSink};
use std::sync::Arc;

/// [`ProgressSink`] drawing an indicatif bar.
pub struct BarSink {
    bar: ProgressBar,
}

impl BarSink {
    pub fn new() -> anyhow::Result<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("  {spinner:.green} [{bar:40.cyan/blue}] {percent:>3}% | {wide_msg}")?
                .progress_chars("█▓░"),
        );
        Ok(Self { bar })
    }

    /// Prints each line above the bar.
    pub fn line_printer(&self) -> Arc<dyn MessageListener> {
        let bar = self.bar.clone();
        Arc::new(move |line: &str| bar.println(format!("    {}", line)))
    }
}

impl ProgressSink for BarSink {
    fn on_start(&self, label: &str, total_units: u64) {
        self.bar.set_length(total_units);
        self.bar.set_position(0);
        self.bar.set_message(label.to_string());
    }

    fn on_advance(&self, units: u64) {
        self.bar.inc(units);
    }

    fn on_message(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    fn on_done(&self) {
        self.bar.finish_with_message("Done");
    }
}
