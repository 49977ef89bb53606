use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tracing::debug;

use crate::progress::ProgressListener;

/// Terminal listener: a spinner carrying the latest tool output line.
///
/// With `echo` every line is also printed above the spinner.
pub struct ConsoleListener {
    spinner: ProgressBar,
    echo: bool,
}

impl ConsoleListener {
    pub fn new(echo: bool) -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("  {spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );
        spinner.enable_steady_tick(Duration::from_millis(120));
        Self { spinner, echo }
    }
}

impl ProgressListener for ConsoleListener {
    fn on_progress(&self, line: &str) {
        debug!(target: "muxkit::tool", "{}", line);
        if self.echo && !line.is_empty() {
            self.spinner.println(format!("  {}", line));
        }
        if !line.trim().is_empty() {
            self.spinner.set_message(line.trim().to_string());
        }
    }

    fn on_complete(&self, message: &str) {
        self.spinner.finish_and_clear();
        println!("✓ {}", message);
    }

    fn on_error(&self, message: &str) {
        self.spinner.finish_and_clear();
        eprintln!("✗ {}", message);
    }

    fn clear_log(&self) {
        self.spinner.set_message("");
    }
}
