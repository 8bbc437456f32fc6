//! Terminal rendering of operation progress with indicatif.

use indicatif::{ProgressBar, ProgressStyle};
use pdf_toolkit::{Operation, OperationProgress};
use std::sync::Arc;
use std::time::Duration;

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

/// Spinner while the input is validated and parsed, then a page bar for
/// the page-oriented conversions.
pub struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    pub fn new(label: &str) -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(spinner_style);
        bar.set_prefix(label.to_string());
        bar.set_message("Reading PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    fn activate_bar(&self, total: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(style);
        self.bar.set_message("");
        self.bar.reset_eta();
    }

    /// Remove the bar, whatever state the operation ended in.
    pub fn clear(&self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}

impl OperationProgress for CliProgress {
    fn on_operation_start(&self, op: Operation, total_pages: usize) {
        match op {
            Operation::ToExcel | Operation::ToWord if total_pages > 0 => {
                self.activate_bar(total_pages)
            }
            _ => self
                .bar
                .set_message(format!("{total_pages} pages, working…")),
        }
    }

    fn on_batch_start(&self, first: usize, last: usize, _total: usize) {
        self.bar.set_message(format!("pages {first}–{last}"));
    }

    fn on_page_complete(&self, page: usize, _total: usize) {
        self.bar.set_position(page as u64);
    }

    fn on_operation_complete(&self, _op: Operation) {
        self.clear();
    }
}
