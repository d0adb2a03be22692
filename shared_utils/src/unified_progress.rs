use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub mod templates {
    pub const BATCH: &str = "{spinner:.green} {prefix:.cyan.bold} ▕{bar:35.green/black}▏ {percent:>3}% • {pos}/{len} • ⏱️ {elapsed_precise} • {msg}";
    pub const PROGRESS_CHARS: &str = "█▓░";
    pub const SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";
}

pub struct UnifiedProgressBar {
    pub bar: ProgressBar,
    is_finished: AtomicBool,
}

impl UnifiedProgressBar {
    pub fn new(total: u64, message: &str) -> Arc<Self> {
        let bar = ProgressBar::new(total);
        match ProgressStyle::default_bar().template(templates::BATCH) {
            Ok(style) => bar.set_style(
                style
                    .progress_chars(templates::PROGRESS_CHARS)
                    .tick_chars(templates::SPINNER_CHARS),
            ),
            Err(e) => tracing::debug!(error = %e, "Falling back to default progress style"),
        }
        bar.set_prefix(message.to_string());
        bar.set_draw_target(ProgressDrawTarget::stderr_with_hz(20));
        Arc::new(Self {
            bar,
            is_finished: AtomicBool::new(false),
        })
    }

    /// A bar that never draws, for JSON output and tests.
    pub fn hidden(total: u64) -> Arc<Self> {
        let bar = ProgressBar::with_draw_target(Some(total), ProgressDrawTarget::hidden());
        Arc::new(Self {
            bar,
            is_finished: AtomicBool::new(false),
        })
    }

    pub fn inc(&self) {
        self.bar.inc(1);
    }
    pub fn set_message(&self, msg: impl Into<String>) {
        self.bar.set_message(msg.into());
    }
    pub fn println(&self, msg: &str) {
        self.bar.suspend(|| eprintln!("{}", msg));
    }

    pub fn finish_with_message(&self, msg: &str) {
        self.is_finished.store(true, Ordering::Relaxed);
        self.bar.finish_with_message(msg.to_string());
    }
}

impl Drop for UnifiedProgressBar {
    fn drop(&mut self) {
        if !self.is_finished.load(Ordering::Relaxed) {
            self.bar.finish_and_clear();
        }
    }
}
