//! Progress reporting bound to the lifetime of an operation.
//!
//! [`with_progress`] owns the future it reports on and ticks only while
//! polling it, so the indicator stops exactly when the operation resolves
//! and the operation's result is handed back untouched.

use std::future::Future;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use colored::Colorize;
use tokio::time::MissedTickBehavior;

/// Receiver of start/tick/end events.
pub trait ProgressSink: Send + Sync {
    fn start(&self, label: &str, total: Option<usize>);
    fn tick(&self, label: &str);
    fn finish(&self, label: &str, ok: bool);
}

/// Discards all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn start(&self, _label: &str, _total: Option<usize>) {}
    fn tick(&self, _label: &str) {}
    fn finish(&self, _label: &str, _ok: bool) {}
}

const SPINNER: [char; 4] = ['|', '/', '-', '\\'];

/// Single-line spinner on stderr.
#[derive(Debug, Default)]
pub struct TerminalProgress {
    steps: AtomicUsize,
    total: AtomicUsize,
}

impl TerminalProgress {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressSink for TerminalProgress {
    fn start(&self, label: &str, total: Option<usize>) {
        self.steps.store(0, Ordering::Relaxed);
        self.total.store(total.unwrap_or(0), Ordering::Relaxed);
        eprint!("\r{} {label}", SPINNER[0]);
    }

    fn tick(&self, label: &str) {
        let step = self.steps.fetch_add(1, Ordering::Relaxed) + 1;
        let total = self.total.load(Ordering::Relaxed);
        let frame = SPINNER[step % SPINNER.len()];

        if total > 0 {
            eprint!("\r{frame} {label} {step}/{total}");
        } else {
            eprint!("\r{frame} {label} {step} steps");
        }
        let _ = std::io::stderr().flush();
    }

    fn finish(&self, label: &str, ok: bool) {
        let mark = if ok { "✓".green().bold() } else { "✗".red().bold() };
        eprintln!("\r{mark} {label}");
    }
}

/// Runs `operation` while ticking `sink` every `period`.
///
/// `finish` is called once, with whether the operation returned `Ok`, before
/// its result is returned.
pub async fn with_progress<F, T, E>(
    sink: &dyn ProgressSink,
    label: &str,
    period: Duration,
    operation: F,
) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
{
    sink.start(label, None);

    let mut ticker = tokio::time::interval(period.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick of an interval completes immediately.
    ticker.tick().await;

    tokio::pin!(operation);

    let outcome = loop {
        tokio::select! {
            biased;
            outcome = &mut operation => break outcome,
            _ = ticker.tick() => sink.tick(label),
        }
    };

    sink.finish(label, outcome.is_ok());
    outcome
}

#[cfg(test)]
pub use counting::CountingProgress;

#[cfg(test)]
mod counting {
    use std::sync::Mutex;

    use super::ProgressSink;

    /// Records events for assertions.
    #[derive(Debug, Default)]
    pub struct CountingProgress {
        pub started: Mutex<usize>,
        pub ticks: Mutex<usize>,
        pub finished: Mutex<Option<bool>>,
    }

    impl CountingProgress {
        pub fn ticks(&self) -> usize {
            *self.ticks.lock().unwrap()
        }

        pub fn finished(&self) -> Option<bool> {
            *self.finished.lock().unwrap()
        }
    }

    impl ProgressSink for CountingProgress {
        fn start(&self, _label: &str, _total: Option<usize>) {
            *self.started.lock().unwrap() += 1;
        }

        fn tick(&self, _label: &str) {
            *self.ticks.lock().unwrap() += 1;
        }

        fn finish(&self, _label: &str, ok: bool) {
            *self.finished.lock().unwrap() = Some(ok);
        }
    }
}
