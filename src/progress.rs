// ABOUTME: Progress views fed by deploy status polls.
// ABOUTME: Bar mode re-renders on every update; status mode prints only when counts change.

use parking_lot::Mutex;
use std::io::Write;

use crate::deploy::{DeployResult, ProgressCounts};

/// Environment toggle that switches from the bar to the status-line view.
pub const PROGRESS_BAR_ENV: &str = "ORGDEPLOY_USE_PROGRESS_BAR";

const BAR_WIDTH: usize = 30;

/// Observer of deploy status updates.
pub trait ProgressSink: Send + Sync {
    fn update(&self, result: &DeployResult);

    fn finish(&self, result: &DeployResult);
}

/// Discards all updates. Used in quiet and JSON modes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Silent;

impl ProgressSink for Silent {
    fn update(&self, _result: &DeployResult) {}

    fn finish(&self, _result: &DeployResult) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStyle {
    Bar,
    StatusLine,
}

impl ProgressStyle {
    /// Bar unless the environment toggle is set to a false value.
    pub fn from_env() -> Self {
        match std::env::var(PROGRESS_BAR_ENV) {
            Ok(value) if matches!(value.trim().to_ascii_lowercase().as_str(), "false" | "0" | "no") => {
                ProgressStyle::StatusLine
            }
            _ => ProgressStyle::Bar,
        }
    }
}

/// Build the sink for a style, writing to stderr.
pub fn sink_for(style: ProgressStyle) -> Box<dyn ProgressSink> {
    match style {
        ProgressStyle::Bar => Box::new(BarProgress::new(std::io::stderr())),
        ProgressStyle::StatusLine => Box::new(StatusProgress::new(std::io::stderr())),
    }
}

fn bar(done: u32, total: u32) -> String {
    let filled = if total == 0 {
        0
    } else {
        (done.min(total) as usize * BAR_WIDTH) / total as usize
    };
    format!("[{}{}]", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled))
}

fn status_line(counts: &ProgressCounts) -> String {
    let mut line = format!(
        "Status: {} | Components: {}/{}",
        counts.status, counts.components_deployed, counts.components_total
    );
    if counts.component_errors > 0 {
        line.push_str(&format!(" ({} errors)", counts.component_errors));
    }
    if counts.tests_total > 0 {
        line.push_str(&format!(
            " | Tests: {}/{}",
            counts.tests_completed, counts.tests_total
        ));
        if counts.test_errors > 0 {
            line.push_str(&format!(" ({} errors)", counts.test_errors));
        }
    }
    line
}

/// Redraws a progress bar on every update.
pub struct BarProgress<W> {
    out: Mutex<W>,
}

impl<W: Write + Send> BarProgress<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    fn render(&self, result: &DeployResult, terminator: &str) {
        let counts = result.counts();
        let mut line = format!(
            "{} {}",
            bar(counts.components_deployed + counts.component_errors, counts.components_total),
            status_line(&counts)
        );
        if counts.tests_total > 0 {
            line.push_str(&format!(
                " {}",
                bar(counts.tests_completed + counts.test_errors, counts.tests_total)
            ));
        }
        let mut out = self.out.lock();
        let _ = write!(out, "\r{line}{terminator}");
        let _ = out.flush();
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

impl<W: Write + Send> ProgressSink for BarProgress<W> {
    fn update(&self, result: &DeployResult) {
        self.render(result, "");
    }

    fn finish(&self, result: &DeployResult) {
        self.render(result, "\n");
    }
}

/// Prints a status line only when the counts differ from the last one printed.
pub struct StatusProgress<W> {
    inner: Mutex<StatusInner<W>>,
}

struct StatusInner<W> {
    out: W,
    last: Option<ProgressCounts>,
}

impl<W: Write + Send> StatusProgress<W> {
    pub fn new(out: W) -> Self {
        Self {
            inner: Mutex::new(StatusInner { out, last: None }),
        }
    }

    pub fn into_inner(self) -> W {
        self.inner.into_inner().out
    }
}

impl<W: Write + Send> ProgressSink for StatusProgress<W> {
    fn update(&self, result: &DeployResult) {
        let counts = result.counts();
        let mut inner = self.inner.lock();
        if inner.last == Some(counts) {
            return;
        }
        inner.last = Some(counts);
        let _ = writeln!(inner.out, "{}", status_line(&counts));
    }

    fn finish(&self, result: &DeployResult) {
        self.update(result);
    }
}
