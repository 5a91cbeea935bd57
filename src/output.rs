// ABOUTME: Output formatting for CLI feedback.
// ABOUTME: Supports normal, quiet (CI), and JSON output modes.

use serde::Serialize;
use std::time::Instant;

use crate::diagnostics::Warning;

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-friendly output with progress messages
    Normal,
    /// Minimal output for CI (only final result)
    Quiet,
    /// A single JSON object on stdout for scripting
    Json,
}

/// Handles CLI output based on the configured mode.
pub struct Output {
    mode: OutputMode,
    start_time: Option<Instant>,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            start_time: None,
        }
    }

    /// Whether live progress views should be drawn.
    pub fn shows_progress(&self) -> bool {
        self.mode == OutputMode::Normal
    }

    /// Start timing an operation.
    pub fn start_timer(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Get elapsed time since timer started.
    pub fn elapsed_secs(&self) -> f64 {
        self.start_time
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    /// Print a progress message (suppressed in quiet/json mode).
    pub fn progress(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            println!("{message}");
        }
    }

    /// Print a warning (suppressed in json mode, where warnings travel in the result).
    pub fn warning(&self, message: &str) {
        if self.mode != OutputMode::Json {
            eprintln!("Warning: {message}");
        }
    }

    /// Print the final result of a command.
    ///
    /// Normal mode prints `human`, quiet mode prints `summary`, and JSON mode
    /// prints `value` wrapped with the exit status and warnings.
    pub fn result<T: Serialize>(
        &self,
        human: &str,
        summary: &str,
        value: &T,
        status: i32,
        warnings: &[Warning],
    ) {
        match self.mode {
            OutputMode::Normal => {
                print!("{human}");
                let elapsed = self.elapsed_secs();
                if elapsed > 0.0 {
                    println!("Elapsed: {elapsed:.1}s");
                }
            }
            OutputMode::Quiet => println!("{summary}"),
            OutputMode::Json => {
                let envelope = JsonEnvelope {
                    status,
                    result: value,
                    warnings,
                };
                if let Ok(json) = serde_json::to_string_pretty(&envelope) {
                    println!("{json}");
                }
            }
        }
    }

    /// Print a success message with optional timing.
    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => {
                let elapsed = self.elapsed_secs();
                if elapsed > 0.0 {
                    println!("{message} ({:.1}s)", elapsed);
                } else {
                    println!("{message}");
                }
            }
            OutputMode::Quiet => {
                println!("{message}");
            }
            OutputMode::Json => {
                let event = JsonEvent {
                    event: "success",
                    message,
                    duration_secs: self.start_time.map(|_| self.elapsed_secs()),
                };
                if let Ok(json) = serde_json::to_string(&event) {
                    println!("{json}");
                }
            }
        }
    }

    /// Print an error message.
    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => {
                eprintln!("Error: {message}");
            }
            OutputMode::Json => {
                let event = JsonEvent {
                    event: "error",
                    message,
                    duration_secs: self.start_time.map(|_| self.elapsed_secs()),
                };
                if let Ok(json) = serde_json::to_string(&event) {
                    eprintln!("{json}");
                }
            }
        }
    }
}

#[derive(Serialize)]
struct JsonEnvelope<'a, T> {
    status: i32,
    result: &'a T,
    #[serde(skip_serializing_if = "no_warnings")]
    warnings: &'a [Warning],
}

fn no_warnings(warnings: &&[Warning]) -> bool {
    warnings.is_empty()
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    event: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
}
