// ABOUTME: Shapes deploy results for humans and JSON, and writes coverage/JUnit reports.
// ABOUTME: Formatting never mutates the result it is given.

mod coverage;
mod human;
mod junit;

pub use coverage::render_coverage;
pub use human::{render_handle, render_report, render_status};
pub use junit::render_junit;

use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

use crate::deploy::{AsyncDeployHandle, Conflict, DeployResult, DeployStatus, ReportOptions};
use crate::tracking::TrackedChange;
use crate::types::DeployId;

/// Default parent directory for written reports.
pub const DEFAULT_RESULTS_DIR: &str = "deploy-results";

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("failed to write report {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to encode report: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Coverage report formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CoverageFormat {
    Json,
    Lcovonly,
    TextSummary,
    Cobertura,
}

impl CoverageFormat {
    /// File name inside the `coverage` directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            CoverageFormat::Json => "coverage.json",
            CoverageFormat::Lcovonly => "lcov.info",
            CoverageFormat::TextSummary => "text-summary.txt",
            CoverageFormat::Cobertura => "cobertura.xml",
        }
    }
}

impl FromStr for CoverageFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(CoverageFormat::Json),
            "lcovonly" | "lcov" => Ok(CoverageFormat::Lcovonly),
            "text-summary" => Ok(CoverageFormat::TextSummary),
            "cobertura" => Ok(CoverageFormat::Cobertura),
            _ => Err(format!(
                "unknown coverage format '{s}' (expected json, lcovonly, text-summary, or cobertura)"
            )),
        }
    }
}

impl fmt::Display for CoverageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CoverageFormat::Json => "json",
            CoverageFormat::Lcovonly => "lcovonly",
            CoverageFormat::TextSummary => "text-summary",
            CoverageFormat::Cobertura => "cobertura",
        };
        write!(f, "{name}")
    }
}

/// Machine form of a command result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FormattedResult {
    Handle(AsyncDeployHandle),
    Report(DeployReport),
}

/// Tracked changes for one target, with the components changed on both sides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceStatus {
    pub target: String,
    pub changes: Vec<TrackedChange>,
    pub conflicts: Vec<Conflict>,
}

/// One deployed or failed file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRow {
    pub state: String,
    pub full_name: String,
    #[serde(rename = "type")]
    pub component_type: String,
    pub file_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub problem: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSummary {
    pub tests_ran: u32,
    pub passing: u32,
    pub failing: u32,
    pub total_time_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestFailureRow {
    pub name: String,
    pub method_name: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageRow {
    pub name: String,
    pub percent: f64,
    pub uncovered_lines: Vec<u32>,
}

/// Display-ready view of a deploy result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployReport {
    pub id: DeployId,
    pub status: DeployStatus,
    pub success: bool,
    pub done: bool,
    pub check_only: bool,
    pub number_components_deployed: u32,
    pub number_components_total: u32,
    pub number_component_errors: u32,
    pub number_tests_completed: u32,
    pub number_tests_total: u32,
    pub number_test_errors: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub files: Vec<FileRow>,
    pub failures: Vec<FileRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tests: Option<TestSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub test_failures: Vec<TestFailureRow>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub coverage: Vec<CoverageRow>,
    /// Report files written for this result.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub report_files: Vec<PathBuf>,
}

fn component_state(outcome: &crate::deploy::ComponentOutcome) -> &'static str {
    if !outcome.success {
        "Failed"
    } else if outcome.deleted {
        "Deleted"
    } else if outcome.created {
        "Created"
    } else if outcome.changed {
        "Changed"
    } else {
        "Unchanged"
    }
}

fn file_row(outcome: &crate::deploy::ComponentOutcome) -> FileRow {
    FileRow {
        state: component_state(outcome).to_string(),
        full_name: outcome.full_name.clone(),
        component_type: outcome.component_type.clone(),
        file_path: outcome.file_name.clone(),
        problem: outcome.problem.clone(),
        line: outcome.line_number,
        column: outcome.column_number,
    }
}

impl DeployReport {
    /// Build the display view of a result.
    pub fn from_result(result: &DeployResult) -> Self {
        let details = &result.details;
        // The manifest itself is reported as a component with an empty type.
        let files = details
            .component_successes
            .iter()
            .filter(|c| !c.component_type.is_empty())
            .map(file_row)
            .collect();
        let failures = details.component_failures.iter().map(file_row).collect();

        let run = details.run_test_result.as_ref();
        let tests = run.map(|r| TestSummary {
            tests_ran: r.num_tests_run,
            passing: r.num_tests_run.saturating_sub(r.num_failures),
            failing: r.num_failures,
            total_time_ms: r.total_time,
        });
        let test_failures = run
            .map(|r| {
                r.failures
                    .iter()
                    .map(|f| TestFailureRow {
                        name: f.name.clone(),
                        method_name: f.method_name.clone(),
                        message: f.message.clone(),
                        stack_trace: f.stack_trace.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        let coverage = run
            .map(|r| {
                r.code_coverage
                    .iter()
                    .map(|c| CoverageRow {
                        name: c.name.clone(),
                        percent: c.percent(),
                        uncovered_lines: c.locations_not_covered.iter().map(|l| l.line).collect(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            id: result.id.clone(),
            status: result.status,
            success: result.success,
            done: result.done,
            check_only: result.check_only,
            number_components_deployed: result.number_components_deployed,
            number_components_total: result.number_components_total,
            number_component_errors: result.number_component_errors,
            number_tests_completed: result.number_tests_completed,
            number_tests_total: result.number_tests_total,
            number_test_errors: result.number_test_errors,
            error_message: result.error_message.clone(),
            files,
            failures,
            tests,
            test_failures,
            coverage,
            report_files: Vec::new(),
        }
    }
}

/// Directory reports for `id` are written to.
pub fn resolve_output_dir(results_dir: Option<&Path>, id: &DeployId) -> PathBuf {
    results_dir
        .unwrap_or(Path::new(DEFAULT_RESULTS_DIR))
        .join(id.as_str())
}

/// Write requested coverage and JUnit reports for a terminal result.
///
/// Relative output directories resolve against `base`. Returns the files written.
pub fn write_reports(
    result: &DeployResult,
    options: &ReportOptions,
    base: &Path,
) -> Result<Vec<PathBuf>, FormatError> {
    let Some(run) = result.details.run_test_result.as_ref() else {
        return Ok(Vec::new());
    };
    if !result.is_terminal() || !options.wants_reports() {
        return Ok(Vec::new());
    }

    let dir = base.join(resolve_output_dir(options.results_dir.as_deref(), &result.id));
    let mut written = Vec::new();

    for format in &options.coverage_formatters {
        let path = dir.join("coverage").join(format.file_name());
        write_file(&path, &render_coverage(*format, run)?)?;
        written.push(path);
    }
    if options.junit {
        let path = dir.join("junit").join("junit.xml");
        write_file(&path, &render_junit(result, run))?;
        written.push(path);
    }

    tracing::debug!(files = written.len(), dir = %dir.display(), "wrote deploy reports");
    Ok(written)
}

fn write_file(path: &Path, content: &str) -> Result<(), FormatError> {
    let io_err = |source| FormatError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    fs::write(path, content).map_err(io_err)
}

/// Escape text for XML attributes and content.
pub(crate) fn xml_escape(value: &str) -> String {
    crate::components::manifest_escape(value)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::deploy::{
        CodeCoverage, CodeLocation, ComponentOutcome, DeployDetails, DeployResult, DeployStatus,
        RunTestResult, TestFailure, TestSuccess,
    };
    use crate::types::DeployId;

    pub fn tested_result() -> DeployResult {
        let mut result = DeployResult::queued(DeployId::new("0Af000000000001").unwrap());
        result.status = DeployStatus::Failed;
        result.done = true;
        result.number_components_total = 2;
        result.number_components_deployed = 2;
        result.number_tests_total = 2;
        result.number_tests_completed = 1;
        result.number_test_errors = 1;
        result.details = DeployDetails {
            component_successes: vec![
                ComponentOutcome {
                    component_type: "ApexClass".to_string(),
                    full_name: "Foo".to_string(),
                    file_name: "classes/Foo.cls".to_string(),
                    success: true,
                    changed: true,
                    ..ComponentOutcome::default()
                },
                ComponentOutcome {
                    full_name: "package.xml".to_string(),
                    file_name: "package.xml".to_string(),
                    success: true,
                    ..ComponentOutcome::default()
                },
            ],
            component_failures: vec![],
            run_test_result: Some(RunTestResult {
                num_tests_run: 2,
                num_failures: 1,
                total_time: 120.0,
                successes: vec![TestSuccess {
                    name: "FooTest".to_string(),
                    method_name: "passes".to_string(),
                    time: 50.0,
                }],
                failures: vec![TestFailure {
                    name: "FooTest".to_string(),
                    method_name: "fails".to_string(),
                    message: "Assertion <failed>".to_string(),
                    stack_trace: Some("Class.FooTest.fails: line 9".to_string()),
                    time: 70.0,
                }],
                code_coverage: vec![CodeCoverage {
                    name: "Foo".to_string(),
                    num_locations: 4,
                    num_locations_not_covered: 1,
                    locations_not_covered: vec![CodeLocation { line: 7 }],
                }],
            }),
        };
        result
    }
}
