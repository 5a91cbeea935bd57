// ABOUTME: Plain-text tables for the normal output mode.
// ABOUTME: Column widths are computed from the rows being printed.

use crate::deploy::AsyncDeployHandle;
use crate::tracking::ChangeOrigin;

use super::{DeployReport, FileRow, SourceStatus};

fn table(title: &str, headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let headers: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    let rule: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();

    let mut out = format!("\n{title}\n");
    for row in [&headers, &rule].into_iter().chain(rows) {
        out.push_str(&line(row));
        out.push('\n');
    }
    out
}

fn file_rows(files: &[FileRow]) -> Vec<Vec<String>> {
    files
        .iter()
        .map(|f| {
            vec![
                f.state.clone(),
                f.full_name.clone(),
                f.component_type.clone(),
                f.file_path.clone(),
            ]
        })
        .collect()
}

/// Human summary of a polled deploy.
pub fn render_report(report: &DeployReport) -> String {
    let verb = if report.check_only { "Validate" } else { "Deploy" };
    let mut out = format!("{verb} ID: {}\nStatus: {}\n", report.id, report.status);
    out.push_str(&format!(
        "Components: {}/{} ({} errors)\n",
        report.number_components_deployed,
        report.number_components_total,
        report.number_component_errors
    ));
    if report.number_tests_total > 0 {
        out.push_str(&format!(
            "Tests: {}/{} ({} errors)\n",
            report.number_tests_completed, report.number_tests_total, report.number_test_errors
        ));
    }
    if let Some(message) = &report.error_message {
        out.push_str(&format!("Error: {message}\n"));
    }

    if !report.files.is_empty() {
        out.push_str(&table(
            "Deployed Source",
            &["State", "Name", "Type", "Path"],
            &file_rows(&report.files),
        ));
    }

    if !report.failures.is_empty() {
        let rows: Vec<Vec<String>> = report
            .failures
            .iter()
            .map(|f| {
                let location = match (f.line, f.column) {
                    (Some(line), Some(col)) => format!("{line}:{col}"),
                    (Some(line), None) => line.to_string(),
                    _ => String::new(),
                };
                vec![
                    f.component_type.clone(),
                    f.full_name.clone(),
                    f.problem.clone().unwrap_or_default(),
                    location,
                ]
            })
            .collect();
        out.push_str(&table(
            "Component Failures",
            &["Type", "Name", "Problem", "Line:Column"],
            &rows,
        ));
    }

    if !report.test_failures.is_empty() {
        let rows: Vec<Vec<String>> = report
            .test_failures
            .iter()
            .map(|t| {
                vec![
                    format!("{}.{}", t.name, t.method_name),
                    t.message.clone(),
                    t.stack_trace.clone().unwrap_or_default(),
                ]
            })
            .collect();
        out.push_str(&table("Test Failures", &["Test", "Message", "Stack Trace"], &rows));
    }

    if let Some(tests) = &report.tests {
        out.push_str(&format!(
            "\nTest Results Summary\nPassing: {}\nFailing: {}\nTotal: {}\nTime: {:.0}ms\n",
            tests.passing, tests.failing, tests.tests_ran, tests.total_time_ms
        ));
    }

    if !report.coverage.is_empty() {
        let rows: Vec<Vec<String>> = report
            .coverage
            .iter()
            .map(|c| {
                let lines: Vec<String> = c.uncovered_lines.iter().map(u32::to_string).collect();
                vec![c.name.clone(), format!("{:.0}%", c.percent), lines.join(",")]
            })
            .collect();
        out.push_str(&table(
            "Apex Code Coverage",
            &["Name", "% Covered", "Uncovered Lines"],
            &rows,
        ));
    }

    for path in &report.report_files {
        out.push_str(&format!("Report written: {}\n", path.display()));
    }
    out
}

/// Human message for an asynchronous submission.
pub fn render_handle(handle: &AsyncDeployHandle) -> String {
    format!(
        "Deploy ID: {}\nDeploy submitted. Run `orgdeploy report --job-id {}` to check its status.\n",
        handle.id, handle.id
    )
}

/// Human listing of tracked changes and conflicts.
pub fn render_status(status: &SourceStatus) -> String {
    if status.changes.is_empty() {
        return format!("No changes since the last deploy to {}.\n", status.target);
    }

    let conflicted: std::collections::HashSet<_> =
        status.conflicts.iter().map(|c| &c.key).collect();
    let rows: Vec<Vec<String>> = status
        .changes
        .iter()
        .map(|c| {
            let origin = match c.origin {
                ChangeOrigin::Local => "Local",
                ChangeOrigin::Remote => "Remote",
            };
            let state = format!("{:?}", c.kind);
            vec![
                origin.to_string(),
                if conflicted.contains(&c.key) {
                    format!("{state} (Conflict)")
                } else {
                    state
                },
                c.key.full_name.clone(),
                c.key.type_name.clone(),
                c.path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default(),
            ]
        })
        .collect();

    let mut out = table(
        &format!("Source Status ({})", status.target),
        &["Origin", "State", "Name", "Type", "Path"],
        &rows,
    );
    if !status.conflicts.is_empty() {
        out.push_str(&format!(
            "\n{} conflict(s). Deploy with --force-overwrite to replace the org's version.\n",
            status.conflicts.len()
        ));
    }
    out
}
