// ABOUTME: Report command implementation.
// ABOUTME: Checks a deploy by id (or the last one) and prints or writes its reports.

use super::context::ProjectContext;
use crate::cli::ReportArgs;
use orgdeploy::deploy::{DeployCache, DeployResult, ReportOptions, report_status};
use orgdeploy::diagnostics::Warning;
use orgdeploy::error::{Error, Result};
use orgdeploy::formatter::{DeployReport, FormattedResult, render_report, write_reports};
use orgdeploy::output::Output;
use orgdeploy::progress::{ProgressSink, ProgressStyle, Silent, sink_for};
use std::env;
use std::path::Path;
use std::time::Duration;

/// Report on a deploy without changing it.
pub async fn report(args: ReportArgs, mut output: Output) -> Result<()> {
    output.start_timer();
    let cwd = env::current_dir()?;

    let (id, target) = match args.job_id {
        Some(id) => (id, args.target),
        None => {
            let cached = DeployCache::new(&cwd)
                .latest()?
                .ok_or(Error::NoRecentDeploy)?;
            (cached.id, args.target.or(Some(cached.target)))
        }
    };

    let ctx = ProjectContext::load(&cwd, target.as_deref())?;
    let progress = progress_sink(&output);

    output.progress(&format!("Checking deploy {id} on {}...", ctx.target));
    let result = report_status(
        &ctx.transport,
        &id,
        Duration::from_secs(args.wait.saturating_mul(60)),
        ctx.config.poll_interval,
        progress.as_ref(),
    )
    .await?;

    emit_result(&output, result, &args.reporting.into(), ctx.root(), &[])
}

/// Live progress view for normal mode, nothing otherwise.
pub(super) fn progress_sink(output: &Output) -> Box<dyn ProgressSink> {
    if output.shows_progress() {
        sink_for(ProgressStyle::from_env())
    } else {
        Box::new(Silent)
    }
}

/// Write requested reports and print a polled result.
///
/// A result that failed outright is rendered first, then returned as an error
/// so the process exits non-zero.
pub(super) fn emit_result(
    output: &Output,
    result: DeployResult,
    reporting: &ReportOptions,
    base: &Path,
    warnings: &[Warning],
) -> Result<()> {
    let mut report = DeployReport::from_result(&result);
    report.report_files = write_reports(&result, reporting, base)?;

    let failed = result.status.failed_outright();
    output.result(
        &render_report(&report),
        &format!("{} {}", result.id, result.status),
        &FormattedResult::Report(report.clone()),
        i32::from(failed),
        warnings,
    );

    if failed {
        return Err(Error::DeployFailed {
            id: result.id,
            status: result.status,
        });
    }
    Ok(())
}
