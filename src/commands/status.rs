// ABOUTME: Status command implementation.
// ABOUTME: Lists local and remote tracked changes and the conflicts between them.

use super::context::ProjectContext;
use orgdeploy::deploy::find_conflicts;
use orgdeploy::error::Result;
use orgdeploy::formatter::{SourceStatus, render_status};
use orgdeploy::output::Output;
use orgdeploy::tracking::{ChangeFilter, TrackingLoader};
use std::env;

pub async fn status(target: Option<String>, output: Output) -> Result<()> {
    let cwd = env::current_dir()?;
    let ctx = ProjectContext::load(&cwd, target.as_deref())?;

    output.progress(&format!("Reading source tracking for {}...", ctx.target));
    let tracking = ctx.tracking_loader().load().await?;
    let changes = tracking.changes(ChangeFilter::all()).await?;
    let conflicts = find_conflicts(&changes, None);

    let status = SourceStatus {
        target: ctx.target.clone(),
        changes,
        conflicts,
    };
    output.result(
        &render_status(&status),
        &format!(
            "{} change(s), {} conflict(s)",
            status.changes.len(),
            status.conflicts.len()
        ),
        &status,
        0,
        &[],
    );
    Ok(())
}
