// ABOUTME: Deploy command implementation.
// ABOUTME: Validates flags, drives the deploy state machine, and prints the outcome.

use super::context::ProjectContext;
use super::report::{emit_result, progress_sink};
use crate::cli::DeployArgs;
use orgdeploy::deploy::{
    AsyncDeployHandle, Collaborators, DeployCache, DeployError, DeployFlags, DeployOutcome,
    DeployRequest, run_deploy,
};
use orgdeploy::diagnostics::Diagnostics;
use orgdeploy::error::Result;
use orgdeploy::formatter::{FormattedResult, render_handle};
use orgdeploy::output::Output;
use std::env;

/// Deploy source to the selected target org.
pub async fn deploy(args: DeployArgs, mut output: Output) -> Result<()> {
    output.start_timer();
    let target = args.target.clone();
    let request = DeployRequest::from_flags(DeployFlags::from(args)).map_err(DeployError::from)?;

    let cwd = env::current_dir()?;
    let ctx = ProjectContext::load(&cwd, target.as_deref())?;
    let loader = ctx.tracking_loader();
    let progress = progress_sink(&output);
    let reporting = request.reporting.clone();
    let recorder = DeployCache::new(ctx.root()).recorder(ctx.target.as_str());
    let mut diag = Diagnostics::default();

    output.progress(&format!("Deploying to {}...", ctx.target));

    let collab = Collaborators {
        resolver: &ctx.resolver,
        transport: &ctx.transport,
        tracking: &loader,
        hooks: &ctx.hooks,
        progress: progress.as_ref(),
        recorder: &recorder,
    };
    let outcome = run_deploy(request, &ctx.settings(), &collab, &mut diag).await?;

    for warning in diag.warnings() {
        output.warning(&warning.message);
    }

    match outcome {
        DeployOutcome::Async(handle) => {
            output.result(
                &render_handle(&handle),
                handle.id.as_str(),
                &FormattedResult::Handle(handle.clone()),
                0,
                diag.warnings(),
            );
            Ok(())
        }
        DeployOutcome::Pending { id, last: None } => {
            let handle = AsyncDeployHandle { id };
            output.result(
                &render_handle(&handle),
                handle.id.as_str(),
                &FormattedResult::Handle(handle.clone()),
                0,
                diag.warnings(),
            );
            Ok(())
        }
        DeployOutcome::Pending {
            last: Some(result), ..
        }
        | DeployOutcome::Completed(result) => {
            emit_result(&output, result, &reporting, ctx.root(), diag.warnings())
        }
    }
}
