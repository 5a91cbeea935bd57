// ABOUTME: Diagnostics accumulator for non-fatal warnings during a command.
// ABOUTME: Collects warnings that shouldn't fail a deploy but should be shown to users.

use serde::Serialize;
use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::types::DeployId;

/// Collects non-fatal warnings during deploy operations.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!("{}", warning.message);
        self.warnings.push(warning);
    }

    /// Get all collected warnings.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Check if any warnings were collected.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// A non-fatal warning collected during a deploy.
#[derive(Debug, Clone, Serialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    /// Local deletions that this deploy will not apply.
    pub fn pending_deletions(paths: &BTreeSet<PathBuf>) -> Self {
        let listed: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
        Self {
            kind: WarningKind::PendingDeletions,
            message: format!(
                "{} locally deleted file(s) are not part of this deploy and will not be deleted in the org: {}",
                paths.len(),
                listed.join(", ")
            ),
        }
    }

    /// Coverage or JUnit output requested for a deploy that was not awaited.
    pub fn reports_skipped(id: &DeployId) -> Self {
        Self {
            kind: WarningKind::ReportsSkipped,
            message: format!(
                "coverage and JUnit reports are not written for asynchronous deploys; run `orgdeploy report --job-id {id}` once it completes"
            ),
        }
    }

    /// The deploy was accepted but its id could not be saved for `report`.
    pub fn not_recorded(id: &DeployId, reason: &dyn std::fmt::Display) -> Self {
        Self {
            kind: WarningKind::NotRecorded,
            message: format!(
                "deploy {id} was submitted but could not be saved as the latest deploy ({reason}); pass --job-id {id} to `orgdeploy report`"
            ),
        }
    }

    /// Wait elapsed before the deploy finished.
    pub fn poll_timeout(id: &DeployId) -> Self {
        Self {
            kind: WarningKind::PollTimeout,
            message: format!(
                "deploy {id} is still running; run `orgdeploy report --job-id {id}` to check on it"
            ),
        }
    }
}

/// Categories of warnings that can occur during a deploy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Locally deleted components outside the deploy.
    PendingDeletions,
    /// Reports requested but the deploy ran asynchronously.
    ReportsSkipped,
    /// Polling stopped before a terminal status.
    PollTimeout,
    /// The submitted id was not written to the deploy cache.
    NotRecorded,
}
