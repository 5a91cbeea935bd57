// ABOUTME: Deploy request built once from command flags.
// ABOUTME: Resolves the single input mode and validates flag combinations up front.

use nonempty::NonEmpty;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::components::SourceSelection;
use crate::formatter::CoverageFormat;
use crate::types::{DeployId, MetadataName};

/// Invalid or contradictory flags. Raised before any work is performed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error(
        "exactly one of --manifest, --metadata, --source-path, or --validated-deploy-request-id is required"
    )]
    NoInputMode,

    #[error("only one input mode may be used, got {}", .0.join(", "))]
    ConflictingInputModes(Vec<&'static str>),

    #[error("--run-tests requires --test-level RunSpecifiedTests")]
    TestsWithoutRunSpecified,

    #[error("--test-level RunSpecifiedTests requires at least one test in --run-tests")]
    RunSpecifiedWithoutTests,

    #[error("--force-overwrite requires --track-source")]
    ForceOverwriteWithoutTracking,

    #[error("--track-source cannot be used with {0}")]
    TrackingIncompatible(&'static str),

    #[error("--validated-deploy-request-id cannot be used with {0}")]
    ReplayIncompatible(&'static str),

    #[error("destructive changes require --manifest")]
    DestructiveRequiresManifest,

    #[error("--purge-on-delete requires --pre-destructive-changes or --post-destructive-changes")]
    PurgeWithoutDestructive,
}

/// Which tests run as part of the deploy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TestLevel {
    NoTestRun,
    RunSpecifiedTests,
    RunLocalTests,
    RunAllTestsInOrg,
}

impl FromStr for TestLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "notestrun" => Ok(TestLevel::NoTestRun),
            "runspecifiedtests" => Ok(TestLevel::RunSpecifiedTests),
            "runlocaltests" => Ok(TestLevel::RunLocalTests),
            "runalltestsinorg" => Ok(TestLevel::RunAllTestsInOrg),
            _ => Err(format!(
                "unknown test level '{s}' (expected NoTestRun, RunSpecifiedTests, RunLocalTests, or RunAllTestsInOrg)"
            )),
        }
    }
}

/// Submission protocol. Orthogonal to every other option.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ApiProtocol {
    #[default]
    Rest,
    Soap,
}

impl FromStr for ApiProtocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rest" => Ok(ApiProtocol::Rest),
            "soap" => Ok(ApiProtocol::Soap),
            _ => Err(format!("unknown API protocol '{s}' (expected rest or soap)")),
        }
    }
}

impl fmt::Display for ApiProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiProtocol::Rest => write!(f, "rest"),
            ApiProtocol::Soap => write!(f, "soap"),
        }
    }
}

/// The four mutually exclusive ways to say what gets deployed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMode {
    Manifest(PathBuf),
    Metadata(NonEmpty<MetadataName>),
    SourcePaths(NonEmpty<PathBuf>),
    ValidatedReplay(DeployId),
}

impl InputMode {
    /// Pick the single active mode. Zero or several active modes is an error.
    pub fn resolve(
        manifest: Option<PathBuf>,
        metadata: Vec<MetadataName>,
        source_paths: Vec<PathBuf>,
        validated_id: Option<DeployId>,
    ) -> Result<Self, ConfigurationError> {
        let mut active = Vec::new();
        if manifest.is_some() {
            active.push("--manifest");
        }
        if !metadata.is_empty() {
            active.push("--metadata");
        }
        if !source_paths.is_empty() {
            active.push("--source-path");
        }
        if validated_id.is_some() {
            active.push("--validated-deploy-request-id");
        }

        if active.len() > 1 {
            return Err(ConfigurationError::ConflictingInputModes(active));
        }

        if let Some(path) = manifest {
            return Ok(InputMode::Manifest(path));
        }
        if let Some(names) = NonEmpty::from_vec(metadata) {
            return Ok(InputMode::Metadata(names));
        }
        if let Some(paths) = NonEmpty::from_vec(source_paths) {
            return Ok(InputMode::SourcePaths(paths));
        }
        validated_id
            .map(InputMode::ValidatedReplay)
            .ok_or(ConfigurationError::NoInputMode)
    }

    /// The component selection, or `None` for a validated replay.
    pub fn selection(&self) -> Option<SourceSelection> {
        match self {
            InputMode::Manifest(path) => Some(SourceSelection::Manifest(path.clone())),
            InputMode::Metadata(names) => Some(SourceSelection::Metadata(names.clone())),
            InputMode::SourcePaths(paths) => Some(SourceSelection::SourcePaths(paths.clone())),
            InputMode::ValidatedReplay(_) => None,
        }
    }

    pub fn is_replay(&self) -> bool {
        matches!(self, InputMode::ValidatedReplay(_))
    }
}

/// Options sent along with the deploy submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployOptions {
    pub check_only: bool,
    pub rollback_on_error: bool,
    pub ignore_warnings: bool,
    pub purge_on_delete: bool,
    pub single_package: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_level: Option<TestLevel>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub run_tests: Vec<String>,
    #[serde(skip)]
    pub protocol: ApiProtocol,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self {
            check_only: false,
            rollback_on_error: true,
            ignore_warnings: false,
            purge_on_delete: false,
            single_package: true,
            test_level: None,
            run_tests: Vec::new(),
            protocol: ApiProtocol::Rest,
        }
    }
}

/// Coverage and JUnit output requested for a completed deploy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportOptions {
    pub results_dir: Option<PathBuf>,
    pub coverage_formatters: Vec<CoverageFormat>,
    pub junit: bool,
}

impl ReportOptions {
    pub fn wants_reports(&self) -> bool {
        self.junit || !self.coverage_formatters.is_empty()
    }
}

/// Raw flag values as parsed by the command line.
#[derive(Debug, Clone, Default)]
pub struct DeployFlags {
    pub manifest: Option<PathBuf>,
    pub metadata: Vec<MetadataName>,
    pub source_paths: Vec<PathBuf>,
    pub validated_deploy_request_id: Option<DeployId>,
    pub wait_minutes: u64,
    pub test_level: Option<TestLevel>,
    pub run_tests: Vec<String>,
    pub ignore_errors: bool,
    pub ignore_warnings: bool,
    pub check_only: bool,
    pub purge_on_delete: bool,
    pub track_source: bool,
    pub force_overwrite: bool,
    pub pre_destructive_changes: Option<PathBuf>,
    pub post_destructive_changes: Option<PathBuf>,
    pub api: ApiProtocol,
    pub reporting: ReportOptions,
}

/// One deploy attempt. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployRequest {
    pub mode: InputMode,
    pub options: DeployOptions,
    /// Zero means submit and return without polling.
    pub wait: Duration,
    pub track_source: bool,
    pub force_overwrite: bool,
    pub destructive_pre: Option<PathBuf>,
    pub destructive_post: Option<PathBuf>,
    pub reporting: ReportOptions,
}

impl DeployRequest {
    pub fn from_flags(flags: DeployFlags) -> Result<Self, ConfigurationError> {
        let mode = InputMode::resolve(
            flags.manifest,
            flags.metadata,
            flags.source_paths,
            flags.validated_deploy_request_id,
        )?;

        match (flags.test_level, flags.run_tests.is_empty()) {
            (Some(TestLevel::RunSpecifiedTests), true) => {
                return Err(ConfigurationError::RunSpecifiedWithoutTests);
            }
            (level, false) if level != Some(TestLevel::RunSpecifiedTests) => {
                return Err(ConfigurationError::TestsWithoutRunSpecified);
            }
            _ => {}
        }

        if flags.force_overwrite && !flags.track_source {
            return Err(ConfigurationError::ForceOverwriteWithoutTracking);
        }

        if flags.track_source {
            if mode.is_replay() {
                return Err(ConfigurationError::TrackingIncompatible(
                    "--validated-deploy-request-id",
                ));
            }
            if flags.check_only {
                return Err(ConfigurationError::TrackingIncompatible("--check-only"));
            }
        }

        let has_destructive =
            flags.pre_destructive_changes.is_some() || flags.post_destructive_changes.is_some();

        if mode.is_replay() {
            if flags.check_only {
                return Err(ConfigurationError::ReplayIncompatible("--check-only"));
            }
            if flags.test_level.is_some() {
                return Err(ConfigurationError::ReplayIncompatible("--test-level"));
            }
            if has_destructive {
                return Err(ConfigurationError::ReplayIncompatible(
                    "destructive changes",
                ));
            }
        }

        if has_destructive && !matches!(mode, InputMode::Manifest(_)) {
            return Err(ConfigurationError::DestructiveRequiresManifest);
        }

        if flags.purge_on_delete && !has_destructive {
            return Err(ConfigurationError::PurgeWithoutDestructive);
        }

        Ok(DeployRequest {
            mode,
            options: DeployOptions {
                check_only: flags.check_only,
                rollback_on_error: !flags.ignore_errors,
                ignore_warnings: flags.ignore_warnings,
                purge_on_delete: flags.purge_on_delete,
                single_package: true,
                test_level: flags.test_level,
                run_tests: flags.run_tests,
                protocol: flags.api,
            },
            wait: Duration::from_secs(flags.wait_minutes.saturating_mul(60)),
            track_source: flags.track_source,
            force_overwrite: flags.force_overwrite,
            destructive_pre: flags.pre_destructive_changes,
            destructive_post: flags.post_destructive_changes,
            reporting: flags.reporting,
        })
    }

    pub fn is_async(&self) -> bool {
        self.wait.is_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata_flags() -> DeployFlags {
        DeployFlags {
            metadata: vec![MetadataName::new("ApexClass").unwrap()],
            wait_minutes: 33,
            ..DeployFlags::default()
        }
    }

    #[test]
    fn rollback_on_error_is_the_default() {
        let request = DeployRequest::from_flags(metadata_flags()).unwrap();
        assert!(request.options.rollback_on_error);
        assert_eq!(request.wait, Duration::from_secs(33 * 60));

        let request = DeployRequest::from_flags(DeployFlags {
            ignore_errors: true,
            ..metadata_flags()
        })
        .unwrap();
        assert!(!request.options.rollback_on_error);
    }

    #[test]
    fn zero_wait_is_async() {
        let request = DeployRequest::from_flags(DeployFlags {
            wait_minutes: 0,
            ..metadata_flags()
        })
        .unwrap();
        assert!(request.is_async());
    }

    #[test]
    fn missing_input_mode_is_rejected() {
        let err = DeployRequest::from_flags(DeployFlags::default()).unwrap_err();
        assert_eq!(err, ConfigurationError::NoInputMode);
    }

    #[test]
    fn conflicting_input_modes_are_rejected() {
        let err = DeployRequest::from_flags(DeployFlags {
            manifest: Some(PathBuf::from("package.xml")),
            ..metadata_flags()
        })
        .unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::ConflictingInputModes(vec!["--manifest", "--metadata"])
        );
    }

    #[test]
    fn run_tests_require_matching_level() {
        let err = DeployRequest::from_flags(DeployFlags {
            run_tests: vec!["FooTest".to_string()],
            ..metadata_flags()
        })
        .unwrap_err();
        assert_eq!(err, ConfigurationError::TestsWithoutRunSpecified);

        let err = DeployRequest::from_flags(DeployFlags {
            test_level: Some(TestLevel::RunSpecifiedTests),
            ..metadata_flags()
        })
        .unwrap_err();
        assert_eq!(err, ConfigurationError::RunSpecifiedWithoutTests);

        let request = DeployRequest::from_flags(DeployFlags {
            test_level: Some(TestLevel::RunSpecifiedTests),
            run_tests: vec!["FooTest".to_string()],
            ..metadata_flags()
        })
        .unwrap();
        assert_eq!(request.options.run_tests, vec!["FooTest"]);
    }

    #[test]
    fn tracking_rules() {
        let err = DeployRequest::from_flags(DeployFlags {
            force_overwrite: true,
            ..metadata_flags()
        })
        .unwrap_err();
        assert_eq!(err, ConfigurationError::ForceOverwriteWithoutTracking);

        let err = DeployRequest::from_flags(DeployFlags {
            track_source: true,
            check_only: true,
            ..metadata_flags()
        })
        .unwrap_err();
        assert_eq!(err, ConfigurationError::TrackingIncompatible("--check-only"));

        let err = DeployRequest::from_flags(DeployFlags {
            metadata: Vec::new(),
            validated_deploy_request_id: Some(DeployId::new("0Af000000000001").unwrap()),
            track_source: true,
            ..metadata_flags()
        })
        .unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::TrackingIncompatible("--validated-deploy-request-id")
        );
    }

    #[test]
    fn destructive_changes_need_manifest_and_purge_needs_destructive() {
        let err = DeployRequest::from_flags(DeployFlags {
            post_destructive_changes: Some(PathBuf::from("destructive.xml")),
            ..metadata_flags()
        })
        .unwrap_err();
        assert_eq!(err, ConfigurationError::DestructiveRequiresManifest);

        let err = DeployRequest::from_flags(DeployFlags {
            metadata: Vec::new(),
            manifest: Some(PathBuf::from("package.xml")),
            purge_on_delete: true,
            ..metadata_flags()
        })
        .unwrap_err();
        assert_eq!(err, ConfigurationError::PurgeWithoutDestructive);
    }

    #[test]
    fn parses_test_levels_case_insensitively() {
        assert_eq!(
            "runlocaltests".parse::<TestLevel>().unwrap(),
            TestLevel::RunLocalTests
        );
        assert!("Everything".parse::<TestLevel>().is_err());
    }

    #[test]
    fn options_serialize_for_the_deploy_api() {
        let request = DeployRequest::from_flags(DeployFlags {
            test_level: Some(TestLevel::RunLocalTests),
            ..metadata_flags()
        })
        .unwrap();
        let json = serde_json::to_value(&request.options).unwrap();
        assert_eq!(json["testLevel"], "RunLocalTests");
        assert_eq!(json["rollbackOnError"], true);
        assert!(json.get("runTests").is_none());
        assert!(json.get("protocol").is_none());
    }
}
