// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{ArgGroup, Args, Parser, Subcommand};
use orgdeploy::deploy::{ApiProtocol, DeployFlags, ReportOptions, TestLevel};
use orgdeploy::formatter::CoverageFormat;
use orgdeploy::output::OutputMode;
use orgdeploy::types::{DeployId, MetadataName};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "orgdeploy")]
#[command(about = "Deploy metadata source to a platform org and report on deploys")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print only the final result
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Print the result as a JSON object
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn output_mode(&self) -> OutputMode {
        if self.json {
            OutputMode::Json
        } else if self.quiet {
            OutputMode::Quiet
        } else {
            OutputMode::Normal
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new orgdeploy.yml configuration file
    Init {
        /// Name of the first target
        #[arg(long)]
        target: Option<String>,

        /// Instance URL of the first target
        #[arg(long)]
        instance_url: Option<String>,

        /// Overwrite an existing configuration file
        #[arg(short, long)]
        force: bool,
    },

    /// Deploy source to the target org
    Deploy(DeployArgs),

    /// Check the status of a deploy that was already started
    Report(ReportArgs),

    /// Show local changes, remote changes, and conflicts
    Status {
        /// Target org (defined in config)
        #[arg(short, long)]
        target: Option<String>,
    },
}

#[derive(Args, Debug, Clone)]
pub struct ReportingArgs {
    /// Directory for coverage and JUnit reports
    #[arg(long)]
    pub results_dir: Option<PathBuf>,

    /// Coverage report formats (json, lcovonly, text-summary, cobertura)
    #[arg(long, value_delimiter = ',', num_args = 1..)]
    pub coverage_formatters: Vec<CoverageFormat>,

    /// Write a JUnit test report
    #[arg(long)]
    pub junit: bool,
}

impl From<ReportingArgs> for ReportOptions {
    fn from(args: ReportingArgs) -> Self {
        ReportOptions {
            results_dir: args.results_dir,
            coverage_formatters: args.coverage_formatters,
            junit: args.junit,
        }
    }
}

#[derive(Args, Debug, Clone)]
#[command(group(
    ArgGroup::new("input")
        .required(true)
        .multiple(false)
        .args(["manifest", "metadata", "source_path", "validated_deploy_request_id"])
))]
pub struct DeployArgs {
    /// Target org (defined in config)
    #[arg(short, long)]
    pub target: Option<String>,

    /// Manifest (package.xml) listing the components to deploy
    #[arg(short = 'x', long)]
    pub manifest: Option<PathBuf>,

    /// Metadata names to deploy: Type, Type:Name, or Type:Prefix*
    #[arg(short, long, num_args = 1..)]
    pub metadata: Vec<MetadataName>,

    /// Source files or directories to deploy
    #[arg(short = 'd', long, num_args = 1..)]
    pub source_path: Vec<PathBuf>,

    /// Quick-deploy a previously validated deploy
    #[arg(long)]
    pub validated_deploy_request_id: Option<DeployId>,

    /// Minutes to wait for completion; 0 returns immediately
    #[arg(short, long, default_value_t = 33)]
    pub wait: u64,

    /// Which tests to run
    #[arg(short = 'l', long)]
    pub test_level: Option<TestLevel>,

    /// Tests to run with RunSpecifiedTests
    #[arg(short, long, value_delimiter = ',', num_args = 1..)]
    pub run_tests: Vec<String>,

    /// Keep successful components when others fail
    #[arg(short = 'o', long)]
    pub ignore_errors: bool,

    /// Deploy even if warnings are raised
    #[arg(short = 'g', long)]
    pub ignore_warnings: bool,

    /// Validate without saving changes in the org
    #[arg(short, long)]
    pub check_only: bool,

    /// Delete components immediately instead of moving them to the recycle bin
    #[arg(long)]
    pub purge_on_delete: bool,

    /// Check for conflicts and update source tracking
    #[arg(long)]
    pub track_source: bool,

    /// Deploy even if the org has conflicting changes
    #[arg(short, long)]
    pub force_overwrite: bool,

    /// Components to delete before deploying (manifest mode only)
    #[arg(long)]
    pub pre_destructive_changes: Option<PathBuf>,

    /// Components to delete after deploying (manifest mode only)
    #[arg(long)]
    pub post_destructive_changes: Option<PathBuf>,

    /// Submission protocol
    #[arg(long, default_value_t = ApiProtocol::Rest)]
    pub api: ApiProtocol,

    #[command(flatten)]
    pub reporting: ReportingArgs,
}

impl From<DeployArgs> for DeployFlags {
    fn from(args: DeployArgs) -> Self {
        DeployFlags {
            manifest: args.manifest,
            metadata: args.metadata,
            source_paths: args.source_path,
            validated_deploy_request_id: args.validated_deploy_request_id,
            wait_minutes: args.wait,
            test_level: args.test_level,
            run_tests: args.run_tests,
            ignore_errors: args.ignore_errors,
            ignore_warnings: args.ignore_warnings,
            check_only: args.check_only,
            purge_on_delete: args.purge_on_delete,
            track_source: args.track_source,
            force_overwrite: args.force_overwrite,
            pre_destructive_changes: args.pre_destructive_changes,
            post_destructive_changes: args.post_destructive_changes,
            api: args.api,
            reporting: args.reporting.into(),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ReportArgs {
    /// Target org (defaults to the target of the last deploy)
    #[arg(short, long)]
    pub target: Option<String>,

    /// Deploy id; defaults to the most recent deploy
    #[arg(short = 'i', long)]
    pub job_id: Option<DeployId>,

    /// Minutes to wait for completion; 0 checks once
    #[arg(short, long, default_value_t = 0)]
    pub wait: u64,

    #[command(flatten)]
    pub reporting: ReportingArgs,
}
