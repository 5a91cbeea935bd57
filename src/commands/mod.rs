// ABOUTME: Command module aggregator for the orgdeploy CLI.
// ABOUTME: Re-exports deploy, report, and status command handlers.

mod context;
mod deploy;
mod report;
mod status;

pub use deploy::deploy;
pub use report::report;
pub use status::status;
