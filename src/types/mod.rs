// ABOUTME: Validated domain types shared across the crate.
// ABOUTME: Deploy request ids, metadata name selectors, and API versions.

mod api_version;
mod deploy_id;
mod metadata_name;

pub use api_version::{ApiVersion, ApiVersionError};
pub use deploy_id::{DeployId, DeployIdError};
pub use metadata_name::{MetadataName, MetadataNameError};
