// ABOUTME: Config scaffolding for new projects.
// ABOUTME: Creates orgdeploy.yml template files.

use std::path::Path;

use crate::error::{Error, Result};

use super::CONFIG_FILENAME;

pub fn init_config(
    dir: &Path,
    target: Option<&str>,
    instance_url: Option<&str>,
    force: bool,
) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let target = target.unwrap_or("dev");
    if target.is_empty() || target.contains(char::is_whitespace) {
        return Err(Error::InvalidConfig(format!("invalid target name: {target:?}")));
    }
    let instance_url = instance_url.unwrap_or("https://example.my.salesforce.com");
    if !instance_url.starts_with("https://") && !instance_url.starts_with("http://") {
        return Err(Error::InvalidConfig(format!(
            "instance url must start with https://: {instance_url}"
        )));
    }

    std::fs::write(&config_path, generate_template_yaml(target, instance_url))?;
    Ok(())
}

fn generate_template_yaml(target: &str, instance_url: &str) -> String {
    format!(
        r#"api_version: "61.0"
package_directories:
  - force-app
default_target: {target}
targets:
  {target}:
    instance_url: {instance_url}
    # Read the token from the environment rather than committing it
    access_token:
      env: SF_ACCESS_TOKEN
"#
    )
}
