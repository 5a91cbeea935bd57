// ABOUTME: Builds the zipped deploy archive for a component set.
// ABOUTME: Writes package.xml, destructive manifests, and component source files.

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use zip::write::SimpleFileOptions;

use super::manifest::render_manifest;
use super::set::{ComponentSet, group_by_type};

#[derive(Debug, Error)]
pub enum PackageError {
    #[error("failed to read {path}: {source}")]
    ReadSource {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write deploy archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("failed to write deploy archive: {0}")]
    Io(#[from] std::io::Error),
}

/// Zip the component set into an in-memory deploy archive.
///
/// `project_root` resolves the project-relative file paths recorded in the set.
pub fn build_archive(set: &ComponentSet, project_root: &Path) -> Result<Vec<u8>, PackageError> {
    let mut buf = Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut buf);
        let options = SimpleFileOptions::default();

        let version = Some(set.source_api_version());
        zip.start_file("package.xml", options)?;
        zip.write_all(render_manifest(&set.members_by_type(), version).as_bytes())?;

        if !set.destructive_pre().is_empty() {
            zip.start_file("destructiveChangesPre.xml", options)?;
            let types = group_by_type(set.destructive_pre().iter());
            zip.write_all(render_manifest(&types, None).as_bytes())?;
        }

        if !set.destructive_post().is_empty() {
            zip.start_file("destructiveChangesPost.xml", options)?;
            let types = group_by_type(set.destructive_post().iter());
            zip.write_all(render_manifest(&types, None).as_bytes())?;
        }

        for component in set {
            for file in &component.files {
                let full_path = project_root.join(&file.path);
                let content =
                    std::fs::read(&full_path).map_err(|source| PackageError::ReadSource {
                        path: full_path.clone(),
                        source,
                    })?;
                zip.start_file(file.archive_path.as_str(), options)?;
                zip.write_all(&content)?;
            }
        }

        zip.finish()?;
    }

    tracing::debug!(
        components = set.len(),
        bytes = buf.get_ref().len(),
        "built deploy archive"
    );
    Ok(buf.into_inner())
}
