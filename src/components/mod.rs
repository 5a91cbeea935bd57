// ABOUTME: Component set resolution from local project source.
// ABOUTME: Exports the type registry, component set, resolver, manifest, and packaging.

mod manifest;
mod package;
mod registry;
mod resolver;
mod set;

pub use manifest::{Manifest, ManifestError, render_manifest};
pub(crate) use manifest::escape as manifest_escape;
pub use package::{PackageError, build_archive};
pub use registry::{Classified, MetadataType, classify, lookup_type};
pub use resolver::{ComponentResolver, ResolveError, ResolveOptions, SourceResolver, SourceSelection};
pub use set::{Component, ComponentKey, ComponentSet, SourceFile};
