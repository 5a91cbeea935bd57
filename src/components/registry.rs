// ABOUTME: Registry of known metadata types keyed by source directory.
// ABOUTME: Classifies project files into component keys and archive paths.

use std::path::{Component as PathComponent, Path};

use super::set::ComponentKey;

/// How a metadata type lays out its files in source format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// `Name.suffix` content file with a `Name.suffix-meta.xml` sidecar.
    Content,
    /// A single `Name.suffix-meta.xml` file.
    MetaOnly,
    /// A directory per component (`lwc/name/...`).
    Bundle,
    /// `Name.resource-meta.xml` plus a file or directory named `Name`.
    Resource,
    /// `objects/Name/Name.object-meta.xml` with child directories.
    Object,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetadataType {
    pub name: &'static str,
    pub directory: &'static str,
    pub suffix: &'static str,
    pub layout: Layout,
}

const fn ty(
    name: &'static str,
    directory: &'static str,
    suffix: &'static str,
    layout: Layout,
) -> MetadataType {
    MetadataType {
        name,
        directory,
        suffix,
        layout,
    }
}

const TYPES: &[MetadataType] = &[
    ty("ApexClass", "classes", "cls", Layout::Content),
    ty("ApexTrigger", "triggers", "trigger", Layout::Content),
    ty("ApexPage", "pages", "page", Layout::Content),
    ty("ApexComponent", "components", "component", Layout::Content),
    ty("StaticResource", "staticresources", "resource", Layout::Resource),
    ty("LightningComponentBundle", "lwc", "", Layout::Bundle),
    ty("AuraDefinitionBundle", "aura", "", Layout::Bundle),
    ty("CustomObject", "objects", "object", Layout::Object),
    ty("Layout", "layouts", "layout", Layout::MetaOnly),
    ty("Flow", "flows", "flow", Layout::MetaOnly),
    ty("PermissionSet", "permissionsets", "permissionset", Layout::MetaOnly),
    ty("Profile", "profiles", "profile", Layout::MetaOnly),
    ty("CustomTab", "tabs", "tab", Layout::MetaOnly),
    ty("CustomLabels", "labels", "labels", Layout::MetaOnly),
    ty("CustomMetadata", "customMetadata", "md", Layout::MetaOnly),
    ty("FlexiPage", "flexipages", "flexipage", Layout::MetaOnly),
];

/// Child types decomposed under `objects/<Object>/<directory>/`.
const OBJECT_CHILDREN: &[MetadataType] = &[
    ty("CustomField", "fields", "field", Layout::MetaOnly),
    ty("ListView", "listViews", "listView", Layout::MetaOnly),
    ty("ValidationRule", "validationRules", "validationRule", Layout::MetaOnly),
    ty("RecordType", "recordTypes", "recordType", Layout::MetaOnly),
    ty("WebLink", "webLinks", "webLink", Layout::MetaOnly),
];

/// Look up a metadata type (including object children) by its API name.
pub fn lookup_type(name: &str) -> Option<&'static MetadataType> {
    TYPES
        .iter()
        .chain(OBJECT_CHILDREN.iter())
        .find(|t| t.name == name)
}

/// A classified source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    pub key: ComponentKey,
    /// Path of the file inside the deploy archive, e.g. `classes/Foo.cls`.
    pub archive_path: String,
}

/// Classify a project-relative file path. Returns `None` for files that do not
/// belong to any known metadata type.
pub fn classify(path: &Path) -> Option<Classified> {
    let segments: Vec<&str> = path
        .components()
        .filter_map(|c| match c {
            PathComponent::Normal(s) => s.to_str(),
            _ => None,
        })
        .collect();

    // The innermost type directory wins, so `objects/classes/...` stays sane.
    let (index, metadata_type) = segments
        .iter()
        .enumerate()
        .rev()
        .find_map(|(i, seg)| {
            TYPES
                .iter()
                .find(|t| t.directory == *seg)
                .map(|t| (i, t))
        })?;

    let rest = &segments[index + 1..];
    let full_name = match metadata_type.layout {
        Layout::Content => match rest {
            [file] => strip_content_suffix(file, metadata_type.suffix)?,
            _ => return None,
        },
        Layout::MetaOnly => match rest {
            [file] => strip_meta_suffix(file, metadata_type.suffix)?,
            _ => return None,
        },
        Layout::Bundle => match rest {
            [bundle, _, ..] => (*bundle).to_string(),
            _ => return None,
        },
        Layout::Resource => {
            let first = rest.first()?;
            match first.split_once('.') {
                Some((name, _)) if !name.is_empty() => name.to_string(),
                Some(_) => return None,
                None => (*first).to_string(),
            }
        }
        Layout::Object => return classify_object(&segments[index..]),
    };

    Some(Classified {
        key: ComponentKey::new(metadata_type.name, full_name),
        archive_path: segments[index..].join("/"),
    })
}

fn classify_object(segments: &[&str]) -> Option<Classified> {
    let archive_path = segments.join("/");
    match segments {
        [_, object, file] => {
            let name = strip_meta_suffix(file, "object")?;
            (name == *object).then(|| Classified {
                key: ComponentKey::new("CustomObject", name),
                archive_path,
            })
        }
        [_, object, child_dir, file] => {
            let child = OBJECT_CHILDREN.iter().find(|t| t.directory == *child_dir)?;
            let name = strip_meta_suffix(file, child.suffix)?;
            Some(Classified {
                key: ComponentKey::new(child.name, format!("{object}.{name}")),
                archive_path,
            })
        }
        _ => None,
    }
}

fn strip_content_suffix(file: &str, suffix: &str) -> Option<String> {
    let meta = format!(".{suffix}-meta.xml");
    let content = format!(".{suffix}");
    file.strip_suffix(meta.as_str())
        .or_else(|| file.strip_suffix(content.as_str()))
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}

fn strip_meta_suffix(file: &str, suffix: &str) -> Option<String> {
    let meta = format!(".{suffix}-meta.xml");
    file.strip_suffix(meta.as_str())
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}
