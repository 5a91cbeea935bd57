// ABOUTME: Package manifest (package.xml) reading and rendering.
// ABOUTME: Reads types/members/version blocks and renders manifests for deploy archives.

use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;
use thiserror::Error;

use crate::types::{ApiVersion, MetadataName};

static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"));
static TYPES_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<types>(.*?)</types>").expect("valid regex"));
static MEMBERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<members>\s*([^<]*?)\s*</members>").expect("valid regex"));
static NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<name>\s*([^<]*?)\s*</name>").expect("valid regex"));
static VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<version>\s*([^<]*?)\s*</version>").expect("valid regex"));

const XML_NAMESPACE: &str = "http://soap.sforce.com/2006/04/metadata";

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("manifest has a <types> block without a <name>")]
    MissingTypeName,

    #[error("manifest contains no <types> or <version> elements")]
    NotAManifest,

    #[error("invalid entry in manifest: {0}")]
    InvalidEntry(String),
}

/// Parsed contents of a package manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    pub types: BTreeMap<String, Vec<String>>,
    pub version: Option<ApiVersion>,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(xml: &str) -> Result<Self, ManifestError> {
        let mut manifest = Manifest::default();
        let mut saw_element = false;
        let xml = COMMENT.replace_all(xml, "");
        let xml = xml.as_ref();

        for block in TYPES_BLOCK.captures_iter(xml) {
            saw_element = true;
            let body = &block[1];
            let name = NAME
                .captures(body)
                .map(|c| unescape(&c[1]))
                .filter(|n| !n.is_empty())
                .ok_or(ManifestError::MissingTypeName)?;
            let members = MEMBERS
                .captures_iter(body)
                .map(|c| unescape(&c[1]))
                .filter(|m| !m.is_empty());
            manifest.types.entry(name).or_default().extend(members);
        }

        // The version element sits outside the types blocks.
        let outside = TYPES_BLOCK.replace_all(xml, "");
        if let Some(version) = VERSION.captures(&outside) {
            saw_element = true;
            let parsed = version[1]
                .parse()
                .map_err(|e: crate::types::ApiVersionError| {
                    ManifestError::InvalidEntry(e.to_string())
                })?;
            manifest.version = Some(parsed);
        }

        if !saw_element {
            return Err(ManifestError::NotAManifest);
        }

        Ok(manifest)
    }

    /// One selector per `(type, member)` pair; `*` members select the whole type.
    pub fn selectors(&self) -> Result<Vec<MetadataName>, ManifestError> {
        self.types
            .iter()
            .flat_map(|(type_name, members)| {
                members
                    .iter()
                    .map(move |member| format!("{type_name}:{member}"))
            })
            .map(|entry| {
                MetadataName::new(&entry).map_err(|e| ManifestError::InvalidEntry(e.to_string()))
            })
            .collect()
    }
}

/// Render a package manifest for the given members.
pub fn render_manifest(types: &BTreeMap<String, Vec<String>>, version: Option<ApiVersion>) -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str(&format!("<Package xmlns=\"{XML_NAMESPACE}\">\n"));
    for (type_name, members) in types {
        xml.push_str("    <types>\n");
        for member in members {
            xml.push_str(&format!("        <members>{}</members>\n", escape(member)));
        }
        xml.push_str(&format!("        <name>{}</name>\n", escape(type_name)));
        xml.push_str("    </types>\n");
    }
    if let Some(version) = version {
        xml.push_str(&format!("    <version>{version}</version>\n"));
    }
    xml.push_str("</Package>\n");
    xml
}

pub(crate) fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Decode the predefined XML entities. `&amp;` goes last so `&amp;lt;` stays `&lt;`.
fn unescape(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
