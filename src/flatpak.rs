/*============================================================
  Synavera Project: Syn-Upd
  Module: synupd_core::flatpak
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Fold Flatpak refs (apps, runtimes, extensions) into one
    logical update per top-level app or runtime.

  Security / Safety Notes:
    Works on descriptors produced by the Flatpak worker; no
    installation or remote access happens here.

  Dependencies:
    serde/serde_json for the worker wire format.

  Operational Scope:
    Backs the `flatpak` subcommand; output is consumed by the
    front-end as a JSON array.

  Revision History:
    2025-11-12 COD  Authored Flatpak hierarchy merge.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Parents always discovered before their children
    - Orphan extensions surfaced, never dropped
    - Lossless JSON round-trip
============================================================*/

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Result, SynupdError};
use crate::keyfile::{KeyFile, MetadataDocument};
use crate::logger::Logger;

/// Commits are shown and compared by this many leading characters.
pub const COMMIT_DISPLAY_LENGTH: usize = 10;
const RUNTIME_FALLBACK_SUMMARY: &str = "A Flatpak runtime package";
const EXTENSION_GROUP_PREFIX: &str = "Extension ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlatpakKind {
    App,
    Runtime,
}

impl FlatpakKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FlatpakKind::App => "app",
            FlatpakKind::Runtime => "runtime",
        }
    }
}

/// `kind/name/arch/branch` reference to an installable Flatpak.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FlatpakRef {
    pub kind: FlatpakKind,
    pub name: String,
    pub arch: String,
    pub branch: String,
}

impl FlatpakRef {
    /// Number of dotted segments in the ref name.
    pub fn depth(&self) -> usize {
        self.name.split('.').count()
    }
}

impl fmt::Display for FlatpakRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.kind.as_str(),
            self.name,
            self.arch,
            self.branch
        )
    }
}

impl FromStr for FlatpakRef {
    type Err = SynupdError;

    fn from_str(value: &str) -> Result<Self> {
        let parts: Vec<&str> = value.split('/').collect();
        let [kind, name, arch, branch] = parts.as_slice() else {
            return Err(SynupdError::Serialization(format!(
                "Flatpak ref `{value}` is not kind/name/arch/branch"
            )));
        };
        let kind = match *kind {
            "app" => FlatpakKind::App,
            "runtime" => FlatpakKind::Runtime,
            other => {
                return Err(SynupdError::Serialization(format!(
                    "Unknown Flatpak ref kind `{other}`"
                )))
            }
        };
        if name.is_empty() {
            return Err(SynupdError::Serialization(format!(
                "Flatpak ref `{value}` has an empty name"
            )));
        }
        Ok(Self {
            kind,
            name: name.to_string(),
            arch: arch.to_string(),
            branch: branch.to_string(),
        })
    }
}

impl Serialize for FlatpakRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FlatpakRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Locally installed deployment of a ref.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct InstalledRefInfo {
    pub commit: String,
    pub appdata_version: Option<String>,
    pub appdata_name: Option<String>,
    pub appdata_summary: Option<String>,
    pub origin: String,
}

/// Remote-side information for a ref about to be installed.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RemoteRefInfo {
    pub remote_name: String,
}

/// Appstream catalog entry for a ref.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppstreamEntry {
    pub name: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub version: Option<String>,
    pub homepage: Option<String>,
}

/// One pending Flatpak operation as reported by the worker.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RefDescriptor {
    pub kind: FlatpakKind,
    pub name: String,
    #[serde(default)]
    pub arch: String,
    #[serde(default)]
    pub branch: String,
    #[serde(default)]
    pub commit: String,
    #[serde(default)]
    pub download_size: u64,
    #[serde(default)]
    pub installed: Option<InstalledRefInfo>,
    #[serde(default)]
    pub remote_ref: Option<RemoteRefInfo>,
    #[serde(default)]
    pub appstream: Option<AppstreamEntry>,
    #[serde(default)]
    pub metadata: Option<KeyFile>,
}

impl RefDescriptor {
    pub fn flatpak_ref(&self) -> FlatpakRef {
        FlatpakRef {
            kind: self.kind,
            name: self.name.clone(),
            arch: self.arch.clone(),
            branch: self.branch.clone(),
        }
    }
}

/// An app or runtime together with the extensions folded into it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatpakLogicalUpdate {
    #[serde(rename = "flatpak_type")]
    pub kind: FlatpakKind,
    pub name: String,
    pub origin: String,
    pub old_version: String,
    pub new_version: String,
    pub size: u64,
    pub summary: String,
    pub description: String,
    pub real_source_name: String,
    pub source_packages: Vec<String>,
    pub package_names: Vec<String>,
    #[serde(rename = "sub_updates")]
    pub child_updates: Vec<FlatpakLogicalUpdate>,
    pub link: Option<String>,
    pub metadata: Option<KeyFile>,
    #[serde(rename = "ref")]
    pub flatpak_ref: FlatpakRef,
}

impl FlatpakLogicalUpdate {
    pub fn from_ref(descriptor: &RefDescriptor) -> Self {
        let flatpak_ref = descriptor.flatpak_ref();
        let ref_name = flatpak_ref.name.clone();
        let (old_version, new_version) = version_strings(descriptor);
        let appstream = descriptor.appstream.as_ref();

        let (name, mut summary, mut description) = match (appstream, &descriptor.installed) {
            (Some(entry), _) => (
                entry.name.clone().unwrap_or_else(|| ref_name.clone()),
                entry.summary.clone().unwrap_or_default(),
                entry.description.clone().unwrap_or_default(),
            ),
            (None, Some(installed)) if descriptor.kind != FlatpakKind::Runtime => (
                installed.appdata_name.clone().unwrap_or_else(|| ref_name.clone()),
                installed.appdata_summary.clone().unwrap_or_default(),
                String::new(),
            ),
            _ => (ref_name.clone(), String::new(), String::new()),
        };
        if description.is_empty() && descriptor.kind == FlatpakKind::Runtime {
            summary = RUNTIME_FALLBACK_SUMMARY.to_string();
            description = RUNTIME_FALLBACK_SUMMARY.to_string();
        }

        let origin = match (&descriptor.installed, &descriptor.remote_ref) {
            (Some(installed), _) => capitalize(&installed.origin),
            (None, Some(remote)) => remote.remote_name.clone(),
            (None, None) => String::new(),
        };

        Self {
            kind: descriptor.kind,
            name,
            origin,
            source_packages: vec![format!("{ref_name}={new_version}")],
            package_names: vec![ref_name.clone()],
            real_source_name: ref_name,
            old_version,
            new_version,
            size: descriptor.download_size,
            summary,
            description,
            child_updates: Vec::new(),
            link: appstream.and_then(|entry| entry.homepage.clone()),
            metadata: descriptor.metadata.clone(),
            flatpak_ref,
        }
    }

    pub fn ref_name(&self) -> &str {
        &self.flatpak_ref.name
    }

    /// Fold an extension or related runtime into this update.
    pub fn add_child(&mut self, child: FlatpakLogicalUpdate) {
        self.package_names.push(child.ref_name().to_string());
        self.size = self.size.saturating_add(child.size);
        self.child_updates.push(child);
    }

    /// Apps, and runtimes whose declared runtime is themselves.
    pub fn is_base_package(&self) -> bool {
        if self.kind == FlatpakKind::App {
            return true;
        }
        self.metadata
            .as_ref()
            .and_then(|metadata| metadata.get_string("Runtime", "runtime"))
            .and_then(|runtime| format!("runtime/{runtime}").parse::<FlatpakRef>().ok())
            .is_some_and(|runtime| runtime.name == self.ref_name())
    }

    /// Whether this update's manifest declares `child` as one of its extensions.
    pub fn declares_extension(&self, child: &FlatpakLogicalUpdate) -> bool {
        let Some(metadata) = &self.metadata else {
            return false;
        };
        let extensions = metadata
            .get_string_list("Build", "built-extensions")
            .unwrap_or_else(|| {
                metadata
                    .groups()
                    .iter()
                    .filter_map(|group| group.strip_prefix(EXTENSION_GROUP_PREFIX))
                    .map(str::to_string)
                    .collect()
            });
        extensions
            .iter()
            .any(|extension| !extension.is_empty() && child.ref_name().starts_with(extension.as_str()))
    }

    fn claims(&self, child: &FlatpakLogicalUpdate) -> bool {
        child.ref_name().starts_with(self.ref_name()) || self.declares_extension(child)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|err| SynupdError::Serialization(format!("Failed to encode Flatpak update: {err}")))
    }

    pub fn from_json(data: &str) -> Result<Self> {
        serde_json::from_str(data)
            .map_err(|err| SynupdError::Serialization(format!("Failed to decode Flatpak update: {err}")))
    }

    /// Encode a whole wire array of updates.
    pub fn list_to_json(updates: &[Self]) -> Result<String> {
        serde_json::to_string_pretty(updates)
            .map_err(|err| SynupdError::Serialization(format!("Failed to encode Flatpak updates: {err}")))
    }
}

/// Appstream versions when both sides have one, else truncated commits.
fn version_strings(descriptor: &RefDescriptor) -> (String, String) {
    let old_commit = descriptor
        .installed
        .as_ref()
        .map(|installed| truncate_commit(&installed.commit))
        .unwrap_or_default();
    let new_commit = truncate_commit(&descriptor.commit);
    let installed_version = descriptor
        .installed
        .as_ref()
        .and_then(|installed| installed.appdata_version.clone())
        .unwrap_or_default();
    let appstream_version = descriptor
        .appstream
        .as_ref()
        .and_then(|entry| entry.version.clone())
        .unwrap_or_default();

    if installed_version.is_empty() || appstream_version.is_empty() {
        return (old_commit, new_commit);
    }
    if installed_version != appstream_version {
        return (installed_version, appstream_version);
    }
    (
        format!("{installed_version} ({old_commit})"),
        format!("{appstream_version} ({new_commit})"),
    )
}

pub fn truncate_commit(commit: &str) -> String {
    commit.chars().take(COMMIT_DISPLAY_LENGTH).collect()
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Resolve parents and children over every pending ref.
///
/// Refs are visited shallowest name first (ties by name) so a parent is
/// always a top-level entry before any ref that would nest under it.
pub fn aggregate_refs(descriptors: &[RefDescriptor], logger: &Logger) -> Vec<FlatpakLogicalUpdate> {
    let mut ordered: Vec<&RefDescriptor> = descriptors.iter().collect();
    ordered.sort_by(|a, b| {
        let depth_a = a.name.split('.').count();
        let depth_b = b.name.split('.').count();
        depth_a.cmp(&depth_b).then_with(|| a.name.cmp(&b.name))
    });

    let mut updates: Vec<FlatpakLogicalUpdate> = Vec::new();
    for descriptor in ordered {
        if descriptor.name.is_empty() {
            logger.warn("FLATPAK", "Skipping ref descriptor without a name");
            continue;
        }
        let update = FlatpakLogicalUpdate::from_ref(descriptor);
        if update.is_base_package() {
            updates.push(update);
            continue;
        }
        match updates.iter_mut().find(|parent| parent.claims(&update)) {
            Some(parent) => {
                logger.debug(
                    "FLATPAK",
                    format!("{} folded into {}", update.ref_name(), parent.ref_name()),
                );
                parent.add_child(update);
            }
            None => {
                logger.debug("FLATPAK", format!("{} has no parent", update.ref_name()));
                updates.push(update);
            }
        }
    }
    updates
}
