/*============================================================
  Synavera Project: Syn-Upd
  Module: synupd_core::update
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Model a logical update: one user-meaningful upgrade entry
    folded from every binary package built from one source.

  Security / Safety Notes:
    Free text is escaped to numeric character references on
    the wire so descriptions can never forge field breaks.

  Dependencies:
    quick-xml for character-reference unescaping.

  Operational Scope:
    Built by the aggregation pass, observed by the tracker and
    exchanged with the front-end as `###`-delimited records.

  Revision History:
    2025-11-12 COD  Authored logical update model and codec.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Urgency fixed at creation, never downgraded
    - Deterministic main-package heuristic
    - Lossless wire round-trip
============================================================*/

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use quick_xml::escape::unescape;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SynupdError};
use crate::package_info::RawPackageRecord;

pub const FIELD_SEPARATOR: &str = "###";
pub const END_OF_LINE: &str = "---EOL---";
const LIST_SEPARATOR: &str = ", ";
const WIRE_FIELDS: usize = 15;

/// Repository label the distribution publishes its own packages under.
pub const DISTRIBUTION_ORIGIN: &str = "linuxmint";
const UNSTABLE_COMPONENT: &str = "romeo";
const SECURITY_SOURCES: [&str; 3] = ["firefox", "thunderbird", "chromium"];
const KERNEL_SOURCES: [&str; 4] = ["linux", "linux-kernel", "linux-signed", "linux-meta"];

const VARIANT_SUFFIXES: [&str; 8] = [
    "-dev", "-dbg", "-common", "-core", "-data", "-doc", ":i386", ":amd64",
];
const LIBRARY_PREFIXES: [&str; 2] = ["lib", "gir1.2"];
const AUXILIARY_KEYWORDS: [&str; 3] = ["-locale-", "-l10n-", "-help-"];

/// Urgency classification of a logical update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateType {
    Package,
    Security,
    Kernel,
    Unstable,
}

impl UpdateType {
    pub fn as_str(self) -> &'static str {
        match self {
            UpdateType::Package => "package",
            UpdateType::Security => "security",
            UpdateType::Kernel => "kernel",
            UpdateType::Unstable => "unstable",
        }
    }
}

impl fmt::Display for UpdateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for UpdateType {
    type Err = SynupdError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "package" => Ok(UpdateType::Package),
            "security" => Ok(UpdateType::Security),
            "kernel" => Ok(UpdateType::Kernel),
            "unstable" => Ok(UpdateType::Unstable),
            other => Err(SynupdError::WireFormat(format!(
                "Unknown update type `{other}`"
            ))),
        }
    }
}

/// Binary packages sharing one source, presented as a single update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicalUpdate {
    pub display_name: String,
    pub source_name: String,
    pub real_source_name: String,
    pub source_packages: BTreeSet<String>,
    pub main_package_name: String,
    pub package_names: Vec<String>,
    pub new_version: String,
    pub old_version: String,
    pub size: u64,
    pub update_type: UpdateType,
    pub origin: String,
    pub short_description: String,
    pub description: String,
    pub site: String,
    pub archive: String,
}

impl LogicalUpdate {
    /// Start a logical update from its first binary package.
    ///
    /// `alias` replaces the source name the update is grouped and shown
    /// under; the real source name is always kept for tracking.
    pub fn from_package(package: &RawPackageRecord, alias: Option<&str>) -> Self {
        let real_source_name = package.source_name.clone();
        let source_name = alias.map(str::to_string).unwrap_or_else(|| real_source_name.clone());

        let mut update = Self {
            display_name: source_name.clone(),
            source_name,
            real_source_name,
            source_packages: BTreeSet::from([package.source_package()]),
            main_package_name: package.name.clone(),
            package_names: vec![package.name.clone()],
            new_version: package.candidate_version.clone(),
            old_version: package.installed_version.clone().unwrap_or_default(),
            size: package.size,
            update_type: UpdateType::Package,
            origin: String::new(),
            short_description: package.short_description.clone(),
            description: package.description.clone(),
            site: String::new(),
            archive: String::new(),
        };
        update.classify(package);
        update
    }

    fn classify(&mut self, package: &RawPackageRecord) {
        for origin in &package.origins {
            self.origin = match origin.origin.as_str() {
                "Ubuntu" => "ubuntu".to_string(),
                "Debian" => "debian".to_string(),
                other => other.to_string(),
            };
            self.site = origin.site.clone();
            self.archive = origin.archive.clone();

            if (origin.origin == "Ubuntu" && origin.archive.contains("-security"))
                || (origin.origin == "Debian" && origin.label.contains("-Security"))
                || SECURITY_SOURCES.contains(&self.source_name.as_str())
            {
                self.update_type = UpdateType::Security;
                break;
            }
            if origin.origin == DISTRIBUTION_ORIGIN && origin.component == UNSTABLE_COMPONENT {
                self.update_type = UpdateType::Unstable;
                break;
            }
        }

        // Kernel wins over any origin-based classification.
        if package.section == "kernel"
            || package.name.starts_with("linux-headers")
            || KERNEL_SOURCES.contains(&self.real_source_name.as_str())
        {
            self.update_type = UpdateType::Kernel;
        }
    }

    /// Fold another binary package of the same source into this update.
    pub fn add_package(&mut self, package: &RawPackageRecord) {
        self.package_names.push(package.name.clone());
        self.source_packages.insert(package.source_package());
        self.size = self.size.saturating_add(package.size);

        if self.main_package_name.is_empty() || package.name == self.source_name {
            self.overwrite_main_package(package);
            return;
        }
        if self.main_package_name == self.source_name {
            return;
        }
        if self.prefers(&package.name) {
            self.overwrite_main_package(package);
        }
    }

    /// Whether `candidate` represents the software better than the current main package.
    fn prefers(&self, candidate: &str) -> bool {
        let current = self.main_package_name.as_str();
        VARIANT_SUFFIXES
            .iter()
            .any(|suffix| current.ends_with(suffix) && !candidate.ends_with(suffix))
            || LIBRARY_PREFIXES
                .iter()
                .any(|prefix| current.starts_with(prefix) && !candidate.starts_with(prefix))
            || AUXILIARY_KEYWORDS
                .iter()
                .any(|keyword| current.contains(keyword) && !candidate.contains(keyword))
    }

    fn overwrite_main_package(&mut self, package: &RawPackageRecord) {
        self.description = package.description.clone();
        self.short_description = package.short_description.clone();
        self.main_package_name = package.name.clone();
    }

    /// Encode as a single `###`-delimited wire line.
    pub fn to_wire(&self) -> String {
        let fields = [
            self.display_name.clone(),
            self.source_name.clone(),
            self.real_source_name.clone(),
            join_list(self.source_packages.iter()),
            self.main_package_name.clone(),
            join_list(self.package_names.iter()),
            self.new_version.clone(),
            self.old_version.clone(),
            self.size.to_string(),
            self.update_type.to_string(),
            self.origin.clone(),
            self.short_description.clone(),
            self.description.clone(),
            self.site.clone(),
            self.archive.clone(),
        ];

        let mut line = String::new();
        for field in &fields {
            line.push_str(FIELD_SEPARATOR);
            line.push_str(&escape_field(field));
        }
        line.push_str(END_OF_LINE);
        line
    }

    /// Decode a wire line produced by [`LogicalUpdate::to_wire`].
    pub fn parse_wire(input: &str) -> Result<Self> {
        let input = input.trim_end_matches(['\r', '\n']);
        let input = input.strip_suffix(END_OF_LINE).unwrap_or(input);
        let body = input.strip_prefix(FIELD_SEPARATOR).ok_or_else(|| {
            SynupdError::WireFormat("Record does not start with a field separator".into())
        })?;

        let raw: Vec<&str> = body.split(FIELD_SEPARATOR).collect();
        if raw.len() != WIRE_FIELDS {
            return Err(SynupdError::WireFormat(format!(
                "Expected {WIRE_FIELDS} fields, found {}",
                raw.len()
            )));
        }
        let values: Vec<String> = raw.iter().map(|field| unescape_field(field)).collect();

        let size = values[8].parse::<u64>().map_err(|err| {
            SynupdError::WireFormat(format!("Invalid size `{}`: {err}", values[8]))
        })?;

        Ok(Self {
            display_name: values[0].clone(),
            source_name: values[1].clone(),
            real_source_name: values[2].clone(),
            source_packages: split_list(&values[3]).into_iter().collect(),
            main_package_name: values[4].clone(),
            package_names: split_list(&values[5]),
            new_version: values[6].clone(),
            old_version: values[7].clone(),
            size,
            update_type: values[9].parse()?,
            origin: values[10].clone(),
            short_description: values[11].clone(),
            description: values[12].clone(),
            site: values[13].clone(),
            archive: values[14].clone(),
        })
    }
}

fn join_list<'a>(items: impl Iterator<Item = &'a String>) -> String {
    items.map(String::as_str).collect::<Vec<_>>().join(LIST_SEPARATOR)
}

fn split_list(value: &str) -> Vec<String> {
    if value.is_empty() {
        return Vec::new();
    }
    value.split(LIST_SEPARATOR).map(str::to_string).collect()
}

/// Non-ASCII, `&`, `#` and line breaks become numeric character references.
fn escape_field(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if ch.is_ascii() && !matches!(ch, '&' | '#' | '\n' | '\r') {
            escaped.push(ch);
        } else {
            escaped.push_str(&format!("&#{};", ch as u32));
        }
    }
    escaped
}

/// Malformed references leave the field as received.
fn unescape_field(value: &str) -> String {
    match unescape(value) {
        Ok(text) => text.into_owned(),
        Err(_) => value.to_string(),
    }
}
