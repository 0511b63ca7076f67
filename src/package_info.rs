/*============================================================
  Synavera Project: Syn-Upd
  Module: synupd_core::package_info
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Shared structures describing the raw per-binary-package
    candidates emitted by the package-manager scanner.

  Security / Safety Notes:
    Pure data container; no I/O performed in this module.

  Dependencies:
    serde for decoding scanner output.

  Operational Scope:
    Consumed by the aggregation pass that folds binary
    packages into logical updates.

  Revision History:
    2025-11-12 COD  Introduced RawPackageRecord contract.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Clear data contracts between modules
    - Serializable structures for collaborator input
============================================================*/

use serde::{Deserialize, Serialize};

/// One archive a candidate version can be fetched from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageOrigin {
    pub origin: String,
    pub label: String,
    pub archive: String,
    pub site: String,
    pub component: String,
}

/// Candidate metadata for a single binary package, immutable once read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawPackageRecord {
    pub name: String,
    pub candidate_version: String,
    pub installed_version: Option<String>,
    pub size: u64,
    pub source_name: String,
    pub source_version: String,
    pub section: String,
    pub origins: Vec<PackageOrigin>,
    pub short_description: String,
    pub description: String,
}

impl RawPackageRecord {
    /// `true` when the candidate is already installed.
    pub fn is_current(&self) -> bool {
        self.installed_version.as_deref() == Some(self.candidate_version.as_str())
    }

    /// `name=version` identity of the source package.
    pub fn source_package(&self) -> String {
        format!("{}={}", self.source_name, self.source_version)
    }
}
