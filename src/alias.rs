/*============================================================
  Synavera Project: Syn-Upd
  Module: synupd_core::alias
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1
  ------------------------------------------------------------
  Purpose:
    Rename logical updates whose source package name means
    little to users (e.g. `firefox-esr` shown as `firefox`).

  Security / Safety Notes:
    Alias text comes from operator configuration only.

  Dependencies:
    serde for configuration decoding.

  Operational Scope:
    Applied by the aggregation pass when an update is created.

  Revision History:
    2025-11-12 COD  Introduced alias table.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Configuration over hard-coded renames
============================================================*/

use std::collections::BTreeMap;

use serde::Deserialize;

/// Presentation override for one real source name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Alias {
    pub name: Option<String>,
    pub short_description: Option<String>,
    pub description: Option<String>,
}

impl Alias {
    pub fn new(
        name: Option<&str>,
        short_description: Option<&str>,
        description: Option<&str>,
    ) -> Self {
        Self {
            name: process_text(name),
            short_description: process_text(short_description),
            description: process_text(description),
        }
    }

    /// Same alias with translation markers unwrapped and whitespace trimmed.
    pub fn normalized(&self) -> Self {
        Self::new(
            self.name.as_deref(),
            self.short_description.as_deref(),
            self.description.as_deref(),
        )
    }
}

/// Aliases keyed by real source name.
pub type AliasTable = BTreeMap<String, Alias>;

/// Strip a `_("...")` gettext marker and surrounding whitespace.
fn process_text(text: Option<&str>) -> Option<String> {
    let text = text?.trim();
    if text.is_empty() {
        return None;
    }
    let unwrapped = text
        .strip_prefix("_(\"")
        .and_then(|rest| rest.strip_suffix("\")"))
        .unwrap_or(text);
    Some(unwrapped.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translation_marker_is_unwrapped() {
        let alias = Alias::new(
            Some("  _(\"Web Browser\") "),
            Some("_(\"Browse the web\")"),
            Some("Plain text"),
        );
        assert_eq!(alias.name.as_deref(), Some("Web Browser"));
        assert_eq!(alias.short_description.as_deref(), Some("Browse the web"));
        assert_eq!(alias.description.as_deref(), Some("Plain text"));
    }

    #[test]
    fn test_blank_fields_are_dropped() {
        let alias = Alias::new(Some("   "), None, Some(""));
        assert_eq!(alias, Alias::default());
    }
}
