/*============================================================
  Synavera Project: Syn-Upd
  Module: synupd_core::keyfile
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1
  ------------------------------------------------------------
  Purpose:
    Expose a Flatpak ref's build/runtime manifest as a small
    group/key lookup capability.

  Security / Safety Notes:
    Parsing is best-effort; unreadable lines are ignored.

  Dependencies:
    serde, to carry manifests through the JSON wire format.

  Operational Scope:
    Queried by the Flatpak hierarchy merge for extension and
    runtime membership only.

  Revision History:
    2025-11-12 COD  Authored manifest capability.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Manifest format hidden behind a trait
    - Lossless re-serialisation of parsed documents
============================================================*/

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Read-only view of a grouped key/value manifest.
pub trait MetadataDocument {
    /// Group names in document order.
    fn groups(&self) -> Vec<String>;

    /// Raw value of `key` in `group`.
    fn get_string(&self, group: &str, key: &str) -> Option<String>;

    /// `;`-separated list value; empty items are dropped.
    fn get_string_list(&self, group: &str, key: &str) -> Option<Vec<String>> {
        self.get_string(group, key).map(|value| {
            value
                .split(';')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect()
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Group {
    name: String,
    entries: Vec<(String, String)>,
}

/// GLib-style key file (`[Group]` headers, `key=value` lines).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyFile {
    groups: Vec<Group>,
}

impl KeyFile {
    pub fn parse(data: &str) -> Self {
        let mut groups: Vec<Group> = Vec::new();

        for line in data.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some(name) = line.strip_prefix('[').and_then(|rest| rest.strip_suffix(']')) {
                groups.push(Group {
                    name: name.to_string(),
                    entries: Vec::new(),
                });
                continue;
            }
            let (Some(group), Some((key, value))) = (groups.last_mut(), line.split_once('=')) else {
                continue;
            };
            group
                .entries
                .push((key.trim().to_string(), value.trim().to_string()));
        }

        Self { groups }
    }

    pub fn to_data(&self) -> String {
        let mut out = String::new();
        for (index, group) in self.groups.iter().enumerate() {
            if index > 0 {
                out.push('\n');
            }
            out.push_str(&format!("[{}]\n", group.name));
            for (key, value) in &group.entries {
                out.push_str(&format!("{key}={value}\n"));
            }
        }
        out
    }
}

impl MetadataDocument for KeyFile {
    fn groups(&self) -> Vec<String> {
        self.groups.iter().map(|group| group.name.clone()).collect()
    }

    fn get_string(&self, group: &str, key: &str) -> Option<String> {
        self.groups
            .iter()
            .filter(|g| g.name == group)
            .flat_map(|g| g.entries.iter())
            .find(|(k, _)| k == key)
            .map(|(_, value)| value.clone())
    }
}

impl Serialize for KeyFile {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_data())
    }
}

impl<'de> Deserialize<'de> for KeyFile {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let data = String::deserialize(deserializer)?;
        Ok(KeyFile::parse(&data))
    }
}
