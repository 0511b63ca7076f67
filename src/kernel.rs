/*============================================================
  Synavera Project: Syn-Upd
  Module: synupd_core::kernel
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Normalise kernel version strings into zero-padded sort
    keys so kernel updates order the way releases do.

  Security / Safety Notes:
    Pure string manipulation; never fails on odd input.

  Dependencies:
    None beyond std.

  Operational Scope:
    Used when ordering and grouping kernel-type updates.

  Revision History:
    2025-11-12 COD  Authored kernel version keys.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Total ordering even for unparseable input
    - Deterministic keys for reproducible listings
============================================================*/

use std::cmp::Ordering;
use std::fmt;

const FIELD_LENGTH: usize = 3;
const MIN_FIELDS: usize = 4;
const RELEASE_SUFFIX: &str = "z";

/// Pre-releases order below the final release of the same numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Release {
    Candidate(u64),
    Final,
}

/// Comparable key derived from a raw kernel version string.
#[derive(Debug, Clone)]
pub struct KernelVersion {
    version: String,
    version_id: Vec<String>,
    numbers: Vec<u64>,
    release: Release,
}

impl KernelVersion {
    pub fn new(version: &str) -> Self {
        let components: Vec<&str> = version.split(['.', '-']).collect();

        // An `rc` component marks a pre-release; anything else is final.
        let candidate = components.iter().find(|part| part.starts_with("rc"));
        let suffix = candidate
            .map(|part| part.to_string())
            .unwrap_or_else(|| RELEASE_SUFFIX.to_string());
        let release = match candidate {
            Some(part) => Release::Candidate(leading_number(&part[2..])),
            None => Release::Final,
        };

        let numeric: Vec<&str> = components
            .iter()
            .copied()
            .filter(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()))
            .collect();

        let mut numbers: Vec<u64> = numeric.iter().map(|part| leading_number(part)).collect();
        while numbers.len() < MIN_FIELDS {
            numbers.push(0);
        }

        let mut version_id: Vec<String> = numeric
            .iter()
            .map(|part| format!("{part:0>width$}", width = FIELD_LENGTH))
            .collect();

        while version_id.len() < MIN_FIELDS {
            version_id.push("0".repeat(FIELD_LENGTH));
        }

        if version_id.len() == MIN_FIELDS {
            let compact: String = version_id[..3].iter().map(|field| compact_field(field)).collect();
            version_id.push(format!("{compact}{suffix}"));
        } else if version_id[MIN_FIELDS].len() == 2 * FIELD_LENGTH {
            version_id[MIN_FIELDS].push_str(&suffix);
        }

        Self {
            version: version.to_string(),
            version_id,
            numbers,
            release,
        }
    }

    /// The raw string this key was built from.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Zero-padded fields in comparison order.
    pub fn version_id(&self) -> &[String] {
        &self.version_id
    }

    /// Major, minor and patch fields.
    pub fn series(&self) -> (&str, &str, &str) {
        (&self.version_id[0], &self.version_id[1], &self.version_id[2])
    }

    /// Major and minor fields, grouping kernels of one minor line.
    pub fn short_series(&self) -> (&str, &str) {
        (&self.version_id[0], &self.version_id[1])
    }

    /// Dotted form of the key, e.g. `005.015.000.091.051500z`.
    pub fn key(&self) -> String {
        self.version_id.join(".")
    }
}

/// Digits at the start of `text`; saturates on absurdly long fields.
fn leading_number(text: &str) -> u64 {
    text.chars()
        .take_while(char::is_ascii_digit)
        .filter_map(|c| c.to_digit(10))
        .fold(0u64, |total, digit| {
            total.saturating_mul(10).saturating_add(u64::from(digit))
        })
}

/// Drops the leading zero of a padded field: `005` -> `05`, `100` -> `100`.
fn compact_field(field: &str) -> String {
    let split = FIELD_LENGTH - 2;
    if field.len() <= split {
        return field.to_string();
    }
    let (head, tail) = field.split_at(split);
    format!("{}{}", head.trim_start_matches('0'), tail)
}

impl PartialEq for KernelVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for KernelVersion {}

impl PartialOrd for KernelVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for KernelVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.numbers
            .cmp(&other.numbers)
            .then(self.release.cmp(&other.release))
    }
}

impl fmt::Display for KernelVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pads_fields_and_appends_release_marker() {
        let kernel = KernelVersion::new("5.15.0-generic");
        assert_eq!(kernel.version_id(), ["005", "015", "000", "000", "051500z"]);
        assert_eq!(kernel.series(), ("005", "015", "000"));
        assert_eq!(kernel.short_series(), ("005", "015"));
        assert_eq!(kernel.version(), "5.15.0-generic");
    }

    #[test]
    fn test_minor_versions_order_numerically() {
        assert!(KernelVersion::new("5.9.0") < KernelVersion::new("5.10.0"));
        assert!(KernelVersion::new("5.15.0-91-generic") < KernelVersion::new("5.15.0-92-generic"));
    }

    #[test]
    fn test_release_sorts_above_its_rc() {
        for base in ["5.10.0", "6.8.0", "4.19.255", "5.15.0-91", "5.15.0-91.101", "6.1.0.2.3"] {
            let release = KernelVersion::new(base);
            let candidate = KernelVersion::new(&format!("{base}-rc1"));
            assert!(release > candidate, "{base} should sort above its rc");
        }
        assert!(KernelVersion::new("5.10.0-rc7") < KernelVersion::new("5.10.0"));
        assert!(KernelVersion::new("5.10.0-rc7") > KernelVersion::new("5.9.0"));
    }

    #[test]
    fn test_abi_suffix_fields_are_kept() {
        let kernel = KernelVersion::new("5.15.0-91.101");
        assert_eq!(kernel.version_id(), ["005", "015", "000", "091", "101"]);
        assert_eq!(kernel.key(), "005.015.000.091.101");
    }

    #[test]
    fn test_extra_numeric_fields_sort_above_their_prefix() {
        let release = KernelVersion::new("6.8.0-45.45");
        let extended = KernelVersion::new("6.8.0-45.45.1");
        assert!(release < extended);
        assert!(KernelVersion::new("6.8.0-45.45.1-rc1") < extended);
        assert!(KernelVersion::new("6.8.0-45.45.1-rc1") > release);
        assert!(KernelVersion::new("5.15.0-91") < KernelVersion::new("5.15.0-91.101"));
    }

    #[test]
    fn test_release_candidates_order_numerically() {
        assert!(KernelVersion::new("6.9.0-rc9") < KernelVersion::new("6.9.0-rc10"));
        assert_eq!(KernelVersion::new("5.10.0"), KernelVersion::new("5.10.0-generic"));
        assert_ne!(KernelVersion::new("5.10.0"), KernelVersion::new("5.10.0-rc1"));
    }

    #[test]
    fn test_six_digit_fifth_field_takes_suffix() {
        let kernel = KernelVersion::new("6.5.0.14.202311");
        assert_eq!(kernel.version_id()[4], "202311z");
    }

    #[test]
    fn test_unparseable_version_still_produces_key() {
        let kernel = KernelVersion::new("not-a-kernel");
        assert_eq!(kernel.version_id(), ["000", "000", "000", "000", "000000z"]);
        assert!(kernel < KernelVersion::new("2.6.32"));

        let empty = KernelVersion::new("");
        assert_eq!(empty.version_id().len(), 5);
    }

    #[test]
    fn test_wide_fields_keep_their_digits() {
        let kernel = KernelVersion::new("100.2.1000");
        assert_eq!(kernel.version_id()[..3], ["100", "002", "1000"]);
        assert_eq!(kernel.version_id()[4], "100021000z");
    }
}
