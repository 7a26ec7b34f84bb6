use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use dast_hash::{FingerprintPolicy, DEFAULT_MAX_DEPTH};

/// Position and annotation fields of Python syntax trees that carry no
/// program meaning.
pub const DEFAULT_IGNORED_FIELDS: [&str; 6] = [
    "lineno",
    "col_offset",
    "end_lineno",
    "end_col_offset",
    "type_comment",
    "type_ignores",
];

/// Minimum similarity for pairing a removed element with an added one.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.5;

/// Configuration for one diff invocation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffConfig {
    /// Field names excluded from equality and never reported as changed.
    pub ignored_fields: BTreeSet<String>,
    /// Field names whose sequences compare as multisets.
    pub unordered_fields: BTreeSet<String>,
    /// Pair removed and added elements into moves instead of reporting
    /// them separately.
    pub detect_reorders: bool,
    /// When reorders are detected, also pair elements that are similar but
    /// not equal, and diff inside them. `None` keeps only exact moves.
    pub similarity_threshold: Option<f64>,
    /// Maximum nesting depth of either tree.
    pub max_depth: usize,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            ignored_fields: DEFAULT_IGNORED_FIELDS.iter().map(|f| f.to_string()).collect(),
            unordered_fields: BTreeSet::new(),
            detect_reorders: true,
            similarity_threshold: Some(DEFAULT_SIMILARITY_THRESHOLD),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl DiffConfig {
    /// Compare every field and report only additions, removals and changes.
    pub fn strict() -> Self {
        Self {
            ignored_fields: BTreeSet::new(),
            detect_reorders: false,
            similarity_threshold: None,
            ..Default::default()
        }
    }

    /// The fingerprinting policy implied by this configuration.
    pub fn policy(&self) -> FingerprintPolicy {
        FingerprintPolicy {
            ignored_fields: self.ignored_fields.clone(),
            unordered_fields: self.unordered_fields.clone(),
            max_depth: self.max_depth,
        }
    }

    pub fn is_ignored(&self, field: &str) -> bool {
        self.ignored_fields.contains(field)
    }

    pub fn is_unordered(&self, field: &str) -> bool {
        self.unordered_fields.contains(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ignores_positions_and_detects_reorders() {
        let config = DiffConfig::default();
        assert!(config.is_ignored("lineno"));
        assert!(config.is_ignored("end_col_offset"));
        assert!(!config.is_ignored("id"));
        assert!(config.detect_reorders);
        assert_eq!(config.similarity_threshold, Some(0.5));
        assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn strict_compares_everything() {
        let config = DiffConfig::strict();
        assert!(config.ignored_fields.is_empty());
        assert!(!config.detect_reorders);
        assert!(config.similarity_threshold.is_none());
    }

    #[test]
    fn policy_mirrors_config() {
        let mut config = DiffConfig::default();
        config.unordered_fields.insert("keywords".into());
        config.max_depth = 64;
        let policy = config.policy();
        assert!(policy.is_ignored("col_offset"));
        assert!(policy.is_unordered("keywords"));
        assert_eq!(policy.max_depth, 64);
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config: DiffConfig = serde_json::from_str(r#"{"detect_reorders": false}"#).unwrap();
        assert!(!config.detect_reorders);
        assert!(config.is_ignored("lineno"));
    }
}
