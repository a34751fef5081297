//! Merge strategies offered at review time.
//!
//! The client stores and forwards the chosen strategy verbatim. Duplicate
//! detection and the merge itself are performed by the remote merge service;
//! the descriptions below are the contract shown to the user.

use serde::{Deserialize, Serialize};

/// How an incoming record reconciles with an existing vault entry of the
/// same identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    /// Combine incoming and existing fields, preferring the more complete or
    /// more recent value per field.
    #[default]
    SmartMerge,
    /// Import only genuinely new records.
    Skip,
    /// Import duplicates as new entries with a disambiguating name suffix.
    Rename,
    /// Replace the existing vault entry with the incoming record.
    Overwrite,
}

impl MergeStrategy {
    pub const ALL: [MergeStrategy; 4] = [
        MergeStrategy::SmartMerge,
        MergeStrategy::Skip,
        MergeStrategy::Rename,
        MergeStrategy::Overwrite,
    ];

    /// Wire name, as sent in the `mergeStrategy` field of `/import`.
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeStrategy::SmartMerge => "smart_merge",
            MergeStrategy::Skip => "skip",
            MergeStrategy::Rename => "rename",
            MergeStrategy::Overwrite => "overwrite",
        }
    }

    /// Parse a wire name. Accepts `smart-merge` and `smartMerge` spellings.
    pub fn parse(value: &str) -> Option<Self> {
        let normalized: String = value
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase();

        match normalized.as_str() {
            "smartmerge" => Some(MergeStrategy::SmartMerge),
            "skip" => Some(MergeStrategy::Skip),
            "rename" => Some(MergeStrategy::Rename),
            "overwrite" => Some(MergeStrategy::Overwrite),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MergeStrategy::SmartMerge => "Smart merge",
            MergeStrategy::Skip => "Skip duplicates",
            MergeStrategy::Rename => "Keep both",
            MergeStrategy::Overwrite => "Overwrite existing",
        }
    }

    /// User-facing description of what the merge service does with
    /// duplicates under this strategy.
    pub fn description(&self) -> &'static str {
        match self {
            MergeStrategy::SmartMerge => {
                "Combines fields from the imported entry and the matching vault entry, keeping the more complete or more recent value for each field."
            }
            MergeStrategy::Skip => {
                "Duplicates are not imported. Only entries that do not exist in your vault are added."
            }
            MergeStrategy::Rename => {
                "Duplicates are imported as new entries with a suffix added to their name."
            }
            MergeStrategy::Overwrite => {
                "Duplicates replace the matching entry in your vault."
            }
        }
    }
}

impl std::fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names_round_trip_through_parse() {
        for strategy in MergeStrategy::ALL {
            assert_eq!(MergeStrategy::parse(strategy.as_str()), Some(strategy));
        }
        assert_eq!(MergeStrategy::parse("smart-merge"), Some(MergeStrategy::SmartMerge));
        assert_eq!(MergeStrategy::parse("smartMerge"), Some(MergeStrategy::SmartMerge));
        assert_eq!(MergeStrategy::parse("replace"), None);
    }

    #[test]
    fn test_default_is_smart_merge() {
        assert_eq!(MergeStrategy::default(), MergeStrategy::SmartMerge);
    }

    #[test]
    fn test_serde_matches_wire_name() {
        let json = serde_json::to_string(&MergeStrategy::SmartMerge).unwrap();
        assert_eq!(json, "\"smart_merge\"");
        let parsed: MergeStrategy = serde_json::from_str("\"overwrite\"").unwrap();
        assert_eq!(parsed, MergeStrategy::Overwrite);
    }
}
