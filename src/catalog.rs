//! Import source and export format catalog.
//!
//! A hardcoded default catalog is always available. The remote `/options`
//! endpoint may replace it for the lifetime of a workflow instance.

use serde::{Deserialize, Serialize};

use crate::merge_strategy::MergeStrategy;

/// Export dialects with a dedicated alias table.
///
/// Any source id outside this closed set (server-declared extras included)
/// resolves to `GenericCsv`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    Bitwarden,
    Vaultwarden,
    Lastpass,
    Google,
    GenericCsv,
}

impl SourceKind {
    pub fn from_id(id: &str) -> Self {
        match id.trim().to_lowercase().as_str() {
            "bitwarden" => SourceKind::Bitwarden,
            "vaultwarden" => SourceKind::Vaultwarden,
            "lastpass" => SourceKind::Lastpass,
            "google" => SourceKind::Google,
            _ => SourceKind::GenericCsv,
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            SourceKind::Bitwarden => "bitwarden",
            SourceKind::Vaultwarden => "vaultwarden",
            SourceKind::Lastpass => "lastpass",
            SourceKind::Google => "google",
            SourceKind::GenericCsv => "generic-csv",
        }
    }

    /// Bitwarden-family exports mix logins with notes, cards and identities.
    pub fn filters_by_type(&self) -> bool {
        matches!(self, SourceKind::Bitwarden | SourceKind::Vaultwarden)
    }
}

/// Descriptor for a credential manager the user can import from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSource {
    pub id: String,
    #[serde(alias = "displayName", alias = "name")]
    pub display_name: String,
    #[serde(default, alias = "requiresPassword")]
    pub requires_password: bool,
    #[serde(default, alias = "colorHint", alias = "color")]
    pub color_hint: Option<String>,
}

impl ImportSource {
    pub fn new(id: &str, display_name: &str, requires_password: bool, color_hint: &str) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            requires_password,
            color_hint: Some(color_hint.to_string()),
        }
    }

    pub fn kind(&self) -> SourceKind {
        SourceKind::from_id(&self.id)
    }
}

/// Target format for a vault export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportFormat {
    pub id: String,
    #[serde(alias = "displayName", alias = "name")]
    pub display_name: String,
    #[serde(default, alias = "supportsEncryption")]
    pub supports_encryption: bool,
}

impl ExportFormat {
    pub fn new(id: &str, display_name: &str, supports_encryption: bool) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            supports_encryption,
        }
    }
}

/// The only export format that may be encrypted.
pub const ENCRYPTABLE_FORMAT: &str = "firekey";

/// Sources, formats and strategies offered to the user for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub import_sources: Vec<ImportSource>,
    pub export_formats: Vec<ExportFormat>,
    pub merge_strategies: Vec<MergeStrategy>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            import_sources: default_import_sources(),
            export_formats: default_export_formats(),
            merge_strategies: MergeStrategy::ALL.to_vec(),
        }
    }
}

impl Catalog {
    pub fn find_source(&self, id: &str) -> Option<&ImportSource> {
        self.import_sources
            .iter()
            .find(|s| s.id.eq_ignore_ascii_case(id.trim()))
    }

    pub fn find_format(&self, id: &str) -> Option<&ExportFormat> {
        self.export_formats
            .iter()
            .find(|f| f.id.eq_ignore_ascii_case(id.trim()))
    }

    /// Build a catalog from a remote `/options` payload.
    ///
    /// Empty lists fall back to the defaults individually; unknown strategy
    /// names are dropped.
    pub fn from_options(
        import_sources: Vec<ImportSource>,
        export_formats: Vec<ExportFormat>,
        merge_strategies: &[String],
    ) -> Self {
        let defaults = Catalog::default();

        let strategies: Vec<MergeStrategy> = merge_strategies
            .iter()
            .filter_map(|s| MergeStrategy::parse(s))
            .collect();

        Self {
            import_sources: if import_sources.is_empty() {
                defaults.import_sources
            } else {
                import_sources
            },
            export_formats: if export_formats.is_empty() {
                defaults.export_formats
            } else {
                export_formats
            },
            merge_strategies: if strategies.is_empty() {
                defaults.merge_strategies
            } else {
                strategies
            },
        }
    }
}

pub fn default_import_sources() -> Vec<ImportSource> {
    vec![
        ImportSource::new("bitwarden", "Bitwarden", false, "#175DDC"),
        ImportSource::new("vaultwarden", "Vaultwarden", false, "#0D6EFD"),
        ImportSource::new("lastpass", "LastPass", false, "#D32D27"),
        ImportSource::new("google", "Google Password Manager", false, "#4285F4"),
        ImportSource::new("generic-csv", "Generic CSV", false, "#6B7280"),
        ImportSource::new("firekey", "FireKey Backup", true, "#F97316"),
    ]
}

pub fn default_export_formats() -> Vec<ExportFormat> {
    vec![
        ExportFormat::new("csv", "CSV", false),
        ExportFormat::new("json", "JSON", false),
        ExportFormat::new(ENCRYPTABLE_FORMAT, "FireKey Backup", true),
    ]
}
