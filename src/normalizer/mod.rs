//! Record normalization: raw export rows to canonical credentials.
//!
//! Both execution paths go through this module. The local fallback feeds it
//! tokenized file rows; the remote path feeds it the preview records returned
//! by the analysis service so that both produce the same schema.
//!
//! Per row, in order:
//! 1. Type filter (Bitwarden family only): non-`login` rows are skipped
//! 2. Field extraction via the FieldMap, unmapped fields read as empty
//! 3. Email inference from an `@` username
//! 4. Tag inference from the folder column
//! 5. Name inference from the website host, `www.` stripped
//! 6. Strength classification
//! 7. Acceptance gate: rows without name and website are dropped

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::SourceKind;
use crate::field_map::{CanonicalField, FieldMap};
use crate::strength::{classify_password, PasswordStrength};

/// One line of an uploaded file: ordered column name to value pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    cells: Vec<(String, String)>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.cells.push((column.into(), value.into()));
    }

    /// Value of the first cell whose column name matches exactly.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|(_, v)| v.trim().is_empty())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        RawRow {
            cells: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Duplicate classification of a staged record.
///
/// Always `New` when produced locally; the remote preview may report
/// `Duplicate` or `Conflict`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    #[default]
    New,
    Duplicate,
    Conflict,
}

impl RecordStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "new" => Some(RecordStatus::New),
            "duplicate" => Some(RecordStatus::Duplicate),
            "conflict" => Some(RecordStatus::Conflict),
            _ => None,
        }
    }
}

/// Source-independent representation of one login entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalCredential {
    pub id: String,
    pub name: String,
    pub website: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub note: String,
    pub tags: Vec<String>,
    pub strength: PasswordStrength,
    pub status: RecordStatus,
}

/// Aggregate counters for a normalization pass.
///
/// `total` counts emitted records, `skipped` counts rows removed by the type
/// filter or the acceptance gate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizeStats {
    pub total: u32,
    pub new: u32,
    pub duplicate: u32,
    pub conflict: u32,
    pub error: u32,
    pub skipped: u32,
}

impl NormalizeStats {
    fn count(&mut self, status: RecordStatus) {
        self.total += 1;
        match status {
            RecordStatus::New => self.new += 1,
            RecordStatus::Duplicate => self.duplicate += 1,
            RecordStatus::Conflict => self.conflict += 1,
        }
    }

    /// Recount from a record list, keeping `error` and `skipped`.
    pub fn recount(&mut self, records: &[CanonicalCredential]) {
        let (error, skipped) = (self.error, self.skipped);
        *self = NormalizeStats {
            error,
            skipped,
            ..NormalizeStats::default()
        };
        for record in records {
            self.count(record.status);
        }
    }
}

/// Output of a normalization pass, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizeOutput {
    pub records: Vec<CanonicalCredential>,
    pub stats: NormalizeStats,
}

/// Normalize rows of one export into canonical credentials.
pub fn normalize_rows(map: &FieldMap, rows: &[RawRow], kind: SourceKind) -> NormalizeOutput {
    let mut output = NormalizeOutput::default();

    for (_, record) in normalize_indexed(map, rows, kind, &mut output.stats) {
        output.stats.count(record.status);
        output.records.push(record);
    }

    debug!(
        source = kind.id(),
        rows = rows.len(),
        accepted = output.stats.total,
        skipped = output.stats.skipped,
        "Normalized export rows"
    );

    output
}

/// Normalize and keep the index of the row each record came from.
fn normalize_indexed(
    map: &FieldMap,
    rows: &[RawRow],
    kind: SourceKind,
    stats: &mut NormalizeStats,
) -> Vec<(usize, CanonicalCredential)> {
    let mut records = Vec::new();

    for (index, row) in rows.iter().enumerate() {
        match normalize_row(map, row, kind) {
            Some(record) => records.push((index, record)),
            None => stats.skipped += 1,
        }
    }

    records
}

/// Normalize a single row. Returns `None` when the row is filtered out.
pub fn normalize_row(map: &FieldMap, row: &RawRow, kind: SourceKind) -> Option<CanonicalCredential> {
    let read = |field: CanonicalField| -> String {
        map.column(field)
            .and_then(|column| row.get(column))
            .unwrap_or("")
            .to_string()
    };

    if kind.filters_by_type() && map.is_mapped(CanonicalField::Type) {
        let item_type = read(CanonicalField::Type);
        if !item_type.trim().eq_ignore_ascii_case("login") {
            return None;
        }
    }

    let mut name = read(CanonicalField::Name).trim().to_string();
    let website = read(CanonicalField::Website).trim().to_string();
    let username = read(CanonicalField::Username).trim().to_string();
    let mut email = read(CanonicalField::Email).trim().to_string();
    let password = read(CanonicalField::Password);
    let note = read(CanonicalField::Notes);
    let folder = read(CanonicalField::Folder).trim().to_string();

    if email.is_empty() && username.contains('@') {
        email = username.clone();
    }

    let tags = if folder.is_empty() { vec![] } else { vec![folder] };

    if name.is_empty() && !website.is_empty() {
        name = name_from_url(&website).unwrap_or_default();
    }

    let strength = classify_password(&password);

    if name.is_empty() && website.is_empty() {
        return None;
    }

    Some(CanonicalCredential {
        id: generate_record_id(),
        name,
        website,
        username,
        email,
        password,
        note,
        tags,
        strength,
        status: RecordStatus::New,
    })
}

/// Derive a display name from a URL host, without a leading `www.`.
///
/// Returns `None` when the value does not parse as an absolute URL or has
/// no host.
pub fn name_from_url(website: &str) -> Option<String> {
    let parsed = url::Url::parse(website.trim()).ok()?;
    let host = parsed.host_str()?;
    let host = host.strip_prefix("www.").unwrap_or(host);
    if host.is_empty() {
        return None;
    }
    Some(host.to_string())
}

fn generate_record_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// A credential as returned by the remote `/upload` and `/preview` endpoints.
///
/// Every field is optional and accepts the common key spellings; unknown
/// strength or status strings are ignored rather than rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteCredential {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, alias = "title")]
    pub name: Option<String>,
    #[serde(default, alias = "url", alias = "uri")]
    pub website: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default, alias = "notes")]
    pub note: Option<String>,
    #[serde(default)]
    pub folder: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub strength: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl RemoteCredential {
    fn to_raw_row(&self) -> RawRow {
        let cell = |value: &Option<String>| value.clone().unwrap_or_default();
        [
            (CanonicalField::Name, cell(&self.name)),
            (CanonicalField::Website, cell(&self.website)),
            (CanonicalField::Username, cell(&self.username)),
            (CanonicalField::Email, cell(&self.email)),
            (CanonicalField::Password, cell(&self.password)),
            (CanonicalField::Notes, cell(&self.note)),
            (CanonicalField::Folder, cell(&self.folder)),
        ]
        .into_iter()
        .map(|(field, value)| (field.as_str(), value))
        .collect()
    }

    fn parsed_strength(&self) -> Option<PasswordStrength> {
        match self.strength.as_deref()?.trim().to_lowercase().as_str() {
            "weak" => Some(PasswordStrength::Weak),
            "medium" => Some(PasswordStrength::Medium),
            "strong" => Some(PasswordStrength::Strong),
            _ => None,
        }
    }
}

/// Adapt remote preview records through the shared normalizer.
///
/// The remote id, status, tags and strength override the locally derived
/// values when present.
pub fn normalize_remote_preview(records: &[RemoteCredential]) -> NormalizeOutput {
    let rows: Vec<RawRow> = records.iter().map(RemoteCredential::to_raw_row).collect();
    let map = FieldMap::canonical();

    let mut output = NormalizeOutput::default();
    let indexed = normalize_indexed(&map, &rows, SourceKind::GenericCsv, &mut output.stats);

    for (index, mut record) in indexed {
        let remote = &records[index];

        if let Some(id) = remote.id.as_ref().filter(|id| !id.trim().is_empty()) {
            record.id = id.clone();
        }
        if let Some(status) = remote.status.as_deref().and_then(RecordStatus::parse) {
            record.status = status;
        }
        if let Some(tags) = remote.tags.as_ref().filter(|t| !t.is_empty()) {
            record.tags = tags.clone();
        }
        if let Some(strength) = remote.parsed_strength() {
            record.strength = strength;
        }

        output.stats.count(record.status);
        output.records.push(record);
    }

    output
}
