//! Field-alias resolution: maps the header row of an export onto the
//! canonical credential fields.
//!
//! Resolution is pure and never fails. An all-`None` map is a valid result
//! that yields zero usable records downstream.

mod aliases;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::catalog::SourceKind;
pub use aliases::AliasTable;
use aliases::aliases_for;

/// Fields of the canonical credential schema that can be read from a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    Name,
    Website,
    Username,
    Email,
    Password,
    Notes,
    Folder,
    Type,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 8] = [
        CanonicalField::Name,
        CanonicalField::Website,
        CanonicalField::Username,
        CanonicalField::Email,
        CanonicalField::Password,
        CanonicalField::Notes,
        CanonicalField::Folder,
        CanonicalField::Type,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalField::Name => "name",
            CanonicalField::Website => "website",
            CanonicalField::Username => "username",
            CanonicalField::Email => "email",
            CanonicalField::Password => "password",
            CanonicalField::Notes => "notes",
            CanonicalField::Folder => "folder",
            CanonicalField::Type => "type",
        }
    }
}

/// Canonical field to source column. Every canonical field is always
/// present; unmapped fields hold `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<CanonicalField, Option<String>>")]
pub struct FieldMap(BTreeMap<CanonicalField, Option<String>>);

impl From<BTreeMap<CanonicalField, Option<String>>> for FieldMap {
    fn from(mut map: BTreeMap<CanonicalField, Option<String>>) -> Self {
        for field in CanonicalField::ALL {
            map.entry(field).or_insert(None);
        }
        FieldMap(map)
    }
}

impl Default for FieldMap {
    fn default() -> Self {
        FieldMap::from(BTreeMap::new())
    }
}

impl FieldMap {
    /// Source column mapped to `field`, if any.
    pub fn column(&self, field: CanonicalField) -> Option<&str> {
        self.0.get(&field).and_then(|c| c.as_deref())
    }

    pub fn is_mapped(&self, field: CanonicalField) -> bool {
        self.column(field).is_some()
    }

    pub fn mapped_count(&self) -> usize {
        self.0.values().filter(|c| c.is_some()).count()
    }

    pub fn set(&mut self, field: CanonicalField, column: Option<String>) {
        self.0.insert(field, column);
    }

    pub fn iter(&self) -> impl Iterator<Item = (CanonicalField, Option<&str>)> {
        self.0.iter().map(|(f, c)| (*f, c.as_deref()))
    }

    /// Identity map over the canonical field names, used for records that
    /// are already in canonical shape (remote previews).
    pub fn canonical() -> Self {
        let mut map = FieldMap::default();
        for field in CanonicalField::ALL {
            map.set(field, Some(field.as_str().to_string()));
        }
        map
    }
}

/// Resolve a header row against the alias table of a source.
///
/// Matching is case-insensitive and ignores surrounding whitespace. The
/// returned column names are the literal headers so rows can be read
/// without further normalization.
pub fn resolve_field_map(kind: SourceKind, headers: &[String]) -> FieldMap {
    resolve_with_table(aliases_for(kind), headers)
}

fn resolve_with_table(table: AliasTable, headers: &[String]) -> FieldMap {
    let mut map = FieldMap::default();

    for (field, aliases) in table {
        let column = aliases.iter().find_map(|alias| {
            headers
                .iter()
                .find(|header| header.trim().eq_ignore_ascii_case(alias))
                .cloned()
        });
        map.set(*field, column);
    }

    map
}

/// Recognize an export dialect from its header signature.
///
/// Returns `None` when the headers carry no distinctive signature; callers
/// then keep the generic table.
pub fn detect_source(headers: &[String]) -> Option<SourceKind> {
    let set: HashSet<String> = headers
        .iter()
        .map(|h| h.trim().to_lowercase())
        .filter(|h| !h.is_empty())
        .collect();
    let has = |name: &str| set.contains(name);

    if has("login_uri") && has("login_password") {
        return Some(SourceKind::Bitwarden);
    }

    if has("url") && has("grouping") && has("extra") {
        return Some(SourceKind::Lastpass);
    }

    let google_required = ["name", "url", "username", "password"];
    if google_required.iter().all(|h| has(h))
        && set
            .iter()
            .all(|h| google_required.contains(&h.as_str()) || h == "note")
    {
        return Some(SourceKind::Google);
    }

    None
}

/// Input of [`resolve_field_map_json`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMapInput {
    #[serde(alias = "source_id")]
    pub source_id: String,
    pub headers: Vec<String>,
}

/// JSON-in/JSON-out wrapper around [`resolve_field_map`] for the bindings.
pub fn resolve_field_map_json(input_json: &str) -> Result<String, String> {
    let input: FieldMapInput = serde_json::from_str(input_json).map_err(|e| e.to_string())?;
    let map = resolve_field_map(SourceKind::from_id(&input.source_id), &input.headers);
    serde_json::to_string(&map).map_err(|e| e.to_string())
}
