//! Client-side parsing of export files, used when remote analysis is
//! unavailable or returns nothing.
//!
//! CSV files are read with a header row, comma delimiter and double-quote
//! escaping. Unencrypted Bitwarden/Vaultwarden JSON exports are also
//! accepted and converted to rows under the Bitwarden CSV headers, so both
//! shapes go through the same resolver and normalizer.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::catalog::SourceKind;
use crate::error::{ImportError, ImportResult};
use crate::field_map::{detect_source, resolve_field_map, FieldMap};
use crate::normalizer::{normalize_rows, NormalizeOutput, RawRow};

const UTF8_BOM: char = '\u{feff}';

/// Tokenized file content: header row plus data rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenizedFile {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

/// Result of a local parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalParseOutput {
    /// Dialect whose alias table was used
    pub effective_source: SourceKind,
    pub field_map: FieldMap,
    pub normalized: NormalizeOutput,
}

/// Parse an uploaded file entirely on the client.
///
/// Fails with `Format` when the content cannot be tokenized or yields no
/// header columns or no rows. A parse that succeeds but whose rows are all
/// dropped by normalization returns an empty record set, not an error.
pub fn parse_local_export(content: &[u8], source_id: &str) -> ImportResult<LocalParseOutput> {
    let text = decode(content)?;
    let requested = SourceKind::from_id(source_id);

    let tokenized = if looks_like_json(text) {
        tokenize_bitwarden_json(text)?
    } else {
        tokenize_csv(text)?
    };

    if tokenized.headers.is_empty() {
        return Err(ImportError::Format("File has no header columns".to_string()));
    }
    if tokenized.rows.is_empty() {
        return Err(ImportError::Format("File contains no data rows".to_string()));
    }

    let effective_source = refine_source(requested, &tokenized.headers);
    let field_map = resolve_field_map(effective_source, &tokenized.headers);
    let normalized = normalize_rows(&field_map, &tokenized.rows, effective_source);

    debug!(
        source = source_id,
        effective = effective_source.id(),
        columns = tokenized.headers.len(),
        mapped = field_map.mapped_count(),
        rows = tokenized.rows.len(),
        accepted = normalized.records.len(),
        "Parsed export locally"
    );

    Ok(LocalParseOutput {
        effective_source,
        field_map,
        normalized,
    })
}

/// Input of [`parse_local_export_json`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalParseInput {
    /// File content as text
    pub content: String,
    #[serde(alias = "source_id")]
    pub source_id: String,
}

/// JSON-in/JSON-out wrapper around [`parse_local_export`] for the bindings.
pub fn parse_local_export_json(input_json: &str) -> Result<String, String> {
    let input: LocalParseInput = serde_json::from_str(input_json).map_err(|e| e.to_string())?;
    let output =
        parse_local_export(input.content.as_bytes(), &input.source_id).map_err(|e| e.to_string())?;
    serde_json::to_string(&output).map_err(|e| e.to_string())
}

/// Only a generic source is refined by header detection; an explicitly
/// chosen dialect is kept as is.
fn refine_source(requested: SourceKind, headers: &[String]) -> SourceKind {
    if requested != SourceKind::GenericCsv {
        return requested;
    }
    match detect_source(headers) {
        Some(detected) => {
            debug!(detected = detected.id(), "Detected export dialect from headers");
            detected
        }
        None => requested,
    }
}

fn decode(content: &[u8]) -> ImportResult<&str> {
    let text = std::str::from_utf8(content)
        .map_err(|e| ImportError::Format(format!("File is not valid UTF-8: {}", e)))?;
    Ok(text.strip_prefix(UTF8_BOM).unwrap_or(text))
}

fn looks_like_json(text: &str) -> bool {
    text.trim_start().starts_with('{')
}

/// Tokenize delimited text with a header row.
///
/// Blank lines and rows whose cells are all empty are skipped. Short rows
/// read their missing cells as empty strings.
pub fn tokenize_csv(text: &str) -> ImportResult<TokenizedFile> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b',')
        .quote(b'"')
        .double_quote(true)
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(String::from).collect();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Ok(TokenizedFile::default());
    }

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let row: RawRow = headers
            .iter()
            .enumerate()
            .map(|(i, header)| (header.clone(), record.get(i).unwrap_or("").to_string()))
            .collect();

        if row.is_blank() {
            continue;
        }
        rows.push(row);
    }

    Ok(TokenizedFile { headers, rows })
}

/// Columns emitted for each Bitwarden JSON item.
const BITWARDEN_JSON_COLUMNS: [&str; 7] = [
    "folder",
    "type",
    "name",
    "notes",
    "login_uri",
    "login_username",
    "login_password",
];

#[derive(Debug, Deserialize)]
struct BitwardenExport {
    #[serde(default)]
    encrypted: bool,
    #[serde(default)]
    folders: Vec<BitwardenFolder>,
    #[serde(default)]
    items: Option<Vec<BitwardenItem>>,
}

#[derive(Debug, Deserialize)]
struct BitwardenFolder {
    id: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BitwardenItem {
    #[serde(rename = "type", default)]
    item_type: u8,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    folder_id: Option<String>,
    #[serde(default)]
    login: Option<BitwardenLogin>,
}

#[derive(Debug, Default, Deserialize)]
struct BitwardenLogin {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    uris: Option<Vec<BitwardenUri>>,
}

#[derive(Debug, Deserialize)]
struct BitwardenUri {
    #[serde(default)]
    uri: Option<String>,
}

fn bitwarden_type_name(item_type: u8) -> &'static str {
    match item_type {
        1 => "login",
        2 => "note",
        3 => "card",
        4 => "identity",
        5 => "ssh_key",
        _ => "unknown",
    }
}

/// Convert an unencrypted Bitwarden JSON export into rows.
pub fn tokenize_bitwarden_json(text: &str) -> ImportResult<TokenizedFile> {
    let export: BitwardenExport = serde_json::from_str(text)
        .map_err(|e| ImportError::Format(format!("Unrecognized JSON export: {}", e)))?;

    if export.encrypted {
        warn!("Encrypted JSON export cannot be parsed locally");
        return Err(ImportError::Format(
            "Encrypted exports can only be read by the import service".to_string(),
        ));
    }

    let items = export
        .items
        .ok_or_else(|| ImportError::Format("JSON export has no items".to_string()))?;

    let folders: HashMap<&str, &str> = export
        .folders
        .iter()
        .map(|f| (f.id.as_str(), f.name.as_str()))
        .collect();

    let headers: Vec<String> = BITWARDEN_JSON_COLUMNS.iter().map(|c| c.to_string()).collect();

    let rows = items
        .iter()
        .map(|item| {
            let folder = item
                .folder_id
                .as_deref()
                .and_then(|id| folders.get(id).copied())
                .unwrap_or("");
            let login = item.login.as_ref();
            let uri = login
                .and_then(|l| l.uris.as_ref())
                .and_then(|uris| uris.iter().find_map(|u| u.uri.clone()))
                .unwrap_or_default();

            let values = [
                folder.to_string(),
                bitwarden_type_name(item.item_type).to_string(),
                item.name.clone().unwrap_or_default(),
                item.notes.clone().unwrap_or_default(),
                uri,
                login.and_then(|l| l.username.clone()).unwrap_or_default(),
                login.and_then(|l| l.password.clone()).unwrap_or_default(),
            ];

            BITWARDEN_JSON_COLUMNS
                .iter()
                .zip(values)
                .map(|(column, value)| (*column, value))
                .collect::<RawRow>()
        })
        .collect();

    Ok(TokenizedFile { headers, rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::RecordStatus;

    const GENERIC_CSV: &str = "name,website,username,password\n\
        GitHub,https://github.com,octo,abc12345\n\
        ,https://www.example.com/login,bob,Tr0ub4dor&3!xyz\n\
        \n\
        \"Acme, Inc.\",https://acme.test,\"wile \"\"e\"\"\",pw\n";

    #[test]
    fn test_generic_csv() {
        let output = parse_local_export(GENERIC_CSV.as_bytes(), "generic-csv").unwrap();
        let records = &output.normalized.records;

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].name, "GitHub");
        assert_eq!(records[1].name, "example.com");
        assert_eq!(records[2].name, "Acme, Inc.");
        assert_eq!(records[2].username, "wile \"e\"");
        assert!(records.iter().all(|r| r.status == RecordStatus::New));
        assert_eq!(output.effective_source, SourceKind::GenericCsv);
    }

    #[test]
    fn test_bitwarden_csv_filters_notes() {
        let csv = "folder,favorite,type,name,notes,fields,reprompt,login_uri,login_username,login_password,login_totp\n\
            ,,login,A,,,0,https://a.com,a,pw,\n\
            ,,note,Note 1,secret,,0,,,,\n\
            Work,,login,B,,,0,https://b.com,b,pw,\n\
            ,,note,Note 2,secret,,0,,,,\n\
            ,,login,C,,,0,https://c.com,c,pw,\n";

        let output = parse_local_export(csv.as_bytes(), "bitwarden").unwrap();

        assert_eq!(output.normalized.records.len(), 3);
        assert_eq!(output.normalized.records[1].tags, vec!["Work".to_string()]);
        assert_eq!(output.normalized.stats.skipped, 2);
    }

    #[test]
    fn test_generic_source_refined_by_detection() {
        let csv = "folder,type,name,login_uri,login_password\n\
            ,note,Just a note,,\n\
            ,login,Site,https://site.test,pw\n";

        let output = parse_local_export(csv.as_bytes(), "some-server-source").unwrap();

        assert_eq!(output.effective_source, SourceKind::Bitwarden);
        assert_eq!(output.normalized.records.len(), 1);
    }

    #[test]
    fn test_explicit_source_not_overridden() {
        let csv = "name,url,username,password,note\nA,https://a.com,u,p,\n";
        let output = parse_local_export(csv.as_bytes(), "lastpass").unwrap();
        assert_eq!(output.effective_source, SourceKind::Lastpass);
    }

    #[test]
    fn test_bom_and_crlf() {
        let csv = "\u{feff}name,url\r\nA,https://a.com\r\n";
        let output = parse_local_export(csv.as_bytes(), "google").unwrap();
        assert_eq!(output.normalized.records.len(), 1);
        assert_eq!(output.normalized.records[0].website, "https://a.com");
    }

    #[test]
    fn test_short_rows_read_missing_cells_as_empty() {
        let csv = "name,website,username,password\nOnly name\n";
        let output = parse_local_export(csv.as_bytes(), "generic-csv").unwrap();
        assert_eq!(output.normalized.records.len(), 1);
        assert_eq!(output.normalized.records[0].password, "");
    }

    #[test]
    fn test_format_errors() {
        assert!(matches!(
            parse_local_export(b"", "generic-csv"),
            Err(ImportError::Format(_))
        ));
        assert!(matches!(
            parse_local_export(b"name,website\n", "generic-csv"),
            Err(ImportError::Format(_))
        ));
        assert!(matches!(
            parse_local_export(b"name,website\n,\n , \n", "generic-csv"),
            Err(ImportError::Format(_))
        ));
        assert!(matches!(
            parse_local_export(&[0xff, 0xfe, 0x00], "generic-csv"),
            Err(ImportError::Format(_))
        ));
    }

    #[test]
    fn test_unmapped_headers_yield_empty_result_not_error() {
        let output = parse_local_export(b"foo,bar\n1,2\n", "generic-csv").unwrap();
        assert!(output.normalized.records.is_empty());
        assert_eq!(output.field_map.mapped_count(), 0);
    }

    #[test]
    fn test_bitwarden_json_export() {
        let json = r#"{
            "encrypted": false,
            "folders": [{"id": "f1", "name": "Social"}],
            "items": [
                {"type": 1, "name": "Mastodon", "folderId": "f1",
                 "login": {"username": "me@social.test", "password": "abc12345",
                           "uris": [{"uri": "https://social.test"}]}},
                {"type": 2, "name": "Secure note", "notes": "hidden"},
                {"type": 1, "name": null, "login": {"uris": [{"uri": "https://www.shop.test/cart"}]}}
            ]
        }"#;

        let output = parse_local_export(json.as_bytes(), "vaultwarden").unwrap();
        let records = &output.normalized.records;

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "Mastodon");
        assert_eq!(records[0].email, "me@social.test");
        assert_eq!(records[0].tags, vec!["Social".to_string()]);
        assert_eq!(records[1].name, "shop.test");
    }

    #[test]
    fn test_encrypted_json_rejected() {
        let json = r#"{"encrypted": true, "data": "2.abc"}"#;
        assert!(matches!(
            parse_local_export(json.as_bytes(), "bitwarden"),
            Err(ImportError::Format(_))
        ));
    }

    #[test]
    fn test_parse_local_export_json() {
        let input = serde_json::json!({
            "content": GENERIC_CSV,
            "sourceId": "generic-csv",
        });

        let output = parse_local_export_json(&input.to_string()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(value["effectiveSource"], "generic-csv");
        assert_eq!(value["normalized"]["records"].as_array().unwrap().len(), 3);
        assert_eq!(value["fieldMap"]["website"], "website");
        assert_eq!(value["fieldMap"]["folder"], serde_json::Value::Null);

        assert!(parse_local_export_json("{\"content\": \"\", \"sourceId\": \"x\"}").is_err());
        assert!(parse_local_export_json("not json").is_err());
    }
}
