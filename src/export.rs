//! Export assembly: validation gate, dispatch and filename derivation.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::catalog::ENCRYPTABLE_FORMAT;
use crate::error::{ImportError, ImportResult};
use crate::remote::RemoteAnalysis;

/// Body of `POST /export`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    pub format: String,
    #[serde(default)]
    pub encrypt: bool,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub include_shared: bool,
    #[serde(default)]
    pub include_tags: bool,
}

impl ExportRequest {
    pub fn new(format: impl Into<String>) -> Self {
        Self {
            format: format.into(),
            encrypt: false,
            password: String::new(),
            include_shared: false,
            include_tags: true,
        }
    }

    pub fn encrypted(mut self, password: impl Into<String>) -> Self {
        self.encrypt = true;
        self.password = password.into();
        self
    }
}

/// Apply the export validation gate.
///
/// Encryption only applies to the FireKey format: for any other format the
/// `encrypt` flag and password are cleared. An encrypted FireKey export
/// without a password is rejected.
pub fn validate_export_request(request: ExportRequest) -> ImportResult<ExportRequest> {
    let mut request = request;
    request.format = request.format.trim().to_lowercase();

    if request.format.is_empty() {
        return Err(ImportError::Validation("Choose an export format".to_string()));
    }

    if request.format != ENCRYPTABLE_FORMAT {
        if request.encrypt {
            debug!(format = %request.format, "Encryption ignored for non-FireKey export");
        }
        request.encrypt = false;
        request.password.clear();
        return Ok(request);
    }

    if request.encrypt && request.password.is_empty() {
        return Err(ImportError::Validation(
            "A password is required for encrypted exports".to_string(),
        ));
    }

    if !request.encrypt {
        request.password.clear();
    }

    Ok(request)
}

/// File extension for an export format.
pub fn export_extension(format: &str) -> &'static str {
    match format {
        "json" => "json",
        ENCRYPTABLE_FORMAT => "fbak",
        _ => "csv",
    }
}

/// Derive the download filename.
///
/// Prefers `filename*` (RFC 5987), then `filename` from the
/// `Content-Disposition` header; otherwise synthesizes
/// `firekey-export-<date>.<ext>`.
pub fn export_filename(content_disposition: Option<&str>, format: &str, date: NaiveDate) -> String {
    content_disposition
        .and_then(filename_from_content_disposition)
        .unwrap_or_else(|| {
            format!(
                "firekey-export-{}.{}",
                date.format("%Y-%m-%d"),
                export_extension(format)
            )
        })
}

fn filename_from_content_disposition(header: &str) -> Option<String> {
    let mut plain: Option<String> = None;

    for param in header.split(';').map(str::trim) {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };
        let key = key.trim().to_lowercase();
        let value = value.trim();

        if key == "filename*" {
            // charset'language'percent-encoded
            let encoded = value.splitn(3, '\'').nth(2).unwrap_or(value);
            if let Ok(decoded) = urlencoding::decode(encoded) {
                let decoded = sanitize_filename(&decoded);
                if !decoded.is_empty() {
                    return Some(decoded);
                }
            }
        } else if key == "filename" && plain.is_none() {
            let unquoted = value.trim_matches('"');
            let cleaned = sanitize_filename(unquoted);
            if !cleaned.is_empty() {
                plain = Some(cleaned);
            }
        }
    }

    plain
}

/// Strip any path components a server might send.
fn sanitize_filename(name: &str) -> String {
    name.rsplit(['/', '\\'])
        .next()
        .unwrap_or("")
        .trim()
        .to_string()
}

/// A finished export ready to be saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Validates and dispatches export requests.
pub struct ExportAssembler<'a, R: RemoteAnalysis> {
    remote: &'a R,
}

impl<'a, R: RemoteAnalysis> ExportAssembler<'a, R> {
    pub fn new(remote: &'a R) -> Self {
        Self { remote }
    }

    /// Validate, dispatch and name an export. Validation failures never
    /// reach the network.
    pub async fn export(&self, request: ExportRequest) -> ImportResult<ExportFile> {
        let request = validate_export_request(request)?;

        let payload = self.remote.export(&request).await?;
        let filename = export_filename(
            payload.content_disposition.as_deref(),
            &request.format,
            Utc::now().date_naive(),
        );

        info!(
            format = %request.format,
            encrypted = request.encrypt,
            bytes = payload.bytes.len(),
            filename = %filename,
            "Export completed"
        );

        Ok(ExportFile {
            filename,
            bytes: payload.bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::mock::MockRemote;
    use crate::remote::ExportPayload;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    #[test]
    fn test_non_firekey_encryption_is_coerced_off() {
        let request = ExportRequest::new("csv").encrypted("hunter2");
        let validated = validate_export_request(request).unwrap();
        assert!(!validated.encrypt);
        assert_eq!(validated.password, "");

        let request = ExportRequest::new("JSON").encrypted("");
        let validated = validate_export_request(request).unwrap();
        assert_eq!(validated.format, "json");
        assert!(!validated.encrypt);
    }

    #[test]
    fn test_firekey_encryption_requires_password() {
        let request = ExportRequest::new("firekey").encrypted("");
        assert!(matches!(
            validate_export_request(request),
            Err(ImportError::Validation(_))
        ));

        let request = ExportRequest::new("firekey").encrypted("s3cret");
        let validated = validate_export_request(request).unwrap();
        assert!(validated.encrypt);
        assert_eq!(validated.password, "s3cret");
    }

    #[test]
    fn test_unencrypted_firekey_drops_password() {
        let mut request = ExportRequest::new("firekey");
        request.password = "stray".to_string();
        let validated = validate_export_request(request).unwrap();
        assert!(!validated.encrypt);
        assert_eq!(validated.password, "");
    }

    #[test]
    fn test_empty_format_rejected() {
        assert!(validate_export_request(ExportRequest::new("  ")).is_err());
    }

    #[test]
    fn test_synthesized_filenames() {
        assert_eq!(export_filename(None, "json", date()), "firekey-export-2026-10-16.json");
        assert_eq!(export_filename(None, "firekey", date()), "firekey-export-2026-10-16.fbak");
        assert_eq!(export_filename(None, "csv", date()), "firekey-export-2026-10-16.csv");
        assert_eq!(export_filename(None, "other", date()), "firekey-export-2026-10-16.csv");
        assert_eq!(
            export_filename(Some("attachment"), "json", date()),
            "firekey-export-2026-10-16.json"
        );
    }

    #[test]
    fn test_content_disposition_filenames() {
        assert_eq!(
            export_filename(Some("attachment; filename=\"vault.csv\""), "json", date()),
            "vault.csv"
        );
        assert_eq!(
            export_filename(Some("attachment; filename=vault.json"), "csv", date()),
            "vault.json"
        );
        assert_eq!(
            export_filename(
                Some("attachment; filename=\"fallback.csv\"; filename*=UTF-8''b%C3%BCro%20vault.csv"),
                "csv",
                date()
            ),
            "büro vault.csv"
        );
        assert_eq!(
            export_filename(Some("attachment; filename=\"../../etc/passwd\""), "csv", date()),
            "passwd"
        );
    }

    #[tokio::test]
    async fn test_assembler_rejects_before_network() {
        let remote = MockRemote::default();
        let assembler = ExportAssembler::new(&remote);

        let result = assembler
            .export(ExportRequest::new("firekey").encrypted(""))
            .await;

        assert!(matches!(result, Err(ImportError::Validation(_))));
        assert_eq!(remote.calls().export, 0);
    }

    #[tokio::test]
    async fn test_assembler_dispatches_coerced_request() {
        let remote = MockRemote::default();
        remote.set_export(Ok(ExportPayload {
            bytes: b"name,url\n".to_vec(),
            content_disposition: Some("attachment; filename=\"my-vault.csv\"".to_string()),
        }));
        let assembler = ExportAssembler::new(&remote);

        let file = assembler
            .export(ExportRequest::new("csv").encrypted("ignored"))
            .await
            .unwrap();

        assert_eq!(file.filename, "my-vault.csv");
        assert_eq!(file.bytes, b"name,url\n".to_vec());

        let sent = remote.last_export_request().unwrap();
        assert!(!sent.encrypt);
        assert_eq!(sent.password, "");
    }
}
