//! Contract with the remote analysis service.
//!
//! The staging workflow only depends on the `RemoteAnalysis` trait; the
//! reqwest-backed implementation lives in `http` and a test double can be
//! swapped in freely.

#[cfg(feature = "http")]
mod http;

#[cfg(feature = "http")]
pub use http::HttpAnalysisClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::catalog::{ExportFormat, ImportSource};
use crate::error::ImportResult;
use crate::export::ExportRequest;
use crate::merge_strategy::MergeStrategy;
use crate::normalizer::RemoteCredential;

/// A file selected by the user, read to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportFile {
    pub name: String,
    pub content: Vec<u8>,
}

impl ImportFile {
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Body of `POST /upload`.
#[derive(Debug, Clone)]
pub struct UploadRequest<'a> {
    pub file: &'a ImportFile,
    pub source_id: &'a str,
    pub password: Option<&'a str>,
}

/// Response of `POST /upload`. The preview may be truncated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    #[serde(rename = "fileId", alias = "file_id")]
    pub file_id: String,
    #[serde(default)]
    pub preview: Vec<RemoteCredential>,
    #[serde(default, rename = "fileStatus", alias = "file_status")]
    pub file_status: Option<String>,
}

/// Response of `GET /preview/{fileId}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewResponse {
    #[serde(default)]
    pub credentials: Vec<RemoteCredential>,
}

/// Body of `POST /import`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteImportRequest {
    #[serde(rename = "fileId")]
    pub file_id: String,
    pub source: String,
    pub password: String,
    #[serde(rename = "mergeStrategy")]
    pub merge_strategy: MergeStrategy,
}

/// Counters reported by the merge service after an import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportResults {
    #[serde(default)]
    pub imported: u32,
    #[serde(default)]
    pub merged: u32,
    #[serde(default)]
    pub skipped: u32,
    #[serde(default)]
    pub renamed: u32,
    #[serde(default)]
    pub overwritten: u32,
    #[serde(default)]
    pub errors: u32,
}

/// Response of `POST /import`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteImportResponse {
    #[serde(default)]
    pub results: ImportResults,
}

/// Raw export payload with its `Content-Disposition` header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportPayload {
    pub bytes: Vec<u8>,
    pub content_disposition: Option<String>,
}

/// Response of `GET /options`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionsResponse {
    #[serde(default, alias = "importSources")]
    pub import_sources: Vec<ImportSource>,
    #[serde(default, alias = "exportFormats")]
    pub export_formats: Vec<ExportFormat>,
    #[serde(default, alias = "mergeStrategies")]
    pub merge_strategies: Vec<String>,
}

/// Remote analysis and merge service.
///
/// Implementations map transport failures and timeouts to
/// `ImportError::Network`, HTTP 401 to `ImportError::Unauthorized` and any
/// other non-2xx status to `ImportError::Server`.
#[async_trait]
pub trait RemoteAnalysis: Send + Sync {
    async fn upload(&self, request: UploadRequest<'_>) -> ImportResult<UploadResponse>;

    async fn preview(&self, file_id: &str, password: Option<&str>) -> ImportResult<PreviewResponse>;

    async fn execute_import(&self, request: &ExecuteImportRequest) -> ImportResult<ExecuteImportResponse>;

    async fn export(&self, request: &ExportRequest) -> ImportResult<ExportPayload>;

    async fn options(&self) -> ImportResult<OptionsResponse>;
}

#[cfg(test)]
pub(crate) mod mock;
