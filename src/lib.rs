//! FireKey Import Core
//!
//! Client-side engine for importing credentials from other password
//! managers and exporting the FireKey vault:
//! - **field_map**: resolves export header rows onto the canonical fields
//! - **normalizer**: turns raw rows into canonical credentials
//! - **strength**: password strength classification
//! - **local_parser**: CSV / Bitwarden JSON parsing used when the remote
//!   analysis service is unavailable
//! - **workflow**: the import staging state machine (select, upload,
//!   review, confirm) with degraded-mode fallback
//! - **export**: export validation and filename derivation
//!
//! The remote service is reached through the [`RemoteAnalysis`] trait; the
//! `http` feature provides a reqwest implementation.
//!
//! # Example (conceptual)
//! ```ignore
//! let client = HttpAnalysisClient::new(ClientConfig::from_env()?)?;
//! let mut workflow = StagingWorkflow::new(client, WorkflowConfig::default());
//!
//! workflow.load_options().await?;
//! workflow.select_source("bitwarden")?;
//! workflow.next().await?;
//! workflow.select_file(ImportFile::new("export.csv", bytes))?;
//! workflow.next().await?; // upload + preview, or local fallback
//! workflow.next().await?;
//! let summary = workflow.confirm().await?;
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod export;
pub mod field_map;
pub mod local_parser;
pub mod logging;
pub mod merge_strategy;
pub mod normalizer;
pub mod remote;
pub mod strength;
pub mod workflow;

pub use catalog::{Catalog, ExportFormat, ImportSource, SourceKind};
pub use config::{ClientConfig, WorkflowConfig};
pub use error::{ImportError, ImportResult};
pub use export::{validate_export_request, ExportAssembler, ExportFile, ExportRequest};
pub use field_map::{detect_source, resolve_field_map, CanonicalField, FieldMap};
pub use local_parser::{parse_local_export, LocalParseOutput};
pub use merge_strategy::MergeStrategy;
pub use normalizer::{
    normalize_remote_preview, normalize_rows, CanonicalCredential, NormalizeOutput,
    NormalizeStats, RawRow, RecordStatus,
};
pub use remote::{ImportFile, RemoteAnalysis};
#[cfg(feature = "http")]
pub use remote::HttpAnalysisClient;
pub use strength::{classify_password, PasswordStrength};
pub use workflow::{
    ImportSummary, Notice, NoticeLevel, StagingSession, StagingSnapshot, StagingWorkflow, Step,
};

// WASM bindings
#[cfg(feature = "wasm")]
pub mod wasm;

#[cfg(feature = "wasm")]
pub use wasm::*;

// C FFI exports for native hosts
#[cfg(feature = "ffi")]
pub mod ffi;
