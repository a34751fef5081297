//! Import staging workflow.
//!
//! Steps, forward-only with an explicit Back to the previous step:
//!
//! ```text
//! SelectSource -> SelectFile -> (UploadAndPreview) -> Review -> Confirm
//! ```
//!
//! `UploadAndPreview` is transient: it tries the remote service first and
//! falls back to local parsing when the upload fails or returns no preview.
//! A session built locally is marked degraded; confirming it makes no
//! network call.
//!
//! The workflow exclusively owns the staging session. Network calls are
//! awaited one at a time, each under a child of the workflow's cancellation
//! token. Since every request borrows the workflow mutably, a live request
//! can only be aborted from another task through a clone of
//! [`StagingWorkflow::cancellation_token`]. A caller that drops a pending
//! `next()` leaves no trace: the next call resumes from the file step, or
//! from review if the upload had already produced a session.

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, ImportSource};
use crate::config::WorkflowConfig;
use crate::error::{ImportError, ImportResult};
use crate::local_parser::parse_local_export;
use crate::merge_strategy::MergeStrategy;
use crate::normalizer::{normalize_remote_preview, CanonicalCredential, NormalizeStats};
use crate::remote::{ExecuteImportRequest, ImportFile, RemoteAnalysis, UploadRequest};

/// Prefix of file ids issued for locally parsed sessions.
pub const LOCAL_FILE_ID_PREFIX: &str = "local-";
const LOCAL_TOKEN_LEN: usize = 16;

/// Workflow step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    SelectSource,
    SelectFile,
    UploadAndPreview,
    Review,
    Confirm,
}

impl Step {
    /// Position shown to the user (the transient upload step shares the
    /// file step's number).
    pub fn number(&self) -> u8 {
        match self {
            Step::SelectSource => 1,
            Step::SelectFile | Step::UploadAndPreview => 2,
            Step::Review => 3,
            Step::Confirm => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    /// Degraded-mode information, never an error
    Info,
    Warning,
    Error,
}

/// User-facing message emitted by the workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// The live pending import between upload and confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagingSession {
    pub file_id: String,
    pub source: ImportSource,
    pub source_password_required: bool,
    pub preview_records: Vec<CanonicalCredential>,
    pub stats: NormalizeStats,
    pub degraded: bool,
}

/// Read-only view of the workflow for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagingSnapshot {
    pub step: Step,
    pub source: Option<ImportSource>,
    pub source_password_required: bool,
    pub file_name: Option<String>,
    pub preview_records: Vec<CanonicalCredential>,
    pub stats: NormalizeStats,
    pub degraded: bool,
    pub merge_strategy: MergeStrategy,
}

/// Outcome of a confirmed import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub imported: u32,
    pub merged: u32,
    pub skipped: u32,
    pub degraded: bool,
    /// False when nothing was sent to the server (degraded confirm)
    pub persisted: bool,
}

pub fn is_local_file_id(file_id: &str) -> bool {
    file_id.starts_with(LOCAL_FILE_ID_PREFIX)
}

fn local_file_id() -> String {
    let token: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(LOCAL_TOKEN_LEN)
        .map(char::from)
        .collect();
    format!("{}{}", LOCAL_FILE_ID_PREFIX, token)
}

/// State machine driving one import at a time.
pub struct StagingWorkflow<R: RemoteAnalysis> {
    remote: R,
    config: WorkflowConfig,
    catalog: Catalog,
    step: Step,
    source: Option<ImportSource>,
    source_password_required: bool,
    source_password: Option<String>,
    file: Option<ImportFile>,
    session: Option<StagingSession>,
    merge_strategy: MergeStrategy,
    notices: Vec<Notice>,
    cancel: CancellationToken,
}

impl<R: RemoteAnalysis> StagingWorkflow<R> {
    pub fn new(remote: R, config: WorkflowConfig) -> Self {
        let merge_strategy = config.default_merge_strategy;
        Self {
            remote,
            config,
            catalog: Catalog::default(),
            step: Step::SelectSource,
            source: None,
            source_password_required: false,
            source_password: None,
            file: None,
            session: None,
            merge_strategy,
            notices: Vec::new(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn step(&self) -> Step {
        self.settled_step()
    }

    pub fn session(&self) -> Option<&StagingSession> {
        self.session.as_ref()
    }

    pub fn merge_strategy(&self) -> MergeStrategy {
        self.merge_strategy
    }

    /// Token whose cancellation aborts the request currently in flight.
    ///
    /// Cancel a clone of it from another task; the workflow itself is
    /// borrowed for the whole request.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn snapshot(&self) -> StagingSnapshot {
        let (preview_records, stats, degraded) = match &self.session {
            Some(session) => (session.preview_records.clone(), session.stats, session.degraded),
            None => (Vec::new(), NormalizeStats::default(), false),
        };

        StagingSnapshot {
            step: self.settled_step(),
            source: self.source.clone(),
            source_password_required: self.source_password_required,
            file_name: self.file.as_ref().map(|f| f.name.clone()),
            preview_records,
            stats,
            degraded,
            merge_strategy: self.merge_strategy,
        }
    }

    /// Drain the notices emitted since the last call.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    fn notify(&mut self, level: NoticeLevel, message: impl Into<String>) {
        self.notices.push(Notice {
            level,
            message: message.into(),
        });
    }

    /// The transient upload step is only ever held while `next()` runs with
    /// exclusive access. Seen from outside, it means that future was
    /// dropped mid-request.
    fn settled_step(&self) -> Step {
        match (self.step, &self.session) {
            (Step::UploadAndPreview, Some(_)) => Step::Review,
            (Step::UploadAndPreview, None) => Step::SelectFile,
            (step, _) => step,
        }
    }

    fn recover_interrupted_upload(&mut self) {
        if self.step == Step::UploadAndPreview {
            warn!("Upload was interrupted before completing");
            let settled = self.settled_step();
            self.transition(settled);
        }
    }

    fn transition(&mut self, to: Step) {
        debug!(from = ?self.step, to = ?to, "Workflow transition");
        self.step = to;
    }

    /// Run a request under a fresh child of the workflow token.
    async fn guarded<T>(&self, request: impl Future<Output = ImportResult<T>>) -> ImportResult<T> {
        let token = self.cancel.child_token();
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(ImportError::Cancelled),
            result = request => result,
        }
    }

    /// A cancelled parent token stays cancelled; replace it so the user can
    /// retry.
    fn renew_cancellation(&mut self) {
        if self.cancel.is_cancelled() {
            self.cancel = CancellationToken::new();
        }
    }

    /// Replace the catalog with the remote options, keeping the defaults on
    /// any failure.
    ///
    /// Only allowed before a source is chosen, so the catalog never changes
    /// under a live session.
    pub async fn load_options(&mut self) -> ImportResult<()> {
        self.recover_interrupted_upload();
        if self.step != Step::SelectSource || self.source.is_some() || self.session.is_some() {
            return Err(ImportError::Validation(
                "Import options can only be loaded before a source is chosen".to_string(),
            ));
        }

        match self.guarded(self.remote.options()).await {
            Ok(options) => {
                self.catalog = Catalog::from_options(
                    options.import_sources,
                    options.export_formats,
                    &options.merge_strategies,
                );
                debug!(sources = self.catalog.import_sources.len(), "Loaded remote import options");
            }
            Err(err) => {
                warn!(error = %err, "Failed to load import options, using defaults");
                self.renew_cancellation();
            }
        }
        Ok(())
    }

    /// Choose the import source. Clears any file, password and session.
    pub fn select_source(&mut self, source_id: &str) -> ImportResult<()> {
        self.recover_interrupted_upload();
        if self.step != Step::SelectSource {
            return Err(ImportError::Validation(
                "Go back to the first step to change the source".to_string(),
            ));
        }

        let source = self
            .catalog
            .find_source(source_id)
            .cloned()
            .ok_or_else(|| ImportError::Validation(format!("Unknown import source: {}", source_id)))?;

        self.source_password_required = source.requires_password;
        self.source = Some(source);
        self.source_password = None;
        self.file = None;
        self.session = None;
        Ok(())
    }

    /// Attach the file to import. Replaces any previous file and session.
    pub fn select_file(&mut self, file: ImportFile) -> ImportResult<()> {
        self.recover_interrupted_upload();
        if self.step != Step::SelectFile {
            return Err(ImportError::Validation("Select a source first".to_string()));
        }
        self.file = Some(file);
        self.session = None;
        Ok(())
    }

    pub fn set_source_password(&mut self, password: Option<String>) {
        self.source_password = password.filter(|p| !p.is_empty());
    }

    /// Guarded forward transition from the current step.
    pub async fn next(&mut self) -> ImportResult<Step> {
        self.recover_interrupted_upload();
        match self.step {
            Step::SelectSource => {
                if self.source.is_none() {
                    self.notify(NoticeLevel::Warning, "Select the password manager you are importing from");
                    return Err(ImportError::Validation("No import source selected".to_string()));
                }
                self.transition(Step::SelectFile);
            }
            Step::SelectFile => self.upload_and_preview().await?,
            Step::UploadAndPreview => {
                return Err(ImportError::Validation("Upload already in progress".to_string()));
            }
            Step::Review => {
                let has_records = self
                    .session
                    .as_ref()
                    .map(|s| !s.preview_records.is_empty())
                    .unwrap_or(false);
                if !has_records {
                    return Err(ImportError::Validation("Nothing to import".to_string()));
                }
                self.transition(Step::Confirm);
            }
            Step::Confirm => {
                return Err(ImportError::Validation("Confirm the import to finish".to_string()));
            }
        }
        Ok(self.step)
    }

    /// Return to the immediately preceding step. The session is kept.
    ///
    /// Going back from Confirm re-enters Review with the records already
    /// staged; the full preview is only fetched on the forward entry from
    /// the upload step.
    pub fn back(&mut self) -> ImportResult<Step> {
        self.recover_interrupted_upload();
        let previous = match self.step {
            Step::SelectSource | Step::UploadAndPreview => {
                return Err(ImportError::Validation("No previous step".to_string()));
            }
            Step::SelectFile => Step::SelectSource,
            Step::Review => Step::SelectFile,
            Step::Confirm => Step::Review,
        };
        self.transition(previous);
        Ok(previous)
    }

    /// Choose how duplicates are reconciled. Never touches the records.
    pub fn select_merge_strategy(&mut self, strategy: MergeStrategy) -> ImportResult<()> {
        self.recover_interrupted_upload();
        if !matches!(self.step, Step::Review | Step::Confirm) {
            return Err(ImportError::Validation(
                "A merge strategy can only be chosen during review".to_string(),
            ));
        }
        self.merge_strategy = strategy;
        Ok(())
    }

    async fn upload_and_preview(&mut self) -> ImportResult<()> {
        let Some(source) = self.source.clone() else {
            return Err(ImportError::Validation("No import source selected".to_string()));
        };
        let Some(file) = self.file.clone() else {
            self.notify(NoticeLevel::Warning, "Choose a file to import");
            return Err(ImportError::Validation("No file selected".to_string()));
        };
        if self.source_password_required && self.source_password.is_none() {
            self.notify(
                NoticeLevel::Warning,
                format!("{} exports require the export password", source.display_name),
            );
            return Err(ImportError::Validation("Source password required".to_string()));
        }

        self.transition(Step::UploadAndPreview);

        let upload = self
            .guarded(self.remote.upload(UploadRequest {
                file: &file,
                source_id: &source.id,
                password: self.source_password.as_deref(),
            }))
            .await;

        match upload {
            Ok(response) => {
                let normalized = normalize_remote_preview(&response.preview);
                if normalized.records.is_empty() {
                    warn!(
                        source = %source.id,
                        file_id = %response.file_id,
                        "Upload returned no preview records, parsing locally"
                    );
                    return self.fallback_to_local(source, &file);
                }

                self.session = Some(StagingSession {
                    file_id: response.file_id,
                    source_password_required: self.source_password_required,
                    source,
                    preview_records: normalized.records,
                    stats: normalized.stats,
                    degraded: false,
                });
                if self.config.refetch_preview {
                    self.refresh_preview().await;
                }
                self.transition(Step::Review);
                Ok(())
            }
            Err(ImportError::Cancelled) => {
                info!(source = %source.id, "Upload cancelled");
                self.renew_cancellation();
                self.transition(Step::SelectFile);
                Err(ImportError::Cancelled)
            }
            Err(err) if err.is_recoverable_by_fallback() => {
                warn!(source = %source.id, error = %err, "Upload failed, parsing locally");
                self.fallback_to_local(source, &file)
            }
            Err(err) => {
                let message = match err {
                    ImportError::Unauthorized => {
                        "Your session has expired. Please sign in again.".to_string()
                    }
                    ref other => format!("Upload failed: {}", other),
                };
                self.notify(NoticeLevel::Error, message);
                self.transition(Step::SelectFile);
                Err(err)
            }
        }
    }

    /// Degraded path: parse the file on the client.
    fn fallback_to_local(&mut self, source: ImportSource, file: &ImportFile) -> ImportResult<()> {
        let parsed = match parse_local_export(&file.content, &source.id) {
            Ok(parsed) => parsed,
            Err(err) => {
                self.notify(NoticeLevel::Error, format!("This file could not be read: {}", err));
                self.transition(Step::SelectFile);
                return Err(err);
            }
        };

        if parsed.normalized.records.is_empty() {
            self.notify(NoticeLevel::Warning, "No credentials found in this file");
            self.transition(Step::SelectFile);
            return Err(ImportError::Format("No credentials found".to_string()));
        }

        let count = parsed.normalized.records.len();
        self.session = Some(StagingSession {
            file_id: local_file_id(),
            source_password_required: self.source_password_required,
            source,
            preview_records: parsed.normalized.records,
            stats: parsed.normalized.stats,
            degraded: true,
        });
        self.notify(
            NoticeLevel::Info,
            format!(
                "The import service is unavailable. {} credentials were read on this device; duplicates will not be detected.",
                count
            ),
        );
        info!(records = count, "Staged import in degraded mode");
        self.transition(Step::Review);
        Ok(())
    }

    /// Replace the truncated upload preview with the full remote preview.
    /// Failures keep the records already staged.
    async fn refresh_preview(&mut self) {
        let Some(file_id) = self.session.as_ref().map(|s| s.file_id.clone()) else {
            return;
        };

        let fetched = self
            .guarded(self.remote.preview(&file_id, self.source_password.as_deref()))
            .await;

        match fetched {
            Ok(response) => {
                let normalized = normalize_remote_preview(&response.credentials);
                if normalized.records.is_empty() {
                    warn!(file_id = %file_id, "Full preview was empty, keeping upload preview");
                    return;
                }
                if let Some(session) = self.session.as_mut() {
                    session.preview_records = normalized.records;
                    session.stats = normalized.stats;
                }
            }
            Err(err) => {
                warn!(file_id = %file_id, error = %err, "Failed to fetch full preview, keeping upload preview");
                self.renew_cancellation();
            }
        }
    }

    /// Dispatch the final import.
    ///
    /// A degraded session makes no network call and reports
    /// `persisted: false`. On success the workflow returns to the first step;
    /// on failure it stays in Confirm with the session intact.
    pub async fn confirm(&mut self) -> ImportResult<ImportSummary> {
        self.recover_interrupted_upload();
        if self.step != Step::Confirm {
            return Err(ImportError::Validation("Review the import before confirming".to_string()));
        }
        let Some(session) = self.session.clone() else {
            return Err(ImportError::Validation("No staged import".to_string()));
        };

        if session.degraded {
            return self.confirm_degraded(&session);
        }

        let request = ExecuteImportRequest {
            file_id: session.file_id.clone(),
            source: session.source.id.clone(),
            password: self.source_password.clone().unwrap_or_default(),
            merge_strategy: self.merge_strategy,
        };

        match self.guarded(self.remote.execute_import(&request)).await {
            Ok(response) => {
                let results = response.results;
                let summary = ImportSummary {
                    imported: results.imported,
                    merged: results.merged,
                    skipped: results.skipped,
                    degraded: false,
                    persisted: true,
                };
                self.notify(
                    NoticeLevel::Success,
                    format!(
                        "Imported {} credentials ({} merged)",
                        summary.imported, summary.merged
                    ),
                );
                self.clear_state();
                Ok(summary)
            }
            Err(err) => {
                if err == ImportError::Cancelled {
                    self.renew_cancellation();
                }
                self.notify(NoticeLevel::Error, format!("Import failed: {}", err));
                Err(err)
            }
        }
    }

    fn confirm_degraded(&mut self, session: &StagingSession) -> ImportResult<ImportSummary> {
        if !self.config.allow_degraded_confirm {
            self.notify(
                NoticeLevel::Warning,
                "The import service is unavailable. Try again once you are back online.",
            );
            return Err(ImportError::Validation(
                "Offline imports are disabled".to_string(),
            ));
        }

        let count = session.preview_records.len() as u32;
        info!(records = count, "Confirmed degraded import without server call");
        self.notify(
            NoticeLevel::Success,
            format!("{} credentials processed on this device. They have not been saved to the server.", count),
        );
        self.clear_state();

        Ok(ImportSummary {
            imported: count,
            merged: 0,
            skipped: 0,
            degraded: true,
            persisted: false,
        })
    }

    /// Discard everything and return to the first step.
    ///
    /// The current token is cancelled and replaced, so clones handed out by
    /// `cancellation_token()` stop any request still holding them.
    pub fn reset(&mut self) {
        self.cancel.cancel();
        self.cancel = CancellationToken::new();
        self.clear_state();
    }

    fn clear_state(&mut self) {
        self.source = None;
        self.source_password_required = false;
        self.source_password = None;
        self.file = None;
        self.session = None;
        self.merge_strategy = self.config.default_merge_strategy;
        self.transition(Step::SelectSource);
    }
}
