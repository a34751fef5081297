// In-memory remote analysis service for tests

use async_trait::async_trait;
use std::sync::Mutex;

use super::{
    ExecuteImportRequest, ExecuteImportResponse, ExportPayload, OptionsResponse,
    PreviewResponse, RemoteAnalysis, UploadRequest, UploadResponse,
};
use crate::error::{ImportError, ImportResult};
use crate::export::ExportRequest;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub upload: u32,
    pub preview: u32,
    pub execute_import: u32,
    pub export: u32,
    pub options: u32,
}

struct MockState {
    upload: ImportResult<UploadResponse>,
    upload_hangs: bool,
    preview: ImportResult<PreviewResponse>,
    execute_import: ImportResult<ExecuteImportResponse>,
    export: ImportResult<ExportPayload>,
    options: ImportResult<OptionsResponse>,
    calls: CallCounts,
    last_upload_password: Option<String>,
    last_import: Option<ExecuteImportRequest>,
    last_export: Option<ExportRequest>,
}

/// Scriptable `RemoteAnalysis`. Every endpoint fails with a network error
/// until a response is set.
pub struct MockRemote {
    state: Mutex<MockState>,
}

impl Default for MockRemote {
    fn default() -> Self {
        let offline = || ImportError::Network("connection refused".to_string());
        MockRemote {
            state: Mutex::new(MockState {
                upload: Err(offline()),
                upload_hangs: false,
                preview: Err(offline()),
                execute_import: Err(offline()),
                export: Err(offline()),
                options: Err(offline()),
                calls: CallCounts::default(),
                last_upload_password: None,
                last_import: None,
                last_export: None,
            }),
        }
    }
}

impl MockRemote {
    pub fn set_upload(&self, result: ImportResult<UploadResponse>) {
        self.state.lock().unwrap().upload = result;
    }

    /// Make uploads never complete, for cancellation tests.
    pub fn hang_uploads(&self) {
        self.state.lock().unwrap().upload_hangs = true;
    }

    pub fn set_preview(&self, result: ImportResult<PreviewResponse>) {
        self.state.lock().unwrap().preview = result;
    }

    pub fn set_execute_import(&self, result: ImportResult<ExecuteImportResponse>) {
        self.state.lock().unwrap().execute_import = result;
    }

    pub fn set_export(&self, result: ImportResult<ExportPayload>) {
        self.state.lock().unwrap().export = result;
    }

    pub fn set_options(&self, result: ImportResult<OptionsResponse>) {
        self.state.lock().unwrap().options = result;
    }

    pub fn calls(&self) -> CallCounts {
        self.state.lock().unwrap().calls
    }

    pub fn last_upload_password(&self) -> Option<String> {
        self.state.lock().unwrap().last_upload_password.clone()
    }

    pub fn last_import_request(&self) -> Option<ExecuteImportRequest> {
        self.state.lock().unwrap().last_import.clone()
    }

    pub fn last_export_request(&self) -> Option<ExportRequest> {
        self.state.lock().unwrap().last_export.clone()
    }
}

#[async_trait]
impl RemoteAnalysis for MockRemote {
    async fn upload(&self, request: UploadRequest<'_>) -> ImportResult<UploadResponse> {
        let (result, hangs) = {
            let mut state = self.state.lock().unwrap();
            state.calls.upload += 1;
            state.last_upload_password = request.password.map(String::from);
            (state.upload.clone(), state.upload_hangs)
        };
        if hangs {
            std::future::pending::<()>().await;
        }
        result
    }

    async fn preview(&self, _file_id: &str, _password: Option<&str>) -> ImportResult<PreviewResponse> {
        let mut state = self.state.lock().unwrap();
        state.calls.preview += 1;
        state.preview.clone()
    }

    async fn execute_import(&self, request: &ExecuteImportRequest) -> ImportResult<ExecuteImportResponse> {
        let mut state = self.state.lock().unwrap();
        state.calls.execute_import += 1;
        state.last_import = Some(request.clone());
        state.execute_import.clone()
    }

    async fn export(&self, request: &ExportRequest) -> ImportResult<ExportPayload> {
        let mut state = self.state.lock().unwrap();
        state.calls.export += 1;
        state.last_export = Some(request.clone());
        state.export.clone()
    }

    async fn options(&self) -> ImportResult<OptionsResponse> {
        let mut state = self.state.lock().unwrap();
        state.calls.options += 1;
        state.options.clone()
    }
}
