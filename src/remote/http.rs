//! reqwest implementation of the remote analysis contract.

use async_trait::async_trait;
use reqwest::header::CONTENT_DISPOSITION;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info};

use super::{
    ExecuteImportRequest, ExecuteImportResponse, ExportPayload, OptionsResponse,
    PreviewResponse, RemoteAnalysis, UploadRequest, UploadResponse,
};
use crate::config::ClientConfig;
use crate::error::{ImportError, ImportResult};
use crate::export::ExportRequest;

/// HTTP client for the import/export API.
#[derive(Debug, Clone)]
pub struct HttpAnalysisClient {
    client: Client,
    config: ClientConfig,
}

impl HttpAnalysisClient {
    pub fn new(config: ClientConfig) -> ImportResult<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ImportError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.config.api_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> ImportResult<Response> {
        let response = self.authorize(builder).send().await?;
        check_status(response).await
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> ImportResult<T> {
        let response = self.send(builder).await?;
        Ok(response.json::<T>().await?)
    }
}

/// Map a response status onto the error taxonomy.
async fn check_status(response: Response) -> ImportResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(status_error(status, &body))
}

fn status_error(status: StatusCode, body: &str) -> ImportError {
    if status == StatusCode::UNAUTHORIZED {
        return ImportError::Unauthorized;
    }
    ImportError::server(status.as_u16(), error_message(body, status))
}

/// Extract `{"error": ".."}` / `{"message": ".."}` bodies, else the raw text.
fn error_message(body: &str, status: StatusCode) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["error", "message", "detail"] {
            if let Some(message) = value.get(key).and_then(|v| v.as_str()) {
                return message.to_string();
            }
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("Unexpected response")
            .to_string()
    } else {
        trimmed.to_string()
    }
}

#[async_trait]
impl RemoteAnalysis for HttpAnalysisClient {
    async fn upload(&self, request: UploadRequest<'_>) -> ImportResult<UploadResponse> {
        let part = Part::bytes(request.file.content.clone()).file_name(request.file.name.clone());
        let mut form = Form::new()
            .part("file", part)
            .text("source", request.source_id.to_string());
        if let Some(password) = request.password {
            form = form.text("password", password.to_string());
        }

        debug!(source = request.source_id, file = %request.file.name, "Uploading export file");
        let response: UploadResponse = self
            .send_json(self.client.post(self.config.endpoint("upload")).multipart(form))
            .await?;

        info!(
            file_id = %response.file_id,
            preview = response.preview.len(),
            "Upload accepted"
        );
        Ok(response)
    }

    async fn preview(&self, file_id: &str, password: Option<&str>) -> ImportResult<PreviewResponse> {
        let url = self
            .config
            .endpoint(&format!("preview/{}", urlencoding::encode(file_id)));
        let builder = self
            .client
            .get(url)
            .query(&[("password", password.unwrap_or(""))]);
        self.send_json(builder).await
    }

    async fn execute_import(&self, request: &ExecuteImportRequest) -> ImportResult<ExecuteImportResponse> {
        let builder = self.client.post(self.config.endpoint("import")).json(request);
        let response: ExecuteImportResponse = self.send_json(builder).await?;
        info!(
            file_id = %request.file_id,
            strategy = %request.merge_strategy,
            imported = response.results.imported,
            merged = response.results.merged,
            "Import executed"
        );
        Ok(response)
    }

    async fn export(&self, request: &ExportRequest) -> ImportResult<ExportPayload> {
        let builder = self.client.post(self.config.endpoint("export")).json(request);
        let response = self.send(builder).await?;

        let content_disposition = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let bytes = response.bytes().await?.to_vec();

        Ok(ExportPayload {
            bytes,
            content_disposition,
        })
    }

    async fn options(&self) -> ImportResult<OptionsResponse> {
        self.send_json(self.client.get(self.config.endpoint("options")))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_mapping() {
        assert_eq!(status_error(StatusCode::UNAUTHORIZED, ""), ImportError::Unauthorized);
        assert_eq!(
            status_error(StatusCode::BAD_REQUEST, r#"{"error":"Unsupported file"}"#),
            ImportError::server(400, "Unsupported file")
        );
        assert_eq!(
            status_error(StatusCode::SERVICE_UNAVAILABLE, ""),
            ImportError::server(503, "Service Unavailable")
        );
        assert_eq!(
            status_error(StatusCode::INTERNAL_SERVER_ERROR, "  stack trace  "),
            ImportError::server(500, "stack trace")
        );
    }

    #[test]
    fn test_client_rejects_invalid_config() {
        let mut config = ClientConfig::new("");
        assert!(HttpAnalysisClient::new(config.clone()).is_err());

        config.base_url = "https://vault.example/api".to_string();
        let client = HttpAnalysisClient::new(config).unwrap();
        assert_eq!(client.config().endpoint("options"), "https://vault.example/api/options");
    }
}
