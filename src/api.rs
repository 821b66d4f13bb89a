use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;

use crate::{
    config::Config,
    error::{AppError, Result},
    models::{FileRecord, PaymentDraft, QuotaState},
};

/// HTTP client for the remote store that owns accounts, files, quotas and
/// payment requests. All interpretation of wire JSON happens here: declines
/// become `RemoteRejected`, transport failures and unparseable bodies become
/// `Network`.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct QuotaWire {
    used: f64,
    total: f64,
}

#[derive(Debug, Default, Deserialize)]
struct FilesWire {
    #[serde(default)]
    files: Vec<FileRecord>,
}

#[derive(Debug, Deserialize)]
struct OutcomeWire {
    #[serde(default)]
    success: bool,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommandWire {
    #[serde(rename = "type")]
    kind: Option<String>,
    result: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RejectionWire {
    error: Option<String>,
    result: Option<String>,
}

impl RejectionWire {
    fn message(self, fallback: &str) -> String {
        self.error
            .or(self.result)
            .unwrap_or_else(|| fallback.to_string())
    }
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(ApiClient {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `GET /api/get-user-quota/{username}` -> `{used, total}` in MB.
    pub async fn get_user_quota(&self, username: &str) -> Result<QuotaState> {
        let response = self
            .http
            .get(self.url(&format!("/api/get-user-quota/{}", username)))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(reject(&body, status, "Failed to fetch quota"));
        }

        let wire: QuotaWire = serde_json::from_str(&body)?;
        Ok(QuotaState {
            used_mb: wire.used,
            total_mb: wire.total,
        })
    }

    /// `POST /api/get-user-files` -> the authoritative file list, unsorted.
    pub async fn get_user_files(&self, username: &str) -> Result<Vec<FileRecord>> {
        let response = self
            .http
            .post(self.url("/api/get-user-files"))
            .json(&json!({ "username": username }))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(reject(&body, status, "Failed to fetch files"));
        }

        let wire: FilesWire = serde_json::from_str(&body)?;
        Ok(wire.files)
    }

    /// `POST /api/rename-file`; `success: false` is a decline.
    pub async fn rename_file(
        &self,
        username: &str,
        file_id: &str,
        new_file_name: &str,
    ) -> Result<()> {
        let response = self
            .http
            .post(self.url("/api/rename-file"))
            .json(&json!({
                "username": username,
                "file_id": file_id,
                "new_file_name": new_file_name,
            }))
            .send()
            .await?;

        Self::expect_success(response, "Failed to rename file").await
    }

    /// `POST /api/delete-file`; the size accompanies the id so the server
    /// can release the quota it accounted for.
    pub async fn delete_file(&self, username: &str, file_id: &str, file_size_mb: f64) -> Result<()> {
        let response = self
            .http
            .post(self.url("/api/delete-file"))
            .json(&json!({
                "username": username,
                "file_id": file_id,
                "file_size_mb": file_size_mb,
            }))
            .send()
            .await?;

        Self::expect_success(response, "Failed to delete file").await
    }

    /// `POST /api/request-storage` files a purchase request for admin
    /// approval; any 2xx is an accept, fulfillment happens out of band.
    pub async fn request_storage(
        &self,
        username: &str,
        additional_storage_gb: u32,
        price: u32,
        payment_details: &PaymentDraft,
    ) -> Result<()> {
        let response = self
            .http
            .post(self.url("/api/request-storage"))
            .json(&json!({
                "username": username,
                "additional_storage_gb": additional_storage_gb,
                "price": price,
                "payment_details": payment_details,
            }))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await?;
        Err(reject(&body, status, "Payment request failed"))
    }

    /// `POST /api/grpc-call` with the `upload_file` command. The gateway
    /// reports failure as `type == "ERROR"` rather than a status code.
    pub async fn upload_file(&self, username: &str, file_name: &str, file_size_mb: f64) -> Result<()> {
        let response = self
            .http
            .post(self.url("/api/grpc-call"))
            .json(&json!({
                "command": "upload_file",
                "params": {
                    "username": username,
                    "file_name": file_name,
                    "file_size_mb": file_size_mb,
                },
            }))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let wire: CommandWire = serde_json::from_str(&body)?;

        if !status.is_success() || wire.kind.as_deref() == Some("ERROR") {
            return Err(AppError::RemoteRejected(
                wire.result.unwrap_or_else(|| "Upload failed".to_string()),
            ));
        }
        Ok(())
    }

    async fn expect_success(response: reqwest::Response, fallback: &str) -> Result<()> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(reject(&body, status, fallback));
        }

        let wire: OutcomeWire = serde_json::from_str(&body)?;
        if wire.success {
            Ok(())
        } else {
            Err(AppError::RemoteRejected(
                wire.error.unwrap_or_else(|| fallback.to_string()),
            ))
        }
    }
}

fn reject(body: &str, status: StatusCode, fallback: &str) -> AppError {
    match serde_json::from_str::<RejectionWire>(body) {
        Ok(wire) => AppError::RemoteRejected(wire.message(fallback)),
        Err(_) => AppError::Network(format!("{}: HTTP {}", fallback, status)),
    }
}
