//! Remote API client
//!
//! Thin typed wrapper over the Nomad PHP backend. Every endpoint answers
//! with the same envelope:
//!
//! ```text
//! { "success": bool, "message": string?, ...payload }
//! ```
//!
//! `success: false` becomes [`AppError::Server`] carrying the backend's
//! message verbatim. Transport failures become [`AppError::HttpClient`].
//! Nothing here retries; callers decide what to do with a failure.

mod accounts;
pub mod dto;
mod friends;
mod observations;
mod upload;

pub use accounts::ProfileImage;
pub use observations::FeedClient;
pub use upload::{ObservationUpload, UploadClient, UploadError, UploadReceipt};

use reqwest::multipart::{Form, Part};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::time::Duration;
use url::Url;

use crate::config::ApiConfig;
use crate::error::AppError;

/// HTTP client bound to one backend host
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    /// Always ends with `/` so endpoint names join underneath it
    base_url: Url,
    request_timeout: Duration,
    upload_timeout: Duration,
}

impl ApiClient {
    /// Create a client from configuration
    ///
    /// # Errors
    /// Returns error if the base URL is invalid or the TLS backend fails
    /// to initialise
    pub fn new(config: &ApiConfig) -> Result<Self, AppError> {
        let mut base = config.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)
            .map_err(|e| AppError::Config(format!("api.base_url is not a valid URL: {e}")))?;

        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(config.connect_timeout())
            .build()?;

        Ok(Self {
            http,
            base_url,
            request_timeout: config.request_timeout(),
            upload_timeout: config.upload_timeout(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, name: &str) -> Result<Url, AppError> {
        self.base_url
            .join(name)
            .map_err(|e| AppError::Config(format!("invalid endpoint {name}: {e}")))
    }

    /// GET `name?query` and decode the envelope payload
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        name: &str,
        query: &[(&str, String)],
    ) -> Result<T, AppError> {
        let url = self.endpoint(name)?;
        let response = self
            .http
            .get(url)
            .query(query)
            .timeout(self.request_timeout)
            .send()
            .await;

        self.read_envelope(name, response).await
    }

    /// POST a JSON body to `name` and decode the envelope payload
    pub(crate) async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        name: &str,
        body: &B,
    ) -> Result<T, AppError> {
        let url = self.endpoint(name)?;
        let response = self
            .http
            .post(url)
            .json(body)
            .timeout(self.request_timeout)
            .send()
            .await;

        self.read_envelope(name, response).await
    }

    /// POST a multipart form to `name` and decode the envelope payload
    pub(crate) async fn post_multipart<T: DeserializeOwned>(
        &self,
        name: &str,
        form: Form,
    ) -> Result<T, AppError> {
        let url = self.endpoint(name)?;
        let response = self
            .http
            .post(url)
            .multipart(form)
            .timeout(self.upload_timeout)
            .send()
            .await;

        self.read_envelope(name, response).await
    }

    /// Decode the `{success, message, ...}` envelope
    ///
    /// The body is read whatever the HTTP status is: the backend reports
    /// business errors through the envelope, sometimes with a 4xx/5xx.
    async fn read_envelope<T: DeserializeOwned>(
        &self,
        name: &str,
        response: reqwest::Result<reqwest::Response>,
    ) -> Result<T, AppError> {
        use crate::metrics::API_REQUESTS_TOTAL;

        let record = |status: &str| {
            API_REQUESTS_TOTAL.with_label_values(&[name, status]).inc();
        };

        let response = response.inspect_err(|_| record("transport_error"))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .inspect_err(|_| record("transport_error"))?;

        tracing::debug!(endpoint = name, %status, "Backend responded");

        let value: serde_json::Value = serde_json::from_str(&body).map_err(|e| {
            record("malformed");
            AppError::MalformedResponse(format!("{name} returned HTTP {status}: {e}"))
        })?;

        let success = value
            .get("success")
            .and_then(serde_json::Value::as_bool)
            .ok_or_else(|| {
                record("malformed");
                AppError::MalformedResponse(format!("{name} response has no success flag"))
            })?;

        if !success {
            record("rejected");
            let message = value
                .get("message")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("Request failed")
                .to_string();
            return Err(AppError::Server(message));
        }

        let payload = serde_json::from_value(value).map_err(|e| {
            record("malformed");
            AppError::MalformedResponse(format!("{name}: {e}"))
        })?;

        record("ok");
        Ok(payload)
    }
}

/// Load a local image into a multipart part
///
/// Content type is guessed from the file extension.
pub(crate) async fn image_part(path: &Path, file_name: &str) -> Result<Part, AppError> {
    let bytes = tokio::fs::read(path).await?;
    let part = Part::bytes(bytes)
        .file_name(file_name.to_string())
        .mime_str(guess_image_mime(path))?;
    Ok(part)
}

fn guess_image_mime(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        _ => "application/octet-stream",
    }
}

/// File extension to keep when copying or renaming an image
pub(crate) fn image_extension(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| "jpg".to_string())
}
