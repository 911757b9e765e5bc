//! Remote asset store for avatars and cover images.
//!
//! Registration stages uploaded files on local disk first; an
//! [`AssetUploader`] then pushes each staged file to the asset store and
//! reports the public URL. A failed upload means "no asset" -- whether that is
//! fatal is the caller's decision.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use crate::config::{env_or, required, ConfigError};

/// A file that now lives in the asset store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedAsset {
    pub url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("failed to read staged file: {0}")]
    Io(#[from] std::io::Error),

    #[error("asset store request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("asset store reply carried no url")]
    MissingUrl,
}

/// Pushes a locally staged file to the asset store.
#[async_trait]
pub trait AssetUploader: Send + Sync {
    async fn upload(&self, local_path: &Path) -> Result<UploadedAsset, UploadError>;
}

/// Upload staging and asset store settings.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Where multipart files are written before upload.
    pub staging_dir: PathBuf,
    /// Largest accepted request body, in bytes.
    pub max_body_bytes: usize,
    /// Asset store endpoint accepting `multipart/form-data` with a `file` part.
    pub endpoint: String,
    /// Optional `upload_preset` form field sent with every upload.
    pub preset: Option<String>,
}

impl UploadConfig {
    /// Load upload configuration from environment variables.
    ///
    /// | Env Var               | Required | Default         |
    /// |-----------------------|----------|-----------------|
    /// | `UPLOAD_STAGING_DIR`  | no       | `./public/temp` |
    /// | `UPLOAD_MAX_BYTES`    | no       | `10485760`      |
    /// | `ASSET_UPLOAD_URL`    | **yes**  | --              |
    /// | `ASSET_UPLOAD_PRESET` | no       | --              |
    pub fn from_env() -> Result<Self, ConfigError> {
        let staging_dir = std::env::var("UPLOAD_STAGING_DIR")
            .unwrap_or_else(|_| "./public/temp".into())
            .into();
        let preset = std::env::var("ASSET_UPLOAD_PRESET")
            .ok()
            .filter(|p| !p.trim().is_empty());

        Ok(Self {
            staging_dir,
            max_body_bytes: env_or("UPLOAD_MAX_BYTES", 10 * 1024 * 1024)?,
            endpoint: required("ASSET_UPLOAD_URL")?,
            preset,
        })
    }
}

/// Reply shape accepted from the asset store. `secure_url` wins over `url`.
#[derive(Debug, Deserialize)]
struct UploadReply {
    secure_url: Option<String>,
    url: Option<String>,
}

/// [`AssetUploader`] that POSTs the staged file as `multipart/form-data`.
///
/// The staged file is deleted after every attempt, successful or not.
#[derive(Debug, Clone)]
pub struct HttpAssetUploader {
    client: reqwest::Client,
    endpoint: String,
    preset: Option<String>,
}

impl HttpAssetUploader {
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: config.endpoint.clone(),
            preset: config.preset.clone(),
        }
    }

    async fn send(&self, local_path: &Path) -> Result<UploadedAsset, UploadError> {
        let bytes = tokio::fs::read(local_path).await?;
        let file_name = local_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();

        let mut form = Form::new().part("file", Part::bytes(bytes).file_name(file_name));
        if let Some(preset) = &self.preset {
            form = form.text("upload_preset", preset.clone());
        }

        let reply: UploadReply = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        reply
            .secure_url
            .or(reply.url)
            .filter(|url| !url.is_empty())
            .map(|url| UploadedAsset { url })
            .ok_or(UploadError::MissingUrl)
    }
}

#[async_trait]
impl AssetUploader for HttpAssetUploader {
    async fn upload(&self, local_path: &Path) -> Result<UploadedAsset, UploadError> {
        let result = self.send(local_path).await;
        remove_staged_file(local_path).await;
        result
    }
}

/// Best-effort removal of a staged upload.
pub async fn remove_staged_file(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove staged upload");
        }
    }
}
