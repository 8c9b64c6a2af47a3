use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::presigning::PresigningConfig;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Prefix of every object key created through the upload flow.
pub const RESOURCE_PREFIX: &str = "resources/";

// Upload URLs stay valid for 10 minutes, download URLs for 5.
const UPLOAD_URL_TTL: Duration = Duration::from_secs(600);
const DOWNLOAD_URL_TTL: Duration = Duration::from_secs(300);

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("invalid presigning configuration: {0}")]
    Config(String),
    #[error("presigning failed: {0}")]
    Presign(String),
}

/// StorageService
///
/// Contract for the object store holding resource files. The S3 client is used in
/// production; `MockStorageService` stands in for it in tests.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Creates the bucket if it does not exist. Used for the local MinIO setup.
    async fn ensure_bucket_exists(&self);

    /// Signs a PUT URL constrained to `content_type`, letting the client upload
    /// the file directly to the bucket.
    async fn presigned_upload_url(
        &self,
        key: &str,
        content_type: &str,
    ) -> Result<String, StorageError>;

    /// Signs a short-lived GET URL for an approved resource.
    async fn presigned_download_url(&self, key: &str) -> Result<String, StorageError>;
}

/// Builds a unique object key under `resources/`, keeping the original extension.
pub fn resource_key(filename: &str) -> String {
    let extension = std::path::Path::new(filename)
        .extension()
        .and_then(std::ffi::OsStr::to_str)
        .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or("bin")
        .to_ascii_lowercase();
    format!("{}{}.{}", RESOURCE_PREFIX, Uuid::new_v4(), extension)
}

/// S3StorageClient
///
/// S3 SDK client. Works against MinIO locally and the Supabase Storage gateway in
/// production; both need path-style addressing.
#[derive(Clone)]
pub struct S3StorageClient {
    client: s3::Client,
    bucket_name: String,
}

impl S3StorageClient {
    pub async fn new(
        endpoint: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        bucket: &str,
    ) -> Self {
        let credentials =
            s3::config::Credentials::new(access_key, secret_key, None, None, "static");

        let config = s3::Config::builder()
            .credentials_provider(credentials)
            .endpoint_url(endpoint)
            .region(s3::config::Region::new(region.to_string()))
            .behavior_version_latest()
            .force_path_style(true)
            .build();

        Self {
            client: s3::Client::from_conf(config),
            bucket_name: bucket.to_string(),
        }
    }
}

#[async_trait]
impl StorageService for S3StorageClient {
    async fn ensure_bucket_exists(&self) {
        // CreateBucket on an existing bucket just errors; nothing to handle.
        if let Err(e) = self
            .client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await
        {
            tracing::debug!("create_bucket skipped: {:?}", e);
        }
    }

    async fn presigned_upload_url(
        &self,
        key: &str,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let presigning = PresigningConfig::expires_in(UPLOAD_URL_TTL)
            .map_err(|e| StorageError::Config(e.to_string()))?;

        let presigned_req = self
            .client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            .content_type(content_type)
            .presigned(presigning)
            .await
            .map_err(|e| StorageError::Presign(e.to_string()))?;

        Ok(presigned_req.uri().to_string())
    }

    async fn presigned_download_url(&self, key: &str) -> Result<String, StorageError> {
        let presigning = PresigningConfig::expires_in(DOWNLOAD_URL_TTL)
            .map_err(|e| StorageError::Config(e.to_string()))?;

        let presigned_req = self
            .client
            .get_object()
            .bucket(&self.bucket_name)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| StorageError::Presign(e.to_string()))?;

        Ok(presigned_req.uri().to_string())
    }
}

/// Strips empty, `.` and `..` segments from a key.
fn sanitize_key(key: &str) -> String {
    key.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// MockStorageService
///
/// Deterministic in-memory stand-in used by handler and router tests.
#[derive(Clone, Default)]
pub struct MockStorageService {
    /// When true, every presign call fails.
    pub should_fail: bool,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self { should_fail: false }
    }

    pub fn new_failing() -> Self {
        Self { should_fail: true }
    }

    fn url(&self, key: &str, action: &str) -> Result<String, StorageError> {
        if self.should_fail {
            return Err(StorageError::Presign("mock storage failure".to_string()));
        }
        Ok(format!(
            "http://localhost:9000/mock-bucket/{}?x-action={}&signature=fake",
            sanitize_key(key),
            action
        ))
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_bucket_exists(&self) {}

    async fn presigned_upload_url(
        &self,
        key: &str,
        _content_type: &str,
    ) -> Result<String, StorageError> {
        self.url(key, "put")
    }

    async fn presigned_download_url(&self, key: &str) -> Result<String, StorageError> {
        self.url(key, "get")
    }
}

pub type StorageState = Arc<dyn StorageService>;
