use std::fmt;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::retry::RetryConfig;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use provdir_config::{Settings, keys};
use tracing::debug;

use super::ObjectUploader;
use crate::error::DeliveryError;

/// Bucket, prefix and static credentials for archive uploads
#[derive(Clone)]
pub struct S3Target {
    pub bucket: String,
    pub base_path: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    pub timeout: Duration,
    /// S3-compatible endpoint; path-style addressing is used when set
    pub endpoint_url: Option<String>,
}

impl S3Target {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            bucket: settings.get_or(keys::AWS_S3_BUCKET_NAME, ""),
            base_path: settings.get_or(keys::AWS_S3_BUCKET_BASE_PATH, ""),
            access_key: settings.get_or(keys::AWS_S3_ACCESS_KEY, ""),
            secret_key: settings.get_or(keys::AWS_S3_SECRET_KEY, ""),
            region: settings.get_or(keys::AWS_S3_REGION, keys::DEFAULT_AWS_S3_REGION),
            timeout: Duration::from_secs(settings.get_u64_or(
                keys::AWS_S3_TIMEOUT_SECONDS,
                keys::DEFAULT_AWS_S3_TIMEOUT_SECONDS,
            )),
            endpoint_url: settings
                .get(keys::AWS_S3_ENDPOINT_URL)
                .map(|url| url.trim().to_string())
                .filter(|url| !url.is_empty()),
        }
    }

    /// `<base_path>/<file name>`
    pub fn object_key(&self, file_name: &str) -> String {
        let prefix = self.base_path.trim_end_matches('/');
        if prefix.is_empty() {
            file_name.to_string()
        } else {
            format!("{prefix}/{file_name}")
        }
    }
}

impl fmt::Debug for S3Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Target")
            .field("bucket", &self.bucket)
            .field("base_path", &self.base_path)
            .field("access_key", &"<redacted>")
            .field("secret_key", &"<redacted>")
            .field("region", &self.region)
            .field("timeout", &self.timeout)
            .field("endpoint_url", &self.endpoint_url)
            .finish()
    }
}

/// Uploads archives with a single `PutObject` per archive; SDK retries are off
#[derive(Debug, Clone)]
pub struct S3Uploader {
    client: Client,
    target: S3Target,
}

impl S3Uploader {
    pub fn new(target: S3Target) -> Self {
        let credentials = Credentials::new(
            target.access_key.clone(),
            target.secret_key.clone(),
            None,
            None,
            "provdir-config",
        );
        let mut builder = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(target.region.clone()))
            .credentials_provider(credentials)
            .retry_config(RetryConfig::disabled());
        if let Some(endpoint) = &target.endpoint_url {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self {
            client: Client::from_conf(builder.build()),
            target,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(S3Target::from_settings(settings))
    }
}

#[async_trait]
impl ObjectUploader for S3Uploader {
    async fn upload(&self, archive: &Path) -> Result<String, DeliveryError> {
        let file_name = archive
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let key = self.target.object_key(&file_name);

        let body = ByteStream::from_path(archive)
            .await
            .map_err(|e| DeliveryError::upload(&key, e.to_string()))?;

        let request = self
            .client
            .put_object()
            .bucket(&self.target.bucket)
            .key(&key)
            .content_type("application/zip")
            .body(body)
            .send();

        match tokio::time::timeout(self.target.timeout, request).await {
            Err(_) => Err(DeliveryError::timeout(
                format!("Upload of {key}"),
                self.target.timeout.as_secs(),
            )),
            Ok(Err(e)) => Err(DeliveryError::upload(&key, describe_sdk_error(e))),
            Ok(Ok(_)) => {
                debug!(bucket = %self.target.bucket, key = %key, "Uploaded archive");
                Ok(key)
            }
        }
    }
}

fn describe_sdk_error<E>(err: SdkError<E>) -> String
where
    E: ProvideErrorMetadata + fmt::Debug,
{
    match &err {
        SdkError::ServiceError(service_err) => {
            let code = service_err.err().code().unwrap_or("Unknown");
            let message = service_err.err().message().unwrap_or("no message");
            format!("{code}: {message}")
        }
        SdkError::TimeoutError(_) => "request timed out".to_string(),
        _ => format!("{err:?}"),
    }
}
