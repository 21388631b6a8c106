//! Object storage for archived rasters.
//!
//! A single S3 bucket receives each final raster in one signed PUT. The
//! [`S3Store`] handle is built once at startup and cloned into every request.

pub mod sigv4;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use aws_config::{BehaviorVersion, SdkConfig};
use aws_credential_types::provider::ProvideCredentials;
use bytes::Bytes;
use reqwest::{Client, Url};
use serde::Serialize;
use tokio::sync::OnceCell;

use crate::error::{Error, Result};

/// Used when neither the environment nor the shared config names a region.
const FALLBACK_REGION: &str = "us-east-1";

/// Key material and region for signing one PUT.
///
/// Never cached across uploads when it comes from the default provider
/// chain: temporary keys from a profile, container role or instance role
/// expire, so each archive asks the chain again.
#[derive(Debug, Clone)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    /// Present for STS-issued keys; sent as `x-amz-security-token`
    pub session_token: Option<String>,
    /// Signing region, also the host region of virtual-hosted URLs
    pub region: String,
}

impl AwsCredentials {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
            region: region.into(),
        }
    }

    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    /// Asks the provider chain of a loaded AWS config for fresh keys.
    ///
    /// The default chain tries environment variables, the shared
    /// credentials/config files (`AWS_PROFILE`), web identity, the ECS
    /// container endpoint and finally EC2 instance metadata (IMDSv2).
    pub async fn from_sdk_config(config: &SdkConfig) -> Result<Self> {
        let provider = config
            .credentials_provider()
            .ok_or_else(|| Error::UploadFailed("no AWS credential provider available".into()))?;
        let keys = provider
            .provide_credentials()
            .await
            .map_err(|e| Error::UploadFailed(format!("cannot resolve AWS credentials: {}", e)))?;
        let region = config
            .region()
            .map(|r| r.to_string())
            .unwrap_or_else(|| FALLBACK_REGION.to_string());

        Ok(Self {
            access_key_id: keys.access_key_id().to_string(),
            secret_access_key: keys.secret_access_key().to_string(),
            session_token: keys.session_token().map(str::to_string),
            region,
        })
    }
}

#[derive(Debug, Clone)]
enum CredentialSource {
    /// Default AWS provider chain, loaded on the first upload
    Chain(Arc<OnceCell<SdkConfig>>),
    Static(AwsCredentials),
}

/// Location of a successfully archived raster
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchivedObject {
    pub bucket: String,
    pub key: String,
}

/// Shared S3 upload handle
#[derive(Debug, Clone)]
pub struct S3Store {
    client: Client,
    bucket: String,
    key_prefix: String,
    endpoint: Option<String>,
    credentials: CredentialSource,
}

impl S3Store {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

    /// Creates a store that signs with the default AWS credential chain
    pub fn new(bucket: impl Into<String>, key_prefix: impl Into<String>, endpoint: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Config(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            bucket: bucket.into(),
            key_prefix: key_prefix.into(),
            endpoint,
            credentials: CredentialSource::Chain(Arc::new(OnceCell::new())),
        })
    }

    /// Signs with fixed keys instead of the provider chain
    pub fn with_credentials(mut self, credentials: AwsCredentials) -> Self {
        self.credentials = CredentialSource::Static(credentials);
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Object key for a local raster: the configured prefix plus its file name
    pub fn object_key(&self, path: &Path) -> Result<String> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::UploadFailed(format!("no usable file name in {}", path.display())))?;
        Ok(format!("{}{}", self.key_prefix, name))
    }

    async fn resolve_credentials(&self) -> Result<AwsCredentials> {
        match &self.credentials {
            CredentialSource::Chain(config) => {
                let config = config
                    .get_or_init(|| aws_config::defaults(BehaviorVersion::latest()).load())
                    .await;
                AwsCredentials::from_sdk_config(config).await
            }
            CredentialSource::Static(creds) => Ok(creds.clone()),
        }
    }

    /// Virtual-hosted URL on AWS, path-style URL on a custom endpoint
    fn object_url(&self, key: &str, region: &str) -> Result<Url> {
        let encoded_key = sigv4::encode_path(key);
        let raw = match &self.endpoint {
            Some(endpoint) => format!(
                "{}/{}/{}",
                endpoint.trim_end_matches('/'),
                sigv4::encode_path(&self.bucket),
                encoded_key
            ),
            None => format!("https://{}.s3.{}.amazonaws.com/{}", self.bucket, region, encoded_key),
        };
        Url::parse(&raw).map_err(|e| Error::UploadFailed(format!("invalid object URL {}: {}", raw, e)))
    }

    /// Uploads the file at `path` under its derived object key
    pub async fn put_file(&self, path: &Path) -> Result<ArchivedObject> {
        let key = self.object_key(path)?;
        let body = tokio::fs::read(path)
            .await
            .map_err(|e| Error::UploadFailed(format!("cannot read {}: {}", path.display(), e)))?;
        self.put_bytes(key, Bytes::from(body)).await
    }

    /// Uploads an in-memory raster in a single PUT
    pub async fn put_bytes(&self, key: String, body: Bytes) -> Result<ArchivedObject> {
        let credentials = self.resolve_credentials().await?;
        let url = self.object_url(&key, &credentials.region)?;
        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => return Err(Error::UploadFailed(format!("object URL {} has no host", url))),
        };

        let signed = sigv4::sign_put(&credentials, &host, url.path(), &body, chrono::Utc::now());


        let mut req = self
            .client
            .put(url.clone())
            .header(reqwest::header::CONTENT_TYPE, crate::TIFF_MIME);
        for (name, value) in &signed {
            req = req.header(name.as_str(), value.as_str());
        }

        tracing::debug!(bucket = %self.bucket, %key, bytes = body.len(), "uploading raster");

        let resp = req
            .body(body)
            .send()
            .await
            .map_err(|e| Error::UploadFailed(format!("PUT {}: {}", url, e)))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let snippet: String = text.chars().take(512).collect();
            return Err(Error::UploadFailed(format!("HTTP {} from {}: {}", status, url, snippet)));
        }

        Ok(ArchivedObject {
            bucket: self.bucket.clone(),
            key,
        })
    }
}
