//! S3 object store adapter.

use crate::transfer;
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::operation::head_object::HeadObjectOutput;
use aws_sdk_s3::primitives::ByteStream;
use std::path::Path;
use stowage_core::{
    CacheMetadata, Error, ObjectLocation, ObjectStore, Result, StoreSettings, TransferRange,
};
use tracing::{debug, info};

/// Whether an error response means "no such object".
pub fn is_not_found(code: Option<&str>, status: Option<u16>) -> bool {
    matches!(code, Some("NotFound") | Some("NoSuchKey")) || status == Some(404)
}

fn classify_not_found<E: ProvideErrorMetadata>(err: &SdkError<E, HttpResponse>) -> bool {
    let code = err.as_service_error().and_then(|e| e.code());
    let status = err.raw_response().map(|r| r.status().as_u16());
    is_not_found(code, status)
}

/// Usable object size from a `Content-Length` value.
pub fn object_size(content_length: Option<i64>) -> Option<u64> {
    content_length.and_then(|len| u64::try_from(len).ok())
}

/// Object store backed by Amazon S3 or an S3-compatible service.
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
    part_size: u64,
    concurrency: usize,
}

impl S3ObjectStore {
    /// Build a client from explicit settings; no environment lookups.
    pub fn new(settings: &StoreSettings, bucket: impl Into<String>) -> Result<Self> {
        settings.validate()?;

        let credentials = Credentials::new(
            settings.credentials.access_key_id.clone(),
            settings.credentials.secret_access_key.clone(),
            None,
            None,
            "stowage",
        );

        let mut builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(settings.region.clone()))
            .credentials_provider(credentials);

        if let Some(endpoint) = &settings.endpoint_url {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Ok(Self::from_client(
            Client::from_conf(builder.build()),
            bucket,
            settings.part_size,
            settings.concurrency,
        ))
    }

    /// Wrap an existing client.
    pub fn from_client(
        client: Client,
        bucket: impl Into<String>,
        part_size: u64,
        concurrency: usize,
    ) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            part_size,
            concurrency,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn head(&self, operation: &str, location: &ObjectLocation) -> Result<Option<HeadObjectOutput>> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(location.as_str())
            .send()
            .await
        {
            Ok(output) => Ok(Some(output)),
            Err(err) if classify_not_found(&err) => Ok(None),
            Err(err) => Err(Error::store(
                operation,
                location.as_str(),
                format!("Failed to check object existence: {}", DisplayErrorContext(&err)),
            )),
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn exists(&self, location: &ObjectLocation) -> Result<bool> {
        let found = self.head("exists", location).await?.is_some();
        debug!(location = %location, found, "Probed object");
        Ok(found)
    }

    async fn download(&self, location: &ObjectLocation, local_path: &Path) -> Result<()> {
        let head = self.head("download", location).await?.ok_or_else(|| {
            Error::store("download", location.as_str(), "object not found")
        })?;
        let size = object_size(head.content_length()).ok_or_else(|| {
            Error::store("download", location.as_str(), "unable to determine object size")
        })?;

        info!(
            location = %location,
            bytes = size,
            "Downloading cache from s3://{}/{}",
            self.bucket,
            location
        );

        let client = self.client.clone();
        let bucket = self.bucket.clone();
        let key = location.as_str().to_string();

        transfer::download_ranges(
            location,
            local_path,
            size,
            self.part_size,
            self.concurrency,
            move |range: TransferRange| {
                let client = client.clone();
                let bucket = bucket.clone();
                let key = key.clone();
                async move {
                    let output = client
                        .get_object()
                        .bucket(bucket)
                        .key(&key)
                        .range(range.header_value())
                        .send()
                        .await
                        .map_err(|e| {
                            Error::store(
                                "download",
                                &key,
                                format!("{}: {}", range.header_value(), DisplayErrorContext(&e)),
                            )
                        })?;

                    let body = output.body.collect().await.map_err(|e| {
                        Error::store(
                            "download",
                            &key,
                            format!("{}: failed to read body: {}", range.header_value(), e),
                        )
                    })?;
                    Ok(body.into_bytes())
                }
            },
        )
        .await
    }

    async fn upload(
        &self,
        location: &ObjectLocation,
        local_path: &Path,
        metadata: Option<&CacheMetadata>,
    ) -> Result<()> {
        let body = ByteStream::from_path(local_path).await.map_err(|e| {
            Error::store(
                "upload",
                location.as_str(),
                format!("Failed to read {}: {}", local_path.display(), e),
            )
        })?;

        info!(location = %location, "Uploading cache to s3://{}/{}", self.bucket, location);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(location.as_str())
            .body(body)
            .set_metadata(metadata.map(CacheMetadata::to_map))
            .send()
            .await
            .map_err(|e| {
                Error::store(
                    "upload",
                    location.as_str(),
                    format!("Failed to upload object: {}", DisplayErrorContext(&e)),
                )
            })?;

        Ok(())
    }
}
