//! S3 bucket for the object-storage metadata store.

use std::fmt::Debug;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use ionfs_common::{Error, Result};

use crate::object::{Listing, ObjectBucket};

/// S3 bucket with a lazily built client.
///
/// The client is created on first use, at most once, even under concurrent
/// first calls, and then shared.
pub struct S3Bucket {
    bucket: String,
    region: Option<String>,
    endpoint: Option<String>,
    client: OnceCell<Client>,
}

impl S3Bucket {
    /// Create a bucket handle.
    ///
    /// Credentials come from the standard AWS provider chain. A custom
    /// `endpoint` switches to path-style addressing for S3-compatible stores.
    pub fn new(bucket: impl Into<String>, region: Option<String>, endpoint: Option<String>) -> Self {
        Self {
            bucket: bucket.into(),
            region,
            endpoint,
            client: OnceCell::new(),
        }
    }

    async fn client(&self) -> &Client {
        self.client
            .get_or_init(|| async {
                let mut loader = aws_config::defaults(BehaviorVersion::latest());
                if let Some(region) = &self.region {
                    loader = loader.region(Region::new(region.clone()));
                }
                if let Some(endpoint) = &self.endpoint {
                    loader = loader.endpoint_url(endpoint.clone());
                }
                let shared = loader.load().await;

                let conf = aws_sdk_s3::config::Builder::from(&shared)
                    .force_path_style(self.endpoint.is_some())
                    .build();

                info!(bucket = %self.bucket, "S3 client initialised");
                Client::from_conf(conf)
            })
            .await
    }

    fn sdk_error<E, R>(e: SdkError<E, R>) -> Error
    where
        E: std::error::Error + 'static,
        R: Debug,
    {
        match &e {
            SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => {
                Error::BackendUnavailable(format!("S3: {}", DisplayErrorContext(&e)))
            }
            _ => Error::Backend(format!("S3: {}", DisplayErrorContext(&e))),
        }
    }
}

#[async_trait]
impl ObjectBucket for S3Bucket {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn list(&self, prefix: &str, delimiter: Option<char>) -> Result<Listing> {
        let client = self.client().await;
        let mut listing = Listing::default();
        let mut token: Option<String> = None;

        loop {
            let mut req = client.list_objects_v2().bucket(&self.bucket).prefix(prefix);
            if let Some(d) = delimiter {
                req = req.delimiter(d.to_string());
            }
            if let Some(t) = token.take() {
                req = req.continuation_token(t);
            }

            let resp = req.send().await.map_err(Self::sdk_error)?;

            listing
                .keys
                .extend(resp.contents().iter().filter_map(|o| o.key().map(str::to_string)));
            listing.common_prefixes.extend(
                resp.common_prefixes()
                    .iter()
                    .filter_map(|p| p.prefix().map(str::to_string)),
            );

            match resp.next_continuation_token() {
                Some(t) if resp.is_truncated().unwrap_or(false) => token = Some(t.to_string()),
                _ => break,
            }
        }

        debug!(bucket = %self.bucket, prefix = %prefix, keys = listing.keys.len(), "S3 listing");
        Ok(listing)
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let resp = self
            .client()
            .await
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        match resp {
            Ok(output) => {
                let body = output
                    .body
                    .collect()
                    .await
                    .map_err(|e| Error::Backend(format!("S3 body read failed: {}", e)))?;
                Ok(Some(body.into_bytes()))
            }
            Err(e) => {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    return Ok(None);
                }
                Err(Self::sdk_error(e))
            }
        }
    }

    async fn put(&self, key: &str, body: Bytes) -> Result<()> {
        self.client()
            .await
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(Self::sdk_error)?;
        Ok(())
    }

    async fn copy(&self, from: &str, to: &str) -> Result<()> {
        self.client()
            .await
            .copy_object()
            .bucket(&self.bucket)
            .copy_source(format!("{}/{}", self.bucket, from))
            .key(to)
            .send()
            .await
            .map_err(Self::sdk_error)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.client()
            .await
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(Self::sdk_error)?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let resp = self
            .client()
            .await
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        match resp {
            Ok(_) => Ok(true),
            Err(e) if e.as_service_error().is_some_and(|se| se.is_not_found()) => Ok(false),
            Err(e) => Err(Self::sdk_error(e)),
        }
    }
}
