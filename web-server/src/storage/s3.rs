// web-server/src/storage/s3.rs
use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Builder as S3ConfigBuilder, Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use session_common::S3Settings;

use super::{BlobStore, StorageError};

/// S3-compatible object storage (AWS S3, Cloudflare R2, MinIO)
#[derive(Debug, Clone)]
pub struct S3BlobStore {
    client: Client,
    bucket: String,
}

impl S3BlobStore {
    pub fn new(settings: &S3Settings) -> Self {
        let credentials = Credentials::new(
            settings.access_key_id.clone(),
            settings.secret_access_key.clone(),
            None,
            None,
            "session-relay",
        );

        let config = S3ConfigBuilder::new()
            .behavior_version(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .endpoint_url(settings.endpoint.clone())
            .region(Region::new(settings.region.clone()))
            // R2 and MinIO only speak path-style addressing
            .force_path_style(true)
            .build();

        Self { client: Client::from_conf(config), bucket: settings.bucket.clone() }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let output = match self.client.get_object().bucket(&self.bucket).key(key).send().await {
            Ok(output) => output,
            Err(err) => {
                let missing = err.as_service_error().map(|e| e.is_no_such_key()).unwrap_or(false);
                if missing {
                    return Ok(None);
                }
                return Err(StorageError::request(key, DisplayErrorContext(&err)));
            }
        };

        let body = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::body(key, e))?;

        Ok(Some(body.into_bytes().to_vec()))
    }

    async fn put(&self, key: &str, body: Vec<u8>) -> Result<(), StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type("application/json")
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| StorageError::request(key, DisplayErrorContext(&e)))?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("s3://{}", self.bucket)
    }
}
