use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::error::DisplayErrorContext;

use crate::error::HandlerError;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Full contents of the object. A partial transfer is an error, never a short read.
    async fn fetch(&self, bucket: &str, key: &str) -> Result<Vec<u8>, HandlerError>;
}

pub fn create_s3_client(config: &aws_config::SdkConfig, use_path_style_buckets: bool) -> s3::Client {
    let client = s3::Client::new(config);

    if use_path_style_buckets {
        tracing::info!("Using path-style buckets");
        let config_builder = client.config().clone().to_builder();
        s3::Client::from_conf(config_builder.force_path_style(true).build())
    } else {
        client
    }
}

#[async_trait]
impl ObjectStore for s3::Client {
    async fn fetch(&self, bucket: &str, key: &str) -> Result<Vec<u8>, HandlerError> {
        let retrieval_error = |reason: String| HandlerError::Retrieval {
            bucket: bucket.to_string(),
            key: key.to_string(),
            reason,
        };

        let object = self
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| retrieval_error(DisplayErrorContext(&err).to_string()))?;

        let body = object
            .body
            .collect()
            .await
            .map_err(|err| retrieval_error(err.to_string()))?;

        let bytes = body.into_bytes().to_vec();
        tracing::info!("Fetched {} bytes from s3://{}/{}", bytes.len(), bucket, key);
        Ok(bytes)
    }
}
