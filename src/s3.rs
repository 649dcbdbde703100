#![forbid(unsafe_code)]

//! StorageGateway over the AWS SDK.
//!
//! The SDK is async; this adapter owns a small runtime and blocks on each call
//! so the rest of the program only sees synchronous methods.

use std::future::Future;

use aws_sdk_s3::Client;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_s3::primitives::{ByteStream, DateTime};
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use time::OffsetDateTime;
use tokio::runtime::Runtime;

use crate::error::GatewayError;
use crate::model::{Bucket, ObjectSummary, StorageClass, StorageObject};
use crate::storage::{GatewayResult, StorageGateway};

/// S3 rejects an explicit location constraint for its default region.
const DEFAULT_REGION: &str = "us-east-1";

#[derive(Debug)]
pub struct S3Gateway {
    client: Client,
    runtime: Runtime,
}

impl S3Gateway {
    pub fn connect(region: &str, endpoint_url: Option<&str>) -> GatewayResult<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .map_err(|err| GatewayError::Runtime(err.to_string()))?;
        let sdk_config = runtime.block_on(
            aws_config::defaults(aws_config::BehaviorVersion::latest())
                .region(Region::new(region.to_string()))
                .load(),
        );
        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        if let Some(url) = endpoint_url {
            builder = builder.endpoint_url(url).force_path_style(true);
        }
        let client = Client::from_conf(builder.build());
        tracing::info!(region, endpoint = endpoint_url.unwrap_or("default"), "s3 client ready");
        Ok(Self { client, runtime })
    }

    fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}

fn to_time(at: Option<&DateTime>) -> Option<OffsetDateTime> {
    at.and_then(|dt| OffsetDateTime::from_unix_timestamp(dt.secs()).ok())
}

fn sdk_error<E>(op: &'static str, err: aws_sdk_s3::error::SdkError<E>) -> GatewayError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    let message = match err.code() {
        Some(code) => format!("{code}: {}", err.message().unwrap_or("no message")),
        None => DisplayErrorContext(&err).to_string(),
    };
    GatewayError::provider(op, message)
}

impl StorageGateway for S3Gateway {
    fn list_buckets(&self) -> GatewayResult<Vec<Bucket>> {
        let out = self
            .block_on(self.client.list_buckets().send())
            .map_err(|err| sdk_error("ListBuckets", err))?;
        Ok(out
            .buckets()
            .iter()
            .map(|bucket| Bucket {
                name: bucket.name().unwrap_or_default().to_string(),
                created_at: to_time(bucket.creation_date()),
            })
            .collect())
    }

    fn create_bucket(&self, name: &str, region: &str) -> GatewayResult<()> {
        let mut request = self.client.create_bucket().bucket(name);
        if region != DEFAULT_REGION {
            let constraint = CreateBucketConfiguration::builder()
                .location_constraint(BucketLocationConstraint::from(region))
                .build();
            request = request.create_bucket_configuration(constraint);
        }
        self.block_on(request.send())
            .map_err(|err| sdk_error("CreateBucket", err))?;
        Ok(())
    }

    fn delete_bucket(&self, name: &str) -> GatewayResult<()> {
        self.block_on(self.client.delete_bucket().bucket(name).send())
            .map_err(|err| sdk_error("DeleteBucket", err))?;
        Ok(())
    }

    fn list_objects(&self, bucket: &str) -> GatewayResult<Vec<ObjectSummary>> {
        let out = self
            .block_on(self.client.list_objects_v2().bucket(bucket).send())
            .map_err(|err| sdk_error("ListObjects", err))?;
        Ok(out
            .contents()
            .iter()
            .map(|object| ObjectSummary {
                key: object.key().unwrap_or_default().to_string(),
                last_modified: to_time(object.last_modified()),
                size: object.size().unwrap_or_default().max(0) as u64,
                etag: object.e_tag().unwrap_or_default().to_string(),
                storage_class: StorageClass::from_provider(
                    object.storage_class().map(|class| class.as_str()).unwrap_or_default(),
                ),
            })
            .collect())
    }

    fn get_object(&self, bucket: &str, key: &str) -> GatewayResult<StorageObject> {
        let out = self
            .block_on(self.client.get_object().bucket(bucket).key(key).send())
            .map_err(|err| sdk_error("GetObject", err))?;
        let last_modified = to_time(out.last_modified());
        let size = out.content_length().unwrap_or_default().max(0) as u64;
        let etag = out.e_tag().unwrap_or_default().to_string();
        let storage_class = StorageClass::from_provider(
            out.storage_class().map(|class| class.as_str()).unwrap_or_default(),
        );
        let body = self
            .block_on(out.body.collect())
            .map_err(|err| GatewayError::provider("GetObject", err.to_string()))?;
        Ok(StorageObject {
            key: key.to_string(),
            last_modified,
            size,
            etag,
            storage_class,
            content: body.into_bytes().to_vec(),
        })
    }

    fn put_object(&self, bucket: &str, key: &str, content: Vec<u8>) -> GatewayResult<()> {
        let request = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(content));
        self.block_on(request.send())
            .map_err(|err| sdk_error("PutObject", err))?;
        Ok(())
    }
}
