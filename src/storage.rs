#![forbid(unsafe_code)]

//! The narrow capability the browser needs from an object-storage provider.
//!
//! Calls are synchronous; the UI runs each one on a background task and feeds
//! the result back as a completion message.

use std::fmt;

use crate::error::GatewayError;
use crate::model::{Bucket, ObjectSummary, StorageObject};

pub type GatewayResult<T> = Result<T, GatewayError>;

pub trait StorageGateway: fmt::Debug + Send + Sync {
    fn list_buckets(&self) -> GatewayResult<Vec<Bucket>>;

    fn create_bucket(&self, name: &str, region: &str) -> GatewayResult<()>;

    fn delete_bucket(&self, name: &str) -> GatewayResult<()>;

    /// Full key listing with metadata, no content.
    fn list_objects(&self, bucket: &str) -> GatewayResult<Vec<ObjectSummary>>;

    /// Keys only, for callers that need no metadata. The tree listing goes
    /// through `list_objects` instead because its rows show modification times.
    fn list_keys(&self, bucket: &str) -> GatewayResult<Vec<String>> {
        Ok(self
            .list_objects(bucket)?
            .into_iter()
            .map(|summary| summary.key)
            .collect())
    }

    fn get_object(&self, bucket: &str, key: &str) -> GatewayResult<StorageObject>;

    fn put_object(&self, bucket: &str, key: &str, content: Vec<u8>) -> GatewayResult<()>;
}
