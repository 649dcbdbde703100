#![forbid(unsafe_code)]

//! Requests the reducer asks for, and the single completion each one yields.

use std::thread;

use crate::error::{EditorError, GatewayError};
use crate::model::{Bucket, ObjectSummary, Preview, StorageObject};
use crate::storage::StorageGateway;

/// What to do once a write lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterPut {
    /// Re-fetch the object so the view shows what was persisted.
    Refetch,
    /// Rebuild the bucket's tree and focus the written key.
    Rebuild,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    ListBuckets,
    CreateBucket { name: String, region: String },
    DeleteBucket { name: String },
    ListKeys { bucket: String, focus: Option<String> },
    ListObjects { bucket: String, prefetch: bool },
    GetObject { bucket: String, key: String },
    PutObject { bucket: String, key: String, content: Vec<u8>, then: AfterPut },
}

/// Why the external editor was opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditPurpose {
    UpdateObject { bucket: String, key: String },
    CreateObject { bucket: String, key: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditJob {
    pub content: Vec<u8>,
    /// Extension for the scratch file so the editor picks a syntax.
    pub extension: Option<String>,
    pub purpose: EditPurpose,
}

/// Side effect returned by the reducer for the runtime to carry out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    None,
    Quit,
    Request(Request),
    OpenEditor(EditJob),
}

/// Typed result of a finished request or editor session.
#[derive(Debug)]
pub enum Completion {
    BucketsListed(Result<Vec<Bucket>, GatewayError>),
    BucketCreated { name: String, result: Result<(), GatewayError> },
    BucketDeleted { name: String, result: Result<(), GatewayError> },
    KeysListed {
        bucket: String,
        focus: Option<String>,
        result: Result<Vec<ObjectSummary>, GatewayError>,
    },
    ObjectsListed {
        bucket: String,
        result: Result<Vec<(ObjectSummary, Preview)>, GatewayError>,
    },
    ObjectFetched {
        bucket: String,
        key: String,
        result: Result<StorageObject, GatewayError>,
    },
    ObjectWritten {
        bucket: String,
        key: String,
        then: AfterPut,
        result: Result<(), GatewayError>,
    },
    EditorFinished {
        purpose: EditPurpose,
        result: Result<Vec<u8>, EditorError>,
    },
}

impl Request {
    pub fn label(&self) -> &'static str {
        match self {
            Request::ListBuckets => "list-buckets",
            Request::CreateBucket { .. } => "create-bucket",
            Request::DeleteBucket { .. } => "delete-bucket",
            Request::ListKeys { .. } => "list-keys",
            Request::ListObjects { .. } => "list-objects",
            Request::GetObject { .. } => "get-object",
            Request::PutObject { .. } => "put-object",
        }
    }
}

/// Runs one request against the gateway. Never panics; every failure is
/// folded into the completion.
pub fn execute(gateway: &dyn StorageGateway, request: Request) -> Completion {
    tracing::debug!(request = request.label(), "executing");
    match request {
        Request::ListBuckets => Completion::BucketsListed(gateway.list_buckets()),
        Request::CreateBucket { name, region } => {
            let result = gateway.create_bucket(&name, &region);
            Completion::BucketCreated { name, result }
        }
        Request::DeleteBucket { name } => {
            let result = gateway.delete_bucket(&name);
            Completion::BucketDeleted { name, result }
        }
        Request::ListKeys { bucket, focus } => {
            let result = gateway.list_objects(&bucket);
            Completion::KeysListed { bucket, focus, result }
        }
        Request::ListObjects { bucket, prefetch } => {
            let result = gateway
                .list_objects(&bucket)
                .map(|summaries| with_previews(gateway, &bucket, summaries, prefetch));
            Completion::ObjectsListed { bucket, result }
        }
        Request::GetObject { bucket, key } => {
            let result = gateway.get_object(&bucket, &key);
            Completion::ObjectFetched { bucket, key, result }
        }
        Request::PutObject { bucket, key, content, then } => {
            let result = gateway.put_object(&bucket, &key, content);
            Completion::ObjectWritten { bucket, key, then, result }
        }
    }
}

/// Fetches every object's content concurrently when `prefetch` is set. All
/// fetches are joined before returning; a failed fetch only marks its row.
fn with_previews(
    gateway: &dyn StorageGateway,
    bucket: &str,
    summaries: Vec<ObjectSummary>,
    prefetch: bool,
) -> Vec<(ObjectSummary, Preview)> {
    if !prefetch {
        return summaries.into_iter().map(|s| (s, Preview::NotFetched)).collect();
    }
    let previews: Vec<Preview> = thread::scope(|scope| {
        let handles: Vec<_> = summaries
            .iter()
            .map(|summary| scope.spawn(move || gateway.get_object(bucket, &summary.key)))
            .collect();
        handles
            .into_iter()
            .map(|handle| match handle.join() {
                Ok(Ok(object)) => Preview::Text(object.content_text()),
                Ok(Err(err)) => Preview::Failed(err.to_string()),
                Err(_) => Preview::Failed("fetch panicked".to_string()),
            })
            .collect()
    });
    summaries.into_iter().zip(previews).collect()
}
