#![forbid(unsafe_code)]

//! In-process gateway: the offline demo backend and the test double.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, RwLock};

use time::OffsetDateTime;

use crate::error::GatewayError;
use crate::model::{Bucket, ObjectSummary, StorageClass, StorageObject};
use crate::storage::{GatewayResult, StorageGateway};

#[derive(Debug, Clone)]
struct StoredObject {
    content: Vec<u8>,
    modified: OffsetDateTime,
}

#[derive(Debug, Clone)]
struct StoredBucket {
    created_at: OffsetDateTime,
    objects: BTreeMap<String, StoredObject>,
}

#[derive(Debug, Default)]
pub struct MemoryGateway {
    buckets: RwLock<BTreeMap<String, StoredBucket>>,
    failures: Mutex<HashMap<&'static str, String>>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// A small store for trying the browser without credentials.
    pub fn seeded() -> Self {
        let gateway = Self::new();
        let now = OffsetDateTime::now_utc();
        let seed: [(&str, &[(&str, &str)]); 3] = [
            (
                "demo-docs",
                &[
                    ("docs/readme.md", "# Demo\n\nBrowse me with the arrow keys.\n"),
                    ("docs/img/logo.txt", "[logo]\n"),
                    ("main.go", "package main\n\nfunc main() {}\n"),
                ],
            ),
            (
                "demo-reports",
                &[
                    ("reports/2024/q1.csv", "region,total\neu,10\nus,12\n"),
                    ("reports/2024/q2.csv", "region,total\neu,11\nus,15\n"),
                    ("summary.txt", "two quarters so far\n"),
                ],
            ),
            ("logs-2023", &[]),
        ];
        if let Ok(mut buckets) = gateway.buckets.write() {
            for (name, objects) in seed {
                let objects = objects
                    .iter()
                    .map(|(key, body)| {
                        let stored = StoredObject { content: body.as_bytes().to_vec(), modified: now };
                        (key.to_string(), stored)
                    })
                    .collect();
                buckets.insert(name.to_string(), StoredBucket { created_at: now, objects });
            }
        }
        gateway
    }

    #[cfg(test)]
    pub fn with_objects<'a>(bucket: &str, objects: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let gateway = Self::new();
        let now = OffsetDateTime::now_utc();
        let objects = objects
            .into_iter()
            .map(|(key, body)| {
                (key.to_string(), StoredObject { content: body.as_bytes().to_vec(), modified: now })
            })
            .collect();
        if let Ok(mut buckets) = gateway.buckets.write() {
            buckets.insert(bucket.to_string(), StoredBucket { created_at: now, objects });
        }
        gateway
    }

    /// Makes every subsequent call of `op` fail with `message` until cleared.
    #[cfg(test)]
    pub fn fail_on(&self, op: &'static str, message: impl Into<String>) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.insert(op, message.into());
        }
    }

    #[cfg(test)]
    pub fn clear_failures(&self) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.clear();
        }
    }

    fn check(&self, op: &'static str) -> GatewayResult<()> {
        let failures = self.failures.lock().map_err(|_| poisoned(op))?;
        match failures.get(op) {
            Some(message) => Err(GatewayError::provider(op, message.clone())),
            None => Ok(()),
        }
    }
}

fn poisoned(op: &'static str) -> GatewayError {
    GatewayError::provider(op, "store lock poisoned")
}

/// Quoted hex digest standing in for a provider etag.
fn etag(content: &[u8]) -> String {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in content {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    format!("\"{hash:016x}\"")
}

fn summary(key: &str, object: &StoredObject) -> ObjectSummary {
    ObjectSummary {
        key: key.to_string(),
        last_modified: Some(object.modified),
        size: object.content.len() as u64,
        etag: etag(&object.content),
        storage_class: StorageClass::Standard,
    }
}

impl StorageGateway for MemoryGateway {
    fn list_buckets(&self) -> GatewayResult<Vec<Bucket>> {
        self.check("ListBuckets")?;
        let buckets = self.buckets.read().map_err(|_| poisoned("ListBuckets"))?;
        Ok(buckets
            .iter()
            .map(|(name, bucket)| Bucket { name: name.clone(), created_at: Some(bucket.created_at) })
            .collect())
    }

    fn create_bucket(&self, name: &str, _region: &str) -> GatewayResult<()> {
        self.check("CreateBucket")?;
        if name.is_empty() {
            return Err(GatewayError::provider("CreateBucket", "bucket name is empty"));
        }
        let mut buckets = self.buckets.write().map_err(|_| poisoned("CreateBucket"))?;
        if buckets.contains_key(name) {
            return Err(GatewayError::BucketExists(name.to_string()));
        }
        let bucket = StoredBucket { created_at: OffsetDateTime::now_utc(), objects: BTreeMap::new() };
        buckets.insert(name.to_string(), bucket);
        Ok(())
    }

    fn delete_bucket(&self, name: &str) -> GatewayResult<()> {
        self.check("DeleteBucket")?;
        let mut buckets = self.buckets.write().map_err(|_| poisoned("DeleteBucket"))?;
        match buckets.get(name) {
            None => return Err(GatewayError::NoSuchBucket(name.to_string())),
            Some(bucket) if !bucket.objects.is_empty() => {
                return Err(GatewayError::BucketNotEmpty(name.to_string()));
            }
            Some(_) => {}
        }
        buckets.remove(name);
        Ok(())
    }

    fn list_objects(&self, bucket: &str) -> GatewayResult<Vec<ObjectSummary>> {
        self.check("ListObjects")?;
        let buckets = self.buckets.read().map_err(|_| poisoned("ListObjects"))?;
        let stored = buckets
            .get(bucket)
            .ok_or_else(|| GatewayError::NoSuchBucket(bucket.to_string()))?;
        Ok(stored.objects.iter().map(|(key, object)| summary(key, object)).collect())
    }

    fn get_object(&self, bucket: &str, key: &str) -> GatewayResult<StorageObject> {
        self.check("GetObject")?;
        let buckets = self.buckets.read().map_err(|_| poisoned("GetObject"))?;
        let stored = buckets
            .get(bucket)
            .ok_or_else(|| GatewayError::NoSuchBucket(bucket.to_string()))?;
        let object = stored
            .objects
            .get(key)
            .ok_or_else(|| GatewayError::NoSuchKey(key.to_string()))?;
        let meta = summary(key, object);
        Ok(StorageObject {
            key: meta.key,
            last_modified: meta.last_modified,
            size: meta.size,
            etag: meta.etag,
            storage_class: meta.storage_class,
            content: object.content.clone(),
        })
    }

    fn put_object(&self, bucket: &str, key: &str, content: Vec<u8>) -> GatewayResult<()> {
        self.check("PutObject")?;
        let mut buckets = self.buckets.write().map_err(|_| poisoned("PutObject"))?;
        let stored = buckets
            .get_mut(bucket)
            .ok_or_else(|| GatewayError::NoSuchBucket(bucket.to_string()))?;
        stored
            .objects
            .insert(key.to_string(), StoredObject { content, modified: OffsetDateTime::now_utc() });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_list_delete_bucket() {
        let gateway = MemoryGateway::new();
        gateway.create_bucket("alpha", "eu-central-1").unwrap();
        gateway.create_bucket("beta", "eu-central-1").unwrap();
        let names: Vec<String> = gateway.list_buckets().unwrap().into_iter().map(|b| b.name).collect();
        assert_eq!(names, vec!["alpha", "beta"]);

        assert_eq!(
            gateway.create_bucket("alpha", "eu-central-1"),
            Err(GatewayError::BucketExists("alpha".to_string()))
        );
        gateway.delete_bucket("alpha").unwrap();
        assert_eq!(gateway.list_buckets().unwrap().len(), 1);
    }

    #[test]
    fn refuses_to_delete_non_empty_bucket() {
        let gateway = MemoryGateway::with_objects("data", [("a.txt", "a")]);
        assert_eq!(
            gateway.delete_bucket("data"),
            Err(GatewayError::BucketNotEmpty("data".to_string()))
        );
    }

    #[test]
    fn put_then_get_and_list_keys() {
        let gateway = MemoryGateway::with_objects("data", [("x/y.txt", "old")]);
        gateway.put_object("data", "x/y.txt", b"new".to_vec()).unwrap();
        gateway.put_object("data", "z.txt", b"zzz".to_vec()).unwrap();
        let object = gateway.get_object("data", "x/y.txt").unwrap();
        assert_eq!(object.content, b"new");
        assert_eq!(object.size, 3);
        assert_eq!(gateway.list_keys("data").unwrap(), vec!["x/y.txt", "z.txt"]);
        assert_eq!(
            gateway.get_object("data", "missing"),
            Err(GatewayError::NoSuchKey("missing".to_string()))
        );
    }

    #[test]
    fn etag_changes_with_content() {
        assert_ne!(etag(b"a"), etag(b"b"));
        assert_eq!(etag(b"same"), etag(b"same"));
    }

    #[test]
    fn injected_failures_surface_as_provider_errors() {
        let gateway = MemoryGateway::seeded();
        gateway.fail_on("ListBuckets", "access denied");
        assert_eq!(
            gateway.list_buckets().unwrap_err().to_string(),
            "ListBuckets failed: access denied"
        );
        gateway.clear_failures();
        assert_eq!(gateway.list_buckets().unwrap().len(), 3);
    }
}
