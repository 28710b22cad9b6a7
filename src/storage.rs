use async_trait::async_trait;
use aws_sdk_s3 as s3;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use s3::error::DisplayErrorContext;
use s3::primitives::ByteStream;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object already exists: {0}")]
    AlreadyExists(String),
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// StoredObject
///
/// One entry of a bucket listing.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub key: String,
    pub size: u64,
    pub created_at: Option<DateTime<Utc>>,
}

// 1. StorageService Contract
/// StorageService
///
/// The contract for every interaction with the classroom bucket. Handlers only see
/// this trait, so the real S3 client and the in-memory mock are interchangeable.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Ensures the configured bucket exists. Used in the `Env::Local` setup to
    /// provision the bucket in MinIO.
    async fn ensure_bucket_exists(&self);

    /// Stores `body` under `key`. Never overwrites: an existing key is an error.
    async fn put_object(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<(), StorageError>;

    /// Lists every object at the bucket root.
    async fn list_objects(&self) -> Result<Vec<StoredObject>, StorageError>;

    /// The unauthenticated download URL of `key`.
    fn public_url(&self, key: &str) -> String;
}

/// Joins a base URL and an object key with exactly one slash.
fn join_url(base: &str, key: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        key.trim_start_matches('/')
    )
}

// 2. The Real Implementation (S3/MinIO/Supabase)
/// S3StorageClient
///
/// Backed by the AWS SDK for S3. Thanks to S3 compatibility it talks to:
/// - **Local:** Dockerized MinIO instance.
/// - **Production:** Supabase Storage's S3 gateway.
#[derive(Clone)]
pub struct S3StorageClient {
    client: s3::Client,
    bucket_name: String,
    public_base_url: String,
}

impl S3StorageClient {
    pub fn new(
        endpoint: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        bucket: &str,
        public_base_url: &str,
    ) -> Self {
        let credentials =
            s3::config::Credentials::new(access_key, secret_key, None, None, "static");

        let config = s3::Config::builder()
            .credentials_provider(credentials)
            .endpoint_url(endpoint)
            .region(s3::config::Region::new(region.to_string()))
            .behavior_version_latest()
            // MinIO and Supabase both require path-style addressing (endpoint/bucket/key).
            .force_path_style(true)
            .build();

        Self {
            client: s3::Client::from_conf(config),
            bucket_name: bucket.to_string(),
            public_base_url: public_base_url.to_string(),
        }
    }
}

#[async_trait]
impl StorageService for S3StorageClient {
    /// CreateBucket fails harmlessly when the bucket is already there.
    async fn ensure_bucket_exists(&self) {
        if let Err(e) = self
            .client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await
        {
            tracing::debug!("create_bucket({}) skipped: {:?}", self.bucket_name, e);
        }
    }

    async fn put_object(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<(), StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            .content_type(content_type)
            // Conditional write: fails with 412 if the key is taken.
            .if_none_match("*")
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| {
                let is_conflict = e
                    .raw_response()
                    .map(|r| r.status().as_u16() == 412)
                    .unwrap_or(false);
                if is_conflict {
                    StorageError::AlreadyExists(key.to_string())
                } else {
                    StorageError::Backend(DisplayErrorContext(&e).to_string())
                }
            })?;

        Ok(())
    }

    async fn list_objects(&self) -> Result<Vec<StoredObject>, StorageError> {
        let mut objects = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let page = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket_name)
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(|e| StorageError::Backend(DisplayErrorContext(&e).to_string()))?;

            for object in page.contents() {
                let Some(key) = object.key() else { continue };
                objects.push(StoredObject {
                    key: key.to_string(),
                    size: object.size().unwrap_or(0).max(0) as u64,
                    created_at: object
                        .last_modified()
                        .and_then(|t| DateTime::from_timestamp(t.secs(), t.subsec_nanos())),
                });
            }

            match page.next_continuation_token() {
                Some(token) if page.is_truncated().unwrap_or(false) => {
                    continuation = Some(token.to_string());
                }
                _ => break,
            }
        }

        Ok(objects)
    }

    fn public_url(&self, key: &str) -> String {
        join_url(&self.public_base_url, key)
    }
}

// 3. The Mock Implementation (For Tests)
/// MockStorageService
///
/// In-memory bucket used by the integration tests. Every successful put is also
/// appended to a log so tests can assert how often the upload handler ran.
#[derive(Clone, Default)]
pub struct MockStorageService {
    /// When true, all operations return a simulated failure.
    pub should_fail: bool,
    objects: Arc<Mutex<BTreeMap<String, MockObject>>>,
    puts: Arc<Mutex<Vec<RecordedPut>>>,
}

#[derive(Clone, Debug)]
struct MockObject {
    body: Bytes,
    created_at: DateTime<Utc>,
}

/// A put observed by the mock.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedPut {
    pub key: String,
    pub body: Bytes,
    pub content_type: String,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Every successful put, in call order.
    pub fn recorded_puts(&self) -> Vec<RecordedPut> {
        self.puts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    /// Pre-populates an object without recording a put.
    pub fn seed(&self, key: &str, body: &'static [u8], created_at: DateTime<Utc>) {
        if let Ok(mut objects) = self.objects.lock() {
            objects.insert(
                key.to_string(),
                MockObject {
                    body: Bytes::from_static(body),
                    created_at,
                },
            );
        }
    }

    fn simulated_failure(&self) -> Result<(), StorageError> {
        if self.should_fail {
            return Err(StorageError::Backend(
                "Mock Storage Error: Simulation requested".to_string(),
            ));
        }
        Ok(())
    }

    fn poisoned() -> StorageError {
        StorageError::Backend("mock storage lock poisoned".to_string())
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_bucket_exists(&self) {}

    async fn put_object(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<(), StorageError> {
        self.simulated_failure()?;

        let mut objects = self.objects.lock().map_err(|_| Self::poisoned())?;
        if objects.contains_key(key) {
            return Err(StorageError::AlreadyExists(key.to_string()));
        }
        objects.insert(
            key.to_string(),
            MockObject {
                body: body.clone(),
                created_at: Utc::now(),
            },
        );

        self.puts
            .lock()
            .map_err(|_| Self::poisoned())?
            .push(RecordedPut {
                key: key.to_string(),
                body,
                content_type: content_type.to_string(),
            });
        Ok(())
    }

    async fn list_objects(&self) -> Result<Vec<StoredObject>, StorageError> {
        self.simulated_failure()?;

        let objects = self.objects.lock().map_err(|_| Self::poisoned())?;
        Ok(objects
            .iter()
            .map(|(key, object)| StoredObject {
                key: key.clone(),
                size: object.body.len() as u64,
                created_at: Some(object.created_at),
            })
            .collect())
    }

    fn public_url(&self, key: &str) -> String {
        join_url("http://localhost:9000/mock-bucket", key)
    }
}

/// StorageState
///
/// The shared handle to the storage layer held in the application state.
pub type StorageState = Arc<dyn StorageService>;
