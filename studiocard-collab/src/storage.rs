use std::{path::PathBuf, sync::Arc, time::Duration};

use async_trait::async_trait;
use dashmap::DashMap;
use log::warn;
use thiserror::Error;
use tokio::{fs, time::sleep};
use url::Url;
use uuid::Uuid;

use crate::PrimaryKey;

pub type ArcedStorage = Arc<dyn ObjectStorage>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Object {0} doesn't exist")]
    NotFound(String),
    #[error("Object path {0} is invalid")]
    InvalidPath(String),
    #[error("Upload failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Upload failed: {0}")]
    Other(String),
}

/// A bucket of objects addressed by path
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<(), StorageError>;
    async fn remove(&self, path: &str) -> Result<(), StorageError>;
    /// Derived from the path, no network call is made
    fn public_url(&self, path: &str) -> String;
}

/// A name no other object gets, sorting by creation time
pub fn unique_object_name(timestamp: i64) -> String {
    format!("{timestamp}-{}", Uuid::new_v4().simple())
}

/// Where a profile image is stored
pub fn profile_image_path(student_id: PrimaryKey, name: &str) -> String {
    format!("profiles/{student_id}-{name}.jpg")
}

/// Where a recording is stored
pub fn recording_path(student_id: PrimaryKey, name: &str) -> String {
    format!("{student_id}/{name}.webm")
}

pub fn lesson_audio_path(lesson_id: PrimaryKey, name: &str) -> String {
    format!("lessons/{lesson_id}/{name}.webm")
}

/// Uploads, retrying with linear backoff.
/// Waits `backoff * attempt` between attempts.
pub async fn upload_with_retry(
    storage: &dyn ObjectStorage,
    path: &str,
    bytes: &[u8],
    content_type: &str,
    attempts: u32,
    backoff: Duration,
) -> Result<(), StorageError> {
    let mut attempt = 1;

    loop {
        match storage.upload(path, bytes, content_type).await {
            Ok(()) => return Ok(()),
            Err(e) if attempt >= attempts => return Err(e),
            Err(e) => {
                warn!("Upload of {} failed on attempt {}: {}", path, attempt, e);
                sleep(backoff * attempt).await;
                attempt += 1;
            }
        }
    }
}

/// Stores objects as files below a bucket directory
pub struct FileStorage {
    root: PathBuf,
    public_base: Url,
}

impl FileStorage {
    /// `public_base` is where the bucket directory is served from
    pub fn new(root: impl Into<PathBuf>, public_base: Url) -> Self {
        Self {
            root: root.into(),
            public_base,
        }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        let escapes = path.split('/').any(|part| part.is_empty() || part == "..");

        if escapes || path.starts_with('/') {
            return Err(StorageError::InvalidPath(path.to_string()));
        }

        Ok(self.root.join(path))
    }
}

#[async_trait]
impl ObjectStorage for FileStorage {
    async fn upload(&self, path: &str, bytes: &[u8], _content_type: &str) -> Result<(), StorageError> {
        let file = self.resolve(path)?;

        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent).await?;
        }

        fs::write(file, bytes).await?;
        Ok(())
    }

    async fn remove(&self, path: &str) -> Result<(), StorageError> {
        let file = self.resolve(path)?;

        fs::remove_file(file).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StorageError::NotFound(path.to_string()),
            _ => e.into(),
        })
    }

    fn public_url(&self, path: &str) -> String {
        self.public_base
            .join(path)
            .map(|url| url.to_string())
            .unwrap_or_else(|_| format!("{}/{}", self.public_base, path))
    }
}

/// Keeps objects in memory
#[derive(Default)]
pub struct MemoryStorage {
    objects: DashMap<String, (Vec<u8>, String)>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.objects.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn upload(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<(), StorageError> {
        self.objects
            .insert(path.to_string(), (bytes.to_vec(), content_type.to_string()));
        Ok(())
    }

    async fn remove(&self, path: &str) -> Result<(), StorageError> {
        self.objects
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    fn public_url(&self, path: &str) -> String {
        format!("memory://audio-tracks/{path}")
    }
}

#[cfg(test)]
mod test {
    use std::{
        sync::atomic::{AtomicU32, Ordering},
        time::Duration,
    };

    use async_trait::async_trait;
    use url::Url;
    use uuid::Uuid;

    use super::{
        profile_image_path, recording_path, unique_object_name, upload_with_retry, FileStorage,
        MemoryStorage, ObjectStorage, StorageError,
    };

    /// Fails a set number of times before delegating
    struct FlakyStorage {
        failures: AtomicU32,
        calls: AtomicU32,
        inner: MemoryStorage,
    }

    #[async_trait]
    impl ObjectStorage for FlakyStorage {
        async fn upload(
            &self,
            path: &str,
            bytes: &[u8],
            content_type: &str,
        ) -> Result<(), StorageError> {
            self.calls.fetch_add(1, Ordering::SeqCst);

            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Err(StorageError::Other("connection reset".to_string()));
            }

            self.inner.upload(path, bytes, content_type).await
        }

        async fn remove(&self, path: &str) -> Result<(), StorageError> {
            self.inner.remove(path).await
        }

        fn public_url(&self, path: &str) -> String {
            self.inner.public_url(path)
        }
    }

    fn flaky(failures: u32) -> FlakyStorage {
        FlakyStorage {
            failures: AtomicU32::new(failures),
            calls: AtomicU32::new(0),
            inner: MemoryStorage::new(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_success() {
        let storage = flaky(2);

        upload_with_retry(&storage, "a/1.webm", b"abc", "audio/webm", 3, Duration::from_millis(500))
            .await
            .unwrap();

        assert_eq!(storage.calls.load(Ordering::SeqCst), 3);
        assert!(storage.inner.contains("a/1.webm"));
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_the_last_attempt() {
        let storage = flaky(5);

        let result = upload_with_retry(
            &storage,
            "a/1.webm",
            b"abc",
            "audio/webm",
            3,
            Duration::from_millis(500),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(storage.calls.load(Ordering::SeqCst), 3);
        assert!(storage.inner.is_empty());
    }

    #[test]
    fn builds_paths() {
        let id = Uuid::new_v4();

        assert_eq!(profile_image_path(id, "1700"), format!("profiles/{id}-1700.jpg"));
        assert_eq!(recording_path(id, "1700"), format!("{id}/1700.webm"));
    }

    #[test]
    fn names_made_in_the_same_millisecond_differ() {
        let first = unique_object_name(1700);
        let second = unique_object_name(1700);

        assert_ne!(first, second);
        assert!(first.starts_with("1700-"));
    }

    #[tokio::test]
    async fn file_storage_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let base = Url::parse("http://localhost:9050/storage/audio-tracks/").unwrap();
        let storage = FileStorage::new(dir.path(), base);

        storage
            .upload("student/1.webm", b"abc", "audio/webm")
            .await
            .unwrap();

        assert_eq!(
            std::fs::read(dir.path().join("student/1.webm")).unwrap(),
            b"abc"
        );
        assert_eq!(
            storage.public_url("student/1.webm"),
            "http://localhost:9050/storage/audio-tracks/student/1.webm"
        );

        storage.remove("student/1.webm").await.unwrap();
        assert!(matches!(
            storage.remove("student/1.webm").await,
            Err(StorageError::NotFound(_))
        ));

        assert!(matches!(
            storage.upload("../escape", b"abc", "audio/webm").await,
            Err(StorageError::InvalidPath(_))
        ));
    }
}
