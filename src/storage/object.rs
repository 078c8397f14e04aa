//! `object_store` backed artifact storage
//!
//! Supports S3-compatible services, a local directory and an in-memory store.
//! The `object_store` API is async; the rest of the crate is not, so each
//! store owns a current-thread tokio runtime and blocks on it per call.

use std::path::Path;
use std::sync::Arc;

use futures::{StreamExt, TryStreamExt};
use object_store::aws::AmazonS3Builder;
use object_store::buffered::BufWriter;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectMeta, ObjectStore};
use tokio::io::AsyncWriteExt;
use tokio::runtime::Runtime;
use tracing::debug;

use super::ArtifactStore;
use crate::config::settings::{StorageBackend, StorageSettings};
use crate::error::{BackupError, BackupResult};
use crate::models::ArtifactListing;

/// Artifact storage on top of any `ObjectStore`
pub struct ObjectArtifactStore {
    store: Arc<dyn ObjectStore>,
    prefix: String,
    runtime: Runtime,
}

impl ObjectArtifactStore {
    /// Wrap an existing object store, keeping artifacts under `prefix`
    pub fn new(store: Arc<dyn ObjectStore>, prefix: &str) -> BackupResult<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| BackupError::Storage(format!("Failed to start storage runtime: {}", e)))?;

        Ok(Self {
            store,
            prefix: prefix.trim_matches('/').to_string(),
            runtime,
        })
    }

    /// Build the store described by the storage settings
    pub fn from_settings(settings: &StorageSettings) -> BackupResult<Self> {
        match settings.backend {
            StorageBackend::S3 => Self::s3(settings),
            StorageBackend::Local => {
                let dir = settings.local_dir.as_ref().ok_or_else(|| {
                    BackupError::Config("storage.local_dir is required for the local backend".into())
                })?;
                Self::local(dir, &settings.prefix)
            }
        }
    }

    /// S3 or an S3-compatible service (path-style requests)
    ///
    /// Credentials missing from the settings are taken from the standard
    /// `AWS_*` environment variables.
    pub fn s3(settings: &StorageSettings) -> BackupResult<Self> {
        let mut builder = AmazonS3Builder::from_env()
            .with_bucket_name(&settings.bucket)
            .with_virtual_hosted_style_request(false);

        if !settings.region.is_empty() {
            builder = builder.with_region(&settings.region);
        }
        if !settings.endpoint.is_empty() {
            builder = builder
                .with_endpoint(&settings.endpoint)
                .with_allow_http(settings.endpoint.starts_with("http://"));
        }
        if !settings.access_key_id.is_empty() {
            builder = builder
                .with_access_key_id(&settings.access_key_id)
                .with_secret_access_key(settings.secret_access_key.as_str());
        }

        let store = builder.build()?;
        Self::new(Arc::new(store), &settings.prefix)
    }

    /// A directory on the local filesystem
    pub fn local(dir: &Path, prefix: &str) -> BackupResult<Self> {
        std::fs::create_dir_all(dir).map_err(|e| {
            BackupError::Io(format!("Failed to create storage directory: {}", e))
        })?;
        let store = LocalFileSystem::new_with_prefix(dir)?;
        Self::new(Arc::new(store), prefix)
    }

    /// A process-local in-memory store
    pub fn in_memory(prefix: &str) -> BackupResult<Self> {
        Self::new(Arc::new(InMemory::new()), prefix)
    }

    /// Storage prefix ("" at the root)
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Key a file with the given name would be stored under
    pub fn key_for(&self, file_name: &str) -> String {
        if self.prefix.is_empty() {
            file_name.to_string()
        } else {
            format!("{}/{}", self.prefix, file_name)
        }
    }
}

impl ArtifactStore for ObjectArtifactStore {
    fn list(&self) -> BackupResult<ArtifactListing> {
        let prefix = (!self.prefix.is_empty()).then(|| ObjectPath::from(self.prefix.as_str()));

        let objects: Vec<ObjectMeta> = self
            .runtime
            .block_on(self.store.list(prefix.as_ref()).try_collect())?;

        debug!("Listed {} object(s) under '{}'", objects.len(), self.prefix);
        Ok(ArtifactListing::new(
            objects.into_iter().map(|meta| meta.location.to_string()),
        ))
    }

    fn upload(&self, local_path: &Path) -> BackupResult<String> {
        let file_name = local_path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                BackupError::Storage(format!("Invalid upload path: {}", local_path.display()))
            })?;
        let key = self.key_for(file_name);
        let location = ObjectPath::from(key.as_str());

        self.runtime.block_on(async {
            let mut file = tokio::fs::File::open(local_path).await.map_err(|e| {
                BackupError::Io(format!("Failed to open {}: {}", local_path.display(), e))
            })?;

            let mut writer = BufWriter::new(Arc::clone(&self.store), location);
            if let Err(e) = tokio::io::copy(&mut file, &mut writer).await {
                let _ = writer.abort().await;
                return Err(BackupError::Storage(format!("Failed to upload {}: {}", key, e)));
            }
            writer
                .shutdown()
                .await
                .map_err(|e| BackupError::Storage(format!("Failed to upload {}: {}", key, e)))
        })?;

        Ok(key)
    }

    fn download(&self, key: &str, local_path: &Path) -> BackupResult<()> {
        let location = ObjectPath::from(key);

        self.runtime.block_on(async {
            let result = self.store.get(&location).await?;
            let mut stream = result.into_stream();

            let mut file = tokio::fs::File::create(local_path).await.map_err(|e| {
                BackupError::Io(format!("Failed to create {}: {}", local_path.display(), e))
            })?;
            while let Some(chunk) = stream.next().await {
                file.write_all(&chunk?).await?;
            }
            file.flush().await?;
            Ok::<(), BackupError>(())
        })
    }

    fn delete(&self, key: &str) -> BackupResult<()> {
        let location = ObjectPath::from(key);
        self.runtime
            .block_on(self.store.delete(&location))
            .map_err(|e| BackupError::Storage(format!("Failed to delete {}: {}", key, e)))
    }
}
