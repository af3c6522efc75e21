use crate::domain::image::{ImageRef, ImageUpload};
use crate::domain::DomainError;
use crate::infrastructure::config::S3Settings;
use async_trait::async_trait;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use std::path::{Component, Path, PathBuf};

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Stores the image under a fresh key and returns where it can be fetched.
    async fn upload(&self, image: ImageUpload) -> Result<ImageRef, DomainError>;
    async fn delete(&self, key: &str) -> Result<(), DomainError>;
}

/// Stores objects as files below `root`; `public_base_url` is whatever serves that directory.
pub struct LocalObjectStorage {
    root: PathBuf,
    public_base_url: String,
}

impl LocalObjectStorage {
    pub fn new(root: impl Into<PathBuf>, public_base_url: &str) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, DomainError> {
        let relative = Path::new(key);
        let is_plain = !key.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));

        if !is_plain {
            return Err(DomainError::StorageError(format!(
                "invalid object key: {}",
                key
            )));
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStorage for LocalObjectStorage {
    async fn upload(&self, image: ImageUpload) -> Result<ImageRef, DomainError> {
        let key = image.object_key();
        let path = self.path_for(&key)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &image.bytes).await?;

        tracing::info!(
            "Stored image {} ({} bytes, original name {})",
            key,
            image.bytes.len(),
            image.file_name
        );

        Ok(ImageRef::new(
            format!("{}/{}", self.public_base_url, key),
            key,
        ))
    }

    async fn delete(&self, key: &str) -> Result<(), DomainError> {
        let path = self.path_for(key)?;

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!("Deleted image {}", key);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("Image {} was already gone", key);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Stores objects in an S3 bucket (or any S3-compatible service).
pub struct S3ObjectStorage {
    client: Client,
    bucket: String,
    public_base_url: String,
}

impl S3ObjectStorage {
    pub async fn connect(settings: &S3Settings) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(settings.region.clone()));

        if let (Some(key_id), Some(secret)) =
            (&settings.access_key_id, &settings.secret_access_key)
        {
            loader = loader.credentials_provider(Credentials::new(
                key_id,
                secret,
                None,
                None,
                "pawpost-server",
            ));
        }

        let shared_config = loader.load().await;
        let mut builder = aws_sdk_s3::config::Builder::from(&shared_config);
        if let Some(endpoint) = &settings.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        tracing::info!(
            "S3 storage configured: bucket={}, region={}",
            settings.bucket,
            settings.region
        );

        Self {
            client: Client::from_conf(builder.build()),
            bucket: settings.bucket.clone(),
            public_base_url: settings.public_base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ObjectStorage for S3ObjectStorage {
    async fn upload(&self, image: ImageUpload) -> Result<ImageRef, DomainError> {
        let key = image.object_key();
        let size = image.bytes.len();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(&image.content_type)
            .body(ByteStream::from(image.bytes))
            .send()
            .await
            .map_err(|e| {
                tracing::error!("S3 upload of {} failed: {}", key, e);
                DomainError::StorageError(format!("S3 upload failed: {}", e))
            })?;

        tracing::info!(
            "Uploaded image {} to bucket {} ({} bytes, original name {})",
            key,
            self.bucket,
            size,
            image.file_name
        );

        Ok(ImageRef::new(
            format!("{}/{}", self.public_base_url, key),
            key,
        ))
    }

    async fn delete(&self, key: &str) -> Result<(), DomainError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("S3 delete of {} failed: {}", key, e);
                DomainError::StorageError(format!("S3 delete failed: {}", e))
            })?;

        tracing::info!("Deleted image {} from bucket {}", key, self.bucket);
        Ok(())
    }
}
