use crate::domain::DomainError;
use serde::{Deserialize, Serialize};

/// Delimiter used by URLs written before object keys were stored alongside them.
/// The object key is everything after its first occurrence.
pub const LEGACY_KEY_DELIMITER: &str = "m/";

/// Current object key scheme version, used as the key prefix.
pub const KEY_SCHEME: &str = "v1";

pub const ALLOWED_CONTENT_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/webp"];

/// Reference to an image held in object storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub url: String,
    pub key: Option<String>,
}

impl ImageRef {
    pub fn new(url: String, key: String) -> Self {
        Self {
            url,
            key: Some(key),
        }
    }

    /// A reference restored from a row that only kept the public URL.
    pub fn legacy(url: String) -> Self {
        Self { url, key: None }
    }

    pub fn object_key(&self) -> Result<String, DomainError> {
        if let Some(key) = &self.key {
            return Ok(key.clone());
        }

        self.url
            .split_once(LEGACY_KEY_DELIMITER)
            .map(|(_, key)| key.to_string())
            .ok_or_else(|| {
                DomainError::StorageError(format!(
                    "cannot derive object key from image url {}",
                    self.url
                ))
            })
    }
}

/// An image received from a client, not yet stored.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn validate(&self, max_bytes: usize) -> Result<(), DomainError> {
        if !ALLOWED_CONTENT_TYPES.contains(&self.content_type.as_str()) {
            return Err(DomainError::ValidationError(
                "Invalid file type. Only JPEG, PNG, GIF, and WEBP are allowed".to_string(),
            ));
        }
        if self.bytes.is_empty() {
            return Err(DomainError::ValidationError("Image is empty".to_string()));
        }
        if self.bytes.len() > max_bytes {
            return Err(DomainError::ValidationError(format!(
                "Image exceeds maximum size of {} bytes",
                max_bytes
            )));
        }
        Ok(())
    }

    pub fn extension(&self) -> &'static str {
        match self.content_type.as_str() {
            "image/png" => "png",
            "image/gif" => "gif",
            "image/webp" => "webp",
            _ => "jpg",
        }
    }

    /// Object key under the current scheme: `v1/posts/<uuid>.<ext>`.
    pub fn object_key(&self) -> String {
        format!(
            "{}/posts/{}.{}",
            KEY_SCHEME,
            uuid::Uuid::new_v4(),
            self.extension()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(content_type: &str, len: usize) -> ImageUpload {
        ImageUpload {
            file_name: "dog.png".to_string(),
            content_type: content_type.to_string(),
            bytes: vec![7; len],
        }
    }

    #[test]
    fn stored_key_wins_over_url() {
        let image = ImageRef::new(
            "https://bucket.s3.amazonaws.com/other".to_string(),
            "v1/posts/abc.png".to_string(),
        );
        assert_eq!(image.object_key().unwrap(), "v1/posts/abc.png");
    }

    #[test]
    fn legacy_key_is_remainder_after_first_delimiter() {
        let image = ImageRef::legacy("https://bucket.s3.amazonaws.com/dogs/m/1.png".to_string());
        assert_eq!(image.object_key().unwrap(), "dogs/m/1.png");
    }

    #[test]
    fn legacy_key_without_delimiter_is_an_error() {
        let image = ImageRef::legacy("https://cdn.example.org/1.png".to_string());
        assert!(matches!(
            image.object_key(),
            Err(DomainError::StorageError(_))
        ));
    }

    #[test]
    fn new_keys_are_versioned() {
        let key = upload("image/webp", 3).object_key();
        assert!(key.starts_with("v1/posts/"));
        assert!(key.ends_with(".webp"));
    }

    #[test]
    fn validation_rejects_bad_uploads() {
        assert!(upload("image/png", 10).validate(10).is_ok());
        assert!(upload("image/png", 11).validate(10).is_err());
        assert!(upload("image/png", 0).validate(10).is_err());
        assert!(upload("application/pdf", 5).validate(10).is_err());
    }
}
