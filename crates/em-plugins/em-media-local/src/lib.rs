//! # em-media-local
//!
//! Local filesystem implementation of `MediaStore`. Content-addressable:
//! the SHA-256 of the bytes is the public id, which deduplicates uploads
//! for free, and files are sharded two levels deep to keep directories
//! small.

use async_trait::async_trait;
use em_core::error::{AppError, Result};
use em_core::models::MediaObject;
use em_core::traits::MediaStore;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use tokio::fs;

pub struct LocalMediaStore {
    /// Root directory for all uploads (e.g., "./data/media")
    root_path: PathBuf,
    /// Public URL prefix (e.g., "/media")
    url_prefix: String,
}

impl LocalMediaStore {
    pub fn new(root: PathBuf, url_prefix: String) -> Self {
        Self { root_path: root, url_prefix }
    }

    /// Generates a sharded path: "ab/cd/abcdef...hash"
    fn sharded_path(&self, hash: &str) -> PathBuf {
        let mut path = self.root_path.clone();
        path.push(&hash[0..2]);
        path.push(&hash[2..4]);
        path.push(hash);
        path
    }

    fn url_for(&self, hash: &str) -> String {
        format!("{}/{}/{}/{}", self.url_prefix, &hash[0..2], &hash[2..4], hash)
    }
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    async fn save(&self, data: Vec<u8>, content_type: &str) -> Result<MediaObject> {
        if data.is_empty() {
            return Err(AppError::InvalidInput("empty upload".into()));
        }
        let mut hasher = Sha256::new();
        hasher.update(&data);
        let hash = hex::encode(hasher.finalize());

        let target = self.sharded_path(&hash);
        let parent = target
            .parent()
            .ok_or_else(|| AppError::Internal("media path has no parent".into()))?;
        fs::create_dir_all(parent)
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?;
        if !target.exists() {
            fs::write(&target, &data)
                .await
                .map_err(|e| AppError::Internal(e.to_string()))?;
        }

        Ok(MediaObject {
            url: self.url_for(&hash),
            media_type: content_type.to_string(),
            public_id: hash,
        })
    }

    /// Best-effort: a missing file counts as already released.
    async fn delete(&self, public_id: &str) -> Result<()> {
        if public_id.len() < 4 || !public_id.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(AppError::InvalidInput("malformed media id".into()));
        }
        match fs::remove_file(self.sharded_path(public_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Internal(e.to_string())),
        }
    }
}
