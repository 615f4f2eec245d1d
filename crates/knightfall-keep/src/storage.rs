//! Persistent storage using RocksDB.
//!
//! One database holds both the session restore cache (`cache:` keys) and the
//! member map pins (`location:<token_id>` keys).

use crate::error::Result;
use async_trait::async_trait;
use knightfall_session::{Annotation, AnnotationStore, RestoreCache};
use rocksdb::{Options, DB};
use std::path::Path;

/// Storage backend for keep data.
pub struct Storage {
    db: DB,
}

impl Storage {
    /// Open or create storage at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        let db = DB::open(&opts, path)?;
        Ok(Self { db })
    }

    // --- Restore cache ---

    fn cache_key(key: &str) -> String {
        format!("cache:{}", key)
    }

    /// Read a restore cache entry.
    pub fn get_cached(&self, key: &str) -> Result<Option<String>> {
        match self.db.get(Self::cache_key(key).as_bytes())? {
            Some(data) => Ok(Some(String::from_utf8_lossy(&data).into_owned())),
            None => Ok(None),
        }
    }

    /// Write a restore cache entry.
    pub fn put_cached(&self, key: &str, value: &str) -> Result<()> {
        self.db.put(Self::cache_key(key).as_bytes(), value.as_bytes())?;
        Ok(())
    }

    /// Delete a restore cache entry.
    pub fn delete_cached(&self, key: &str) -> Result<()> {
        self.db.delete(Self::cache_key(key).as_bytes())?;
        Ok(())
    }

    // --- Annotations ---

    /// Store an annotation, replacing any previous one for its token.
    pub fn put_annotation(&self, annotation: &Annotation) -> Result<()> {
        let key = format!("location:{}", annotation.token_id);
        let value = serde_json::to_vec(annotation)?;
        self.db.put(key.as_bytes(), value)?;
        Ok(())
    }

    /// List all annotations.
    pub fn list_annotations(&self) -> Result<Vec<Annotation>> {
        let prefix = b"location:";
        let mut annotations = Vec::new();

        let iter = self.db.prefix_iterator(prefix);
        for item in iter {
            let (key, value) = item?;
            if key.starts_with(prefix) {
                let annotation: Annotation = serde_json::from_slice(&value)?;
                annotations.push(annotation);
            } else {
                break;
            }
        }

        Ok(annotations)
    }
}

impl RestoreCache for Storage {
    fn get(&self, key: &str) -> knightfall_session::Result<Option<String>> {
        Ok(self.get_cached(key)?)
    }

    fn put(&self, key: &str, value: &str) -> knightfall_session::Result<()> {
        Ok(self.put_cached(key, value)?)
    }

    fn remove(&self, key: &str) -> knightfall_session::Result<()> {
        Ok(self.delete_cached(key)?)
    }
}

#[async_trait]
impl AnnotationStore for Storage {
    async fn list_annotations(&self) -> knightfall_session::Result<Vec<Annotation>> {
        Ok(Storage::list_annotations(self)?)
    }

    async fn upsert_annotation(&self, annotation: Annotation) -> knightfall_session::Result<()> {
        annotation.validate()?;
        Ok(self.put_annotation(&annotation)?)
    }
}
