//! Member map pins, keyed by token id.

use crate::category::Category;
use crate::error::{Error, Result};
use crate::types::TokenId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// A member's pin on the globe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub token_id: TokenId,
    pub name: String,
    pub category: Category,
    pub lon: f64,
    pub lat: f64,
    /// Unix seconds at which the pin was written.
    pub created_at: u64,
}

impl Annotation {
    /// Check that the coordinates are finite and on the globe.
    pub fn validate(&self) -> Result<()> {
        validate_coordinates(self.lon, self.lat)
    }
}

/// Longitude in [-180, 180], latitude in [-90, 90].
pub fn validate_coordinates(lon: f64, lat: f64) -> Result<()> {
    if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
        return Err(Error::InvalidInput(format!(
            "longitude {lon} must be between -180 and 180"
        )));
    }
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(Error::InvalidInput(format!(
            "latitude {lat} must be between -90 and 90"
        )));
    }
    Ok(())
}

/// Document store holding one annotation per token.
#[async_trait]
pub trait AnnotationStore: Send + Sync {
    /// Every stored annotation, in no particular order.
    async fn list_annotations(&self) -> Result<Vec<Annotation>>;

    /// Insert or replace the annotation for `annotation.token_id`.
    async fn upsert_annotation(&self, annotation: Annotation) -> Result<()>;
}

/// Annotation store kept in memory.
#[derive(Debug, Default)]
pub struct MemoryAnnotationStore {
    pins: RwLock<HashMap<TokenId, Annotation>>,
}

impl MemoryAnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AnnotationStore for MemoryAnnotationStore {
    async fn list_annotations(&self) -> Result<Vec<Annotation>> {
        Ok(self.pins.read().await.values().cloned().collect())
    }

    async fn upsert_annotation(&self, annotation: Annotation) -> Result<()> {
        annotation.validate()?;
        self.pins.write().await.insert(annotation.token_id, annotation);
        Ok(())
    }
}
