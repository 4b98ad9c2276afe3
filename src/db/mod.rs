// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Document store layer (Firestore, or in-memory for development and tests).

pub mod firestore;
pub mod memory;

pub use self::firestore::FirestoreDb;
pub use memory::MemoryStore;

use crate::error::AppError;
use crate::models::{Customization, DesignSource};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Collection names as constants.
pub mod collections {
    pub const DESIGNS: &str = "designs";
}

/// CRUD over the `designs` collection.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Write a new record and return its store-assigned id.
    async fn insert_design(&self, record: &DesignRecord) -> Result<String, AppError>;

    async fn get_design(&self, id: &str) -> Result<Option<DesignDocument>, AppError>;

    /// All records for an owner, newest first by `created_at`.
    async fn designs_for_owner(&self, owner_id: &str) -> Result<Vec<DesignDocument>, AppError>;

    async fn delete_design(&self, id: &str) -> Result<(), AppError>;
}

/// Write shape of a design record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesignRecord {
    pub owner_id: String,
    pub image_ref: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_image_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customization: Option<Customization>,
    pub source: DesignSource,
    #[serde(with = "::firestore::serialize_as_timestamp")]
    pub created_at: DateTime<Utc>,
    /// Client-side RFC3339 copy of the creation time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl DesignRecord {
    /// Reduced-field record: owner, image ref, timestamp and type tag only.
    pub fn minimal(owner_id: &str, image_ref: &str, created_at: DateTime<Utc>) -> Self {
        Self {
            owner_id: owner_id.to_string(),
            image_ref: image_ref.to_string(),
            original_image_ref: None,
            prompt: None,
            customization: None,
            source: DesignSource::FallbackDirect,
            created_at,
            saved_at: None,
            filename: None,
        }
    }

    pub fn is_minimal(&self) -> bool {
        self.original_image_ref.is_none()
            && self.prompt.is_none()
            && self.customization.is_none()
            && self.saved_at.is_none()
            && self.filename.is_none()
    }
}

/// Creation timestamp as found in the store.
///
/// Native timestamps come back as RFC3339 and land in `Native`; anything
/// else written by older clients is kept as text for lenient parsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoreTimestamp {
    Native(DateTime<Utc>),
    Text(String),
}

/// Read shape of a design record. Every field is optional since records
/// written by the reduced-field tier or by older clients may lack any of them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DesignDocument {
    #[serde(alias = "_firestore_id", default)]
    pub id: Option<String>,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub image_ref: Option<String>,
    #[serde(default)]
    pub original_image_ref: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub customization: Option<Customization>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub created_at: Option<StoreTimestamp>,
    #[serde(default)]
    pub saved_at: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
}

impl DesignDocument {
    pub fn from_record(id: &str, record: &DesignRecord) -> Self {
        Self {
            id: Some(id.to_string()),
            owner_id: Some(record.owner_id.clone()),
            image_ref: Some(record.image_ref.clone()),
            original_image_ref: record.original_image_ref.clone(),
            prompt: record.prompt.clone(),
            customization: record.customization.clone(),
            source: Some(record.source.as_str().to_string()),
            created_at: Some(StoreTimestamp::Native(record.created_at)),
            saved_at: record.saved_at.clone(),
            filename: record.filename.clone(),
        }
    }

    /// Creation time if it can be read from either timestamp field.
    pub fn created_at_parsed(&self) -> Option<DateTime<Utc>> {
        match &self.created_at {
            Some(StoreTimestamp::Native(dt)) => Some(*dt),
            Some(StoreTimestamp::Text(raw)) => crate::time_utils::parse_lenient(raw),
            None => None,
        }
        .or_else(|| {
            self.saved_at
                .as_deref()
                .and_then(crate::time_utils::parse_lenient)
        })
    }
}
