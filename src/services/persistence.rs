// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Persistence gateway: save, read and delete designs across the document
//! store and the blob store.
//!
//! Saves try an ordered list of tiers and the first one that succeeds wins:
//! - `Direct`: promote inline data to the blob store and write the full
//!   record (remote refs are written as-is)
//! - `ServiceFallback`: when the blob upload failed, write the full record
//!   with the inline data itself
//! - `Minimal`: after a failed document write, write owner, image ref,
//!   timestamp and type tag only

use crate::data_url;
use crate::db::{DesignDocument, DesignRecord, DocumentStore};
use crate::error::{AppError, PersistenceError, SaveTier};
use crate::models::design::is_local_server_ref;
use crate::models::{Design, DesignSource, NewDesign};
use crate::storage::{blob_key, BlobStore};
use crate::time_utils::format_utc_rfc3339;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Tiers in the order they are attempted.
pub const SAVE_TIERS: [SaveTier; 3] = [SaveTier::Direct, SaveTier::ServiceFallback, SaveTier::Minimal];

/// Which step of the direct tier failed.
enum PromoteFailure {
    Upload(AppError),
    Write(AppError),
}

/// Gateway over the two stores.
#[derive(Clone)]
pub struct PersistenceGateway {
    docs: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobStore>,
    local_server_patterns: Vec<String>,
}

impl PersistenceGateway {
    pub fn new(
        docs: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
        local_server_patterns: Vec<String>,
    ) -> Self {
        Self {
            docs,
            blobs,
            local_server_patterns,
        }
    }

    // ─── Save ────────────────────────────────────────────────────

    /// Persist a new design. Either one tier commits a complete record or
    /// the call fails with every tier's error and nothing is stored.
    pub async fn save(&self, design: NewDesign) -> Result<Design, AppError> {
        if design.image_ref.trim().is_empty() {
            return Err(AppError::BadRequest("Image reference is required".to_string()));
        }

        let now = Utc::now();
        let mut failures = Vec::new();
        let mut upload_failed = false;

        for tier in SAVE_TIERS {
            let Some(attempt) = self.attempt(tier, &design, now, &mut upload_failed).await else {
                continue;
            };
            match attempt {
                Ok((id, record)) => {
                    tracing::info!(
                        design_id = %id,
                        owner_id = %design.owner_id,
                        tier = %tier,
                        source = record.source.as_str(),
                        "Design saved"
                    );
                    return Ok(self.design_from_record(id, record));
                }
                Err(e) => {
                    tracing::warn!(
                        owner_id = %design.owner_id,
                        tier = %tier,
                        error = %e,
                        "Save tier failed"
                    );
                    failures.push((tier, e));
                }
            }
        }

        Err(PersistenceError { failures }.into())
    }

    /// Run one tier. `None` means the tier does not apply to this design.
    ///
    /// The inline-record tier only follows a failed blob upload; a failed
    /// document write goes straight to the reduced-field tier.
    async fn attempt(
        &self,
        tier: SaveTier,
        design: &NewDesign,
        now: DateTime<Utc>,
        upload_failed: &mut bool,
    ) -> Option<Result<(String, DesignRecord), AppError>> {
        let inline = data_url::is_inline(&design.image_ref);
        match tier {
            SaveTier::Direct if inline => Some(match self.save_promoted(design, now).await {
                Ok(written) => Ok(written),
                Err(PromoteFailure::Upload(e)) => {
                    *upload_failed = true;
                    Err(e)
                }
                Err(PromoteFailure::Write(e)) => Err(e),
            }),
            SaveTier::Direct => {
                let record = full_record(design, &design.image_ref, DesignSource::External, now);
                Some(self.write(record).await)
            }
            SaveTier::ServiceFallback if inline && *upload_failed => {
                let record = full_record(design, &design.image_ref, DesignSource::DataUrl, now);
                Some(self.write(record).await)
            }
            SaveTier::ServiceFallback => None,
            SaveTier::Minimal => {
                let record = DesignRecord::minimal(&design.owner_id, &design.image_ref, now);
                Some(self.write(record).await)
            }
        }
    }

    /// Upload the inline image, then write a record pointing at the durable URL.
    async fn save_promoted(
        &self,
        design: &NewDesign,
        now: DateTime<Utc>,
    ) -> Result<(String, DesignRecord), PromoteFailure> {
        let ext = data_url::mime_type_of(&design.image_ref)
            .map(|m| data_url::extension_for_mime(&m))
            .unwrap_or("png");
        let path = blob_key(&design.owner_id, now.timestamp_millis(), ext);

        let url = self
            .blobs
            .upload_data_url(&path, &design.image_ref)
            .await
            .map_err(PromoteFailure::Upload)?;

        let record = DesignRecord {
            original_image_ref: Some(design.image_ref.clone()),
            ..full_record(design, &url, DesignSource::FirebaseStorage, now)
        };

        match self.write(record).await {
            Ok(written) => Ok(written),
            Err(e) => {
                // Don't leave an orphaned object behind a failed write.
                if let Err(cleanup) = self.blobs.delete(&path).await {
                    tracing::warn!(path = %path, error = %cleanup, "Failed to remove orphaned blob");
                }
                Err(PromoteFailure::Write(e))
            }
        }
    }

    async fn write(&self, record: DesignRecord) -> Result<(String, DesignRecord), AppError> {
        let id = self.docs.insert_design(&record).await?;
        Ok((id, record))
    }

    fn design_from_record(&self, id: String, record: DesignRecord) -> Design {
        Design {
            is_local_server_ref: is_local_server_ref(&record.image_ref, &self.local_server_patterns),
            id,
            owner_id: record.owner_id,
            image_ref: record.image_ref,
            original_image_ref: record.original_image_ref,
            prompt: record.prompt.unwrap_or_default(),
            customization: record.customization,
            source: record.source,
            created_at: Some(record.created_at),
            filename: record.filename,
        }
    }

    // ─── Read ────────────────────────────────────────────────────

    /// All displayable designs for an owner, newest first.
    pub async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Design>, AppError> {
        let docs = self.docs.designs_for_owner(owner_id).await?;
        let total = docs.len();
        let now = Utc::now();

        let mut designs: Vec<Design> = docs
            .into_iter()
            .filter_map(|doc| self.normalize(doc, owner_id, now))
            .collect();
        designs.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let local_server = designs.iter().filter(|d| d.is_local_server_ref).count();
        tracing::debug!(
            owner_id,
            total,
            shown = designs.len(),
            local_server,
            "Listed designs"
        );
        Ok(designs)
    }

    /// One design, if it exists and belongs to `owner_id`.
    pub async fn get(&self, id: &str, owner_id: &str) -> Result<Design, AppError> {
        let doc = self
            .docs
            .get_design(id)
            .await?
            .filter(|doc| doc.owner_id.as_deref() == Some(owner_id))
            .ok_or_else(|| AppError::NotFound(format!("Design {} not found", id)))?;

        self.normalize(doc, owner_id, Utc::now())
            .ok_or_else(|| AppError::NotFound(format!("Design {} has no image", id)))
    }

    /// Turn a stored document into a `Design`, or `None` if it cannot be shown.
    fn normalize(&self, doc: DesignDocument, owner_id: &str, now: DateTime<Utc>) -> Option<Design> {
        let id = doc.id.clone().unwrap_or_default();
        let image_ref = match doc.image_ref.as_deref().map(str::trim) {
            Some(r) if !r.is_empty() => r.to_string(),
            _ => {
                tracing::warn!(design_id = %id, "Skipping design without image ref");
                return None;
            }
        };
        if id.is_empty() {
            tracing::warn!("Skipping design without id");
            return None;
        }

        let created_at = doc.created_at_parsed().unwrap_or(now);
        let source = doc
            .source
            .as_deref()
            .and_then(DesignSource::from_tag)
            .unwrap_or_else(|| DesignSource::infer(&image_ref));

        Some(Design {
            is_local_server_ref: is_local_server_ref(&image_ref, &self.local_server_patterns),
            id,
            owner_id: doc.owner_id.unwrap_or_else(|| owner_id.to_string()),
            image_ref,
            original_image_ref: doc.original_image_ref,
            prompt: doc.prompt.unwrap_or_default(),
            customization: doc.customization,
            source,
            created_at: Some(created_at),
            filename: doc.filename,
        })
    }

    // ─── Delete ──────────────────────────────────────────────────

    /// Delete a design owned by `owner_id`, then best-effort delete its blob.
    pub async fn remove(&self, id: &str, owner_id: &str) -> Result<(), AppError> {
        let doc = self
            .docs
            .get_design(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Design {} not found", id)))?;

        if doc.owner_id.as_deref() != Some(owner_id) {
            tracing::warn!(design_id = id, owner_id, "Delete rejected: owner mismatch");
            return Err(AppError::NotFound(format!("Design {} not found", id)));
        }

        self.docs.delete_design(id).await?;
        tracing::info!(design_id = id, owner_id, "Design deleted");

        let promoted = doc.source.as_deref().and_then(DesignSource::from_tag)
            == Some(DesignSource::FirebaseStorage)
            || doc.original_image_ref.is_some();
        let blob_path = doc
            .image_ref
            .as_deref()
            .filter(|_| promoted)
            .filter(|r| !data_url::is_inline(r))
            .and_then(|r| self.blobs.path_from_url(r));

        if let Some(path) = blob_path {
            if let Err(e) = self.blobs.delete(&path).await {
                tracing::warn!(design_id = id, path = %path, error = %e, "Blob deletion failed");
            }
        }

        Ok(())
    }
}

fn full_record(
    design: &NewDesign,
    image_ref: &str,
    default_source: DesignSource,
    now: DateTime<Utc>,
) -> DesignRecord {
    DesignRecord {
        owner_id: design.owner_id.clone(),
        image_ref: image_ref.to_string(),
        original_image_ref: design.original_image_ref.clone(),
        prompt: Some(design.prompt.clone()),
        customization: design.customization.clone(),
        source: design.source.unwrap_or(default_source),
        created_at: now,
        saved_at: Some(format_utc_rfc3339(now)),
        filename: design.filename.clone(),
    }
}
