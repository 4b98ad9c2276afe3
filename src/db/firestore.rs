// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations on the `designs` collection.

use crate::db::{collections, DesignDocument, DesignRecord, DocumentStore};
use crate::error::AppError;
use async_trait::async_trait;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: firestore::FirestoreDb,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // The emulator takes an unauthenticated connection; skip credential lookup.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self { client })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self { client })
    }
}

// ─── Design Operations ───────────────────────────────────────

#[async_trait]
impl DocumentStore for FirestoreDb {
    async fn insert_design(&self, record: &DesignRecord) -> Result<String, AppError> {
        let id = uuid::Uuid::new_v4().to_string();

        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::DESIGNS)
            .document_id(&id)
            .object(record)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::debug!(design_id = %id, owner_id = %record.owner_id, "Design document written");
        Ok(id)
    }

    async fn get_design(&self, id: &str) -> Result<Option<DesignDocument>, AppError> {
        let doc: Option<DesignDocument> = self
            .client
            .fluent()
            .select()
            .by_id_in(collections::DESIGNS)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(doc.map(|mut d| {
            d.id.get_or_insert_with(|| id.to_string());
            d
        }))
    }

    async fn designs_for_owner(&self, owner_id: &str) -> Result<Vec<DesignDocument>, AppError> {
        let owner_id = owner_id.to_string();
        self.client
            .fluent()
            .select()
            .from(collections::DESIGNS)
            .filter(move |q| q.for_all([q.field("owner_id").eq(owner_id.clone())]))
            .order_by([("created_at", firestore::FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn delete_design(&self, id: &str) -> Result<(), AppError> {
        self.client
            .fluent()
            .delete()
            .from(collections::DESIGNS)
            .document_id(id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}
