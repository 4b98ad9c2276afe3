// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory blob store for local development and tests.

use crate::data_url::DataUrl;
use crate::error::AppError;
use crate::storage::BlobStore;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// Stored object: mime type and bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredBlob {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Blob store backed by a `DashMap`. URLs look like `memory://blobs/o/<path>`.
#[derive(Default)]
pub struct MemoryBlobStore {
    objects: DashMap<String, StoredBlob>,
    fail_uploads: AtomicBool,
    fail_deletes: AtomicBool,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn get(&self, path: &str) -> Option<StoredBlob> {
        self.objects.get(path).map(|b| b.value().clone())
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload_data_url(&self, path: &str, data_url: &str) -> Result<String, AppError> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(AppError::Storage("injected upload failure".to_string()));
        }

        let parsed = DataUrl::parse(data_url).map_err(|e| AppError::BadRequest(e.to_string()))?;
        self.objects.insert(
            path.to_string(),
            StoredBlob {
                mime_type: parsed.mime_type,
                bytes: parsed.bytes,
            },
        );

        Ok(format!("memory://blobs/o/{}", urlencoding::encode(path)))
    }

    async fn delete(&self, path: &str) -> Result<(), AppError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(AppError::Storage("injected delete failure".to_string()));
        }
        self.objects
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("Blob {} not found", path)))
    }
}
