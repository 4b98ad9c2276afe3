// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory document store for local development and tests.

use crate::db::{DesignDocument, DesignRecord, DocumentStore};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Document store backed by a `DashMap`.
#[derive(Default)]
pub struct MemoryStore {
    docs: DashMap<String, (u64, DesignDocument)>,
    seq: AtomicU64,
    fail_writes: AtomicBool,
    fail_full_writes: AtomicBool,
    fail_next_writes: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every insert fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make inserts fail unless the record is a reduced-field record.
    pub fn set_fail_full_writes(&self, fail: bool) {
        self.fail_full_writes.store(fail, Ordering::SeqCst);
    }

    /// Make the next `count` inserts fail, whatever their shape.
    pub fn set_fail_next_writes(&self, count: u64) {
        self.fail_next_writes.store(count, Ordering::SeqCst);
    }

    /// Store a document as-is, bypassing the write shape (legacy records).
    pub fn insert_raw(&self, id: &str, mut doc: DesignDocument) {
        doc.id = Some(id.to_string());
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        self.docs.insert(id.to_string(), (seq, doc));
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

fn sort_key(doc: &DesignDocument) -> DateTime<Utc> {
    doc.created_at_parsed().unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert_design(&self, record: &DesignRecord) -> Result<String, AppError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Database("injected write failure".to_string()));
        }
        if self
            .fail_next_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(AppError::Database("injected transient write failure".to_string()));
        }
        if self.fail_full_writes.load(Ordering::SeqCst) && !record.is_minimal() {
            return Err(AppError::Database(
                "injected write failure (full record)".to_string(),
            ));
        }

        let id = uuid::Uuid::new_v4().to_string();
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        self.docs
            .insert(id.clone(), (seq, DesignDocument::from_record(&id, record)));
        Ok(id)
    }

    async fn get_design(&self, id: &str) -> Result<Option<DesignDocument>, AppError> {
        Ok(self.docs.get(id).map(|entry| entry.value().1.clone()))
    }

    async fn designs_for_owner(&self, owner_id: &str) -> Result<Vec<DesignDocument>, AppError> {
        let mut matching: Vec<(u64, DesignDocument)> = self
            .docs
            .iter()
            .filter(|entry| entry.value().1.owner_id.as_deref() == Some(owner_id))
            .map(|entry| entry.value().clone())
            .collect();

        // Newest first; later inserts win ties.
        matching.sort_by(|(seq_a, a), (seq_b, b)| {
            sort_key(b).cmp(&sort_key(a)).then(seq_b.cmp(seq_a))
        });

        Ok(matching.into_iter().map(|(_, doc)| doc).collect())
    }

    async fn delete_design(&self, id: &str) -> Result<(), AppError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Database("injected write failure".to_string()));
        }
        if self
            .fail_next_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(AppError::Database("injected transient write failure".to_string()));
        }
        self.docs.remove(id);
        Ok(())
    }
}
