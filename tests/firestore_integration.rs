// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running
//! (`FIRESTORE_EMULATOR_HOST` set). Without it they return early.

use banner_studio::db::{DesignRecord, DocumentStore};
use banner_studio::models::{Customization, DesignSource};
use chrono::{Duration, Utc};

mod common;
use common::test_db;

/// Unique owner id so runs against a shared emulator don't collide.
fn unique_owner_id() -> String {
    format!("owner-{}", uuid::Uuid::new_v4())
}

fn record(owner_id: &str, image_ref: &str, age_secs: i64) -> DesignRecord {
    let created_at = Utc::now() - Duration::seconds(age_secs);
    DesignRecord {
        owner_id: owner_id.to_string(),
        image_ref: image_ref.to_string(),
        original_image_ref: None,
        prompt: Some("emulator".to_string()),
        customization: Some(Customization::default()),
        source: DesignSource::External,
        created_at,
        saved_at: Some(created_at.to_rfc3339()),
        filename: Some("emulator.jpg".to_string()),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// DESIGN TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_insert_and_get_design() {
    require_emulator!();

    let db = test_db().await;
    let owner = unique_owner_id();
    let id = db
        .insert_design(&record(&owner, "https://cdn.example/a.jpg", 0))
        .await
        .unwrap();
    assert!(!id.is_empty());

    let doc = db.get_design(&id).await.unwrap().expect("design stored");
    assert_eq!(doc.id.as_deref(), Some(id.as_str()));
    assert_eq!(doc.owner_id.as_deref(), Some(owner.as_str()));
    assert_eq!(doc.image_ref.as_deref(), Some("https://cdn.example/a.jpg"));
    assert_eq!(doc.source.as_deref(), Some("external"));
    assert!(doc.created_at_parsed().is_some());
    assert_eq!(doc.customization, Some(Customization::default()));
}

#[tokio::test]
async fn test_designs_for_owner_newest_first() {
    require_emulator!();

    let db = test_db().await;
    let owner = unique_owner_id();
    let other = unique_owner_id();

    let old = db
        .insert_design(&record(&owner, "https://cdn.example/old.jpg", 600))
        .await
        .unwrap();
    let new = db
        .insert_design(&record(&owner, "https://cdn.example/new.jpg", 0))
        .await
        .unwrap();
    db.insert_design(&record(&other, "https://cdn.example/x.jpg", 0))
        .await
        .unwrap();

    let docs = db.designs_for_owner(&owner).await.unwrap();
    let ids: Vec<_> = docs.iter().filter_map(|d| d.id.clone()).collect();
    assert_eq!(ids, vec![new, old]);
}

#[tokio::test]
async fn test_minimal_record_round_trip() {
    require_emulator!();

    let db = test_db().await;
    let owner = unique_owner_id();
    let minimal = DesignRecord::minimal(&owner, "data:image/png;base64,AAAA", Utc::now());
    let id = db.insert_design(&minimal).await.unwrap();

    let doc = db.get_design(&id).await.unwrap().expect("design stored");
    assert_eq!(doc.source.as_deref(), Some("fallback_direct"));
    assert!(doc.prompt.is_none());
    assert!(doc.saved_at.is_none());
}

#[tokio::test]
async fn test_delete_design() {
    require_emulator!();

    let db = test_db().await;
    let owner = unique_owner_id();
    let id = db
        .insert_design(&record(&owner, "https://cdn.example/gone.jpg", 0))
        .await
        .unwrap();

    db.delete_design(&id).await.unwrap();
    assert!(db.get_design(&id).await.unwrap().is_none());
    assert!(db.designs_for_owner(&owner).await.unwrap().is_empty());
}
