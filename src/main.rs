// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Banner Studio API Server
//!
//! Serves the banner dashboard: generation, customization, saved designs
//! and account management.

use banner_studio::{
    config::Config,
    db::{DocumentStore, FirestoreDb, MemoryStore},
    services::{HttpImageFetcher, HttpImageGenerator, IdentityToolkitClient, ImageTransformEngine},
    storage::{BlobStore, FirebaseStorage, MemoryBlobStore},
    AppState, Collaborators,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Banner Studio API");

    let (docs, blobs): (Arc<dyn DocumentStore>, Arc<dyn BlobStore>) = if config.in_memory_stores {
        tracing::warn!("Using in-memory stores; designs are lost on restart");
        (Arc::new(MemoryStore::new()), Arc::new(MemoryBlobStore::new()))
    } else {
        let db = FirestoreDb::new(&config.gcp_project_id).await?;
        let storage = FirebaseStorage::new(&config.storage_bucket).await?;
        (Arc::new(db), Arc::new(storage))
    };

    let fetcher = Arc::new(HttpImageFetcher::new(
        config.frontend_url.clone(),
        std::slice::from_ref(&config.generation_api_url),
    )?);
    let engine = Arc::new(ImageTransformEngine::new(fetcher.clone()));

    tracing::info!(
        url = %config.generation_api_url,
        variations = config.generation_variations,
        "Generation service configured"
    );
    let generator = Arc::new(HttpImageGenerator::new(config.generation_api_url.clone()));
    let identity = Arc::new(IdentityToolkitClient::new(config.identity_api_key.clone()));

    // Build shared state
    let state = Arc::new(AppState::new(
        config.clone(),
        Collaborators {
            docs,
            blobs,
            generator,
            identity,
            fetcher,
            engine,
        },
    ));

    // Build router
    let app = banner_studio::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> Result<(), tracing_subscriber::filter::ParseError> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("banner_studio=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
