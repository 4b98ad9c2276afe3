// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Banner Studio: generate, customize and keep AI promotional banners
//!
//! This crate provides the backend API behind the banner dashboard: image
//! generation with placeholder fallback, server-side customization
//! rendering, tiered persistence across a document store and a blob
//! store, and account management.

pub mod config;
pub mod data_url;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod storage;
pub mod time_utils;

use config::Config;
use db::DocumentStore;
use services::{
    AccountService, DashboardServices, DownloadService, GenerationService, IdentityProvider,
    ImageFetcher, ImageGenerator, ImageTransformEngine, PersistenceGateway, SessionRegistry,
};
use std::sync::Arc;
use storage::BlobStore;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub dashboard: DashboardServices,
    pub accounts: AccountService,
    pub downloads: DownloadService,
    pub sessions: SessionRegistry,
}

/// External collaborators the application is assembled from.
pub struct Collaborators {
    pub docs: Arc<dyn DocumentStore>,
    pub blobs: Arc<dyn BlobStore>,
    pub generator: Arc<dyn ImageGenerator>,
    pub identity: Arc<dyn IdentityProvider>,
    pub fetcher: Arc<dyn ImageFetcher>,
    pub engine: Arc<ImageTransformEngine>,
}

impl AppState {
    pub fn new(config: Config, parts: Collaborators) -> Self {
        let gateway = PersistenceGateway::new(
            parts.docs,
            parts.blobs,
            config.local_server_patterns.clone(),
        );
        let generation = GenerationService::new(
            parts.generator,
            config.generation_variations,
            config.local_server_patterns.clone(),
        );

        Self {
            dashboard: DashboardServices {
                gateway,
                engine: parts.engine,
                generation,
            },
            accounts: AccountService::new(parts.identity),
            downloads: DownloadService::new(parts.fetcher),
            sessions: SessionRegistry::new(),
            config,
        }
    }
}
