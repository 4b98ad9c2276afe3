// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod customization;
pub mod dashboard;
pub mod download;
pub mod filters;
pub mod generation;
pub mod identity;
pub mod image_transform;
pub mod persistence;
pub mod placeholder;
pub mod reconcile;

pub use customization::{ApplyOutcome, CustomizationController, CustomizationPatch};
pub use dashboard::{DashboardController, DashboardServices, DashboardTab, SessionRegistry};
pub use download::{DownloadFile, DownloadService};
pub use generation::{GeneratedImage, GenerationService, HttpImageGenerator, ImageGenerator};
pub use identity::{AccountService, IdentityProvider, IdentityToolkitClient};
pub use image_transform::{HttpImageFetcher, ImageFetcher, ImageTransformEngine, RenderedImage};
pub use persistence::PersistenceGateway;
