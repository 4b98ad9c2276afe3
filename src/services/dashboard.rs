// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Dashboard controller: per-account workflow state.
//!
//! Holds the active tab, the images generated for the last prompt, the
//! displayed design list and the customization controller. The design
//! list is only ever replaced or prepended to, from gateway and
//! reconciler results.

use crate::error::AppError;
use crate::models::{Design, DesignSource, NewDesign};
use crate::services::customization::{ApplyOutcome, CustomizationController};
use crate::services::generation::{GeneratedImage, GenerationService};
use crate::services::image_transform::ImageTransformEngine;
use crate::services::persistence::PersistenceGateway;
use crate::services::reconcile::merge;
use chrono::Utc;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Dashboard views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(ts_rs::TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum DashboardTab {
    #[default]
    Create,
    Saved,
    Customize,
    Profile,
}

/// Collaborators shared by every account's dashboard.
#[derive(Clone)]
pub struct DashboardServices {
    pub gateway: PersistenceGateway,
    pub engine: Arc<ImageTransformEngine>,
    pub generation: GenerationService,
}

pub struct DashboardController {
    owner_id: String,
    tab: DashboardTab,
    last_prompt: Option<String>,
    generated: Vec<GeneratedImage>,
    saved: Vec<Design>,
    customization: CustomizationController,
}

impl DashboardController {
    pub fn new(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            tab: DashboardTab::default(),
            last_prompt: None,
            generated: Vec::new(),
            saved: Vec::new(),
            customization: CustomizationController::new(),
        }
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn tab(&self) -> DashboardTab {
        self.tab
    }

    pub fn last_prompt(&self) -> Option<&str> {
        self.last_prompt.as_deref()
    }

    pub fn generated(&self) -> &[GeneratedImage] {
        &self.generated
    }

    pub fn saved(&self) -> &[Design] {
        &self.saved
    }

    pub fn customization(&self) -> &CustomizationController {
        &self.customization
    }

    pub fn customization_mut(&mut self) -> &mut CustomizationController {
        &mut self.customization
    }

    /// Switch tabs. Leaving the customize view discards an open session.
    pub fn set_tab(&mut self, tab: DashboardTab) {
        if self.tab == DashboardTab::Customize && tab != DashboardTab::Customize {
            self.customization.cancel();
        }
        self.tab = tab;
    }

    // ─── Create ──────────────────────────────────────────────────

    /// Generate images for a prompt, replacing the previous results.
    pub async fn generate(
        &mut self,
        services: &DashboardServices,
        prompt: &str,
    ) -> Result<&[GeneratedImage], AppError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(AppError::BadRequest("Prompt is required".to_string()));
        }

        tracing::info!(owner_id = %self.owner_id, "Generating images");
        self.generated = services.generation.generate_variations(prompt).await;
        self.last_prompt = Some(prompt.to_string());
        self.tab = DashboardTab::Create;
        Ok(&self.generated)
    }

    fn generated_image(&self, index: usize) -> Result<&GeneratedImage, AppError> {
        self.generated
            .get(index)
            .ok_or_else(|| AppError::NotFound(format!("Generated image {} not found", index)))
    }

    /// Save one of the last generated images.
    pub async fn save_generated(
        &mut self,
        services: &DashboardServices,
        index: usize,
    ) -> Result<Design, AppError> {
        let image = self.generated_image(index)?;
        let design = NewDesign::new(self.owner_id.clone(), image.image_ref.clone())
            .with_prompt(image.prompt.clone())
            .with_filename(image.filename.clone());
        self.save_design(services, design).await
    }

    /// Save an arbitrary image ref and prepend the result.
    pub async fn save_design(
        &mut self,
        services: &DashboardServices,
        design: NewDesign,
    ) -> Result<Design, AppError> {
        let saved = services.gateway.save(design).await?;
        self.saved.insert(0, saved.clone());
        Ok(saved)
    }

    // ─── Saved ───────────────────────────────────────────────────

    /// Reload the design list: the local store merged with the generation
    /// server's history.
    pub async fn refresh_saved(&mut self, services: &DashboardServices) -> Result<&[Design], AppError> {
        let (local, external) = tokio::join!(
            services.gateway.list_by_owner(&self.owner_id),
            services.generation.history(&self.owner_id)
        );
        self.saved = merge(local?, external);
        Ok(&self.saved)
    }

    /// Delete a design and drop it from the list.
    pub async fn delete_design(
        &mut self,
        services: &DashboardServices,
        id: &str,
    ) -> Result<(), AppError> {
        services.gateway.remove(id, &self.owner_id).await?;
        self.saved = self.saved.iter().filter(|d| d.id != id).cloned().collect();
        Ok(())
    }

    // ─── Customize ───────────────────────────────────────────────

    /// Open a saved design in the customizer.
    pub async fn begin_customize_saved(
        &mut self,
        services: &DashboardServices,
        id: &str,
    ) -> Result<&CustomizationController, AppError> {
        let design = match self.saved.iter().find(|d| d.id == id) {
            Some(d) => d.clone(),
            None => services.gateway.get(id, &self.owner_id).await?,
        };
        self.customization.begin(design);
        self.tab = DashboardTab::Customize;
        Ok(&self.customization)
    }

    /// Open a not-yet-saved generated image in the customizer.
    pub fn begin_customize_generated(&mut self, index: usize) -> Result<&CustomizationController, AppError> {
        let image = self.generated_image(index)?;
        let design = Design {
            id: format!("generated-{}", index),
            owner_id: self.owner_id.clone(),
            image_ref: image.image_ref.clone(),
            original_image_ref: None,
            prompt: image.prompt.clone(),
            customization: None,
            source: DesignSource::infer(&image.image_ref),
            created_at: Some(Utc::now()),
            filename: Some(image.filename.clone()),
            is_local_server_ref: false,
        };
        self.customization.begin(design);
        self.tab = DashboardTab::Customize;
        Ok(&self.customization)
    }

    /// Commit the open session; the new design is prepended and the saved
    /// view shown.
    pub async fn apply_customization(
        &mut self,
        services: &DashboardServices,
    ) -> Result<ApplyOutcome, AppError> {
        let outcome = self
            .customization
            .apply(&services.engine, &services.gateway)
            .await?;
        self.saved.insert(0, outcome.design.clone());
        self.tab = DashboardTab::Saved;
        Ok(outcome)
    }

    pub fn cancel_customization(&mut self) {
        self.customization.cancel();
        if self.tab == DashboardTab::Customize {
            self.tab = DashboardTab::Saved;
        }
    }
}

// ─── Session Registry ────────────────────────────────────────

/// One dashboard per account. Each is behind its own lock, so one
/// account's operations run one at a time while accounts proceed
/// independently.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, Arc<Mutex<DashboardController>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The dashboard for `owner_id`, created on first use.
    pub fn session(&self, owner_id: &str) -> Arc<Mutex<DashboardController>> {
        self.sessions
            .entry(owner_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(DashboardController::new(owner_id))))
            .clone()
    }

    pub fn remove(&self, owner_id: &str) {
        self.sessions.remove(owner_id);
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
