// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Customization controller: the edit session state machine.
//!
//! `Idle -> Editing -> Committing -> Idle`, or `Editing -> Idle` on cancel.

use crate::error::{AppError, RenderError};
use crate::models::customization::clamp_scale;
use crate::models::{Customization, Design, DesignSource, NewDesign, Position, TextSize, Theme};
use crate::services::image_transform::ImageTransformEngine;
use crate::services::persistence::PersistenceGateway;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Container bounding box in client pixels.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct ContainerRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

/// Pointer location in client pixels.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Pointer {
    pub x: f32,
    pub y: f32,
}

/// Transient drag state.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DragState {
    pub dragging: bool,
    /// Pointer offset from the content's rendered position, in pixels
    pub offset: (f32, f32),
}

/// One active edit: the design being edited and the working values.
#[derive(Debug, Clone)]
pub struct CustomizationSession {
    pub design: Design,
    pub customization: Customization,
    pub drag: DragState,
}

#[derive(Debug, Default)]
pub enum CustomizationState {
    #[default]
    Idle,
    Editing(CustomizationSession),
    Committing,
}

/// Partial update of the working customization. Absent fields are unchanged.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct CustomizationPatch {
    #[validate(length(min = 1, max = 3))]
    pub color_scheme: Option<Vec<String>>,
    #[validate(length(min = 1, max = 64))]
    pub font: Option<String>,
    pub theme: Option<Theme>,
    #[validate(length(max = 200))]
    pub text: Option<String>,
    pub size: Option<TextSize>,
    #[validate(length(min = 1, max = 32))]
    pub layout: Option<String>,
    pub position: Option<Position>,
    pub scale: Option<f32>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub rotation: Option<f32>,
}

/// Result of a successful commit.
#[derive(Debug, Clone)]
pub struct ApplyOutcome {
    pub design: Design,
    /// False when rendering failed and the original image was saved instead
    pub effects_applied: bool,
    pub render_error: Option<RenderError>,
}

/// Drives a single account's customization sessions.
#[derive(Debug, Default)]
pub struct CustomizationController {
    state: CustomizationState,
}

impl CustomizationController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &CustomizationState {
        &self.state
    }

    pub fn state_name(&self) -> &'static str {
        match self.state {
            CustomizationState::Idle => "idle",
            CustomizationState::Editing(_) => "editing",
            CustomizationState::Committing => "committing",
        }
    }

    pub fn session(&self) -> Option<&CustomizationSession> {
        match &self.state {
            CustomizationState::Editing(session) => Some(session),
            _ => None,
        }
    }

    fn session_mut(&mut self) -> Result<&mut CustomizationSession, AppError> {
        match &mut self.state {
            CustomizationState::Editing(session) => Ok(session),
            _ => Err(AppError::InvalidState(
                "No customization in progress".to_string(),
            )),
        }
    }

    /// Start editing `design` and return the seeded working values. Any
    /// previous session's edits are discarded.
    pub fn begin(&mut self, design: Design) -> Customization {
        let customization = design
            .customization
            .clone()
            .map(Customization::normalized)
            .unwrap_or_default();

        tracing::debug!(design_id = %design.id, "Customization session started");
        self.state = CustomizationState::Editing(CustomizationSession {
            design,
            customization: customization.clone(),
            drag: DragState::default(),
        });
        customization
    }

    /// Discard the session and its edits.
    pub fn cancel(&mut self) {
        if matches!(self.state, CustomizationState::Editing(_)) {
            tracing::debug!("Customization session cancelled");
        }
        self.state = CustomizationState::Idle;
    }

    /// Apply a partial update to the working values.
    pub fn update(&mut self, patch: CustomizationPatch) -> Result<&Customization, AppError> {
        patch
            .validate()
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        let session = self.session_mut()?;
        let c = &mut session.customization;

        if let Some(colors) = patch.color_scheme {
            c.color_scheme = colors;
        }
        if let Some(font) = patch.font {
            c.font = font;
        }
        if let Some(theme) = patch.theme {
            c.theme = theme;
        }
        if let Some(text) = patch.text {
            c.text = text;
        }
        if let Some(size) = patch.size {
            c.size = size;
        }
        if let Some(layout) = patch.layout {
            c.layout = layout;
        }
        if let Some(position) = patch.position {
            c.position = position.clamped();
        }
        if let Some(scale) = patch.scale {
            c.scale = clamp_scale(scale);
        }
        if let Some(rotation) = patch.rotation {
            c.rotation = rotation;
        }

        Ok(&session.customization)
    }

    // ─── Drag ────────────────────────────────────────────────────

    /// Pointer pressed over the content: remember where it was grabbed.
    pub fn pointer_down(&mut self, pointer: Pointer, rect: ContainerRect) -> Result<(), AppError> {
        let session = self.session_mut()?;
        let pos = session.customization.position;
        let content_x = rect.left + pos.x / 100.0 * rect.width;
        let content_y = rect.top + pos.y / 100.0 * rect.height;

        session.drag = DragState {
            dragging: true,
            offset: (pointer.x - content_x, pointer.y - content_y),
        };
        Ok(())
    }

    /// Pointer moved. Returns the new position while dragging, `None` otherwise.
    pub fn pointer_move(
        &mut self,
        pointer: Pointer,
        rect: ContainerRect,
    ) -> Result<Option<Position>, AppError> {
        let session = self.session_mut()?;
        if !session.drag.dragging || rect.width <= 0.0 || rect.height <= 0.0 {
            return Ok(None);
        }

        let x = pointer.x - rect.left - session.drag.offset.0;
        let y = pointer.y - rect.top - session.drag.offset.1;
        let position = Position::new(x / rect.width * 100.0, y / rect.height * 100.0);

        session.customization.position = position;
        Ok(Some(position))
    }

    pub fn pointer_up(&mut self) -> Result<(), AppError> {
        let session = self.session_mut()?;
        session.drag = DragState::default();
        Ok(())
    }

    // ─── Commit ──────────────────────────────────────────────────

    /// Render and save the working customization as a new design.
    ///
    /// A render failure saves the original image with the customization
    /// attached instead. If saving fails the session stays open.
    pub async fn apply(
        &mut self,
        engine: &ImageTransformEngine,
        gateway: &PersistenceGateway,
    ) -> Result<ApplyOutcome, AppError> {
        let session = match std::mem::replace(&mut self.state, CustomizationState::Committing) {
            CustomizationState::Editing(session) => session,
            other => {
                self.state = other;
                return Err(AppError::InvalidState(
                    "No customization in progress".to_string(),
                ));
            }
        };

        let customization = session.customization.clone().normalized();
        let source = &session.design;

        let (new_design, render_error) = match engine.render_design(source, &customization).await {
            Ok(rendered) => (
                NewDesign::new(source.owner_id.clone(), rendered.data_url)
                    .with_source(DesignSource::Customized),
                None,
            ),
            Err(e) => {
                tracing::warn!(
                    design_id = %source.id,
                    error = %e,
                    "Render failed, saving original with customization"
                );
                let mut fallback = NewDesign::new(source.owner_id.clone(), source.image_ref.clone())
                    .with_source(DesignSource::CustomizedFallback);
                fallback.original_image_ref = source.original_image_ref.clone();
                (fallback, Some(e))
            }
        };

        let mut new_design = new_design
            .with_prompt(source.prompt.clone())
            .with_customization(customization);
        new_design.filename = source.filename.clone();

        match gateway.save(new_design).await {
            Ok(design) => {
                self.state = CustomizationState::Idle;
                Ok(ApplyOutcome {
                    design,
                    effects_applied: render_error.is_none(),
                    render_error,
                })
            }
            Err(e) => {
                self.state = CustomizationState::Editing(session);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_url::DataUrl;
    use crate::db::MemoryStore;
    use crate::services::image_transform::{CrossOriginMode, FetchedImage, ImageFetcher};
    use crate::storage::MemoryBlobStore;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct NoFetch;

    #[async_trait]
    impl ImageFetcher for NoFetch {
        async fn fetch(&self, _: &str, _: CrossOriginMode) -> Result<FetchedImage, RenderError> {
            Err(RenderError::Decode("offline".to_string()))
        }
    }

    fn design(image_ref: &str) -> Design {
        Design {
            id: "d1".to_string(),
            owner_id: "u1".to_string(),
            image_ref: image_ref.to_string(),
            original_image_ref: None,
            prompt: "sunset sale banner".to_string(),
            customization: None,
            source: DesignSource::External,
            created_at: None,
            filename: None,
            is_local_server_ref: false,
        }
    }

    fn rect() -> ContainerRect {
        ContainerRect {
            left: 100.0,
            top: 50.0,
            width: 400.0,
            height: 200.0,
        }
    }

    fn engine() -> ImageTransformEngine {
        ImageTransformEngine::with_fontdb(Arc::new(NoFetch), Arc::new(usvg::fontdb::Database::new()))
    }

    fn gateway() -> (Arc<MemoryStore>, PersistenceGateway) {
        let docs = Arc::new(MemoryStore::new());
        let gateway = PersistenceGateway::new(docs.clone(), Arc::new(MemoryBlobStore::new()), vec![]);
        (docs, gateway)
    }

    #[test]
    fn test_begin_seeds_defaults_or_existing() {
        let mut ctl = CustomizationController::new();
        assert_eq!(ctl.state_name(), "idle");

        assert_eq!(ctl.begin(design("x")), Customization::default());

        let mut with_custom = design("x");
        with_custom.customization = Some(Customization {
            text: "hello".to_string(),
            scale: 9.0,
            ..Default::default()
        });
        let seeded = ctl.begin(with_custom);
        assert_eq!(seeded.text, "hello");
        assert_eq!(seeded.scale, 2.0);
        assert_eq!(ctl.state_name(), "editing");
    }

    #[test]
    fn test_update_requires_session() {
        let mut ctl = CustomizationController::new();
        let err = ctl.update(CustomizationPatch::default()).unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[test]
    fn test_update_clamps() {
        let mut ctl = CustomizationController::new();
        ctl.begin(design("x"));
        let c = ctl
            .update(CustomizationPatch {
                scale: Some(0.1),
                position: Some(Position { x: 150.0, y: -3.0 }),
                theme: Some(Theme::Retro),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(c.scale, 0.5);
        assert_eq!(c.position, Position { x: 100.0, y: 0.0 });
        assert_eq!(c.theme, Theme::Retro);
    }

    #[test]
    fn test_update_rejects_out_of_range_rotation() {
        let mut ctl = CustomizationController::new();
        ctl.begin(design("x"));
        let err = ctl
            .update(CustomizationPatch {
                rotation: Some(270.0),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn test_drag_keeps_grab_offset_and_clamps() {
        let mut ctl = CustomizationController::new();
        ctl.begin(design("x"));

        // Content sits at (50%, 50%) = (300, 150); grab it 10px right of center.
        ctl.pointer_down(Pointer { x: 310.0, y: 150.0 }, rect()).unwrap();
        let pos = ctl
            .pointer_move(Pointer { x: 150.0, y: 100.0 }, rect())
            .unwrap()
            .unwrap();
        assert_eq!(pos, Position { x: 10.0, y: 25.0 });

        let pos = ctl
            .pointer_move(Pointer { x: 5000.0, y: -5000.0 }, rect())
            .unwrap()
            .unwrap();
        assert_eq!(pos, Position { x: 100.0, y: 0.0 });

        ctl.pointer_up().unwrap();
        assert_eq!(ctl.pointer_move(Pointer { x: 0.0, y: 0.0 }, rect()).unwrap(), None);
        assert_eq!(
            ctl.session().unwrap().customization.position,
            Position { x: 100.0, y: 0.0 }
        );
    }

    #[test]
    fn test_cancel_discards() {
        let mut ctl = CustomizationController::new();
        ctl.begin(design("x"));
        ctl.cancel();
        assert!(ctl.session().is_none());
        assert!(matches!(ctl.pointer_up(), Err(AppError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_apply_renders_and_saves_customized() {
        let (docs, gateway) = gateway();
        let mut ctl = CustomizationController::new();
        ctl.begin(design(&crate::services::placeholder::prompt_placeholder("sunset sale banner")));
        ctl.update(CustomizationPatch {
            theme: Some(Theme::Retro),
            text: Some("50% OFF".to_string()),
            ..Default::default()
        })
        .unwrap();

        let outcome = ctl.apply(&engine(), &gateway).await.unwrap();
        assert!(outcome.effects_applied);
        assert_eq!(outcome.design.source, DesignSource::Customized);
        assert_eq!(outcome.design.prompt, "sunset sale banner");
        assert_eq!(
            outcome.design.customization.as_ref().map(|c| c.text.as_str()),
            Some("50% OFF")
        );
        assert_eq!(ctl.state_name(), "idle");
        assert_eq!(docs.len(), 1);
    }

    #[tokio::test]
    async fn test_apply_render_failure_saves_original() {
        let (_docs, gateway) = gateway();
        let mut ctl = CustomizationController::new();
        let broken = DataUrl::encode("image/png", b"garbage");
        ctl.begin(design(&broken));

        let outcome = ctl.apply(&engine(), &gateway).await.unwrap();
        assert!(!outcome.effects_applied);
        assert!(matches!(outcome.render_error, Some(RenderError::Decode(_))));
        assert_eq!(outcome.design.source, DesignSource::CustomizedFallback);
        assert!(outcome.design.customization.is_some());
        assert_eq!(outcome.design.original_image_ref.as_deref(), Some(broken.as_str()));
    }

    #[tokio::test]
    async fn test_apply_save_failure_keeps_session() {
        let (docs, gateway) = gateway();
        docs.set_fail_writes(true);
        let mut ctl = CustomizationController::new();
        ctl.begin(design(&crate::services::placeholder::prompt_placeholder("x")));

        assert!(matches!(
            ctl.apply(&engine(), &gateway).await,
            Err(AppError::Persistence(_))
        ));
        assert_eq!(ctl.state_name(), "editing");
    }

    #[tokio::test]
    async fn test_apply_without_session() {
        let (_docs, gateway) = gateway();
        let mut ctl = CustomizationController::new();
        assert!(matches!(
            ctl.apply(&engine(), &gateway).await,
            Err(AppError::InvalidState(_))
        ));
    }
}
