// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Customization session routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Customization, Position};
use crate::routes::designs::DesignResponse;
use crate::services::customization::{ContainerRect, CustomizationController, Pointer};
use crate::services::{CustomizationPatch, RenderedImage};
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/designs/{id}/customize", post(begin_saved))
        .route("/api/generated/{index}/customize", post(begin_generated))
        .route(
            "/api/customize",
            get(get_session).patch(update_session).delete(cancel_session),
        )
        .route("/api/customize/drag", post(drag))
        .route("/api/customize/preview", post(preview))
        .route("/api/customize/apply", post(apply))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SessionResponse {
    pub design: DesignResponse,
    pub customization: Customization,
    pub dragging: bool,
}

#[derive(Deserialize)]
#[serde(tag = "phase", rename_all = "lowercase")]
pub enum DragRequest {
    Down {
        pointer: Pointer,
        rect: ContainerRect,
    },
    Move {
        pointer: Pointer,
        rect: ContainerRect,
    },
    Up,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DragResponse {
    pub dragging: bool,
    pub position: Position,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ApplyResponse {
    pub design: DesignResponse,
    pub effects_applied: bool,
    /// Set when the image could not be rendered and the original was saved
    pub notice: Option<String>,
}

fn session_response(ctl: &CustomizationController) -> Result<Json<SessionResponse>> {
    let session = ctl
        .session()
        .ok_or_else(|| AppError::InvalidState("No customization in progress".to_string()))?;
    Ok(Json(SessionResponse {
        design: session.design.clone().into(),
        customization: session.customization.clone(),
        dragging: session.drag.dragging,
    }))
}

async fn begin_saved(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>> {
    let session = state.sessions.session(&user.account_id);
    let mut dash = session.lock().await;
    let ctl = dash.begin_customize_saved(&state.dashboard, &id).await?;
    session_response(ctl)
}

async fn begin_generated(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(index): Path<usize>,
) -> Result<Json<SessionResponse>> {
    let session = state.sessions.session(&user.account_id);
    let mut dash = session.lock().await;
    let ctl = dash.begin_customize_generated(index)?;
    session_response(ctl)
}

async fn get_session(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<SessionResponse>> {
    let session = state.sessions.session(&user.account_id);
    let dash = session.lock().await;
    session_response(dash.customization())
}

async fn update_session(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(patch): Json<CustomizationPatch>,
) -> Result<Json<Customization>> {
    let session = state.sessions.session(&user.account_id);
    let mut dash = session.lock().await;
    let updated = dash.customization_mut().update(patch)?;
    Ok(Json(updated.clone()))
}

async fn cancel_session(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> axum::http::StatusCode {
    let session = state.sessions.session(&user.account_id);
    session.lock().await.cancel_customization();
    axum::http::StatusCode::NO_CONTENT
}

async fn drag(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<DragRequest>,
) -> Result<Json<DragResponse>> {
    let session = state.sessions.session(&user.account_id);
    let mut dash = session.lock().await;
    let ctl = dash.customization_mut();

    match body {
        DragRequest::Down { pointer, rect } => ctl.pointer_down(pointer, rect)?,
        DragRequest::Move { pointer, rect } => {
            ctl.pointer_move(pointer, rect)?;
        }
        DragRequest::Up => ctl.pointer_up()?,
    }

    let session = ctl
        .session()
        .ok_or_else(|| AppError::InvalidState("No customization in progress".to_string()))?;
    Ok(Json(DragResponse {
        dragging: session.drag.dragging,
        position: session.customization.position,
    }))
}

/// Render the working customization without saving it.
async fn preview(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<RenderedImage>> {
    let (design, customization) = {
        let session = state.sessions.session(&user.account_id);
        let dash = session.lock().await;
        let s = dash
            .customization()
            .session()
            .ok_or_else(|| AppError::InvalidState("No customization in progress".to_string()))?;
        (s.design.clone(), s.customization.clone())
    };

    let rendered = state
        .dashboard
        .engine
        .render_design(&design, &customization)
        .await?;
    Ok(Json(rendered))
}

/// Commit the session: render and save, or save the original with the
/// customization attached when rendering fails.
async fn apply(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ApplyResponse>> {
    let session = state.sessions.session(&user.account_id);
    let mut dash = session.lock().await;
    let outcome = dash.apply_customization(&state.dashboard).await?;

    Ok(Json(ApplyResponse {
        notice: outcome.render_error.map(|e| {
            format!(
                "Some visual effects could not be applied ({}); the original image was saved with your settings",
                e
            )
        }),
        effects_applied: outcome.effects_applied,
        design: outcome.design.into(),
    }))
}
