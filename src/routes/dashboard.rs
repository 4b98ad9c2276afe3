// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Dashboard state and image generation routes.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::routes::designs::DesignResponse;
use crate::routes::validated;
use crate::services::{DashboardTab, GeneratedImage};
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/dashboard", get(get_dashboard))
        .route("/api/dashboard/tab", put(set_tab))
        .route("/api/generate", post(generate))
        .route("/api/generated/{index}/save", post(save_generated))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DashboardResponse {
    pub tab: DashboardTab,
    pub last_prompt: Option<String>,
    pub generated: Vec<GeneratedImage>,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub saved_count: usize,
    /// `idle`, `editing` or `committing`
    pub customization_state: String,
}

#[derive(Deserialize)]
pub struct TabRequest {
    pub tab: DashboardTab,
}

#[derive(Deserialize, Validate)]
pub struct GenerateRequest {
    #[validate(length(min = 1, max = 1000))]
    pub prompt: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct GenerateResponse {
    pub prompt: String,
    pub images: Vec<GeneratedImage>,
}

async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Json<DashboardResponse> {
    let session = state.sessions.session(&user.account_id);
    let dash = session.lock().await;

    Json(DashboardResponse {
        tab: dash.tab(),
        last_prompt: dash.last_prompt().map(String::from),
        generated: dash.generated().to_vec(),
        saved_count: dash.saved().len(),
        customization_state: dash.customization().state_name().to_string(),
    })
}

async fn set_tab(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<TabRequest>,
) -> Json<DashboardTab> {
    let session = state.sessions.session(&user.account_id);
    let mut dash = session.lock().await;
    dash.set_tab(body.tab);
    Json(dash.tab())
}

/// Generate images for a prompt. Failed variations come back as
/// placeholders rather than errors.
async fn generate(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>> {
    let body = validated(body)?;
    let session = state.sessions.session(&user.account_id);
    let mut dash = session.lock().await;

    let images = dash
        .generate(&state.dashboard, &body.prompt)
        .await?
        .to_vec();
    Ok(Json(GenerateResponse {
        prompt: body.prompt.trim().to_string(),
        images,
    }))
}

async fn save_generated(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(index): Path<usize>,
) -> Result<Json<DesignResponse>> {
    let session = state.sessions.session(&user.account_id);
    let mut dash = session.lock().await;
    let design = dash.save_generated(&state.dashboard, index).await?;
    Ok(Json(design.into()))
}
