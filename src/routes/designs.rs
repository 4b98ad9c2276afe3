// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Saved design routes: list, save, delete, download.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::{Design, NewDesign};
use crate::routes::validated;
use crate::AppState;
use axum::{
    extract::{DefaultBodyLimit, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{delete, get},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// Request body limit for saves; inline images up to the `image_ref` bound
/// must fit along with the rest of the JSON.
pub const MAX_SAVE_BODY_BYTES: usize = 10 * 1024 * 1024;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/designs",
            get(list_designs)
                .post(save_design)
                .layer(DefaultBodyLimit::max(MAX_SAVE_BODY_BYTES)),
        )
        .route("/api/designs/{id}", delete(delete_design))
        .route("/api/designs/{id}/download", get(download_design))
}

/// A design plus the ref a client should display.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DesignResponse {
    #[serde(flatten)]
    #[cfg_attr(feature = "binding-generation", ts(flatten))]
    pub design: Design,
    /// `image_ref`, or a placeholder for images only a local server holds
    pub display_ref: String,
}

impl From<Design> for DesignResponse {
    fn from(design: Design) -> Self {
        Self {
            display_ref: design.display_ref(),
            design,
        }
    }
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DesignsResponse {
    pub designs: Vec<DesignResponse>,
}

#[derive(Deserialize, Validate)]
pub struct SaveDesignRequest {
    #[validate(length(min = 1, max = 8_000_000))]
    pub image_ref: String,
    #[serde(default)]
    #[validate(length(max = 1000))]
    pub prompt: String,
    #[validate(length(min = 1, max = 255))]
    pub filename: Option<String>,
}

/// Local designs merged with the generation server's history.
async fn list_designs(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<DesignsResponse>> {
    let session = state.sessions.session(&user.account_id);
    let mut dash = session.lock().await;
    let designs = dash.refresh_saved(&state.dashboard).await?;

    Ok(Json(DesignsResponse {
        designs: designs.iter().cloned().map(DesignResponse::from).collect(),
    }))
}

async fn save_design(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<SaveDesignRequest>,
) -> Result<(StatusCode, Json<DesignResponse>)> {
    let body = validated(body)?;
    let mut new_design =
        NewDesign::new(user.account_id.clone(), body.image_ref).with_prompt(body.prompt);
    new_design.filename = body.filename;

    let session = state.sessions.session(&user.account_id);
    let mut dash = session.lock().await;
    let design = dash.save_design(&state.dashboard, new_design).await?;
    Ok((StatusCode::CREATED, Json(design.into())))
}

async fn delete_design(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let session = state.sessions.session(&user.account_id);
    let mut dash = session.lock().await;
    dash.delete_design(&state.dashboard, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn download_design(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let design = state.dashboard.gateway.get(&id, &user.account_id).await?;
    let file = state.downloads.download(&design).await?;

    tracing::info!(design_id = %id, filename = %file.filename, "Design downloaded");
    Ok((
        [
            (header::CONTENT_TYPE, file.content_type),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file.filename.replace('"', "")),
            ),
            (header::CACHE_CONTROL, "private, no-cache".to_string()),
        ],
        file.bytes,
    ))
}
