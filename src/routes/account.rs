// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account profile and password routes.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::Account;
use crate::routes::auth::{issue, SessionResponse};
use crate::routes::validated;
use crate::AppState;
use axum::{
    extract::State,
    routing::{get, put},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me))
        .route("/api/me/profile", put(update_profile))
        .route("/api/me/password", put(update_password))
}

/// Current account response.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AccountResponse {
    pub account_id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            account_id: account.id,
            email: account.email,
            display_name: account.display_name,
        }
    }
}

#[derive(Deserialize, Validate)]
pub struct ProfileRequest {
    #[validate(length(max = 100))]
    pub display_name: String,
}

#[derive(Deserialize, Validate)]
pub struct PasswordRequest {
    #[validate(length(max = 4096))]
    pub password: String,
    #[validate(length(max = 4096))]
    pub confirmation: String,
}

async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<AccountResponse>> {
    let account = state.accounts.account(&user.id_token).await?;
    Ok(Json(account.into()))
}

async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<ProfileRequest>,
) -> Result<Json<AccountResponse>> {
    let body = validated(body)?;
    let account = state
        .accounts
        .update_display_name(&user.id_token, &body.display_name)
        .await?;
    tracing::info!(account_id = %user.account_id, "Display name updated");
    Ok(Json(account.into()))
}

/// Change the password. The identity service issues new tokens, so the
/// session cookie is replaced.
async fn update_password(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    jar: CookieJar,
    Json(body): Json<PasswordRequest>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let body = validated(body)?;
    let session = state
        .accounts
        .update_password(&user.id_token, &body.password, &body.confirmation)
        .await?;
    issue(&state, jar, session)
}
