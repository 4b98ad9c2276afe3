// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session routes: sign in, refresh, sign out.

use crate::error::{AppError, Result};
use crate::middleware::auth::{create_jwt, verify_jwt, SESSION_COOKIE};
use crate::models::IdentitySession;
use crate::routes::validated;
use crate::AppState;
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/session", post(create_session))
        .route("/auth/refresh", post(refresh_session))
        .route("/auth/logout", post(logout))
}

#[derive(Deserialize, Validate)]
pub struct SessionRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 4096))]
    pub password: String,
}

#[derive(Deserialize, Validate)]
pub struct RefreshRequest {
    #[validate(length(min = 1, max = 4096))]
    pub refresh_token: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SessionResponse {
    pub account_id: String,
    /// Session JWT, also set as the session cookie
    pub token: String,
    pub refresh_token: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub expires_in: u64,
}

/// Cookies are `Secure` except when the frontend runs on a local origin.
fn is_local_frontend(frontend_url: &str) -> bool {
    frontend_url.starts_with("http://localhost") || frontend_url.starts_with("http://127.0.0.1")
}

fn session_cookie(state: &AppState, value: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, value))
        .path("/")
        .http_only(true)
        .secure(!is_local_frontend(&state.config.frontend_url))
        .same_site(SameSite::Lax)
        .build()
}

pub(crate) fn issue(
    state: &AppState,
    jar: CookieJar,
    session: IdentitySession,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let token = create_jwt(
        &session.account_id,
        &session.id_token,
        session.expires_in,
        &state.config.jwt_signing_key,
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

    let jar = jar.add(session_cookie(state, token.clone()));
    Ok((
        jar,
        Json(SessionResponse {
            account_id: session.account_id,
            token,
            refresh_token: session.refresh_token,
            expires_in: session.expires_in,
        }),
    ))
}

/// Sign in with email and password.
async fn create_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<SessionRequest>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let body = validated(body)?;
    let session = state.accounts.sign_in(&body.email, &body.password).await?;
    issue(&state, jar, session)
}

/// Exchange a refresh token for a new session.
async fn refresh_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<RefreshRequest>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let body = validated(body)?;
    let session = state.accounts.refresh(&body.refresh_token).await?;
    issue(&state, jar, session)
}

/// Clear the session cookie and drop the account's dashboard state.
async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> (CookieJar, StatusCode) {
    if let Some(claims) = jar
        .get(SESSION_COOKIE)
        .and_then(|c| verify_jwt(c.value(), &state.config.jwt_signing_key).ok())
    {
        state.sessions.remove(&claims.sub);
        tracing::info!(account_id = %claims.sub, "Signed out");
    }

    let removal = Cookie::build(SESSION_COOKIE)
        .path("/")
        .http_only(true)
        .secure(!is_local_frontend(&state.config.frontend_url))
        .same_site(SameSite::Lax)
        .build();
    (jar.remove(removal), StatusCode::NO_CONTENT)
}
