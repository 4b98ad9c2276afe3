// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account management against the identity service.
//!
//! `IdentityProvider` is the raw collaborator; `AccountService` adds input
//! rules and is what handlers call.

use crate::error::AppError;
use crate::models::{Account, IdentitySession};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 6;

const IDENTITY_TOOLKIT_BASE: &str = "https://identitytoolkit.googleapis.com/v1";
const SECURE_TOKEN_BASE: &str = "https://securetoken.googleapis.com/v1";

/// Authentication collaborator.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<IdentitySession, AppError>;

    async fn refresh(&self, refresh_token: &str) -> Result<IdentitySession, AppError>;

    async fn account(&self, id_token: &str) -> Result<Account, AppError>;

    async fn set_display_name(&self, id_token: &str, display_name: &str) -> Result<(), AppError>;

    /// Returns the session that replaces the one whose token was used.
    async fn set_password(
        &self,
        id_token: &str,
        password: &str,
    ) -> Result<IdentitySession, AppError>;
}

// ─── Account Service ─────────────────────────────────────────

#[derive(Clone)]
pub struct AccountService {
    provider: Arc<dyn IdentityProvider>,
}

impl AccountService {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self { provider }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<IdentitySession, AppError> {
        let session = self.provider.sign_in(email.trim(), password).await?;
        tracing::info!(account_id = %session.account_id, "Signed in");
        Ok(session)
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<IdentitySession, AppError> {
        self.provider.refresh(refresh_token).await
    }

    pub async fn account(&self, id_token: &str) -> Result<Account, AppError> {
        self.provider.account(id_token).await
    }

    /// Set the display name. Surrounding whitespace is dropped; an empty
    /// name is rejected.
    pub async fn update_display_name(
        &self,
        id_token: &str,
        display_name: &str,
    ) -> Result<Account, AppError> {
        let name = display_name.trim();
        if name.is_empty() {
            return Err(AppError::BadRequest("Display name cannot be empty".to_string()));
        }

        self.provider.set_display_name(id_token, name).await?;
        self.provider.account(id_token).await
    }

    /// Change the password. Fails with `StaleSession` when the identity
    /// service wants a fresh sign-in first.
    pub async fn update_password(
        &self,
        id_token: &str,
        password: &str,
        confirmation: &str,
    ) -> Result<IdentitySession, AppError> {
        if password != confirmation {
            return Err(AppError::BadRequest("Passwords do not match".to_string()));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::BadRequest(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        let session = self.provider.set_password(id_token, password).await?;
        tracing::info!(account_id = %session.account_id, "Password updated");
        Ok(session)
    }
}

// ─── Identity Toolkit Client ─────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    local_id: String,
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    user_id: String,
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    email: Option<String>,
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// REST client for the Identity Toolkit and Secure Token APIs.
#[derive(Clone)]
pub struct IdentityToolkitClient {
    http: reqwest::Client,
    api_key: String,
    toolkit_base: String,
    token_base: String,
}

impl IdentityToolkitClient {
    pub fn new(api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            toolkit_base: IDENTITY_TOOLKIT_BASE.to_string(),
            token_base: SECURE_TOKEN_BASE.to_string(),
        }
    }

    async fn post_toolkit<T: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<T, AppError> {
        let url = format!("{}/accounts:{}", self.toolkit_base, method);
        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Identity(e.to_string()))?;

        self.check_response_json(response).await
    }

    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let code = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or_default();
            return Err(map_identity_error(&code, &format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Identity(format!("JSON parse error: {}", e)))
    }
}

#[async_trait]
impl IdentityProvider for IdentityToolkitClient {
    async fn sign_in(&self, email: &str, password: &str) -> Result<IdentitySession, AppError> {
        let body = serde_json::json!({
            "email": email,
            "password": password,
            "returnSecureToken": true,
        });
        let r: SignInResponse = self.post_toolkit("signInWithPassword", body).await?;
        Ok(IdentitySession {
            account_id: r.local_id,
            id_token: r.id_token,
            refresh_token: r.refresh_token,
            expires_in: r.expires_in.parse().unwrap_or(3600),
        })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<IdentitySession, AppError> {
        let response = self
            .http
            .post(format!("{}/token", self.token_base))
            .query(&[("key", self.api_key.as_str())])
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await
            .map_err(|e| AppError::Identity(format!("Token refresh request failed: {}", e)))?;

        let r: RefreshResponse = self.check_response_json(response).await?;
        Ok(IdentitySession {
            account_id: r.user_id,
            id_token: r.id_token,
            refresh_token: r.refresh_token,
            expires_in: r.expires_in.parse().unwrap_or(3600),
        })
    }

    async fn account(&self, id_token: &str) -> Result<Account, AppError> {
        let r: LookupResponse = self
            .post_toolkit("lookup", serde_json::json!({ "idToken": id_token }))
            .await?;
        let user = r.users.into_iter().next().ok_or(AppError::InvalidToken)?;
        Ok(Account {
            id: user.local_id,
            email: user.email,
            display_name: user.display_name,
        })
    }

    async fn set_display_name(&self, id_token: &str, display_name: &str) -> Result<(), AppError> {
        let body = serde_json::json!({
            "idToken": id_token,
            "displayName": display_name,
            "returnSecureToken": false,
        });
        let _: serde_json::Value = self.post_toolkit("update", body).await?;
        Ok(())
    }

    async fn set_password(
        &self,
        id_token: &str,
        password: &str,
    ) -> Result<IdentitySession, AppError> {
        let body = serde_json::json!({
            "idToken": id_token,
            "password": password,
            "returnSecureToken": true,
        });
        let r: SignInResponse = self.post_toolkit("update", body).await?;
        Ok(IdentitySession {
            account_id: r.local_id,
            id_token: r.id_token,
            refresh_token: r.refresh_token,
            expires_in: r.expires_in.parse().unwrap_or(3600),
        })
    }
}

/// Map an identity-service error code to an `AppError`.
fn map_identity_error(code: &str, raw: &str) -> AppError {
    // Codes may carry a suffix, e.g. "WEAK_PASSWORD : Password should be ..."
    let code = code.split(':').next().unwrap_or(code).trim();
    match code {
        "CREDENTIAL_TOO_OLD_LOGIN_AGAIN" => AppError::StaleSession,
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" | "USER_DISABLED" => {
            AppError::Unauthorized
        }
        "INVALID_ID_TOKEN" | "TOKEN_EXPIRED" | "USER_NOT_FOUND" | "INVALID_REFRESH_TOKEN" => {
            AppError::InvalidToken
        }
        "WEAK_PASSWORD" => AppError::BadRequest("Password is too weak".to_string()),
        _ if raw.to_ascii_lowercase().contains("requires recent login") => AppError::StaleSession,
        _ => AppError::Identity(raw.to_string()),
    }
}
