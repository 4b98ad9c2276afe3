// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account model as reported by the identity service.

use serde::{Deserialize, Serialize};

/// Current account identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Identity-service account id (also the design owner id)
    pub id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

/// Tokens issued by the identity service for one sign-in.
#[derive(Debug, Clone)]
pub struct IdentitySession {
    pub account_id: String,
    /// Short-lived identity token used for account calls
    pub id_token: String,
    pub refresh_token: String,
    /// Seconds until `id_token` expires
    pub expires_in: u64,
}
