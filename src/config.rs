// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.

use std::env;

/// Default number of variations requested per prompt.
pub const DEFAULT_VARIATIONS: usize = 6;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// GCP project ID (Firestore)
    pub gcp_project_id: String,
    /// Blob-store bucket name
    pub storage_bucket: String,
    /// Base URL of the image-generation service
    pub generation_api_url: String,
    /// How many variations to request per prompt
    pub generation_variations: usize,
    /// Substrings marking image refs served by a non-durable local generation server
    pub local_server_patterns: Vec<String>,
    /// Use in-memory stores instead of Firestore/Storage (local development)
    pub in_memory_stores: bool,
    /// Server port
    pub port: u16,

    // --- Secrets ---
    /// Identity service API key
    pub identity_api_key: String,
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
}

impl Config {
    /// Config for tests; never read from the environment.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            storage_bucket: "test-project.appspot.com".to_string(),
            generation_api_url: "http://127.0.0.1:9".to_string(),
            generation_variations: DEFAULT_VARIATIONS,
            local_server_patterns: default_local_server_patterns(),
            in_memory_stores: true,
            port: 8080,
            identity_api_key: "test_api_key".to_string(),
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is honored for local development.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let gcp_project_id =
            env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string());
        let storage_bucket = env::var("STORAGE_BUCKET")
            .unwrap_or_else(|_| format!("{}.appspot.com", gcp_project_id));

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id,
            storage_bucket,
            generation_api_url: env::var("GENERATION_API_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| "http://localhost:5000".to_string()),
            generation_variations: env::var("GENERATION_VARIATIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(DEFAULT_VARIATIONS),
            local_server_patterns: env::var("LOCAL_SERVER_PATTERNS")
                .map(|v| parse_patterns(&v))
                .unwrap_or_else(|_| default_local_server_patterns()),
            in_memory_stores: env::var("IN_MEMORY_STORES")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),

            identity_api_key: env::var("IDENTITY_API_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("IDENTITY_API_KEY"))?,
            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
        })
    }
}

fn default_local_server_patterns() -> Vec<String> {
    vec!["localhost:5000".to_string(), "127.0.0.1:5000".to_string()]
}

fn parse_patterns(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
