// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Image generation collaborator.
//!
//! Handles:
//! - Prompt -> image ref requests against the generation server
//! - Placeholder substitution when a request fails
//! - Concurrent variation requests (index-aligned results)
//! - The generation server's per-account history

use crate::error::AppError;
use crate::models::design::is_local_server_ref;
use crate::models::{Design, DesignSource};
use crate::services::placeholder::prompt_placeholder;
use crate::time_utils::parse_lenient;
use async_trait::async_trait;
use chrono::Utc;
use futures_util::future::join_all;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const MODEL: &str = "stable-diffusion-xl";

/// One generated image.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationResult {
    pub image_ref: String,
    pub filename: String,
}

/// A design the generation server kept for an account.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    #[serde(default)]
    pub prompt: String,
    #[serde(alias = "imageUrl")]
    pub image_url: Option<String>,
    #[serde(alias = "createdAt")]
    pub created_at: Option<String>,
}

/// Remote image generation.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<GenerationResult, AppError>;

    /// Designs the generation server saved for `owner_id`.
    async fn history(&self, owner_id: &str) -> Result<Vec<HistoryEntry>, AppError>;
}

// ─── HTTP Client ─────────────────────────────────────────────

#[derive(Serialize)]
struct GenerateRequest<'a> {
    prompt: &'a str,
    model: &'a str,
    num_images: u32,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    image_url: Option<String>,
    #[serde(default)]
    images: Vec<GeneratedUrl>,
    filename: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeneratedUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    designs: Vec<HistoryEntry>,
}

/// Client for the generation server's REST API.
#[derive(Clone)]
pub struct HttpImageGenerator {
    http: reqwest::Client,
    base_url: String,
}

impl HttpImageGenerator {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Generation(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Generation(format!("JSON parse error: {}", e)))
    }
}

#[async_trait]
impl ImageGenerator for HttpImageGenerator {
    async fn generate(&self, prompt: &str) -> Result<GenerationResult, AppError> {
        let url = format!("{}/generate", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&GenerateRequest {
                prompt,
                model: MODEL,
                num_images: 1,
            })
            .send()
            .await
            .map_err(|e| AppError::Generation(e.to_string()))?;

        let body: GenerateResponse = self.check_response_json(response).await?;
        parse_generate_response(body, &self.base_url)
    }

    async fn history(&self, owner_id: &str) -> Result<Vec<HistoryEntry>, AppError> {
        let url = format!(
            "{}/user-designs/{}",
            self.base_url,
            urlencoding::encode(owner_id)
        );
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::Generation(e.to_string()))?;

        let body: HistoryResponse = self.check_response_json(response).await?;
        Ok(body
            .designs
            .into_iter()
            .map(|mut entry| {
                entry.image_url = entry.image_url.map(|u| resolve_url(&self.base_url, &u));
                entry
            })
            .collect())
    }
}

fn parse_generate_response(
    body: GenerateResponse,
    base_url: &str,
) -> Result<GenerationResult, AppError> {
    let image_url = body
        .image_url
        .filter(|u| !u.is_empty())
        .or_else(|| body.images.into_iter().next().map(|i| i.url))
        .filter(|u| !u.is_empty())
        .ok_or_else(|| AppError::Generation("Response contained no image".to_string()))?;

    Ok(GenerationResult {
        image_ref: resolve_url(base_url, &image_url),
        filename: body
            .filename
            .unwrap_or_else(|| format!("banner_{}.jpg", Utc::now().timestamp_millis())),
    })
}

/// Resolve a server-relative image path against the server's base URL.
fn resolve_url(base_url: &str, image_url: &str) -> String {
    if crate::data_url::is_inline(image_url) {
        return image_url.to_string();
    }
    match Url::parse(image_url) {
        Ok(_) => image_url.to_string(),
        Err(_) => Url::parse(&format!("{}/", base_url))
            .and_then(|base| base.join(image_url))
            .map(String::from)
            .unwrap_or_else(|_| image_url.to_string()),
    }
}

// ─── Service ─────────────────────────────────────────────────

/// A generated image as shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(ts_rs::TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct GeneratedImage {
    pub index: usize,
    pub image_ref: String,
    pub filename: String,
    pub prompt: String,
    /// True when generation failed and a placeholder was substituted
    pub is_placeholder: bool,
}

/// Generation with placeholder fallback and history mapping.
#[derive(Clone)]
pub struct GenerationService {
    generator: Arc<dyn ImageGenerator>,
    variations: usize,
    local_server_patterns: Vec<String>,
}

impl GenerationService {
    pub fn new(
        generator: Arc<dyn ImageGenerator>,
        variations: usize,
        local_server_patterns: Vec<String>,
    ) -> Self {
        Self {
            generator,
            variations: variations.max(1),
            local_server_patterns,
        }
    }

    /// Generate one image. Never fails: errors become a placeholder.
    pub async fn generate_one(&self, index: usize, prompt: &str) -> GeneratedImage {
        match self.generator.generate(prompt).await {
            Ok(result) => GeneratedImage {
                index,
                image_ref: result.image_ref,
                filename: result.filename,
                prompt: prompt.to_string(),
                is_placeholder: false,
            },
            Err(e) => {
                tracing::warn!(index, error = %e, "Generation failed, using placeholder");
                GeneratedImage {
                    index,
                    image_ref: prompt_placeholder(prompt),
                    filename: format!("placeholder_{}.svg", Utc::now().timestamp_millis()),
                    prompt: prompt.to_string(),
                    is_placeholder: true,
                }
            }
        }
    }

    /// Request every variation concurrently. Results follow request order.
    pub async fn generate_variations(&self, prompt: &str) -> Vec<GeneratedImage> {
        let prompts: Vec<String> = (0..self.variations)
            .map(|i| variation_prompt(prompt, i, self.variations))
            .collect();

        let images = join_all(
            prompts
                .iter()
                .enumerate()
                .map(|(i, p)| self.generate_one(i, p)),
        )
        .await;

        let placeholders = images.iter().filter(|i| i.is_placeholder).count();
        tracing::info!(
            variations = images.len(),
            placeholders,
            "Generated images for prompt"
        );
        images
    }

    /// The generation server's saved designs for `owner_id`. Errors yield
    /// an empty list; the server is optional.
    pub async fn history(&self, owner_id: &str) -> Vec<Design> {
        match self.generator.history(owner_id).await {
            Ok(entries) => entries
                .into_iter()
                .map(|entry| self.history_design(owner_id, entry))
                .collect(),
            Err(e) => {
                tracing::warn!(owner_id, error = %e, "Generation history unavailable");
                Vec::new()
            }
        }
    }

    fn history_design(&self, owner_id: &str, entry: HistoryEntry) -> Design {
        let image_ref = entry.image_url.unwrap_or_default();
        Design {
            is_local_server_ref: is_local_server_ref(&image_ref, &self.local_server_patterns),
            filename: Some(entry.id.clone()),
            id: entry.id,
            owner_id: owner_id.to_string(),
            image_ref,
            original_image_ref: None,
            prompt: entry.prompt,
            customization: None,
            source: DesignSource::External,
            created_at: entry.created_at.as_deref().and_then(parse_lenient),
        }
    }
}

/// Prompt for variation `index`; a single request uses the prompt as-is.
fn variation_prompt(prompt: &str, index: usize, total: usize) -> String {
    if total <= 1 {
        prompt.to_string()
    } else {
        format!("{} - variation {}", prompt, index + 1)
    }
}
