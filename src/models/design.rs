// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Design model: one persisted generated or customized image.

use crate::data_url;
use crate::models::Customization;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Provenance tag describing which storage path a design took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum DesignSource {
    /// Inline data stored directly in the document.
    DataUrl,
    /// Promoted to the blob store; `image_ref` is a durable URL.
    #[serde(rename = "firebase")]
    FirebaseStorage,
    /// Remote URL stored as-is, or a record from the generation history.
    External,
    /// Written by the reduced-field save tier.
    FallbackDirect,
    /// Rendered customization.
    Customized,
    /// Customization metadata saved alongside the unmodified source.
    CustomizedFallback,
}

impl DesignSource {
    pub fn as_str(self) -> &'static str {
        match self {
            DesignSource::DataUrl => "data_url",
            DesignSource::FirebaseStorage => "firebase",
            DesignSource::External => "external",
            DesignSource::FallbackDirect => "fallback_direct",
            DesignSource::Customized => "customized",
            DesignSource::CustomizedFallback => "customized_fallback",
        }
    }

    /// Parse a stored tag. Older records used a few alternate spellings.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "data_url" => Some(DesignSource::DataUrl),
            "firebase" | "firebase_storage" => Some(DesignSource::FirebaseStorage),
            "external" => Some(DesignSource::External),
            "fallback_direct" => Some(DesignSource::FallbackDirect),
            "customized" => Some(DesignSource::Customized),
            "customized_fallback" => Some(DesignSource::CustomizedFallback),
            _ => None,
        }
    }

    /// Best guess for records with no (or an unknown) tag.
    pub fn infer(image_ref: &str) -> Self {
        if data_url::is_inline(image_ref) {
            DesignSource::DataUrl
        } else {
            DesignSource::External
        }
    }
}

/// A persisted promotional-image record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Design {
    /// Store-assigned identifier
    pub id: String,
    pub owner_id: String,
    /// Inline data URL, blob-store URL, or (degraded) a local-server URL
    pub image_ref: String,
    /// Inline original kept when `image_ref` was promoted to the blob store
    pub original_image_ref: Option<String>,
    pub prompt: String,
    pub customization: Option<Customization>,
    pub source: DesignSource,
    /// Normalized creation time; `None` sorts as the epoch
    pub created_at: Option<DateTime<Utc>>,
    pub filename: Option<String>,
    /// `image_ref` points at a non-durable local generation server
    #[serde(default)]
    pub is_local_server_ref: bool,
}

/// A design that has not been persisted yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDesign {
    pub owner_id: String,
    pub image_ref: String,
    pub prompt: String,
    pub customization: Option<Customization>,
    /// Overrides the tag the save tier would pick
    pub source: Option<DesignSource>,
    pub filename: Option<String>,
    /// Recovery copy carried over from the design being customized
    pub original_image_ref: Option<String>,
}

impl NewDesign {
    pub fn new(owner_id: impl Into<String>, image_ref: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            image_ref: image_ref.into(),
            prompt: String::new(),
            customization: None,
            source: None,
            filename: None,
            original_image_ref: None,
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn with_customization(mut self, customization: Customization) -> Self {
        self.customization = Some(customization);
        self
    }

    pub fn with_source(mut self, source: DesignSource) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }
}

impl Design {
    /// Ref to show in place of `image_ref`; local-server refs get a placeholder.
    pub fn display_ref(&self) -> String {
        if self.is_local_server_ref {
            let filename = self
                .filename
                .clone()
                .or_else(|| {
                    self.image_ref
                        .rsplit('/')
                        .next()
                        .map(|s| s.split('?').next().unwrap_or(s).to_string())
                })
                .unwrap_or_default();
            crate::services::placeholder::local_server_placeholder(&filename)
        } else {
            self.image_ref.clone()
        }
    }

    /// Inline copy to fall back on when `image_ref` cannot be fetched.
    pub fn recovery_ref(&self) -> Option<&str> {
        self.original_image_ref
            .as_deref()
            .filter(|r| data_url::is_inline(r))
    }

    /// Base name for downloads.
    pub fn download_name(&self) -> String {
        self.filename
            .as_deref()
            .map(|f| f.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(f))
            .filter(|f| !f.is_empty())
            .map(String::from)
            .unwrap_or_else(|| format!("banner-{}", self.id))
    }
}

/// True if `image_ref` matches any of the configured local-server patterns.
pub fn is_local_server_ref(image_ref: &str, patterns: &[String]) -> bool {
    !data_url::is_inline(image_ref) && patterns.iter().any(|p| image_ref.contains(p.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn design(image_ref: &str) -> Design {
        Design {
            id: "d1".to_string(),
            owner_id: "u1".to_string(),
            image_ref: image_ref.to_string(),
            original_image_ref: None,
            prompt: "sale".to_string(),
            customization: None,
            source: DesignSource::External,
            created_at: None,
            filename: None,
            is_local_server_ref: false,
        }
    }

    #[test]
    fn test_source_serde_names() {
        assert_eq!(
            serde_json::to_string(&DesignSource::FirebaseStorage).unwrap(),
            "\"firebase\""
        );
        assert_eq!(
            serde_json::to_string(&DesignSource::CustomizedFallback).unwrap(),
            "\"customized_fallback\""
        );
        for source in [
            DesignSource::DataUrl,
            DesignSource::FirebaseStorage,
            DesignSource::External,
            DesignSource::FallbackDirect,
            DesignSource::Customized,
            DesignSource::CustomizedFallback,
        ] {
            assert_eq!(DesignSource::from_tag(source.as_str()), Some(source));
        }
    }

    #[test]
    fn test_infer_source() {
        assert_eq!(DesignSource::infer("data:image/png;base64,AA"), DesignSource::DataUrl);
        assert_eq!(DesignSource::infer("https://x/y.png"), DesignSource::External);
    }

    #[test]
    fn test_local_server_detection() {
        let patterns = vec!["localhost:5000".to_string()];
        assert!(is_local_server_ref("http://localhost:5000/images/a.png", &patterns));
        assert!(!is_local_server_ref("https://cdn.example.com/a.png", &patterns));
        assert!(!is_local_server_ref("data:image/png;base64,localhost:5000", &patterns));
    }

    #[test]
    fn test_display_ref_substitutes_placeholder() {
        let mut d = design("http://localhost:5000/images/abc.png?x=1");
        assert_eq!(d.display_ref(), d.image_ref);

        d.is_local_server_ref = true;
        let shown = d.display_ref();
        assert!(shown.starts_with("data:image/svg+xml,"));
        assert!(urlencoding::decode(&shown).unwrap().contains("abc.png"));
    }

    #[test]
    fn test_recovery_ref_requires_inline() {
        let mut d = design("https://firebasestorage.googleapis.com/v0/b/x/o/y");
        d.original_image_ref = Some("https://elsewhere/y".to_string());
        assert_eq!(d.recovery_ref(), None);
        d.original_image_ref = Some("data:image/png;base64,AA".to_string());
        assert_eq!(d.recovery_ref(), Some("data:image/png;base64,AA"));
    }

    #[test]
    fn test_download_name() {
        let mut d = design("x");
        assert_eq!(d.download_name(), "banner-d1");
        d.filename = Some("sunset.png".to_string());
        assert_eq!(d.download_name(), "sunset");
    }
}
