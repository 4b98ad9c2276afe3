// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Inline raster references (`data:` URLs).

use base64::{engine::general_purpose::STANDARD, Engine as _};

/// A decoded `data:` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Errors from parsing a `data:` URL.
#[derive(Debug, thiserror::Error)]
pub enum DataUrlError {
    #[error("Not a data URL")]
    NotDataUrl,

    #[error("Data URL has no payload separator")]
    MissingPayload,

    #[error("Invalid base64 payload: {0}")]
    Base64(String),
}

/// True if the image ref is self-contained inline data.
pub fn is_inline(image_ref: &str) -> bool {
    image_ref.starts_with("data:")
}

impl DataUrl {
    /// Parse `data:<mime>[;params][;base64],<payload>`.
    ///
    /// Payloads without `;base64` are percent-decoded (SVG placeholders use this form).
    pub fn parse(raw: &str) -> Result<Self, DataUrlError> {
        let rest = raw.strip_prefix("data:").ok_or(DataUrlError::NotDataUrl)?;
        let (header, payload) = rest.split_once(',').ok_or(DataUrlError::MissingPayload)?;

        let mut params = header.split(';');
        let mime_type = params
            .next()
            .filter(|m| !m.is_empty())
            .unwrap_or("text/plain")
            .to_ascii_lowercase();
        let is_base64 = params.any(|p| p.eq_ignore_ascii_case("base64"));

        let bytes = if is_base64 {
            let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
            STANDARD
                .decode(compact.as_bytes())
                .map_err(|e| DataUrlError::Base64(e.to_string()))?
        } else {
            urlencoding::decode_binary(payload.as_bytes()).into_owned()
        };

        Ok(Self { mime_type, bytes })
    }

    /// Encode bytes as a base64 `data:` URL.
    pub fn encode(mime_type: &str, bytes: &[u8]) -> String {
        format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes))
    }

    /// File extension matching the mime type.
    pub fn extension(&self) -> &'static str {
        extension_for_mime(&self.mime_type)
    }

    pub fn is_svg(&self) -> bool {
        self.mime_type == "image/svg+xml"
    }
}

/// File extension for an image mime type, defaulting to `png`.
pub fn extension_for_mime(mime_type: &str) -> &'static str {
    match mime_type {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/svg+xml" => "svg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/bmp" => "bmp",
        _ => "png",
    }
}

/// Mime type announced by a `data:` URL without decoding its payload.
pub fn mime_type_of(raw: &str) -> Option<String> {
    let rest = raw.strip_prefix("data:")?;
    let header = rest.split_once(',').map(|(h, _)| h).unwrap_or(rest);
    header
        .split(';')
        .next()
        .filter(|m| !m.is_empty())
        .map(str::to_ascii_lowercase)
}
