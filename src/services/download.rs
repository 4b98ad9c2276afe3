// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Full-quality downloads of saved designs.

use crate::data_url::{self, extension_for_mime, DataUrl};
use crate::error::AppError;
use crate::models::Design;
use crate::services::image_transform::{CrossOriginMode, FetchedImage, ImageFetcher};
use image::codecs::jpeg::JpegEncoder;
use image::ImageFormat;
use std::sync::Arc;

/// Quality used when re-encoding lossy downloads.
pub const DOWNLOAD_JPEG_QUALITY: u8 = 100;

/// A file ready to hand to the client.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadFile {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Clone)]
pub struct DownloadService {
    fetcher: Arc<dyn ImageFetcher>,
}

impl DownloadService {
    pub fn new(fetcher: Arc<dyn ImageFetcher>) -> Self {
        Self { fetcher }
    }

    /// Produce the file for a design. Remote images that cannot be fetched
    /// fall back to the design's inline original, if it has one.
    pub async fn download(&self, design: &Design) -> Result<DownloadFile, AppError> {
        let (content_type, bytes) = if data_url::is_inline(&design.image_ref) {
            decode_inline(&design.image_ref)?
        } else {
            match self.fetch_remote(&design.image_ref).await {
                Ok(file) => file,
                Err(e) => match design.recovery_ref() {
                    Some(original) => {
                        tracing::warn!(
                            design_id = %design.id,
                            error = %e,
                            "Download fetch failed, using inline original"
                        );
                        decode_inline(original)?
                    }
                    None => return Err(e),
                },
            }
        };

        let filename = format!(
            "{}-hq.{}",
            design.download_name(),
            extension_for_mime(&content_type)
        );
        tracing::debug!(design_id = %design.id, filename = %filename, size = bytes.len(), "Prepared download");

        Ok(DownloadFile {
            filename,
            content_type,
            bytes,
        })
    }

    async fn fetch_remote(&self, url: &str) -> Result<(String, Vec<u8>), AppError> {
        let FetchedImage {
            bytes,
            content_type,
        } = self
            .fetcher
            .fetch(url, CrossOriginMode::Relaxed)
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;

        let content_type = content_type
            .map(|ct| ct.split(';').next().unwrap_or(&ct).trim().to_ascii_lowercase())
            .filter(|ct| ct.starts_with("image/"))
            .or_else(|| {
                image::guess_format(&bytes)
                    .ok()
                    .map(|f| f.to_mime_type().to_string())
            })
            .filter(|ct| ct.starts_with("image/"))
            .ok_or_else(|| AppError::Storage("Remote resource is not an image".to_string()))?;

        if content_type == "image/jpeg" {
            match reencode_jpeg(&bytes) {
                Ok(reencoded) => return Ok((content_type, reencoded)),
                Err(e) => {
                    tracing::warn!(error = %e, "JPEG re-encode failed, serving original bytes")
                }
            }
        }
        Ok((content_type, bytes))
    }
}

fn decode_inline(raw: &str) -> Result<(String, Vec<u8>), AppError> {
    let parsed = DataUrl::parse(raw).map_err(|e| AppError::BadRequest(e.to_string()))?;
    Ok((parsed.mime_type, parsed.bytes))
}

/// Decode a lossy image and encode it again at full quality.
fn reencode_jpeg(bytes: &[u8]) -> Result<Vec<u8>, image::ImageError> {
    let img = image::load_from_memory_with_format(bytes, ImageFormat::Jpeg)?.to_rgb8();
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, DOWNLOAD_JPEG_QUALITY).encode_image(&img)?;
    Ok(buf)
}
