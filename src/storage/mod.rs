// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Blob store layer: durable storage for promoted inline images.

pub mod firebase;
pub mod memory;

pub use firebase::FirebaseStorage;
pub use memory::MemoryBlobStore;

use crate::error::AppError;
use async_trait::async_trait;

/// Upload-by-reference and delete-by-path over an object store.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store the payload of an inline `data:` URL under `path` and return a
    /// durable, fetchable URL for it.
    async fn upload_data_url(&self, path: &str, data_url: &str) -> Result<String, AppError>;

    async fn delete(&self, path: &str) -> Result<(), AppError>;

    /// Recover the object path from a URL this store handed out.
    fn path_from_url(&self, url: &str) -> Option<String> {
        path_from_object_url(url)
    }
}

/// Object key for a promoted image:
/// `images/<owner>/generated_image_<millis>_<uuid>.<ext>`. The random suffix
/// keeps saves within the same millisecond from sharing an object.
pub fn blob_key(owner_id: &str, millis: i64, ext: &str) -> String {
    format!(
        "images/{}/generated_image_{}_{}.{}",
        owner_id,
        millis,
        uuid::Uuid::new_v4().simple(),
        ext
    )
}

/// Extract the percent-decoded object path from the `/o/<path>` URL segment.
pub fn path_from_object_url(url: &str) -> Option<String> {
    let (_, rest) = url.split_once("/o/")?;
    let encoded = rest.split(['?', '#']).next().unwrap_or(rest);
    if encoded.is_empty() {
        return None;
    }
    urlencoding::decode(encoded).ok().map(|p| p.into_owned())
}
