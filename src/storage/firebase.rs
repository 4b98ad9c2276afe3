// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cloud Storage client for a Firebase bucket.
//!
//! Objects are written through the Cloud Storage JSON API with service
//! credentials, then tagged with a Firebase download token so the returned
//! URL can be fetched without credentials.

use crate::data_url::DataUrl;
use crate::error::AppError;
use crate::storage::BlobStore;
use async_trait::async_trait;

const STORAGE_API: &str = "https://storage.googleapis.com";
const DOWNLOAD_API: &str = "https://firebasestorage.googleapis.com/v0/b";

/// Firebase Storage bucket client.
pub struct FirebaseStorage {
    http: reqwest::Client,
    bucket: String,
    api_base: String,
    auth: Option<gcloud_sdk::GoogleAuthTokenGenerator>,
}

impl FirebaseStorage {
    /// Create a client using application default credentials.
    ///
    /// With FIREBASE_STORAGE_EMULATOR_HOST set, requests go to the emulator
    /// without credentials.
    pub async fn new(bucket: &str) -> Result<Self, AppError> {
        if let Ok(host) = std::env::var("FIREBASE_STORAGE_EMULATOR_HOST") {
            tracing::info!(bucket, host = %host, "Using Firebase Storage emulator");
            return Ok(Self {
                http: reqwest::Client::new(),
                bucket: bucket.to_string(),
                api_base: format!("http://{}", host),
                auth: None,
            });
        }

        let auth = gcloud_sdk::GoogleAuthTokenGenerator::new(
            gcloud_sdk::TokenSourceType::Default,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
        )
        .await
        .map_err(|e| AppError::Storage(format!("Failed to load storage credentials: {}", e)))?;

        tracing::info!(bucket, "Connected to Cloud Storage");

        Ok(Self {
            http: reqwest::Client::new(),
            bucket: bucket.to_string(),
            api_base: STORAGE_API.to_string(),
            auth: Some(auth),
        })
    }

    /// Public download URL for an object and its download token.
    pub fn download_url(&self, path: &str, token: &str) -> String {
        format!(
            "{}/{}/o/{}?alt=media&token={}",
            DOWNLOAD_API,
            self.bucket,
            urlencoding::encode(path),
            token
        )
    }

    async fn authorize(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::RequestBuilder, AppError> {
        match &self.auth {
            Some(auth) => {
                let token = auth
                    .create_token()
                    .await
                    .map_err(|e| AppError::Storage(format!("Token request failed: {}", e)))?;
                Ok(request.header(
                    reqwest::header::AUTHORIZATION,
                    format!("{} {}", token.token_type, token.token.as_sensitive_str()),
                ))
            }
            None => Ok(request),
        }
    }

    fn object_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/b/{}/o/{}",
            self.api_base,
            self.bucket,
            urlencoding::encode(path)
        )
    }

    /// Check response status and return error if not successful.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, AppError> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!("Storage object: {}", body)));
        }

        Err(AppError::Storage(format!("HTTP {}: {}", status, body)))
    }
}

#[async_trait]
impl BlobStore for FirebaseStorage {
    async fn upload_data_url(&self, path: &str, data_url: &str) -> Result<String, AppError> {
        let parsed = DataUrl::parse(data_url).map_err(|e| AppError::BadRequest(e.to_string()))?;
        let size = parsed.bytes.len();

        let upload_url = format!("{}/upload/storage/v1/b/{}/o", self.api_base, self.bucket);
        let request = self
            .http
            .post(&upload_url)
            .query(&[("uploadType", "media"), ("name", path)])
            .header(reqwest::header::CONTENT_TYPE, parsed.mime_type.as_str())
            .body(parsed.bytes);

        let response = self
            .authorize(request)
            .await?
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Upload request failed: {}", e)))?;
        Self::check_response(response).await?;

        // Attach a download token so the object is fetchable by URL.
        let token = uuid::Uuid::new_v4().to_string();
        let body = serde_json::json!({
            "metadata": { "firebaseStorageDownloadTokens": token }
        });
        let request = self.http.patch(self.object_url(path)).json(&body);
        let response = self
            .authorize(request)
            .await?
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Metadata update failed: {}", e)))?;
        Self::check_response(response).await?;

        tracing::info!(path, size, bucket = %self.bucket, "Uploaded image to storage");
        Ok(self.download_url(path, &token))
    }

    async fn delete(&self, path: &str) -> Result<(), AppError> {
        let request = self.http.delete(self.object_url(path));
        let response = self
            .authorize(request)
            .await?
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Delete request failed: {}", e)))?;
        Self::check_response(response).await?;

        tracing::info!(path, "Deleted storage object");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_url_round_trips_path() {
        let storage = FirebaseStorage {
            http: reqwest::Client::new(),
            bucket: "demo.appspot.com".to_string(),
            api_base: STORAGE_API.to_string(),
            auth: None,
        };
        let url = storage.download_url("images/u1/generated_image_5.jpg", "tok");
        assert_eq!(
            url,
            "https://firebasestorage.googleapis.com/v0/b/demo.appspot.com/o/images%2Fu1%2Fgenerated_image_5.jpg?alt=media&token=tok"
        );
        assert_eq!(
            storage.path_from_url(&url).as_deref(),
            Some("images/u1/generated_image_5.jpg")
        );
    }
}
