// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response};
use banner_studio::config::Config;
use banner_studio::db::{FirestoreDb, MemoryStore};
use banner_studio::error::{AppError, RenderError};
use banner_studio::middleware::auth::create_jwt;
use banner_studio::models::{Account, IdentitySession};
use banner_studio::routes::create_router;
use banner_studio::services::generation::{GenerationResult, HistoryEntry, ImageGenerator};
use banner_studio::services::identity::IdentityProvider;
use banner_studio::services::image_transform::{CrossOriginMode, FetchedImage, ImageFetcher};
use banner_studio::services::ImageTransformEngine;
use banner_studio::storage::MemoryBlobStore;
use banner_studio::{AppState, Collaborators};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

pub const PASSWORD: &str = "correct horse";

/// Generation server double. Echoes prompts as URLs unless told to fail.
#[derive(Default)]
pub struct FakeGenerator {
    pub fail: AtomicBool,
    pub history: Mutex<Vec<HistoryEntry>>,
}

#[async_trait]
impl ImageGenerator for FakeGenerator {
    async fn generate(&self, prompt: &str) -> Result<GenerationResult, AppError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::Generation("connection refused".to_string()));
        }
        Ok(GenerationResult {
            image_ref: format!("https://gen.example/{}.jpg", urlencoding::encode(prompt)),
            filename: "generated.jpg".to_string(),
        })
    }

    async fn history(&self, _owner_id: &str) -> Result<Vec<HistoryEntry>, AppError> {
        Ok(self.history.lock().unwrap().clone())
    }
}

/// Identity service double with one account per email.
#[derive(Default)]
pub struct FakeIdentity {
    pub require_recent_login: AtomicBool,
    pub display_name: Mutex<Option<String>>,
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn sign_in(&self, email: &str, password: &str) -> Result<IdentitySession, AppError> {
        if password != PASSWORD {
            return Err(AppError::Unauthorized);
        }
        Ok(IdentitySession {
            account_id: format!("acct-{}", email),
            id_token: format!("idt-{}", email),
            refresh_token: format!("rt-{}", email),
            expires_in: 3600,
        })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<IdentitySession, AppError> {
        let email = refresh_token
            .strip_prefix("rt-")
            .ok_or(AppError::InvalidToken)?;
        self.sign_in(email, PASSWORD).await
    }

    async fn account(&self, id_token: &str) -> Result<Account, AppError> {
        let email = id_token.strip_prefix("idt-").ok_or(AppError::InvalidToken)?;
        Ok(Account {
            id: format!("acct-{}", email),
            email: Some(email.to_string()),
            display_name: self.display_name.lock().unwrap().clone(),
        })
    }

    async fn set_display_name(&self, _id_token: &str, name: &str) -> Result<(), AppError> {
        *self.display_name.lock().unwrap() = Some(name.to_string());
        Ok(())
    }

    async fn set_password(
        &self,
        id_token: &str,
        _password: &str,
    ) -> Result<IdentitySession, AppError> {
        if self.require_recent_login.load(Ordering::SeqCst) {
            return Err(AppError::StaleSession);
        }
        let email = id_token.strip_prefix("idt-").ok_or(AppError::InvalidToken)?;
        self.sign_in(email, PASSWORD).await
    }
}

/// Fetcher with no network: every remote image is unreachable.
pub struct OfflineFetcher;

#[async_trait]
impl ImageFetcher for OfflineFetcher {
    async fn fetch(&self, _url: &str, _mode: CrossOriginMode) -> Result<FetchedImage, RenderError> {
        Err(RenderError::Decode("offline".to_string()))
    }
}

/// Test app over in-memory stores with handles to every double.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub docs: Arc<MemoryStore>,
    pub blobs: Arc<MemoryBlobStore>,
    pub generator: Arc<FakeGenerator>,
    pub identity: Arc<FakeIdentity>,
}

#[allow(dead_code)]
impl TestApp {
    /// Session JWT for an account, as the identity service would issue it.
    pub fn token_for(&self, email: &str) -> String {
        create_jwt(
            &format!("acct-{}", email),
            &format!("idt-{}", email),
            3600,
            &self.state.config.jwt_signing_key,
        )
        .unwrap()
    }

    /// Send a request, optionally authenticated as `email`.
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        email: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> Response<Body> {
        use tower::ServiceExt;

        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(email) = email {
            builder = builder.header(
                header::AUTHORIZATION,
                format!("Bearer {}", self.token_for(email)),
            );
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.router.clone().oneshot(request).await.unwrap()
    }
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Create a test app with in-memory stores and offline collaborators.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    create_test_app_with_config(Config::test_default())
}

#[allow(dead_code)]
pub fn create_test_app_with_config(mut config: Config) -> TestApp {
    config.generation_variations = 2;

    let docs = Arc::new(MemoryStore::new());
    let blobs = Arc::new(MemoryBlobStore::new());
    let generator = Arc::new(FakeGenerator::default());
    let identity = Arc::new(FakeIdentity::default());
    let fetcher = Arc::new(OfflineFetcher);
    let engine = Arc::new(ImageTransformEngine::with_fontdb(
        fetcher.clone(),
        Arc::new(usvg::fontdb::Database::new()),
    ));

    let state = Arc::new(AppState::new(
        config,
        Collaborators {
            docs: docs.clone(),
            blobs: blobs.clone(),
            generator: generator.clone(),
            identity: identity.clone(),
            fetcher,
            engine,
        },
    ));

    TestApp {
        router: create_router(state.clone()),
        state,
        docs,
        blobs,
        generator,
        identity,
    }
}
