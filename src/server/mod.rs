//! Web interface for uploading and grading answer sheets.
//!
//! Provides:
//! - Signup, login and logout with server-side sessions
//! - A dashboard with the upload form and the user's scripts
//! - Lazy evaluation of a script on first view

mod assets;
mod handlers;
mod markup;
mod routes;
mod session;
mod template_structs;

pub use routes::create_router;

use std::net::SocketAddr;
use std::sync::Arc;

use crate::auth::AuthService;
use crate::config::Settings;
use crate::llm::{GeminiClient, GenerateContent};
use crate::ocr::{PdfRenderer, PopplerRenderer};
use crate::repository::DbContext;
use crate::services::GradingService;
use crate::storage::UploadStore;

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub db: DbContext,
    pub auth: AuthService,
    pub grading: GradingService,
    pub uploads: UploadStore,
    pub max_upload_bytes: usize,
}

impl AppState {
    /// State backed by poppler and the configured Gemini endpoint.
    pub fn new(settings: &Settings) -> anyhow::Result<Self> {
        let transport = Arc::new(GeminiClient::new(&settings.gemini)?);
        if !transport.is_configured() {
            tracing::warn!("No Gemini API key configured; OCR and evaluation will report errors");
        }

        Ok(Self::with_services(
            settings,
            settings.create_db_context(),
            Arc::new(PopplerRenderer::new()),
            transport,
        ))
    }

    /// State with explicit PDF and model backends.
    pub fn with_services(
        settings: &Settings,
        db: DbContext,
        renderer: Arc<dyn PdfRenderer>,
        transport: Arc<dyn GenerateContent>,
    ) -> Self {
        Self {
            auth: AuthService::new(db.clone(), &settings.admin_email),
            grading: GradingService::new(renderer, transport, settings.gemini.clone()),
            uploads: UploadStore::new(&settings.upload_dir),
            max_upload_bytes: settings.max_upload_bytes,
            db,
        }
    }
}

/// Start the web server.
pub async fn serve(settings: &Settings, host: &str, port: u16) -> anyhow::Result<()> {
    settings.ensure_directories()?;
    let state = AppState::new(settings)?;
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
