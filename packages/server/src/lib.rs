#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for paperwright.
//!
//! Every component (`paperwright_llm`, `paperwright_prompts`,
//! `paperwright_vectorstore`, `paperwright_summaries`,
//! `paperwright_tagging`, `paperwright_rag`, `paperwright_research`,
//! `paperwright_recommender`, `paperwright_jobs`) is wired behind one
//! shared [`AppState`] that every handler reads from `web::Data`.
//!
//! Authentication is a documented simplification: the
//! `Authorization: Bearer <user_id>` header is trusted as already
//! validated by whatever edge proxy terminates real auth, and its value
//! is parsed directly as the acting user's id.

pub mod handlers;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpRequest, HttpServer, error::ResponseError, http::StatusCode, middleware, web};
use paperwright_database::DbError;
use paperwright_jobs::JobRegistry;
use paperwright_llm::ProviderError;
use paperwright_llm::gateway::{Gateway, GatewayError};
use paperwright_prompts::PromptError;
use paperwright_rag::RagError;
use paperwright_rag::tools::{HttpWebTools, WebTools};
use paperwright_recommender::RecommenderError;
use paperwright_research::ResearchError;
use paperwright_summaries::SummaryError;
use paperwright_tagging::TaggingError;
use paperwright_vectorstore::embedder::{Embedder, EmbedError, OpenAiEmbedder};
use paperwright_vectorstore::{VectorStore, VectorStoreError};
use serde::Serialize;
use switchy_database::Database;
use thiserror::Error;

/// Shared application state holding every component handle a request
/// handler might need.
pub struct AppState {
    pub db: Arc<dyn Database>,
    pub gateway: Gateway,
    pub vector_store: Arc<dyn VectorStore>,
    pub embedder: Arc<dyn Embedder>,
    pub web_tools: Arc<dyn WebTools>,
    pub jobs: Arc<JobRegistry>,
}

impl AppState {
    /// Builds application state from already-constructed component
    /// handles.
    #[must_use]
    pub fn new(
        db: Arc<dyn Database>,
        gateway: Gateway,
        vector_store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        web_tools: Arc<dyn WebTools>,
    ) -> Self {
        Self {
            db,
            gateway,
            vector_store,
            embedder,
            web_tools,
            jobs: Arc::new(JobRegistry::new()),
        }
    }

    /// Builds application state from environment variables: `DATABASE_URL`
    /// for the core database, the LLM gateway's provider variables
    /// (`paperwright_llm::gateway::Gateway::from_env`), and the vector
    /// store / embedder / web-tools variables each component reads in its
    /// own `from_env`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if any required environment variable is
    /// missing or a component fails to initialize.
    pub async fn from_env() -> Result<Self, ApiError> {
        let db = paperwright_database::db::connect_from_env().await?;
        paperwright_database::run_migrations(db.as_ref()).await?;

        let gateway = Gateway::from_env()?;
        let vector_store = build_vector_store()?;
        let embedder: Arc<dyn Embedder> = Arc::new(OpenAiEmbedder::from_env()?);
        let web_tools: Arc<dyn WebTools> = Arc::new(HttpWebTools::from_env());

        Ok(Self::new(Arc::from(db), gateway, vector_store, embedder, web_tools))
    }
}

/// Chooses the vector store backend: the managed `CloudStore` if
/// `PAPERWRIGHT_VECTORSTORE_URL` is configured, else a local
/// `EmbeddedStore` rooted at `PAPERWRIGHT_VECTORSTORE_PATH` (default
/// `data/vectors.json`) — the same "managed service, else local file"
/// split `paperwright_vectorstore` itself models between `cloud.rs` and
/// `embedded.rs`.
fn build_vector_store() -> Result<Arc<dyn VectorStore>, ApiError> {
    if std::env::var("PAPERWRIGHT_VECTORSTORE_URL").is_ok() {
        let store = paperwright_vectorstore::cloud::CloudStore::from_env()?;
        Ok(Arc::new(store))
    } else {
        let path = std::env::var("PAPERWRIGHT_VECTORSTORE_PATH").unwrap_or_else(|_| "data/vectors.json".to_string());
        let store = paperwright_vectorstore::embedded::EmbeddedStore::open(path)?;
        Ok(Arc::new(store))
    }
}

/// The authenticated actor for one request, extracted from the trusted
/// bearer header.
pub struct Actor {
    pub user_id: i64,
}

impl Actor {
    /// Extracts the actor from `Authorization: Bearer <user_id>`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] if the header is missing or its
    /// value does not parse as an integer user id.
    pub fn from_request(req: &HttpRequest) -> Result<Self, ApiError> {
        let header = req
            .headers()
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;
        let user_id = header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::Unauthorized)?
            .trim()
            .parse::<i64>()
            .map_err(|_| ApiError::Unauthorized)?;
        Ok(Self { user_id })
    }
}

/// Top-level error type every handler converges to, so `actix-web` can
/// render the uniform `{error: {kind, message}}` envelope
/// regardless of which component failed.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Database(#[from] DbError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    VectorStore(#[from] VectorStoreError),

    #[error(transparent)]
    Embed(#[from] EmbedError),

    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error(transparent)]
    Summary(#[from] SummaryError),

    #[error(transparent)]
    Tagging(#[from] TaggingError),

    #[error(transparent)]
    Rag(#[from] RagError),

    #[error(transparent)]
    Research(#[from] ResearchError),

    #[error(transparent)]
    Recommender(#[from] RecommenderError),
}

impl ApiError {
    const fn kind(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::NotFound(_) => "not_found",
            Self::BadRequest(_) => "bad_request",
            Self::Database(_) => "database_error",
            Self::Provider(_) => "provider_error",
            Self::Gateway(_) => "gateway_error",
            Self::VectorStore(_) => "vector_store_error",
            Self::Embed(_) => "embed_error",
            Self::Prompt(_) => "prompt_error",
            Self::Summary(_) => "summary_error",
            Self::Tagging(_) => "tagging_error",
            Self::Rag(_) => "rag_error",
            Self::Research(_) => "research_error",
            Self::Recommender(_) => "recommender_error",
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    kind: &'static str,
    message: String,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) | Self::Database(DbError::NotFound { .. }) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> actix_web::HttpResponse {
        log::error!("request failed: {self}");
        actix_web::HttpResponse::build(self.status_code()).json(ErrorBody {
            error: ErrorDetail {
                kind: self.kind(),
                message: self.to_string(),
            },
        })
    }
}

/// Mounts every `/api` route onto `cfg` under a single
/// `web::scope("/api")`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/me", web::get().to(handlers::me))
            .route("/me/character", web::post().to(handlers::set_character))
            .route("/papers/check_duplications", web::get().to(handlers::check_duplications))
            .route("/papers/check_existing_summary", web::post().to(handlers::check_existing_summary))
            .route("/papers/import_from_arxiv", web::post().to(handlers::import_from_arxiv))
            .route("/papers/recommend", web::get().to(handlers::recommend))
            .route("/papers/{paper_id}/summaries/generate", web::post().to(handlers::generate_single_summary))
            .route("/papers/summaries/generate_bulk", web::post().to(handlers::generate_multiple_summaries_parallel))
            .route(
                "/auth/character-selection-bulk-update-progress",
                web::get().to(handlers::bulk_progress),
            )
            .route("/research/start", web::post().to(handlers::deepresearch_start))
            .route("/research/{session_id}/status", web::get().to(handlers::research_status))
            .route("/rag/query", web::post().to(handlers::rag_query))
            .route("/rag/start_async", web::post().to(handlers::deeprag_start))
            .route("/rag/{session_id}/status", web::get().to(handlers::rag_status)),
    );
}

/// Runs the HTTP server bound to `BIND_ADDR`/`PORT` (defaults
/// `127.0.0.1:8080`).
///
/// # Errors
///
/// Returns an I/O error if the listener cannot bind.
pub async fn run_server(state: AppState) -> std::io::Result<()> {
    let state = web::Data::new(state);

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT").ok().and_then(|p| p.parse().ok()).unwrap_or(8080);

    log::info!("Starting paperwright server on {bind_addr}:{port}");

    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((bind_addr, port))?
    .run()
    .await
}
