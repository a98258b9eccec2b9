//! # gemini-gateway: an HTTP front end for Gemini content generation
//!
//! `gemini-gateway` accepts a prompt, optionally with an image, document or audio file, forwards
//! it to Google's Generative Language API and returns the model's text in a uniform JSON
//! envelope. It also serves a small browser chat client and ships a command line client
//! (`gemini-chat`) that keeps a local transcript.
//!
//! ## Request Flow
//!
//! Each of the four endpoints under `/gemini-api` runs the same [`pipeline::Pipeline`]:
//!
//! 1. **Validate** ([`validation`]): the prompt must be present, and attachment endpoints need a
//!    file whose media type is on that endpoint's whitelist. Nothing touches disk before this.
//! 2. **Acquire** ([`attachments`]): the upload is written to the scratch directory.
//! 3. **Encode** ([`encoder`]): the stored bytes are read back and base64 encoded.
//! 4. **Dispatch** ([`gemini`]): prompt and inline data go to `generateContent`; the first text
//!    part of the first candidate is the answer.
//! 5. **Release**: the stored file is deleted, whatever happened in steps 3 and 4.
//!
//! Failures are rendered by [`errors::Error`] as `{"success": false, "error": ...}`: 400 for
//! validation problems, 500 for upstream failures and empty model output.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use gemini_gateway::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = gemini_gateway::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     gemini_gateway::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.

pub mod api;
pub mod attachments;
pub mod client;
pub mod config;
pub mod encoder;
pub mod errors;
pub mod gemini;
pub mod metrics;
pub mod openapi;
pub mod pipeline;
mod static_assets;
pub mod telemetry;
#[cfg(test)]
pub mod test_utils;
pub mod transcript;
pub mod types;
pub mod validation;

use crate::{
    attachments::LocalAttachmentStore,
    config::CorsOrigin,
    gemini::{Dispatcher, GeminiClient, GenerateContent},
    openapi::ApiDoc,
    pipeline::Pipeline,
    types::MediaKind,
};
use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::{self, HeaderValue, StatusCode},
    routing::{get, post},
};
use axum_prometheus::PrometheusMetricLayer;
use bon::Builder;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use config::Config;

/// Shared state handed to every handler
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub pipeline: Pipeline,
}

fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let origins = &config.cors.allowed_origins;

    // A literal "*" in an origin list is rejected by tower-http, so the wildcard wins outright
    let allow_origin = if origins.iter().any(|origin| matches!(origin, CorsOrigin::Wildcard)) {
        AllowOrigin::any()
    } else {
        let mut values = Vec::with_capacity(origins.len());
        for origin in origins {
            if let CorsOrigin::Url(url) = origin {
                values.push(url.origin().ascii_serialization().parse::<HeaderValue>()?);
            }
        }
        AllowOrigin::list(values)
    };

    let mut cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([http::Method::GET, http::Method::POST, http::Method::OPTIONS])
        .allow_headers(Any);

    if let Some(max_age) = config.cors.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router.
///
/// - `/gemini-api/*`: the generation endpoints, with the request body capped by the upload limit
/// - `/healthz`, `/openapi.json`, `/docs`
/// - `/internal/metrics` when metrics are enabled
/// - everything else: the embedded chat page
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    let api_routes = Router::new()
        .route(MediaKind::Text.route(), post(api::handlers::generate::generate_text))
        .route(MediaKind::Image.route(), post(api::handlers::generate::generate_from_image))
        .route(MediaKind::Document.route(), post(api::handlers::generate::generate_from_document))
        .route(MediaKind::Audio.route(), post(api::handlers::generate::generate_from_audio))
        .fallback(|| async { StatusCode::NOT_FOUND })
        .layer(DefaultBodyLimit::max(state.config.uploads.body_limit()))
        .with_state(state.clone());

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .route("/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .nest("/gemini-api", api_routes)
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .fallback(api::handlers::static_assets::serve_embedded_asset);

    let mut router = router.layer(create_cors_layer(&state.config)?);

    if state.config.enable_metrics {
        let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();
        router = router
            .route("/internal/metrics", get(|| async move { metric_handle.render() }))
            .layer(prometheus_layer);
    }

    let router = router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

pub struct Application {
    router: Router,
    config: Config,
}

impl Application {
    /// Create the application with a real Gemini client built from `config.gemini`
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let client = GeminiClient::new(&config.gemini)?;
        Self::with_client(config, Arc::new(client)).await
    }

    /// Create the application around any [`GenerateContent`] implementation
    pub async fn with_client(config: Config, client: Arc<dyn GenerateContent>) -> anyhow::Result<Self> {
        info!(
            model = %config.gemini.model,
            upload_dir = %config.uploads.dir.display(),
            max_file_size = config.uploads.max_file_size,
            "Starting gemini gateway"
        );

        let store = LocalAttachmentStore::create(&config.uploads.dir).await?;
        let dispatcher = Dispatcher::new(client, config.gemini.model.clone());
        let pipeline = Pipeline::new(Arc::new(store), dispatcher);

        let app_state = AppState::builder().config(config.clone()).pipeline(pipeline).build();
        let router = build_router(&app_state)?;

        Ok(Self { router, config })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "Gemini gateway listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}
