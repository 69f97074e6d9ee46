//! HTTP API server for the voice gateway

pub mod health;
pub mod rate_limit;
pub mod translate;
pub mod voice;

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::voice::{CaptureThresholds, Language, SpeechPipeline};
use crate::{Config, Result};

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    /// Speech pipeline, absent when no backend key is configured
    pub pipeline: Option<SpeechPipeline>,
    pub default_language: Language,
    /// Size check applied to uploaded recordings
    pub capture: CaptureThresholds,
    pub rate_limiter: Option<rate_limit::SharedLimiter>,
}

/// Configuration for building an API server
pub struct ApiServerBuilder {
    port: u16,
    pipeline: Option<SpeechPipeline>,
    default_language: Language,
    capture: CaptureThresholds,
    static_dir: Option<PathBuf>,
    rate_limit_rpm: Option<u32>,
}

impl ApiServerBuilder {
    /// Create a new API server builder
    #[must_use]
    pub fn new(port: u16) -> Self {
        Self {
            port,
            pipeline: None,
            default_language: Language::Twi,
            capture: CaptureThresholds::default(),
            static_dir: None,
            rate_limit_rpm: None,
        }
    }

    /// Builder populated from loaded configuration
    ///
    /// # Errors
    ///
    /// Returns error if the speech backend client cannot be created
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(config.server.port)
            .pipeline(config.speech_pipeline()?)
            .default_language(config.default_language)
            .capture(config.capture)
            .static_dir(config.server.static_dir.clone())
            .rate_limit_rpm(config.server.rate_limit_rpm))
    }

    /// Set the speech pipeline
    #[must_use]
    pub fn pipeline(mut self, pipeline: Option<SpeechPipeline>) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Set the language used when a request names none
    #[must_use]
    pub const fn default_language(mut self, language: Language) -> Self {
        self.default_language = language;
        self
    }

    /// Set the thresholds uploaded recordings must meet
    #[must_use]
    pub const fn capture(mut self, thresholds: CaptureThresholds) -> Self {
        self.capture = thresholds;
        self
    }

    /// Set the static files directory for serving the web UI
    #[must_use]
    pub fn static_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.static_dir = dir;
        self
    }

    /// Enable global rate limiting
    #[must_use]
    pub const fn rate_limit_rpm(mut self, rpm: Option<u32>) -> Self {
        self.rate_limit_rpm = rpm;
        self
    }

    /// Build the API server
    #[must_use]
    pub fn build(self) -> ApiServer {
        let state = Arc::new(ApiState {
            pipeline: self.pipeline,
            default_language: self.default_language,
            capture: self.capture,
            rate_limiter: self.rate_limit_rpm.map(rate_limit::create_limiter),
        });

        ApiServer {
            state,
            port: self.port,
            static_dir: self.static_dir,
        }
    }
}

/// API server
pub struct ApiServer {
    state: Arc<ApiState>,
    port: u16,
    static_dir: Option<PathBuf>,
}

impl ApiServer {
    /// Build the router with all routes
    #[must_use]
    pub fn router(&self) -> Router {
        let mut router = Router::new()
            .nest("/api/voice", voice::router(self.state.clone()))
            .merge(translate::router(self.state.clone()))
            .merge(health::router());

        // Serve static files if configured
        if let Some(static_dir) = &self.static_dir {
            let index_file = static_dir.join("index.html");
            let serve_dir =
                ServeDir::new(static_dir).not_found_service(ServeFile::new(&index_file));

            router = router.fallback_service(serve_dir);
            tracing::info!(path = %static_dir.display(), "serving static files");
        }

        let router = router.layer(axum::middleware::from_fn_with_state(
            self.state.clone(),
            rate_limit::rate_limit_middleware,
        ));

        // CORS layer for cross-origin requests from frontend
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
            .expose_headers([voice::FAILED_CHUNKS_HEADER]);

        router.layer(cors).layer(TraceLayer::new_for_http())
    }

    /// Run the API server
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        if self.state.pipeline.is_none() {
            tracing::warn!("no speech backend configured, voice endpoints will return 503");
        }
        if self.state.rate_limiter.is_some() {
            tracing::info!("rate limiting active");
        }

        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr).await?;

        tracing::info!(port = self.port, "API server listening");

        axum::serve(listener, self.router()).await?;

        Ok(())
    }

    /// Run the API server in a background task
    #[must_use]
    pub fn spawn(self) -> tokio::task::JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run().await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn run_reports_port_in_use_as_io_error() {
        let taken = TcpListener::bind("0.0.0.0:0").await.unwrap();
        let port = taken.local_addr().unwrap().port();

        let err = ApiServerBuilder::new(port).build().run().await.unwrap_err();
        assert!(matches!(err, crate::Error::Io(_)), "got {err:?}");
    }
}
