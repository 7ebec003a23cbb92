//! HTTP server integration for pagewright.
//!
//! [`PagewrightApp`] turns a [`Renderer`] into an Axum router: every GET path
//! is rendered through the pipeline, and `/assets/*` is served from the
//! template directory.
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use pagewright_core::Settings;
//! use pagewright_http::InMemoryContentApi;
//! use pagewright_server::PagewrightApp;
//! use pagewright_template::Renderer;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = Settings::default();
//! let renderer = Renderer::new(settings, Arc::new(InMemoryContentApi::new()));
//! let app = PagewrightApp::new(renderer);
//!
//! app.run("127.0.0.1:9000").await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use http::Uri;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use pagewright_core::{PagewrightError, PagewrightResult, Settings};
use pagewright_http::ForwardedParams;
use pagewright_template::Renderer;

use crate::response;

/// The pagewright web application.
#[derive(Debug, Clone)]
pub struct PagewrightApp {
    renderer: Arc<Renderer>,
}

impl PagewrightApp {
    /// Creates an application around a renderer.
    pub fn new(renderer: Renderer) -> Self {
        Self {
            renderer: Arc::new(renderer),
        }
    }

    /// Creates an application talking to `settings.site_url`.
    ///
    /// # Errors
    ///
    /// Fails if no site URL is configured.
    pub fn from_settings(settings: Settings) -> PagewrightResult<Self> {
        Ok(Self::new(Renderer::from_settings(settings)?))
    }

    /// Returns the application settings.
    pub fn settings(&self) -> &Settings {
        self.renderer.settings()
    }

    /// Returns the renderer.
    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    /// Converts the application into an Axum router.
    pub fn into_axum_router(self) -> axum::Router {
        let assets = ServeDir::new(self.renderer.source().assets_dir());

        axum::Router::new()
            .nest_service("/assets", assets)
            .route("/", get(render_path))
            .route("/{*path}", get(render_path))
            .with_state(self.renderer)
            .layer(TraceLayer::new_for_http())
    }

    /// Serves the application on `addr` until the process stops.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound or the server fails.
    pub async fn run(self, addr: &str) -> PagewrightResult<()> {
        let router = self.into_axum_router();
        let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
            PagewrightError::Configuration(format!("Failed to bind to {addr}: {e}"))
        })?;

        tracing::info!("Serving pagewright at http://{addr}/");

        axum::serve(listener, router).await?;
        Ok(())
    }
}

async fn render_path(State(renderer): State<Arc<Renderer>>, uri: Uri) -> Response {
    let params = ForwardedParams::from_query(uri.query());
    match renderer.render(uri.path(), &params).await {
        Ok(rendered) => response::rendered(rendered),
        Err(e) => {
            tracing::error!(path = uri.path(), status = e.status_code(), error = %e, "render failed");
            response::error_page(&e, renderer.settings().debug)
        }
    }
}
