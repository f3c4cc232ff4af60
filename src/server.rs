//! HTTP layer: application context, router assembly, error responses and
//! shutdown.

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::{Value, json};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::{
    error::{Error, Result},
    node::NodeManager,
    resource::DocumentResource,
    service_index::ServiceIndex,
};

pub const JSON_UTF8: &str = "application/json; charset=utf-8";

/// Path of the service directory.
pub const SERVICE_INDEX_PATH: &str = "/api";

/// Largest request body accepted unless configured otherwise (256 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 256 * 1024 * 1024;

/// Router settings that are not tied to one resource.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Served for every path no route claims.
    pub static_dir: Option<PathBuf>,
    /// Request body limit; bulk imports are bounded by it.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            static_dir: None,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// State shared by every request handler.
#[derive(Debug, Clone)]
pub struct AppContext {
    pub node: Arc<NodeManager>,
    pub services: Arc<ServiceIndex>,
}

impl AppContext {
    pub fn new(node: Arc<NodeManager>) -> Self {
        Self {
            node,
            services: Arc::new(ServiceIndex::new()),
        }
    }
}

/// Assemble the full application: the service directory, every resource's
/// routes and, when given, static files for everything else.
pub fn build_router(
    ctx: AppContext,
    resources: Vec<DocumentResource>,
    config: &ServerConfig,
) -> Result<Router> {
    let mut router: Router<AppContext> =
        Router::new().route(SERVICE_INDEX_PATH, get(service_index_handler));

    for resource in resources {
        router = router.merge(resource.router(ctx.clone())?);
    }

    if let Some(dir) = &config.static_dir {
        if !dir.is_dir() {
            tracing::warn!(
                "static directory {} does not exist",
                dir.display()
            );
        }
        router = router.fallback_service(ServeDir::new(dir));
    }

    Ok(router
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(ctx))
}

async fn service_index_handler(
    State(ctx): State<AppContext>,
) -> Result<Response> {
    let index = ctx.services.render_index()?;
    Ok(json_response(StatusCode::OK, &index))
}

/// A JSON body with an explicit UTF-8 charset.
pub fn json_response(status: StatusCode, body: &Value) -> Response {
    (status, [(header::CONTENT_TYPE, JSON_UTF8)], body.to_string())
        .into_response()
}

impl Error {
    pub fn status(&self) -> StatusCode {
        if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else if matches!(self, Error::NodeNotRunning) {
            StatusCode::SERVICE_UNAVAILABLE
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("request failed: {self}");
        } else {
            tracing::debug!("rejected request: {self}");
        }

        let mut body = json!({
            "error": self.kind(),
            "message": self.to_string(),
        });
        if let Error::ImportRejected { failures } = &self {
            body["failures"] = json!(failures);
        }
        json_response(status, &body)
    }
}

/// Resolves on Ctrl-C or SIGTERM. From then on the process has `grace` to
/// finish; after that it halts regardless.
pub async fn shutdown_signal(grace: Duration) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(
            tokio::signal::unix::SignalKind::terminate(),
        ) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown requested, halting within {grace:?}");
    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        tracing::warn!("grace period elapsed, halting now");
        std::process::exit(0);
    });
}
