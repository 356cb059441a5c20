//! Router assembly and server lifecycle.

use axum::middleware::{from_fn, from_fn_with_state};
use axum::{
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{metrics::metrics_middleware, tracing::request_id_middleware};
use service_core::observability::REQUEST_ID_HEADER;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::config::HookConfig;
use crate::handlers;
use crate::middleware::hook_auth_middleware;
use crate::AppState;

pub fn build_router(state: AppState) -> Router {
    let hooks = Router::new()
        .route("/hooks/post-login", post(handlers::hooks::post_login))
        .route_layer(from_fn_with_state(state.clone(), hook_auth_middleware));

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics::metrics))
        .merge(hooks)
        .route_layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build clients and bind the listener; port 0 picks a free port.
    pub async fn build(config: HookConfig) -> Result<Self, AppError> {
        let state = AppState::from_config(&config)?;

        if config.decision.test_mode {
            tracing::warn!("Test mode enabled: client IPs are replaced for mock emails");
        }

        let addr = config.common.bind_address();
        let listener = TcpListener::bind(&addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(
            port,
            failure_policy = ?config.decision.risk_failure_policy,
            "Login risk hook listening"
        );

        Ok(Self {
            port,
            listener,
            router: build_router(state),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router).await
    }
}
