//! HTTP server for xbridge
//!
//! Provides a REST API for all bridge operations with complete parity
//! with the CLI and MCP interfaces. Operation routes are generated from
//! operation metadata; the only hand-written routes are the health probe
//! and the OAuth callback the platform redirects back to.

use crate::config::{Config, HttpConfig};
use crate::constants::{HTTP_PATH_AUTH_CALLBACK, HTTP_PATH_HEALTH};
use crate::core::{Dependencies, OperationRegistry};
use crate::error::{AuthError, StorageError};
use crate::{Result, XBridgeError};
use axum::{
    Router,
    extract::{Json, Query},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    LatencyUnit,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

/// Error type for HTTP handlers with enhanced error details
#[derive(Debug)]
pub struct AppError(XBridgeError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self.0 {
            XBridgeError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "validation_error", msg.clone())
            }
            XBridgeError::Auth(e) => match e {
                AuthError::InvalidOrExpiredState => {
                    (StatusCode::BAD_REQUEST, "auth_error", e.to_string())
                }
                AuthError::CredentialNotFound(_) => {
                    (StatusCode::NOT_FOUND, "not_found", e.to_string())
                }
                AuthError::RefreshFailed(_) => {
                    (StatusCode::UNAUTHORIZED, "auth_error", e.to_string())
                }
                AuthError::TokenExchangeFailed { .. }
                | AuthError::IdentityResolutionFailed(_) => {
                    (StatusCode::BAD_GATEWAY, "auth_error", e.to_string())
                }
            },
            XBridgeError::Storage(e) => match e {
                StorageError::NotFound(what) => {
                    (StatusCode::NOT_FOUND, "not_found", what.clone())
                }
                _ => {
                    // Log full error details internally
                    tracing::error!("Storage error: {:?}", e);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "storage_error",
                        "An internal storage error occurred".to_string(),
                    )
                }
            },
            XBridgeError::Platform { .. } => {
                (StatusCode::BAD_GATEWAY, "platform_error", self.0.to_string())
            }
            XBridgeError::RateLimited { .. } => (
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limited",
                self.0.to_string(),
            ),
            XBridgeError::Network(e) => {
                // Log full error details internally
                tracing::error!("Network error: {:?}", e);
                (
                    StatusCode::BAD_GATEWAY,
                    "network_error",
                    "A network error occurred".to_string(),
                )
            }
            XBridgeError::Mcp(msg) => (StatusCode::BAD_GATEWAY, "mcp_error", msg.clone()),
            XBridgeError::Config(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "config_error", msg.clone())
            }
            _ => {
                // Log full error details internally
                tracing::error!("Internal error: {:?}", self.0);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        // Log the sanitized error response
        tracing::debug!(
            error_type = error_type,
            status = %status,
            message = %message,
            "HTTP request error response"
        );

        let body = json!({
            "error": {
                "type": error_type,
                "message": message,
                "status": status.as_u16(),
            }
        });

        (status, Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<XBridgeError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

/// Start the HTTP server
pub async fn start_server(config: Config) -> Result<()> {
    // Ensure HTTP config exists (use defaults if not provided)
    let http_config = config.http.as_ref().cloned().unwrap_or_else(|| HttpConfig {
        host: crate::constants::DEFAULT_HOST.to_string(),
        port: crate::constants::DEFAULT_HTTP_PORT,
        mcp_port: crate::constants::DEFAULT_MCP_PORT,
        allowed_origins: None,
    });

    // Use centralized dependency creation from core module
    let dependencies = crate::core::create_dependencies(&config).await?;
    let registry = Arc::new(OperationRegistry::new(dependencies));

    let app = build_router(registry, &http_config);

    // Determine bind address
    let addr = format!("{}:{}", http_config.host, http_config.port);
    let socket_addr: SocketAddr = addr
        .parse()
        .map_err(|e| XBridgeError::config(format!("Invalid address {}: {}", addr, e)))?;

    tracing::info!("Starting HTTP server on {}", socket_addr);

    let listener = tokio::net::TcpListener::bind(socket_addr).await?;
    axum::serve(listener, app)
        .await
        .map_err(|e| XBridgeError::config(format!("Server error: {}", e)))?;

    Ok(())
}

/// Auto-generate routes from operation metadata using macro-generated
/// registration functions
fn build_operation_routes(deps: Arc<Dependencies>) -> Router {
    // Use generated registration functions from each operation group
    // These functions call the http_route() method on each operation
    Router::new()
        .merge(crate::core::accounts::accounts::register_http_routes(
            deps.clone(),
        ))
        .merge(crate::core::auth::auth::register_http_routes(deps.clone()))
        .merge(crate::core::tweets::tweets::register_http_routes(
            deps.clone(),
        ))
        .merge(crate::core::users::users::register_http_routes(
            deps.clone(),
        ))
        .merge(crate::core::timeline::timeline::register_http_routes(deps))
}

/// Build the router with all endpoints
///
/// The MCP Streamable HTTP endpoint is mounted alongside the REST routes so
/// `xbridge serve` exposes both surfaces on one port.
pub fn build_router(registry: Arc<OperationRegistry>, http_config: &HttpConfig) -> Router {
    let deps = registry.get_dependencies();

    let app_routes = Router::new()
        .route(HTTP_PATH_HEALTH, get(health_handler))
        .merge(build_operation_routes(deps.clone()))
        .merge(callback_routes(deps));

    Router::new()
        .merge(app_routes)
        .merge(crate::mcp::create_mcp_routes(registry))
        // Add comprehensive middleware stack
        .layer(
            ServiceBuilder::new()
                // Tracing layer for request/response logging
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().include_headers(true))
                        .on_response(
                            DefaultOnResponse::new()
                                .level(tracing::Level::INFO)
                                .latency_unit(LatencyUnit::Micros),
                        ),
                )
                // CORS layer for cross-origin requests (restrictive policy)
                .layer(cors_layer(http_config)),
        )
}

fn cors_layer(http_config: &HttpConfig) -> CorsLayer {
    // Origins from config, falling back to localhost on the configured port
    let origins: Vec<axum::http::HeaderValue> = match &http_config.allowed_origins {
        Some(configured) => configured
            .iter()
            .filter_map(|origin| {
                // An origin must be a real URL; HeaderValue alone accepts
                // nearly any ASCII string
                match url::Url::parse(origin).ok().and_then(|_| origin.parse().ok()) {
                    Some(value) => Some(value),
                    None => {
                        tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                        None
                    }
                }
            })
            .collect(),
        None => vec![
            format!("http://localhost:{}", http_config.port)
                .parse()
                .expect("valid header value"),
            format!("http://127.0.0.1:{}", http_config.port)
                .parse()
                .expect("valid header value"),
        ],
    };

    CorsLayer::new()
        .allow_origin(origins)
        // Only allow necessary HTTP methods
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PATCH,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ])
        // Only allow necessary headers
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
            axum::http::header::HeaderName::from_static("x-requested-with"),
        ])
        .allow_credentials(true)
}

// ============================================================================
// OAUTH CALLBACK (The platform redirects the browser here after consent)
// ============================================================================

/// Query parameters the platform appends to the redirect URI
#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

fn callback_routes(deps: Arc<Dependencies>) -> Router {
    Router::new().route(
        HTTP_PATH_AUTH_CALLBACK,
        get(move |Query(params): Query<CallbackParams>| {
            let deps = deps.clone();
            async move { auth_callback(deps, params).await }
        }),
    )
}

/// Complete the pending authorization identified by the `state` parameter
/// and show the user a minimal confirmation page.
///
/// A platform `error` parameter (user denied consent) renders the failure
/// page without touching the authorization manager, so the pending entry
/// stays valid until its TTL runs out.
async fn auth_callback(
    deps: Arc<Dependencies>,
    params: CallbackParams,
) -> (StatusCode, Html<String>) {
    if let Some(error) = params.error {
        let detail = params
            .error_description
            .unwrap_or_else(|| "The authorization was not granted.".to_string());
        tracing::warn!("Authorization callback returned error: {}", error);
        return (
            StatusCode::BAD_REQUEST,
            Html(callback_page(
                "Authorization Failed",
                &format!("{}: {}", error, detail),
            )),
        );
    }

    let (Some(code), Some(state)) = (params.code, params.state) else {
        return (
            StatusCode::BAD_REQUEST,
            Html(callback_page(
                "Authorization Failed",
                "Missing code or state parameter in the callback.",
            )),
        );
    };

    match deps.oauth.complete_authorization(&state, &code).await {
        Ok(outcome) => {
            let detail = format!(
                "Account @{} is now connected{}.",
                outcome.username,
                outcome
                    .display_name
                    .map(|name| format!(" ({})", name))
                    .unwrap_or_default()
            );
            (
                StatusCode::OK,
                Html(callback_page("Authorization Complete", &detail)),
            )
        }
        Err(e) => {
            tracing::warn!("Authorization callback failed: {}", e);
            (
                StatusCode::BAD_REQUEST,
                Html(callback_page("Authorization Failed", &e.to_string())),
            )
        }
    }
}

/// Inline confirmation page, intentionally free of any template engine
fn callback_page(title: &str, detail: &str) -> String {
    format!(
        "<!DOCTYPE html>\n\
         <html>\n\
         <head><meta charset=\"utf-8\"><title>{title}</title></head>\n\
         <body style=\"font-family: sans-serif; text-align: center; padding-top: 4rem;\">\n\
         <h1>{title}</h1>\n\
         <p>{detail}</p>\n\
         <p>You can close this window.</p>\n\
         </body>\n\
         </html>\n"
    )
}

// ============================================================================
// SYSTEM HANDLERS (Special cases not in operation registry)
// ============================================================================

async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
