//! HTTP tool server.
//!
//! Serves the tools of a [`ToolRegistry`] as a JSON HTTP API for agents.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/tools/list` | List all registered tools with schemas |
//! | `POST` | `/tools/{name}` | Call a registered tool by name |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "search_sections: invalid query: k must be at least 1, got 0" } }
//! ```
//!
//! | Code | Status | Raised for |
//! |------|--------|------------|
//! | `bad_request` | 400 | schema violations, [`IndexError::InvalidQuery`] |
//! | `not_found` | 404 | unknown tool, [`IndexError::IndexNotFound`], [`IndexError::SectionNotFound`] |
//! | `configuration` | 500 | [`IndexError::Configuration`] |
//! | `backend_error` | 502 | [`IndexError::Backend`] |
//! | `tool_error` | 500 | anything else |
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::error::IndexError;
use crate::traits::{validate_params, ToolContext, ToolInfo, ToolRegistry};

#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    tools: Arc<ToolRegistry>,
}

/// Build the router for `config` and `tools`, for embedding the tool API
/// in another axum app.
pub fn router(config: Arc<Config>, tools: Arc<ToolRegistry>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/tools/list", get(handle_list_tools))
        .route("/tools/{name}", post(handle_tool_call))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(AppState { config, tools })
}

/// Serve the built-in tools on `[server].bind` until the process exits.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    run_server_with_tools(config, ToolRegistry::with_builtins()).await
}

/// Serve a custom registry, e.g. the built-ins plus extra Rust tools.
pub async fn run_server_with_tools(config: &Config, tools: ToolRegistry) -> anyhow::Result<()> {
    // Fail at startup rather than on the first call.
    let address = config.index.address()?;
    let bind_addr = config.server.bind.clone();

    println!("Registered {} tools:", tools.len());
    for t in tools.tools() {
        println!("  POST /tools/{}  {}", t.name(), t.description());
    }
    println!(
        "Serving collection '{}' from {}",
        address.collection,
        address.db_path().display()
    );

    let app = router(Arc::new(config.clone()), Arc::new(tools));

    println!("Tool server listening on http://{}", bind_addr);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn app_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> AppError {
    AppError {
        status,
        code,
        message: message.into(),
    }
}

fn classify_tool_error(tool_name: &str, err: anyhow::Error) -> AppError {
    let message = format!("{}: {}", tool_name, err);
    let (status, code) = match err.downcast_ref::<IndexError>() {
        Some(IndexError::InvalidQuery(_)) => (StatusCode::BAD_REQUEST, "bad_request"),
        Some(IndexError::IndexNotFound { .. }) | Some(IndexError::SectionNotFound(_)) => {
            (StatusCode::NOT_FOUND, "not_found")
        }
        Some(IndexError::Configuration(_)) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "configuration")
        }
        Some(IndexError::Backend { .. }) => (StatusCode::BAD_GATEWAY, "backend_error"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "tool_error"),
    };
    app_error(status, code, message)
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /tools/list ============

#[derive(Serialize)]
struct ToolListResponse {
    tools: Vec<ToolInfo>,
}

async fn handle_list_tools(State(state): State<AppState>) -> Json<ToolListResponse> {
    Json(ToolListResponse {
        tools: state.tools.infos(),
    })
}

// ============ POST /tools/{name} ============

async fn handle_tool_call(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(params): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>, AppError> {
    let tool = state.tools.find(&name).ok_or_else(|| {
        app_error(
            StatusCode::NOT_FOUND,
            "not_found",
            format!("no tool registered with name: {}", name),
        )
    })?;

    let validated_params = validate_params(&tool.parameters_schema(), &params)
        .map_err(|e| app_error(StatusCode::BAD_REQUEST, "bad_request", e.to_string()))?;

    let ctx = ToolContext::new(state.config.clone());
    let result = tool
        .execute(validated_params, &ctx)
        .await
        .map_err(|e| classify_tool_error(&name, e))?;

    Ok(Json(serde_json::json!({ "result": result })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn classify(err: IndexError) -> (StatusCode, &'static str) {
        let e = classify_tool_error("t", err.into());
        (e.status, e.code)
    }

    #[test]
    fn errors_map_to_codes() {
        assert_eq!(
            classify(IndexError::InvalidQuery("k".into())),
            (StatusCode::BAD_REQUEST, "bad_request")
        );
        assert_eq!(
            classify(IndexError::IndexNotFound {
                collection: "slpc".into(),
                location: PathBuf::from("/tmp"),
            }),
            (StatusCode::NOT_FOUND, "not_found")
        );
        assert_eq!(
            classify(IndexError::SectionNotFound(7)),
            (StatusCode::NOT_FOUND, "not_found")
        );
        assert_eq!(
            classify(IndexError::Configuration("x".into())),
            (StatusCode::INTERNAL_SERVER_ERROR, "configuration")
        );
        assert_eq!(
            classify(IndexError::backend("openai", "429")),
            (StatusCode::BAD_GATEWAY, "backend_error")
        );
    }

    #[test]
    fn untyped_errors_are_tool_errors() {
        let e = classify_tool_error("t", anyhow::anyhow!("boom"));
        assert_eq!(e.code, "tool_error");
        assert_eq!(e.message, "t: boom");
    }
}
