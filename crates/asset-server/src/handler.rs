//! HTTP request handlers for the asset API.
//!
//! Handlers only parse and scrub path parameters, call the [`AssetService`]
//! and encode the result; the service owns caching and database access.
//!
//! [`AssetService`]: asset_core::AssetService

use crate::server::AppState;
use asset_core::AssetError;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use regex::Regex;
use serde::Serialize;
use serde_json::json;
use std::sync::{Arc, LazyLock};
use tracing::{debug, error};

/// Anything that is not an ASCII word character.
static FORBIDDEN_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_]").unwrap());

/// Strip every non-word character from a path parameter.
pub fn scrub(s: &str) -> String {
    FORBIDDEN_CHARS.replace_all(s, "").into_owned()
}

/// Page number from a path segment; anything unparsable is the first page.
fn parse_page(raw: &str) -> u32 {
    raw.parse().unwrap_or(0)
}

/// Health check endpoint.
pub async fn handle_health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

/// `GET /api/1/suggest`: collection names to start searching from.
pub async fn handle_suggest_all(State(state): State<Arc<AppState>>) -> Response {
    match state.service.suggest_initial().await {
        Ok(results) => json_response(&results),
        Err(e) => error_response(&e),
    }
}

/// `GET /api/1/suggest/:page/:name`
pub async fn handle_suggest_name(
    State(state): State<Arc<AppState>>,
    Path((page, name)): Path<(String, String)>,
) -> Response {
    handle_suggest(&state, &name, "", "", &page).await
}

/// `GET /api/1/suggest/:page/:name/:class`
pub async fn handle_suggest_class(
    State(state): State<Arc<AppState>>,
    Path((page, name, class)): Path<(String, String, String)>,
) -> Response {
    handle_suggest(&state, &name, &class, "", &page).await
}

/// `GET /api/1/suggest/:page/:name/:class/:var`
pub async fn handle_suggest_subclass(
    State(state): State<Arc<AppState>>,
    Path((page, name, class, subclass)): Path<(String, String, String, String)>,
) -> Response {
    handle_suggest(&state, &name, &class, &subclass, &page).await
}

/// `GET /api/1/fetch/:name/:class/:var`
pub async fn handle_fetch_asset(
    State(state): State<Arc<AppState>>,
    Path((name, class, subclass)): Path<(String, String, String)>,
) -> Response {
    let (name, class, subclass) = (scrub(&name), scrub(&class), scrub(&subclass));
    debug!("Fetch {}/{}/{}", name, class, subclass);

    match state.service.asset_data(&name, &class, &subclass).await {
        Ok(data) => json_response(&data),
        Err(e) => error_response(&e),
    }
}

/// Shared body of the suggest-by-field handlers.
async fn handle_suggest(
    state: &AppState,
    name: &str,
    class: &str,
    subclass: &str,
    page: &str,
) -> Response {
    let (name, class, subclass) = (scrub(name), scrub(class), scrub(subclass));
    let page = parse_page(page);
    debug!("Suggest {}/{}/{} page {}", name, class, subclass, page);

    match state.service.matches(&name, &class, &subclass, page).await {
        Ok(matches) => json_response(&matches),
        Err(e) => error_response(&e),
    }
}

/// 200 with a JSON body the browser must not cache.
fn json_response<T: Serialize>(value: &T) -> Response {
    match serde_json::to_vec(value) {
        Ok(body) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "application/json"),
                (header::CACHE_CONTROL, "no-cache"),
            ],
            body,
        )
            .into_response(),
        Err(e) => error_response(&AssetError::from(e)),
    }
}

/// Plain-text error; underspecified queries are the caller's fault.
fn error_response(err: &AssetError) -> Response {
    error!("Request failed: {}", err);
    let status = if err.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, [(header::CONTENT_TYPE, "text/plain")], err.to_string()).into_response()
}
