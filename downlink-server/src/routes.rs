//! Request routing and handlers. Everything here reads only from the
//! snapshot cache; no handler ever waits on the refresh machinery.

use axum::{
    Router,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::get,
};
use downlink_core::{FileMeta, SyncHandle};
use serde_json::json;
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};

use crate::errors::AppError;
use crate::{installer, platform};

/// The Windows build the PowerShell installer is pinned to.
const INSTALLER_PLATFORM: &str = "windows-386";

/// Shared state for request handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    pub sync: SyncHandle,
    pub source_url: String,
    pub artifact_prefix: String,
}

impl AppState {
    fn artifact_name(&self, platform: &str) -> String {
        format!("{}-{platform}.gz", self.artifact_prefix)
    }

    fn artifact_url(&self, name: &str, meta: &FileMeta) -> String {
        format!("{}/targets/{}.{name}", self.source_url, meta.sha512_hex())
    }
}

/// Builds the full application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/cli", get(redirect_guessed))
        .route("/cli/{platform}", get(redirect_explicit))
        .route("/cli.ps1", get(powershell_installer))
        .route("/refresh", get(trigger_refresh).post(trigger_refresh))
        .route("/healthz", get(health))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-cache"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn redirect_guessed(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    redirect_to(&state, &platform::guess(user_agent))
}

async fn redirect_explicit(
    State(state): State<AppState>,
    Path(platform): Path<String>,
) -> Response {
    // Platforms are exactly `os-arch`; anything else is not worth a lookup.
    if platform.matches('-').count() != 1 {
        return AppError::not_found("unknown platform").into_response();
    }
    redirect_to(&state, &platform)
}

fn redirect_to(state: &AppState, platform: &str) -> Response {
    let Some(snapshot) = state.sync.snapshot() else {
        return AppError::service_unavailable("snapshot not yet loaded").into_response();
    };
    let name = state.artifact_name(platform);
    let Some(meta) = snapshot.get(&name) else {
        return AppError::not_found("unknown target").into_response();
    };

    let url = state.artifact_url(&name, meta);
    match HeaderValue::from_str(&url) {
        Ok(location) => {
            (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
        }
        Err(_) => AppError::not_found("unknown target").into_response(),
    }
}

async fn powershell_installer(State(state): State<AppState>) -> Response {
    let Some(snapshot) = state.sync.snapshot() else {
        return AppError::service_unavailable("snapshot not yet loaded").into_response();
    };
    let name = state.artifact_name(INSTALLER_PLATFORM);
    let Some(meta) = snapshot.get(&name) else {
        return AppError::not_found("unknown target").into_response();
    };

    let script = installer::powershell(
        &state.artifact_url(&name, meta),
        &meta.sha512_hex(),
        &state.artifact_prefix,
    );
    (
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        )],
        script,
    )
        .into_response()
}

async fn trigger_refresh(State(state): State<AppState>) -> StatusCode {
    state.sync.request_refresh();
    StatusCode::NO_CONTENT
}

async fn health(State(state): State<AppState>) -> Response {
    match state.sync.snapshot() {
        Some(snapshot) => Json(json!({
            "status": "ok",
            "snapshot_version": snapshot.version(),
            "targets": snapshot.len(),
        }))
        .into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "loading" })),
        )
            .into_response(),
    }
}
