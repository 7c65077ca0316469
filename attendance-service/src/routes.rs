use attendance_utils::{
    ingest::{self, EventPayload, LogoutPayload},
    report::{ReportRow, build_report},
    store::EventStore,
};
use axum::{
    Json, extract::State, extract::rejection::JsonRejection, http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use schema::UserIdentity;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    config::AppState,
    error::{Error, ResponseContext},
};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    fn data(data: T) -> Self {
        ApiResponse {
            success: true,
            message: None,
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    fn message(message: impl Into<String>) -> Self {
        ApiResponse {
            success: true,
            message: Some(message.into()),
            data: None,
        }
    }
}

#[derive(Deserialize)]
pub struct AuthenticateRequest {
    username: Option<String>,
    password: Option<String>,
}

pub async fn post_authenticate<S: EventStore>(
    State(state): State<AppState<S>>,
    payload: Result<Json<AuthenticateRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<UserIdentity>>, Error> {
    // Login does not read the store, but is gated on it like every other route
    state.store.connected()?;
    let Json(request) = payload?;

    let username = request.username.unwrap_or_default();
    let password = request.password.unwrap_or_default();
    let identity = state
        .directory
        .authenticate(&username, &password)
        .inspect_err(|_| warn!(username = %username, "failed login attempt"))?;

    info!(name = %identity.name, role = ?identity.role, "user authenticated");
    Ok(Json(ApiResponse::data(identity)))
}

pub async fn post_events<S: EventStore>(
    State(state): State<AppState<S>>,
    payload: Result<Json<EventPayload>, JsonRejection>,
) -> Result<Json<ApiResponse<()>>, Error> {
    let store = state.store.connected()?;
    let Json(payload) = payload?;

    ingest::record_event(store, payload, Utc::now())
        .await
        .response_context("Internal server error during event storage.")?;

    Ok(Json(ApiResponse::message("Event recorded.")))
}

pub async fn post_logout<S: EventStore>(
    State(state): State<AppState<S>>,
    payload: Result<Json<LogoutPayload>, JsonRejection>,
) -> Result<Json<ApiResponse<()>>, Error> {
    let store = state.store.connected()?;
    let Json(payload) = payload?;

    ingest::record_logout(store, payload, Utc::now())
        .await
        .response_context("Internal server error during logout event storage.")?;

    Ok(Json(ApiResponse::message("Logout event recorded.")))
}

/// Deletes every stored event. Not protected by any credential check.
pub async fn post_clear_events<S: EventStore>(
    State(state): State<AppState<S>>,
) -> Result<Json<ApiResponse<()>>, Error> {
    let store = state.store.connected()?;

    let deleted_count = store
        .clear()
        .await
        .response_context("Internal server error during database cleanup.")?;

    warn!(num = deleted_count, "cleared all attendance records");
    Ok(Json(ApiResponse::message(format!(
        "Cleared {deleted_count} records"
    ))))
}

pub async fn get_students<S: EventStore>(
    State(state): State<AppState<S>>,
) -> Result<Json<ApiResponse<Vec<ReportRow>>>, Error> {
    let store = state.store.connected()?;

    let report = build_report(
        state.directory.as_ref(),
        store,
        Utc::now(),
        &state.status_config,
    )
    .await
    .response_context("Failed to retrieve student data.")?;

    info!(num = report.len(), "admin report generated");
    Ok(Json(ApiResponse::data(report)))
}

pub async fn get_status_ping() -> impl IntoResponse {
    info!("Status");
    StatusCode::OK
}
