pub mod config;
pub mod error;
pub mod mongo;
pub mod routes;

use std::time::Duration;

use attendance_utils::store::EventStore;
use axum::{
    Router,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::{
    LatencyUnit,
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::{config::AppState, error::Error};

pub fn app<S>(state: AppState<S>) -> Router
where
    S: EventStore + Clone + 'static,
{
    Router::new()
        .route("/status/ping", get(routes::get_status_ping))
        .route("/authenticate", post(routes::post_authenticate::<S>))
        .route("/events", post(routes::post_events::<S>))
        .route("/events/logout", post(routes::post_logout::<S>))
        .route("/admin/events:clear", post(routes::post_clear_events::<S>))
        .route("/admin/students", get(routes::get_students::<S>))
        .with_state(state)
}

/// Timeout, body limit, CORS and request tracing
pub fn with_layers(router: Router, request_timeout: Duration, body_size_limit: usize) -> Router {
    router
        .layer(TimeoutLayer::new(request_timeout))
        .layer(middleware::map_response(timeout_response))
        .layer(RequestBodyLimitLayer::new(body_size_limit))
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .latency_unit(LatencyUnit::Micros),
                ),
        )
}

/// `TimeoutLayer` answers with an empty 408, give it the usual error body
async fn timeout_response(response: Response) -> Response {
    if response.status() == StatusCode::REQUEST_TIMEOUT {
        tracing::warn!("request timed out");
        Error::Server(StatusCode::REQUEST_TIMEOUT, "Request timed out.".to_string())
            .into_response()
    } else {
        response
    }
}
