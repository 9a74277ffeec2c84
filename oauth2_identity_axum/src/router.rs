//! Router for the login flow endpoints

use axum::{
    Router,
    routing::{delete, get, post},
};
use std::sync::Arc;
use tower_http::LatencyUnit;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use oauth2_identity::OAuthFlowController;

use super::handlers;

/// Create a router for the login flow endpoints
///
/// Mount it at the controller's `route_prefix`; the callback URL sent to
/// providers assumes that location. The endpoints are:
/// - `GET /{provider}/start?redirect=<path>`
/// - `GET /{provider}/callback`
/// - `POST /{provider}/link`
/// - `DELETE /{provider}/unlink`
/// - `GET /identities`
/// - `POST /logout`
pub fn oauth2_identity_router(controller: Arc<OAuthFlowController>) -> Router {
    oauth2_identity_router_no_trace(controller).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(
                DefaultOnResponse::new()
                    .level(Level::INFO)
                    .latency_unit(LatencyUnit::Millis),
            ),
    )
}

/// Same as [`oauth2_identity_router`] without the HTTP tracing middleware.
pub fn oauth2_identity_router_no_trace(controller: Arc<OAuthFlowController>) -> Router {
    Router::new()
        .route("/{provider}/start", get(handlers::start))
        .route("/{provider}/callback", get(handlers::callback))
        .route("/{provider}/link", post(handlers::link))
        .route("/{provider}/unlink", delete(handlers::unlink))
        .route("/identities", get(handlers::list_identities))
        .route("/logout", post(handlers::logout))
        .with_state(controller)
}
