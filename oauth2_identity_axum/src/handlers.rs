use axum::{
    Json,
    body::Body,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header::LOCATION},
    response::Response,
};
use serde::Deserialize;
use std::sync::Arc;

use oauth2_identity::{CallbackParams, FlowRedirect, IdentitySummary, OAuthFlowController};

use super::error::IntoResponseError;
use super::session::AuthUser;

type Controller = State<Arc<OAuthFlowController>>;

#[derive(Debug, Deserialize)]
pub(super) struct StartQuery {
    redirect: Option<String>,
}

/// Redirect response carrying the flow's cookies.
fn redirect_response(
    status: StatusCode,
    flow: FlowRedirect,
) -> Result<Response, (StatusCode, String)> {
    let mut response = Response::builder()
        .status(status)
        .header(LOCATION, &flow.location)
        .body(Body::empty())
        .into_response_error()?;
    response.headers_mut().extend(flow.headers);
    Ok(response)
}

pub(super) async fn start(
    State(controller): Controller,
    Path(provider): Path<String>,
    Query(query): Query<StartQuery>,
    headers: HeaderMap,
) -> Result<Response, (StatusCode, String)> {
    let flow = controller
        .start(&provider, query.redirect.as_deref(), &headers)
        .await
        .into_response_error()?;
    redirect_response(StatusCode::FOUND, flow)
}

pub(super) async fn callback(
    State(controller): Controller,
    Path(provider): Path<String>,
    Query(params): Query<CallbackParams>,
    headers: HeaderMap,
) -> Result<Response, (StatusCode, String)> {
    let flow = controller
        .callback(&provider, &params, &headers)
        .await
        .into_response_error()?;
    redirect_response(StatusCode::FOUND, flow)
}

pub(super) async fn link(
    State(controller): Controller,
    user: AuthUser,
    Path(provider): Path<String>,
    headers: HeaderMap,
) -> Result<Response, (StatusCode, String)> {
    let flow = controller
        .link(&provider, &user.id, &headers)
        .await
        .into_response_error()?;
    redirect_response(StatusCode::SEE_OTHER, flow)
}

pub(super) async fn unlink(
    State(controller): Controller,
    user: AuthUser,
    Path(provider): Path<String>,
) -> Result<Response, (StatusCode, String)> {
    let flow = controller
        .unlink(&provider, &user.id)
        .await
        .into_response_error()?;
    redirect_response(StatusCode::SEE_OTHER, flow)
}

pub(super) async fn list_identities(
    State(controller): Controller,
    user: AuthUser,
) -> Result<Json<Vec<IdentitySummary>>, (StatusCode, String)> {
    let identities = controller
        .list_identities(&user.id)
        .await
        .into_response_error()?;
    Ok(Json(identities))
}

pub(super) async fn logout(
    State(controller): Controller,
) -> Result<Response, (StatusCode, String)> {
    let flow = controller.logout().into_response_error()?;
    redirect_response(StatusCode::SEE_OTHER, flow)
}
