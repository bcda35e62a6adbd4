use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{
    errors::LinkError,
    models::link::{Answer, LinkRecord},
    startup::AppState,
};

#[derive(Deserialize)]
pub struct CreateLinkRequest {
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Serialize)]
pub struct CreateLinkResponse {
    pub url: String,
    pub id: String,
    pub bypass: bool,
}

#[instrument(name = "HTTP: Create link", skip(state, body))]
pub async fn create_link(
    State(state): State<AppState>,
    body: Result<Json<CreateLinkRequest>, JsonRejection>,
) -> Result<Json<CreateLinkResponse>, LinkError> {
    // A body that does not parse is reported the same way as a storage
    // failure, not as a field-level validation error.
    let Json(payload) = body.map_err(|e| LinkError::CreateFailed(anyhow::Error::new(e)))?;

    let created = state
        .link_service
        .create(payload.email.as_deref(), payload.name.as_deref())
        .await?;

    Ok(Json(CreateLinkResponse {
        url: created.url,
        id: created.id,
        bypass: created.bypass,
    }))
}

#[derive(Deserialize)]
pub struct CheckLinkParams {
    pub id: Option<String>,
}

#[instrument(name = "HTTP: Check link", skip(state, params))]
pub async fn check_link(
    State(state): State<AppState>,
    Query(params): Query<CheckLinkParams>,
) -> Result<Json<LinkRecord>, LinkError> {
    let id = params.id.unwrap_or_default();
    let record = state.link_service.read(&id).await?;
    Ok(Json(record))
}

#[derive(Deserialize)]
pub struct RespondRequest {
    pub id: Option<String>,
    pub answer: Option<String>,
}

#[derive(Serialize)]
pub struct RespondResponse {
    pub success: bool,
    pub bypass: bool,
}

#[instrument(name = "HTTP: Respond", skip(state, body))]
pub async fn respond(
    State(state): State<AppState>,
    body: Result<Json<RespondRequest>, JsonRejection>,
) -> Result<Json<RespondResponse>, LinkError> {
    let Json(payload) = body.map_err(|e| LinkError::RespondFailed(anyhow::Error::new(e)))?;

    let id = payload.id.unwrap_or_default();
    if id.trim().is_empty() {
        return Err(LinkError::MissingId);
    }
    let answer = payload
        .answer
        .as_deref()
        .and_then(Answer::parse)
        .ok_or(LinkError::InvalidAnswer)?;

    let receipt = state.link_service.respond(&id, answer).await?;

    Ok(Json(RespondResponse {
        success: true,
        bypass: receipt.bypass,
    }))
}
