use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("Valid email is required")]
    InvalidEmail,

    #[error("ID is required")]
    MissingId,

    #[error("Answer must be \"yes\" or \"no\"")]
    InvalidAnswer,

    #[error("Link not found")]
    NotFound,

    #[error("Link already answered")]
    AlreadyAnswered,

    #[error("Failed to create link")]
    CreateFailed(anyhow::Error),

    #[error("Failed to check link")]
    CheckFailed(anyhow::Error),

    #[error("Failed to submit response")]
    RespondFailed(anyhow::Error),
}

impl IntoResponse for LinkError {
    fn into_response(self) -> Response {
        let status = match self {
            LinkError::InvalidEmail | LinkError::MissingId | LinkError::InvalidAnswer => {
                StatusCode::BAD_REQUEST
            }
            LinkError::NotFound => StatusCode::NOT_FOUND,
            LinkError::AlreadyAnswered => StatusCode::BAD_REQUEST,
            LinkError::CreateFailed(_) | LinkError::CheckFailed(_) | LinkError::RespondFailed(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if let LinkError::CreateFailed(source)
        | LinkError::CheckFailed(source)
        | LinkError::RespondFailed(source) = &self
        {
            tracing::error!("Request failed: {:?}", source);
        }

        let body = Json(json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}
