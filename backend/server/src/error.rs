use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use raffle::{CampaignError, ImageError, ValidationErrors};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid {key} value: {message}")]
    Invalid { key: &'static str, message: String },

    #[error("Secret {0} not found in /run/secrets or environment")]
    MissingSecret(&'static str),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Corrupt record: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("Tickets already taken: {0:?}")]
    Taken(Vec<u32>),

    #[error("Tickets changed since they were read: {0:?}")]
    Changed(Vec<u32>),

    #[error("Record kept changing, try again")]
    Contended,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Malformed payload")]
    MalformedPayload,

    #[error("Missing or invalid session")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(&'static str),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error(transparent)]
    Campaign(#[from] CampaignError),

    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error("Upstream service error: {0}")]
    Upstream(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    InternalError(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::Upstream(e.to_string())
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::MalformedPayload | AppError::Validation(_) | AppError::Image(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Campaign(e) => campaign_status(e),
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Store(
                StoreError::Taken(_) | StoreError::Changed(_) | StoreError::Contended,
            ) => StatusCode::CONFLICT,
            AppError::Store(_) | AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn campaign_status(error: &CampaignError) -> StatusCode {
    match error {
        CampaignError::InvalidTransition { .. }
        | CampaignError::DraftExpired
        | CampaignError::Locked(_)
        | CampaignError::NotActive
        | CampaignError::SoldOut { .. }
        | CampaignError::Unavailable(_)
        | CampaignError::Expired(_) => StatusCode::CONFLICT,
        CampaignError::RankingDisabled => StatusCode::NOT_FOUND,
        _ => StatusCode::BAD_REQUEST,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            error!("{self}");
        }

        let body = match &self {
            AppError::Validation(fields)
            | AppError::Campaign(CampaignError::Validation(fields)) => {
                json!({ "error": "Invalid input", "fields": fields })
            }
            AppError::Campaign(
                CampaignError::Unavailable(numbers) | CampaignError::Expired(numbers),
            )
            | AppError::Store(StoreError::Taken(numbers) | StoreError::Changed(numbers)) => {
                json!({ "error": self.to_string(), "numbers": numbers })
            }
            AppError::Store(StoreError::Contended) => json!({ "error": self.to_string() }),
            // hide backend details from callers
            AppError::Store(_) | AppError::InternalError(_) => json!({ "error": "Internal error" }),
            _ => json!({ "error": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}
