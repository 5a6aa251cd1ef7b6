use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{error, warn};
use uuid::Uuid;

use shelfbot_agent::errors::CommandError;
use shelfbot_core::errors::{ApplicationError, InterfaceError};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub detail: String,
    pub correlation_id: String,
}

/// An interface error rendered as a JSON body with the matching status code.
#[derive(Debug)]
pub struct ApiError(pub InterfaceError);

impl From<CommandError> for ApiError {
    fn from(value: CommandError) -> Self {
        let correlation_id = Uuid::new_v4().to_string();
        let interface = ApplicationError::from(value).into_interface(correlation_id);
        match &interface {
            InterfaceError::ServiceUnavailable { message, correlation_id }
            | InterfaceError::Internal { message, correlation_id } => error!(
                event_name = "api.request_failed",
                correlation_id = %correlation_id,
                error = %message,
            ),
            other => warn!(event_name = "api.request_rejected", error = %other),
        }
        Self(interface)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
            InterfaceError::Conflict { .. } => StatusCode::CONFLICT,
            InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(&self) -> ErrorBody {
        let (message, correlation_id) = match &self.0 {
            InterfaceError::BadRequest { message, correlation_id }
            | InterfaceError::NotFound { message, correlation_id }
            | InterfaceError::Conflict { message, correlation_id }
            | InterfaceError::ServiceUnavailable { message, correlation_id }
            | InterfaceError::Internal { message, correlation_id } => (message, correlation_id),
        };
        ErrorBody {
            error: self.0.user_message(),
            detail: message.clone(),
            correlation_id: correlation_id.clone(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

pub type ApiResult<T> = Result<Json<T>, ApiError>;
