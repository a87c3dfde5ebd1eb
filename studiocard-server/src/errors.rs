use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use log::error;
use studiocard_collab::{AuthError, DatabaseError, GateError, StudioError};
use thiserror::Error;

pub type ServerResult<T> = Result<T, ServerError>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("{resource}:{identifier} not found")]
    NotFound {
        resource: &'static str,
        identifier: &'static str,
    },
    #[error("{resource} with {field} of value {value} already exists")]
    Conflict {
        resource: &'static str,
        field: &'static str,
        value: String,
    },
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    /// The studio is full and needs a higher tier
    #[error("{0}")]
    UpgradeRequired(String),
    #[error("Unknown internal error: {0}")]
    Unknown(String),
}

impl ServerError {
    fn as_status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::UpgradeRequired(_) => StatusCode::PAYMENT_REQUIRED,
            Self::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        if let Self::Unknown(e) = &self {
            error!("Request failed: {}", e);
        }

        (self.as_status_code(), self.to_string()).into_response()
    }
}

impl From<AuthError> for ServerError {
    fn from(value: AuthError) -> Self {
        match value {
            AuthError::InvalidCredentials => Self::Unauthorized(value.to_string()),
            AuthError::InvalidLicense | AuthError::Invalid(_) => Self::BadRequest(value.to_string()),
            AuthError::LicenseUsed | AuthError::EmailTaken(_) => Self::Conflict {
                resource: "account",
                field: "license or email",
                value: value.to_string(),
            },
            AuthError::CapacityReached { .. } => Self::UpgradeRequired(value.to_string()),
            AuthError::NotPermitted => Self::Forbidden(value.to_string()),
            AuthError::Db(e) => e.into(),
            e => Self::Unknown(e.to_string()),
        }
    }
}

impl From<GateError> for ServerError {
    fn from(value: GateError) -> Self {
        match value {
            GateError::IncorrectCode | GateError::Forbidden => Self::Forbidden(value.to_string()),
            GateError::NotATeacher | GateError::NotAStudent => Self::Forbidden(value.to_string()),
            GateError::NoSession => Self::Unauthorized(value.to_string()),
            GateError::Auth(e) => e.into(),
            GateError::Db(e) => e.into(),
        }
    }
}

impl From<StudioError> for ServerError {
    fn from(value: StudioError) -> Self {
        match value {
            StudioError::Locked => Self::Forbidden(value.to_string()),
            StudioError::Invalid(reason) => Self::BadRequest(reason.to_string()),
            StudioError::Gate(e) => e.into(),
            StudioError::Db(e) => e.into(),
            e => Self::Unknown(e.to_string()),
        }
    }
}

impl From<DatabaseError> for ServerError {
    fn from(value: DatabaseError) -> Self {
        match value {
            DatabaseError::NotFound {
                resource,
                identifier,
            } => Self::NotFound {
                resource,
                identifier,
            },
            DatabaseError::Conflict {
                resource,
                field,
                value,
            } => Self::Conflict {
                resource,
                field,
                value,
            },
            e => Self::Unknown(e.to_string()),
        }
    }
}
