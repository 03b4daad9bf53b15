use std::error::Error;
use std::fmt::{Display, Formatter};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use invitation_core::db::DbError;
use invitation_core::RepoError;
use log::{error, warn};
use serde::Serialize;

use crate::config::ConfigError;

/// Failure of a single HTTP request.
#[derive(Debug)]
pub enum ApiError {
    MalformedPayload(String),
    Store(RepoError),
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedPayload(reason) => write!(f, "malformed payload: {reason}"),
            Self::Store(err) => write!(f, "store failure: {err}"),
        }
    }
}

impl Error for ApiError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::MalformedPayload(_) => None,
            Self::Store(err) => Some(err),
        }
    }
}

impl From<RepoError> for ApiError {
    fn from(value: RepoError) -> Self {
        Self::Store(value)
    }
}

/// Body of every non-2xx response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    #[serde(rename = "isSuccess")]
    pub is_success: bool,
    pub error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::MalformedPayload(_) => {
                warn!("event=http_request module=api status=error error_code=malformed_payload");
                StatusCode::BAD_REQUEST
            }
            ApiError::Store(err) => {
                error!("event=http_request module=api status=error error_code=store_failure error={err}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = ErrorBody {
            is_success: false,
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Failure that stops the server from starting or running.
#[derive(Debug)]
pub enum ServerError {
    Config(ConfigError),
    Db(DbError),
    Io(std::io::Error),
}

impl Display for ServerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "configuration error: {err}"),
            Self::Db(err) => write!(f, "database error: {err}"),
            Self::Io(err) => write!(f, "io error: {err}"),
        }
    }
}

impl Error for ServerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Io(err) => Some(err),
        }
    }
}

impl From<ConfigError> for ServerError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<DbError> for ServerError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<std::io::Error> for ServerError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}
