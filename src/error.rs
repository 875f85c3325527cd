use anyhow::Error;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::fmt;

use crate::models::{json_response, Envelope};

pub enum ApiError {
    /// A required field is missing or empty.
    Validation(String),
    /// The request body is not valid JSON for the endpoint.
    BadRequest(Error),
    /// The automation capability reported a failure.
    Capability(Error),
    UnknownEndpoint(String),
    MethodNotAllowed { method: String, path: String },
    Internal(Error),
}

impl<E: Into<Error>> From<E> for ApiError {
    fn from(e: E) -> Self {
        ApiError::Capability(e.into())
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    pub fn message(&self) -> String {
        match self {
            ApiError::Validation(msg) => msg.clone(),
            ApiError::BadRequest(e) => format!("Invalid JSON body: {}", e),
            ApiError::Capability(e) => e.to_string(),
            ApiError::UnknownEndpoint(path) => format!("Unknown endpoint: {}", path),
            ApiError::MethodNotAllowed { method, path } => {
                format!("Method {} not allowed for {}", method, path)
            }
            ApiError::Internal(e) => format!("Internal server error: {}", e),
        }
    }

    pub fn into_envelope(self) -> Envelope {
        Envelope::fail(self.message())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            log::error!("{}", self);
        }
        json_response(status, &self.into_envelope())
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Validation(msg) => write!(f, "Validation: {}", msg),
            ApiError::BadRequest(e) => write!(f, "BadRequest: {}", e),
            ApiError::Capability(e) => write!(f, "Capability: {}", e),
            ApiError::UnknownEndpoint(p) => write!(f, "UnknownEndpoint: {}", p),
            ApiError::MethodNotAllowed { method, path } => {
                write!(f, "MethodNotAllowed: {} {}", method, path)
            }
            ApiError::Internal(e) => write!(f, "Internal: {}", e),
        }
    }
}

impl fmt::Debug for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Failures while bringing the listener up.
#[derive(Debug)]
pub enum ServerError {
    InvalidPrefix(String),
    Bind { addr: String, source: std::io::Error },
    AlreadyRunning,
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerError::InvalidPrefix(p) => write!(f, "invalid listener prefix `{}`", p),
            ServerError::Bind { addr, source } => write!(f, "failed to bind {}: {}", addr, source),
            ServerError::AlreadyRunning => write!(f, "server is already running"),
        }
    }
}

impl std::error::Error for ServerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServerError::Bind { source, .. } => Some(source),
            _ => None,
        }
    }
}
