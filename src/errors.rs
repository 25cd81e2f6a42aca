use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};

use crate::ui::render_error;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("No submissions table found (expected {expected}).")]
    NoTable { expected: String },
    #[error("No date/time column found in table {table}.")]
    NoDateColumn { table: String },
    #[error("storage error: {0}")]
    Store(String),
}

impl From<sqlx::Error> for ReportError {
    fn from(err: sqlx::Error) -> Self {
        Self::Store(err.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("either DATABASE_URL or REPORT_SNAPSHOT_PATH must be set")]
    MissingBackend,
    #[error("TABLE_PREFIX may only contain ASCII letters, digits and '_' (got {0:?})")]
    InvalidPrefix(String),
    #[error("REPORT_TIMEZONE is not a known IANA timezone: {0}")]
    InvalidTimezone(String),
    #[error("{var} is not a valid absolute URL: {value}")]
    InvalidUrl { var: &'static str, value: String },
    #[error("PORT is not a valid port number: {0}")]
    InvalidPort(String),
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            message: message.into(),
        }
    }

    pub fn internal(err: impl std::error::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }

    pub fn into_html_response(self) -> Response {
        (self.status, Html(render_error(&self.message))).into_response()
    }
}

impl From<ReportError> for AppError {
    fn from(err: ReportError) -> Self {
        match err {
            // Storage details stay in the log.
            ReportError::Store(_) => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: "The report could not be loaded from storage.".to_string(),
            },
            other => Self::internal(other),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}
