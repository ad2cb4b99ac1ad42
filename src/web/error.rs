//! Errors surfaced at the HTTP boundary.

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use crate::entity::User;
use crate::error::NotekeeperError;

use super::templates;

#[derive(Error, Debug)]
pub enum AppError {
    /// Missing note, or a note the caller does not own. Carries the
    /// caller so the 404 page keeps their navigation.
    #[error("Not found")]
    NotFound(Option<User>),

    #[error(transparent)]
    Internal(#[from] NotekeeperError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) | AppError::Internal(NotekeeperError::NoteNotFound(_)) => {
                StatusCode::NOT_FOUND
            }
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            AppError::NotFound(user) => (status, Html(templates::not_found(user.as_ref()))).into_response(),
            AppError::Internal(NotekeeperError::NoteNotFound(_)) => {
                (status, Html(templates::not_found(None))).into_response()
            }
            AppError::Internal(err) => {
                // detail goes to the log only
                error!(error = %err, "request failed");
                (status, Html(templates::server_error())).into_response()
            }
        }
    }
}
