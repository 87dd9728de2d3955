use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{error, info};

use crate::views;

/// Failures a handler cannot recover from locally. Validation and
/// authorization problems never get here; they become flash messages.
#[derive(Debug, thiserror::Error)]
pub enum PageError {
    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        match self {
            Self::NotFound(message) => {
                info!("404 - {}", message);
                (StatusCode::NOT_FOUND, views::error_page(&message)).into_response()
            }
            Self::Internal(e) => {
                // Full detail goes to the log only.
                error!("Unexpected error: {:#}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, views::error_page("Something went wrong."))
                    .into_response()
            }
        }
    }
}
