//! Mapping of wiki failures to HTTP responses.

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use tinywiki_core::WikiError;
use tinywiki_render::{Chrome, ErrorTemplate};
use tracing::error;

use crate::auth::AuthError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Wiki(#[from] WikiError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Wiki(err) => match err {
                WikiError::PageNotFound(_)
                | WikiError::RevisionNotFound { .. }
                | WikiError::UserNotFound(_) => StatusCode::NOT_FOUND,
                WikiError::PageExists(_) | WikiError::UserExists(_) => StatusCode::CONFLICT,
                WikiError::OutsideRoot(_)
                | WikiError::InvalidUrl(_)
                | WikiError::InvalidSearch(_)
                | WikiError::InvalidRating(_)
                | WikiError::InvalidUserName(_) => StatusCode::BAD_REQUEST,
                WikiError::Io(_) | WikiError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Auth(_) => StatusCode::FORBIDDEN,
            AppError::Template(_) | AppError::Join(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::Auth(err) => return err.into_response(),
            ref other => other.status(),
        };

        let message = if status.is_server_error() {
            error!(error = %self, "request failed");
            "Something went wrong on our side.".to_string()
        } else {
            self.to_string()
        };

        let create_url = match &self {
            AppError::Wiki(WikiError::PageNotFound(url)) => Some(url.clone()),
            _ => None,
        };

        let page = ErrorTemplate {
            chrome: Chrome {
                site_title: "tinywiki".into(),
                user: None,
            },
            status: status.as_u16(),
            message,
            create_url,
        };
        match page.render() {
            Ok(html) => (status, Html(html)).into_response(),
            Err(err) => {
                error!(error = %err, "error page failed to render");
                (status, status.to_string()).into_response()
            }
        }
    }
}

/// Run blocking wiki I/O off the async runtime.
pub async fn blocking<T, F>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, WikiError> + Send + 'static,
    T: Send + 'static,
{
    Ok(tokio::task::spawn_blocking(f).await??)
}

/// Render an askama template as an HTML response.
pub fn render<T: Template>(template: T) -> Result<Html<String>, AppError> {
    Ok(Html(template.render()?))
}
