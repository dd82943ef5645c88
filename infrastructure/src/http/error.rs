//! Mapping of `reqwest` failures onto the application's port errors

use council_application::{ClientError, RepositoryError};
use reqwest::{Response, StatusCode};

/// Longest response body kept in an error message
const MAX_ERROR_BODY: usize = 512;

pub(crate) fn client_error(error: reqwest::Error) -> ClientError {
    if error.is_decode() {
        ClientError::Protocol(error.to_string())
    } else {
        ClientError::Connection(error.to_string())
    }
}

pub(crate) fn repository_error(error: reqwest::Error) -> RepositoryError {
    if error.is_decode() {
        RepositoryError::Decode(error.to_string())
    } else {
        RepositoryError::Request(error.to_string())
    }
}

/// Body of a failed response, truncated for display
pub(crate) async fn error_body(response: Response) -> String {
    let body = response.text().await.unwrap_or_default();
    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body,
    }
}

/// Turn a non-2xx response into a [`RepositoryError`].
///
/// `404` is reported as [`RepositoryError::NotFound`] naming `resource`.
pub(crate) async fn check_status(
    response: Response,
    resource: &str,
) -> Result<Response, RepositoryError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(RepositoryError::NotFound(resource.to_string()));
    }
    let body = error_body(response).await;
    Err(RepositoryError::Request(format!(
        "HTTP {}: {}",
        status.as_u16(),
        body
    )))
}
