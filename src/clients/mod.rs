pub mod jellyfin;
pub mod telegram;
pub mod youtube;

use reqwest::{Response, StatusCode};

use crate::domain::NotifyError;

/// Maps a transport failure to a remote error. URLs are stripped because
/// some of them carry credentials.
pub(crate) fn transport_error(service: &'static str, error: reqwest::Error) -> NotifyError {
    if error.is_timeout() {
        NotifyError::remote(service, "request timed out")
    } else if error.is_connect() {
        NotifyError::remote(service, "connection failed")
    } else {
        NotifyError::remote(service, error.without_url())
    }
}

/// Builds the error for a non-success response, keeping the body for context.
pub(crate) async fn status_error(service: &'static str, response: Response) -> NotifyError {
    let status: StatusCode = response.status();
    let body = response.text().await.unwrap_or_default();
    if body.is_empty() {
        NotifyError::remote(service, status)
    } else {
        NotifyError::remote(service, format!("{status} - {body}"))
    }
}

pub(crate) fn endpoint(
    service: &'static str,
    base_url: &str,
    path: &str,
) -> Result<url::Url, NotifyError> {
    url::Url::parse(&format!("{base_url}{path}"))
        .map_err(|e| NotifyError::remote(service, format!("invalid URL: {e}")))
}
