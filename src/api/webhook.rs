use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderName, HeaderValue, header},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::api::AppState;

/// Response header carrying [`crate::services::Outcome::kind`].
pub const OUTCOME_HEADER: &str = "x-notification-outcome";

/// `POST /webhook`
///
/// Always answers 200 with a plain-text summary; the outcome kind travels
/// in [`OUTCOME_HEADER`].
pub async fn receive(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let outcome = state.notifier().handle_payload(&body).await;

    (
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; charset=utf-8"),
            ),
            (
                HeaderName::from_static(OUTCOME_HEADER),
                HeaderValue::from_static(outcome.kind()),
            ),
        ],
        outcome.message(),
    )
        .into_response()
}
