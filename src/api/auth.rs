//! HTTP basic authentication against the configured API users.

use axum::{
    body::Body,
    extract::State,
    http::{header::WWW_AUTHENTICATE, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::{
    headers::{authorization::Basic, Authorization},
    TypedHeader,
};
use std::sync::Arc;

use super::handlers::AppState;

/// The authenticated username, inserted into request extensions.
#[derive(Debug, Clone)]
pub struct AuthUser(pub String);

fn challenge() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(WWW_AUTHENTICATE, r#"Basic realm="Login Required""#)],
        "Authentication Required",
    )
        .into_response()
}

/// Reject requests without valid basic-auth credentials.
pub async fn require_basic_auth(
    State(state): State<Arc<AppState>>,
    credentials: Option<TypedHeader<Authorization<Basic>>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(TypedHeader(Authorization(basic))) = credentials else {
        return challenge();
    };

    if !state
        .config
        .authorized_user(basic.username(), basic.password())
    {
        tracing::debug!(user = %basic.username(), "Rejected API credentials");
        return challenge();
    }

    request
        .extensions_mut()
        .insert(AuthUser(basic.username().to_string()));
    next.run(request).await
}
