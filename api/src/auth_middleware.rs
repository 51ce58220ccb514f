use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use axum_extra::extract::cookie::CookieJar;
use domain::User;

use crate::state::AppState;

pub const SESSION_COOKIE: &str = "coinwatch_session";

/// The authenticated user for this request, resolved from the session cookie.
/// Rejects with 401 when the cookie is absent, unknown, or expired.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    pub fn user(&self) -> &User {
        &self.0
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = StatusCode;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = CookieJar::from_request_parts(parts, state)
            .await
            .ok()
            .and_then(|jar| {
                jar.get(SESSION_COOKIE)
                    .map(|cookie| cookie.value().to_owned())
            })
            .ok_or(StatusCode::UNAUTHORIZED)?;

        match state.sessions.resolve(&token).await {
            Ok(Some(user)) => Ok(CurrentUser(user)),
            Ok(None) => Err(StatusCode::UNAUTHORIZED),
            Err(err) => {
                tracing::error!(error = %err, "session lookup failed");
                Err(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}
