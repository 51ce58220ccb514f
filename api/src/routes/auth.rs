use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use domain::{LoginRequest, User};

use crate::{auth_middleware::SESSION_COOKIE, config::AppConfig, error::ApiError, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
}

async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<User>), ApiError> {
    let (user, token) = state
        .sessions
        .login(&payload.username, &payload.password)
        .await?;
    Ok((jar.add(session_cookie(token, &state.config)), Json(user)))
}

async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, StatusCode), ApiError> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.sessions.logout(cookie.value()).await?;
    }
    let mut removal = Cookie::from(SESSION_COOKIE);
    removal.set_path("/");
    Ok((jar.remove(removal), StatusCode::NO_CONTENT))
}

fn session_cookie(token: String, config: &AppConfig) -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, token);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_secure(config.cookie_secure);
    cookie.set_same_site(config.cookie_same_site);
    cookie.set_max_age(time::Duration::seconds(config.session_ttl.as_secs() as i64));
    cookie
}
