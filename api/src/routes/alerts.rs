use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use domain::{Alert, Currency, Price};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{auth_middleware::CurrentUser, error::ApiError, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/alerts", get(list_alerts).post(create_alert))
        .route(
            "/alerts/:alert_id",
            get(get_alert).put(update_alert).delete(delete_alert),
        )
}

#[derive(Debug, Deserialize)]
struct AlertPayload {
    from_ticker: String,
    to_ticker: String,
    above: bool,
    threshold: Decimal,
}

/// Single-alert view: the alert plus the latest observation for its pair,
/// when one exists inside the price window.
#[derive(Debug, Serialize)]
struct AlertDetail {
    alert: Alert,
    current_price: Option<Price>,
}

async fn list_alerts(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<Alert>>, ApiError> {
    let alerts = state.alert_repo.list_for_user(user.user().id).await?;
    Ok(Json(alerts))
}

async fn create_alert(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<AlertPayload>,
) -> Result<(StatusCode, Json<Alert>), ApiError> {
    let (from, to) = resolve_pair(&state, &payload).await?;
    let now = Utc::now();
    let alert = Alert {
        id: Uuid::new_v4(),
        user_id: user.user().id,
        from,
        to,
        above: payload.above,
        threshold: payload.threshold,
        created_time: now,
        sent: false,
        updated_at: now,
    };
    state.alert_repo.append_version(&alert).await?;
    Ok((StatusCode::CREATED, Json(alert)))
}

async fn get_alert(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(alert_id): Path<Uuid>,
) -> Result<Json<AlertDetail>, ApiError> {
    let alert = state
        .alert_repo
        .find(alert_id, user.user().id)
        .await?
        .ok_or(ApiError::NotFound)?;
    let current_price = state
        .price_repo
        .latest_rate(&alert.from.ticker, &alert.to.ticker)
        .await?;
    Ok(Json(AlertDetail {
        alert,
        current_price,
    }))
}

/// Editing an alert appends a fresh version: the condition resets to unsent
/// and the creation time moves to now, so an edited condition that is already
/// true does not fire off a pre-edit price.
async fn update_alert(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(alert_id): Path<Uuid>,
    Json(payload): Json<AlertPayload>,
) -> Result<Json<Alert>, ApiError> {
    let existing = state
        .alert_repo
        .find(alert_id, user.user().id)
        .await?
        .ok_or(ApiError::NotFound)?;

    let (from, to) = resolve_pair(&state, &payload).await?;
    let now = Utc::now();
    let alert = Alert {
        from,
        to,
        above: payload.above,
        threshold: payload.threshold,
        created_time: now,
        sent: false,
        updated_at: now,
        ..existing
    };
    state.alert_repo.append_version(&alert).await?;
    Ok(Json(alert))
}

async fn delete_alert(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(alert_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let existing = state
        .alert_repo
        .find(alert_id, user.user().id)
        .await?
        .ok_or(ApiError::NotFound)?;
    state.alert_repo.append_deleted(&existing).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn resolve_pair(
    state: &AppState,
    payload: &AlertPayload,
) -> Result<(Currency, Currency), ApiError> {
    if payload.from_ticker == payload.to_ticker {
        return Err(ApiError::Validation(
            "from and to currencies must differ".to_string(),
        ));
    }
    if payload.threshold <= Decimal::ZERO {
        return Err(ApiError::Validation("threshold must be positive".to_string()));
    }
    let from = lookup(state, &payload.from_ticker).await?;
    let to = lookup(state, &payload.to_ticker).await?;
    Ok((from, to))
}

async fn lookup(state: &AppState, ticker: &str) -> Result<Currency, ApiError> {
    state
        .currency_repo
        .find_by_ticker(ticker)
        .await?
        .ok_or_else(|| ApiError::Validation(format!("unknown currency {ticker}")))
}
