use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use domain::{AssetValuation, Portfolio, PortfolioValuation};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::{auth_middleware::CurrentUser, error::ApiError, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/portfolio", get(get_valuation).post(set_portfolio))
        .route("/portfolio/:ticker", get(get_asset))
        .route("/portfolio/:ticker/buy", post(buy))
        .route("/portfolio/:ticker/sell", post(sell))
}

#[derive(Debug, Deserialize)]
struct PortfolioPayload {
    reference_ticker: String,
    cash: Decimal,
}

#[derive(Debug, Deserialize)]
struct TradePayload {
    fiat: Decimal,
    crypto: Decimal,
}

async fn get_valuation(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<PortfolioValuation>, ApiError> {
    let valuation = state.portfolio.valuate(user.user().id).await?;
    Ok(Json(valuation))
}

async fn set_portfolio(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<PortfolioPayload>,
) -> Result<Json<Portfolio>, ApiError> {
    let portfolio = state
        .portfolio
        .set_reference(user.user().id, &payload.reference_ticker, payload.cash)
        .await?;
    Ok(Json(portfolio))
}

async fn get_asset(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(ticker): Path<String>,
) -> Result<Json<AssetValuation>, ApiError> {
    let asset = state.portfolio.asset(user.user().id, &ticker).await?;
    Ok(Json(asset))
}

async fn buy(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(ticker): Path<String>,
    Json(payload): Json<TradePayload>,
) -> Result<StatusCode, ApiError> {
    state
        .portfolio
        .buy(user.user().id, &ticker, payload.fiat, payload.crypto)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn sell(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(ticker): Path<String>,
    Json(payload): Json<TradePayload>,
) -> Result<StatusCode, ApiError> {
    state
        .portfolio
        .sell(user.user().id, &ticker, payload.fiat, payload.crypto)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
