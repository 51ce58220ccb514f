use axum::{extract::State, routing::get, Json, Router};
use domain::Currency;

use crate::{error::ApiError, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/currencies", get(list_currencies))
        .route("/currencies/reference", get(list_reference_currencies))
}

async fn list_currencies(
    State(state): State<AppState>,
) -> Result<Json<Vec<Currency>>, ApiError> {
    let currencies = state.currency_repo.list_all().await?;
    Ok(Json(currencies))
}

async fn list_reference_currencies(
    State(state): State<AppState>,
) -> Result<Json<Vec<Currency>>, ApiError> {
    let currencies = state.currency_repo.reference_currencies().await?;
    Ok(Json(currencies))
}
