//! The `/api/cars` surface: vehicle catalog reads (makes, models) and a
//! dealer's inventory listing.

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::db::{queries, AppState};
use crate::error::{msg, AppError, Result};
use crate::extractors::{Json, Query};
use crate::models::{CarMake, CarModel, CarWithNames};

#[derive(Debug, Deserialize)]
pub struct CarsQuery {
    pub action: Option<String>,
    pub make_id: Option<String>,
    pub dealer_id: Option<String>,
}

#[derive(Serialize)]
struct MakesResponse {
    makes: Vec<CarMake>,
}

#[derive(Serialize)]
struct ModelsResponse {
    models: Vec<CarModel>,
}

#[derive(Serialize)]
struct DealerCarsResponse {
    cars: Vec<CarWithNames>,
}

pub async fn cars_get(
    State(state): State<AppState>,
    Query(query): Query<CarsQuery>,
) -> Result<Response> {
    let conn = state.db.get()?;

    match query.action.as_deref() {
        Some("makes") => {
            let makes = queries::list_active_makes(&conn)?;
            Ok(Json(MakesResponse { makes }).into_response())
        }
        Some("models") => {
            let make_id = query
                .make_id
                .ok_or_else(|| AppError::BadRequest("Make ID required for models".to_string()))?;
            let models = queries::list_models_for_make(&conn, &make_id)?;
            Ok(Json(ModelsResponse { models }).into_response())
        }
        Some("dealer") => {
            let dealer_id = query
                .dealer_id
                .ok_or_else(|| AppError::BadRequest("Dealer ID is required".to_string()))?;
            let cars = queries::list_dealer_cars(&conn, &dealer_id)?;
            Ok(Json(DealerCarsResponse { cars }).into_response())
        }
        _ => Err(AppError::BadRequest(msg::INVALID_ACTION.to_string())),
    }
}
