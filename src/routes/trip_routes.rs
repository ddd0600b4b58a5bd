use axum::{extract::State, routing::post, Json, Router};

use crate::controllers::trip_controller::TripController;
use crate::dto::fleet_dto::TripRequest;
use crate::dto::ApiResponse;
use crate::services::{TripReceipt, TripStart};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_trip_router() -> Router<AppState> {
    Router::new()
        .route("/start", post(start_trip))
        .route("/finish", post(finish_trip))
}

async fn start_trip(
    State(state): State<AppState>,
    Json(request): Json<TripRequest>,
) -> Result<Json<ApiResponse<TripStart>>, AppError> {
    let controller = TripController::new(state.fleet.clone());
    let response = controller.start(request).await?;
    Ok(Json(response))
}

async fn finish_trip(
    State(state): State<AppState>,
    Json(request): Json<TripRequest>,
) -> Result<Json<ApiResponse<TripReceipt>>, AppError> {
    let controller = TripController::new(state.fleet.clone());
    let response = controller.finish(request).await?;
    Ok(Json(response))
}
