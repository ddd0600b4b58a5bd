use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};

use crate::controllers::vehicle_controller::VehicleController;
use crate::dto::fleet_dto::{AddFareRequest, CreateVehicleRequest, UpdateVehicleRequest, VehicleSearchQuery};
use crate::dto::ApiResponse;
use crate::models::Vehicle;
use crate::services::FareReceipt;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_vehicle_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_vehicle).get(list_vehicles))
        .route("/:plate", get(get_vehicle).put(update_vehicle).delete(delete_vehicle))
        .route("/:plate/fares", post(add_fare))
        .route("/:plate/maintenance", post(perform_maintenance))
}

async fn create_vehicle(
    State(state): State<AppState>,
    Json(request): Json<CreateVehicleRequest>,
) -> Result<Json<ApiResponse<Vehicle>>, AppError> {
    let controller = VehicleController::new(state.fleet.clone());
    let response = controller.create(request).await?;
    Ok(Json(response))
}

async fn list_vehicles(
    State(state): State<AppState>,
    Query(query): Query<VehicleSearchQuery>,
) -> Result<Json<ApiResponse<Vec<Vehicle>>>, AppError> {
    let controller = VehicleController::new(state.fleet.clone());
    let response = controller.list(query).await?;
    Ok(Json(response))
}

async fn get_vehicle(
    State(state): State<AppState>,
    Path(plate): Path<String>,
) -> Result<Json<ApiResponse<Vehicle>>, AppError> {
    let controller = VehicleController::new(state.fleet.clone());
    let response = controller.get(&plate).await?;
    Ok(Json(response))
}

async fn update_vehicle(
    State(state): State<AppState>,
    Path(plate): Path<String>,
    Json(request): Json<UpdateVehicleRequest>,
) -> Result<Json<ApiResponse<Vehicle>>, AppError> {
    let controller = VehicleController::new(state.fleet.clone());
    let response = controller.update(&plate, request).await?;
    Ok(Json(response))
}

async fn delete_vehicle(
    State(state): State<AppState>,
    Path(plate): Path<String>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let controller = VehicleController::new(state.fleet.clone());
    let response = controller.delete(&plate).await?;
    Ok(Json(response))
}

async fn add_fare(
    State(state): State<AppState>,
    Path(plate): Path<String>,
    Json(request): Json<AddFareRequest>,
) -> Result<Json<ApiResponse<FareReceipt>>, AppError> {
    let controller = VehicleController::new(state.fleet.clone());
    let response = controller.add_fare(&plate, request).await?;
    Ok(Json(response))
}

async fn perform_maintenance(
    State(state): State<AppState>,
    Path(plate): Path<String>,
) -> Result<Json<ApiResponse<Vehicle>>, AppError> {
    let controller = VehicleController::new(state.fleet.clone());
    let response = controller.perform_maintenance(&plate).await?;
    Ok(Json(response))
}
