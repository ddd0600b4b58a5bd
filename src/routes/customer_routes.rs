use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};

use crate::controllers::customer_controller::CustomerController;
use crate::dto::fleet_dto::{CreateCustomerRequest, CustomerQuery, RenameCustomerRequest, TopUpRequest};
use crate::dto::ApiResponse;
use crate::models::Customer;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_customer_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_customer).get(list_customers))
        .route("/:id", get(get_customer).put(rename_customer).delete(delete_customer))
        .route("/:id/top-up", post(top_up))
}

async fn create_customer(
    State(state): State<AppState>,
    Json(request): Json<CreateCustomerRequest>,
) -> Result<Json<ApiResponse<Customer>>, AppError> {
    let controller = CustomerController::new(state.fleet.clone());
    let response = controller.create(request).await?;
    Ok(Json(response))
}

async fn list_customers(
    State(state): State<AppState>,
    Query(query): Query<CustomerQuery>,
) -> Result<Json<ApiResponse<Vec<Customer>>>, AppError> {
    let controller = CustomerController::new(state.fleet.clone());
    let response = controller.list(query).await?;
    Ok(Json(response))
}

async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<Customer>>, AppError> {
    let controller = CustomerController::new(state.fleet.clone());
    let response = controller.get(id).await?;
    Ok(Json(response))
}

async fn rename_customer(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(request): Json<RenameCustomerRequest>,
) -> Result<Json<ApiResponse<Customer>>, AppError> {
    let controller = CustomerController::new(state.fleet.clone());
    let response = controller.rename(id, request).await?;
    Ok(Json(response))
}

async fn top_up(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(request): Json<TopUpRequest>,
) -> Result<Json<ApiResponse<Customer>>, AppError> {
    let controller = CustomerController::new(state.fleet.clone());
    let response = controller.top_up(id, request).await?;
    Ok(Json(response))
}

async fn delete_customer(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let controller = CustomerController::new(state.fleet.clone());
    let response = controller.delete(id).await?;
    Ok(Json(response))
}
