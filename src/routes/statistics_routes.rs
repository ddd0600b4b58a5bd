use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};

use crate::controllers::statistics_controller::{recent_events, StatisticsController};
use crate::dto::fleet_dto::{AverageDistanceResponse, EventsQuery, TopCustomersQuery};
use crate::dto::ApiResponse;
use crate::models::statistics::{CustomerSpending, FleetStatistics};
use crate::models::Vehicle;
use crate::services::notifications::JournalEntry;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_statistics_router() -> Router<AppState> {
    Router::new()
        .route("/", get(report))
        .route("/most-used-car", get(most_used_car))
        .route("/top-paying-customers", get(top_paying_customers))
        .route("/average-distance", get(average_distance))
}

pub fn create_event_router() -> Router<AppState> {
    Router::new().route("/", get(list_events))
}

fn controller(state: &AppState) -> StatisticsController {
    StatisticsController::new(state.fleet.clone(), state.statistics.clone())
}

async fn report(State(state): State<AppState>) -> Result<Json<ApiResponse<FleetStatistics>>, AppError> {
    let response = controller(&state).report().await?;
    Ok(Json(response))
}

async fn most_used_car(State(state): State<AppState>) -> Result<Json<ApiResponse<Option<Vehicle>>>, AppError> {
    let response = controller(&state).most_used_car().await?;
    Ok(Json(response))
}

async fn top_paying_customers(
    State(state): State<AppState>,
    Query(query): Query<TopCustomersQuery>,
) -> Result<Json<ApiResponse<Vec<CustomerSpending>>>, AppError> {
    let response = controller(&state).top_paying_customers(query.count).await?;
    Ok(Json(response))
}

async fn average_distance(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<AverageDistanceResponse>>, AppError> {
    let response = controller(&state).average_distance().await?;
    Ok(Json(response))
}

async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Json<ApiResponse<Vec<JournalEntry>>> {
    Json(recent_events(&state.journal, &query))
}
