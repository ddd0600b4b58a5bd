use axum::{
    extract::{Query, State},
    routing::post,
    Json, Router,
};

use crate::controllers::import_controller::ImportController;
use crate::dto::import_dto::ImportQuery;
use crate::dto::ApiResponse;
use crate::models::import::ImportReport;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_import_router() -> Router<AppState> {
    Router::new().route("/", post(import_batch))
}

/// El cuerpo llega en crudo; el formato se toma de `?format=` o se detecta
async fn import_batch(
    State(state): State<AppState>,
    Query(query): Query<ImportQuery>,
    body: String,
) -> Result<Json<ApiResponse<ImportReport>>, AppError> {
    let controller = ImportController::new(state.importer.clone());
    let response = controller.import(query.format.as_deref(), &body).await?;
    Ok(Json(response))
}
