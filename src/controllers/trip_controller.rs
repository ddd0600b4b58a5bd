use std::sync::Arc;
use validator::Validate;

use crate::dto::fleet_dto::TripRequest;
use crate::dto::ApiResponse;
use crate::services::{FleetService, TripReceipt, TripStart};
use crate::utils::errors::{AppError, AppResult};

pub struct TripController {
    fleet: Arc<FleetService>,
}

impl TripController {
    pub fn new(fleet: Arc<FleetService>) -> Self {
        Self { fleet }
    }

    /// Saldo insuficiente no es un error: la respuesta es 200 con `success: false`
    pub async fn start(&self, request: TripRequest) -> AppResult<ApiResponse<TripStart>> {
        request.validate().map_err(AppError::Validation)?;

        let outcome = self
            .fleet
            .start_trip(&request.license_plate, request.customer_id, request.distance)
            .await?;

        let response = match &outcome {
            TripStart::Started { estimated_cost } => ApiResponse::success_with_message(
                outcome.clone(),
                format!("Viaje iniciado, coste estimado {}", estimated_cost),
            ),
            TripStart::InsufficientFunds { minimum_balance, .. } => ApiResponse {
                success: false,
                message: Some(format!("Saldo insuficiente, se requieren al menos {}", minimum_balance)),
                data: Some(outcome.clone()),
            },
        };
        Ok(response)
    }

    pub async fn finish(&self, request: TripRequest) -> AppResult<ApiResponse<TripReceipt>> {
        request.validate().map_err(AppError::Validation)?;

        let receipt = self
            .fleet
            .finish_trip(&request.license_plate, request.customer_id, request.distance)
            .await?;

        let message = match receipt.maintenance {
            Some(_) => format!("Viaje finalizado, cobrado {}; mantenimiento realizado", receipt.fare.paid_amount),
            None => format!("Viaje finalizado, cobrado {}", receipt.fare.paid_amount),
        };
        Ok(ApiResponse::success_with_message(receipt, message))
    }
}
