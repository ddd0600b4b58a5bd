use chrono::Utc;
use std::sync::{Arc, Mutex};
use tracing::info;
use validator::Validate;

use crate::dto::fleet_dto::{AddFareRequest, CreateVehicleRequest, UpdateVehicleRequest, VehicleSearchQuery};
use crate::dto::ApiResponse;
use crate::models::{Fare, Vehicle};
use crate::services::{FareReceipt, FleetService, VehicleUpdate};
use crate::utils::errors::{AppError, AppResult};

pub struct VehicleController {
    fleet: Arc<FleetService>,
}

impl VehicleController {
    pub fn new(fleet: Arc<FleetService>) -> Self {
        Self { fleet }
    }

    pub async fn create(&self, request: CreateVehicleRequest) -> AppResult<ApiResponse<Vehicle>> {
        request.validate().map_err(AppError::Validation)?;

        let vehicle = self
            .fleet
            .add_vehicle(&request.license_plate, &request.driver, &request.model)
            .await?;

        Ok(ApiResponse::success_with_message(
            vehicle,
            "Vehículo creado exitosamente".to_string(),
        ))
    }

    /// Listado con búsqueda opcional por matrícula y conductor
    pub async fn list(&self, query: VehicleSearchQuery) -> AppResult<ApiResponse<Vec<Vehicle>>> {
        let vehicles = self
            .fleet
            .search_cars(query.license_plate.as_deref(), query.driver.as_deref())
            .await?;
        Ok(ApiResponse::success(vehicles))
    }

    pub async fn get(&self, license_plate: &str) -> AppResult<ApiResponse<Vehicle>> {
        let vehicle = self.fleet.get_vehicle(license_plate).await?;
        Ok(ApiResponse::success(vehicle))
    }

    pub async fn update(&self, license_plate: &str, request: UpdateVehicleRequest) -> AppResult<ApiResponse<Vehicle>> {
        request.validate().map_err(AppError::Validation)?;

        let update = VehicleUpdate {
            driver: request.driver,
            model: request.model,
        };
        let vehicle = self.fleet.update_vehicle(license_plate, update).await?;

        Ok(ApiResponse::success_with_message(
            vehicle,
            "Vehículo actualizado exitosamente".to_string(),
        ))
    }

    pub async fn delete(&self, license_plate: &str) -> AppResult<ApiResponse<()>> {
        self.fleet.delete_vehicle(license_plate).await?;
        Ok(ApiResponse::message("Vehículo eliminado exitosamente".to_string()))
    }

    /// Registrar una tarifa; los avisos de importe alto vuelven en `message`
    pub async fn add_fare(&self, license_plate: &str, request: AddFareRequest) -> AppResult<ApiResponse<FareReceipt>> {
        request.validate().map_err(AppError::Validation)?;

        let fare = Fare {
            id: 0,
            vehicle_id: 0,
            customer_id: request.customer_id,
            distance: request.distance,
            paid_amount: request.paid_amount,
            origin: request.origin,
            destination: request.destination,
            started_at: request.started_at.unwrap_or_else(Utc::now),
        };

        let warnings: Mutex<Vec<String>> = Mutex::new(Vec::new());
        let sink = |message: &str| -> anyhow::Result<()> {
            warnings
                .lock()
                .map_err(|_| anyhow::anyhow!("warning buffer poisoned"))?
                .push(message.to_string());
            Ok(())
        };

        let receipt = self.fleet.add_fare(license_plate, fare, Some(&sink)).await?;
        info!("🧾 Tarifa {} añadida a {}", receipt.fare.id, license_plate);

        let warnings = warnings.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(match warnings.is_empty() {
            true => ApiResponse::success(receipt),
            false => ApiResponse::success_with_message(receipt, warnings.join("; ")),
        })
    }

    pub async fn perform_maintenance(&self, license_plate: &str) -> AppResult<ApiResponse<Vehicle>> {
        let vehicle = self.fleet.perform_maintenance(license_plate).await?;
        Ok(ApiResponse::success_with_message(
            vehicle,
            "Mantenimiento realizado".to_string(),
        ))
    }
}
