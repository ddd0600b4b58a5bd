use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::utils::validation::{validate_non_negative_amount, validate_positive_amount};

// Request para registrar un vehículo
#[derive(Debug, Deserialize, Validate)]
pub struct CreateVehicleRequest {
    #[validate(length(min = 1, max = 32))]
    pub license_plate: String,
    #[serde(default)]
    pub driver: String,
    #[validate(length(min = 1, max = 100))]
    pub model: String,
}

// Request para actualizar conductor y/o modelo
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateVehicleRequest {
    pub driver: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub model: Option<String>,
}

// Filtros de búsqueda de vehículos
#[derive(Debug, Default, Deserialize)]
pub struct VehicleSearchQuery {
    pub license_plate: Option<String>,
    pub driver: Option<String>,
}

// Request para registrar una tarifa en un vehículo
#[derive(Debug, Deserialize, Validate)]
pub struct AddFareRequest {
    pub customer_id: Option<i32>,
    #[validate(range(min = 0.0, max = 1000000000.0))]
    pub distance: f64,
    #[validate(custom = "validate_non_negative_amount")]
    pub paid_amount: Decimal,
    #[validate(length(min = 1, max = 200))]
    pub origin: String,
    #[validate(length(min = 1, max = 200))]
    pub destination: String,
    pub started_at: Option<DateTime<Utc>>,
}

// Request para registrar un cliente
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCustomerRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(custom = "validate_non_negative_amount")]
    pub balance: Decimal,
}

// Request para renombrar un cliente
#[derive(Debug, Deserialize, Validate)]
pub struct RenameCustomerRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}

// Request para recargar saldo
#[derive(Debug, Deserialize, Validate)]
pub struct TopUpRequest {
    #[validate(custom = "validate_positive_amount")]
    pub amount: Decimal,
}

// Búsqueda de clientes por nombre
#[derive(Debug, Default, Deserialize)]
pub struct CustomerQuery {
    pub name: Option<String>,
}

// Request para iniciar o finalizar un viaje
#[derive(Debug, Deserialize, Validate)]
pub struct TripRequest {
    #[validate(length(min = 1, max = 32))]
    pub license_plate: String,
    pub customer_id: i32,
    #[validate(range(min = 0.0, max = 1000000000.0))]
    pub distance: f64,
}

#[derive(Debug, Default, Deserialize)]
pub struct TopCustomersQuery {
    pub count: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EventsQuery {
    /// Filtra por tipo (`trip_started`, `maintenance_performed`, ...)
    pub kind: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct AverageDistanceResponse {
    pub average_distance: f64,
}

// Response genérica
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn success_with_message(data: T, message: String) -> Self {
        Self {
            success: true,
            message: Some(message),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: String) -> Self {
        Self {
            success: true,
            message: Some(message),
            data: None,
        }
    }
}
