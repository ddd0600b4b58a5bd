//! DTOs de importación
//!
//! Dos formatos de entrada con la misma semántica de reconciliación:
//!
//! - `fleet`: array de vehículos con sus tarifas (`Fares`) y servicios
//!   (`Services`) anidados, identificados por matrícula.
//! - `car_sharing`: objeto con `Cars`, `Customers` y `Trips`, todos con id.
//!
//! Ambos se convierten a [`ImportBatch`] nada más decodificarse.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;

use crate::models::import::{CustomerRecord, FareRecord, ImportBatch, TripRecord, VehicleRecord};
use crate::utils::errors::{invalid_input_error, AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportFormat {
    Fleet,
    CarSharing,
}

impl FromStr for ImportFormat {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fleet" | "taxi" => Ok(ImportFormat::Fleet),
            "car_sharing" | "carsharing" => Ok(ImportFormat::CarSharing),
            other => Err(invalid_input_error(&format!("unsupported import format '{}'", other))),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ImportQuery {
    pub format: Option<String>,
}

// Formato `fleet`

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FleetVehicleDto {
    #[serde(default)]
    pub license_plate: String,
    #[serde(default)]
    pub driver: String,
    #[serde(default)]
    pub fares: Vec<FleetFareDto>,
    #[serde(default)]
    pub services: Vec<FleetFareDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FleetFareDto {
    pub from: String,
    pub to: String,
    pub distance: f64,
    pub paid_amount: Decimal,
    pub fare_start_date: DateTime<Utc>,
}

impl From<FleetFareDto> for FareRecord {
    fn from(dto: FleetFareDto) -> Self {
        FareRecord {
            origin: dto.from,
            destination: dto.to,
            distance: dto.distance,
            paid_amount: dto.paid_amount,
            started_at: dto.fare_start_date,
        }
    }
}

impl From<FleetVehicleDto> for VehicleRecord {
    fn from(dto: FleetVehicleDto) -> Self {
        let fares = dto
            .fares
            .into_iter()
            .chain(dto.services)
            .map(FareRecord::from)
            .collect();
        VehicleRecord {
            id: None,
            license_plate: dto.license_plate,
            driver: dto.driver,
            model: None,
            total_distance: None,
            distance_since_maintenance: None,
            fares,
        }
    }
}

// Formato `car_sharing`

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CarSharingDto {
    #[serde(default)]
    pub cars: Vec<CarDto>,
    #[serde(default)]
    pub customers: Vec<CustomerDto>,
    #[serde(default)]
    pub trips: Vec<TripDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CarDto {
    pub id: i32,
    #[serde(default)]
    pub license_plate: String,
    #[serde(default)]
    pub driver: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub total_distance: f64,
    #[serde(default)]
    pub distance_since_last_maintenance: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CustomerDto {
    pub id: i32,
    pub name: String,
    pub balance: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TripDto {
    pub id: i32,
    pub car_id: i32,
    pub customer_id: Option<i32>,
    pub distance: f64,
    pub paid_amount: Decimal,
    pub from: Option<String>,
    pub to: Option<String>,
    pub fare_start_date: Option<DateTime<Utc>>,
}

impl From<CarSharingDto> for ImportBatch {
    fn from(dto: CarSharingDto) -> Self {
        ImportBatch {
            vehicles: dto
                .cars
                .into_iter()
                .map(|car| VehicleRecord {
                    id: Some(car.id),
                    license_plate: car.license_plate,
                    driver: car.driver,
                    model: Some(car.model),
                    total_distance: Some(car.total_distance),
                    distance_since_maintenance: Some(car.distance_since_last_maintenance),
                    fares: Vec::new(),
                })
                .collect(),
            customers: dto
                .customers
                .into_iter()
                .map(|c| CustomerRecord {
                    id: c.id,
                    name: c.name,
                    balance: c.balance,
                })
                .collect(),
            trips: dto
                .trips
                .into_iter()
                .map(|t| TripRecord {
                    id: t.id,
                    vehicle_id: t.car_id,
                    customer_id: t.customer_id,
                    distance: t.distance,
                    paid_amount: t.paid_amount,
                    origin: t.from,
                    destination: t.to,
                    started_at: t.fare_start_date,
                })
                .collect(),
        }
    }
}

/// Decodificar el cuerpo de una importación.
///
/// Sin formato explícito se detecta por la forma del JSON: un array es
/// `fleet` y un objeto es `car_sharing`. Un error de decodificación aborta
/// antes de tocar el almacén.
pub fn decode(format: Option<ImportFormat>, body: &str) -> AppResult<ImportBatch> {
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| invalid_input_error(&format!("import body is not valid JSON: {}", e)))?;

    let format = match format {
        Some(format) => format,
        None if value.is_array() => ImportFormat::Fleet,
        None if value.is_object() => ImportFormat::CarSharing,
        None => return Err(invalid_input_error("cannot detect import format: expected a JSON array or object")),
    };

    match format {
        ImportFormat::Fleet => {
            let vehicles: Vec<FleetVehicleDto> = serde_json::from_value(value)
                .map_err(|e| invalid_input_error(&format!("invalid fleet import: {}", e)))?;
            if vehicles.is_empty() {
                return Err(invalid_input_error("fleet import contains no vehicles"));
            }
            Ok(ImportBatch {
                vehicles: vehicles.into_iter().map(VehicleRecord::from).collect(),
                ..Default::default()
            })
        }
        ImportFormat::CarSharing => {
            let dto: CarSharingDto = serde_json::from_value(value)
                .map_err(|e| invalid_input_error(&format!("invalid car sharing import: {}", e)))?;
            Ok(ImportBatch::from(dto))
        }
    }
}
