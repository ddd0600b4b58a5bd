//! Modelo de Vehicle
//!
//! Este módulo contiene el struct Vehicle de la flota compartida.
//! Mapea a la tabla `vehicles`; las tarifas se cargan aparte.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::fare::Fare;

/// Distancia desde el último mantenimiento a partir de la cual es obligatorio
pub const MAINTENANCE_DISTANCE_THRESHOLD: f64 = 200.0;

/// Días sin servicio a partir de los cuales el mantenimiento está atrasado
pub const SERVICE_INTERVAL_DAYS: i64 = 90;

/// Modelo asignado a vehículos importados sin información de modelo
pub const UNKNOWN_MODEL: &str = "Unknown";

/// Vehículo de la flota, identificado por su matrícula
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Vehicle {
    pub id: i32,
    pub license_plate: String,
    pub driver: String,
    pub model: String,
    pub total_distance: f64,
    pub distance_since_maintenance: f64,
    pub last_service_date: DateTime<Utc>,
    #[sqlx(skip)]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fares: Vec<Fare>,
}

impl Vehicle {
    /// Crear un vehículo nuevo, todavía sin id asignado por el store
    pub fn new(license_plate: impl Into<String>, driver: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            id: 0,
            license_plate: license_plate.into(),
            driver: driver.into(),
            model: model.into(),
            total_distance: 0.0,
            distance_since_maintenance: 0.0,
            last_service_date: Utc::now(),
            fares: Vec::new(),
        }
    }

    /// Sumar la distancia de un viaje a ambos contadores
    pub fn record_distance(&mut self, distance: f64) {
        self.total_distance += distance;
        self.distance_since_maintenance += distance;
    }

    /// Reiniciar el contador de mantenimiento
    pub fn reset_maintenance(&mut self, serviced_at: DateTime<Utc>) {
        self.distance_since_maintenance = 0.0;
        self.last_service_date = serviced_at;
    }

    /// El umbral es configurable; por defecto [`MAINTENANCE_DISTANCE_THRESHOLD`]
    pub fn needs_maintenance(&self, threshold: f64) -> bool {
        self.distance_since_maintenance >= threshold
    }

    pub fn is_maintenance_overdue(&self, now: DateTime<Utc>) -> bool {
        now - self.last_service_date > Duration::days(SERVICE_INTERVAL_DAYS)
    }

    /// Búsqueda por subcadena sin distinguir mayúsculas
    pub fn matches_search(&self, license_plate: Option<&str>, driver: Option<&str>) -> bool {
        fn contains(haystack: &str, needle: Option<&str>) -> bool {
            match needle.map(str::trim).filter(|n| !n.is_empty()) {
                Some(n) => haystack.to_lowercase().contains(&n.to_lowercase()),
                None => true,
            }
        }

        contains(&self.license_plate, license_plate) && contains(&self.driver, driver)
    }
}
