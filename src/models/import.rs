//! Representación interna de un lote importado
//!
//! Los dos formatos de importación (flota con tarifas anidadas y
//! car-sharing con tres colecciones) se normalizan a [`ImportBatch`]
//! antes de llegar al servicio de importación.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// Lote normalizado listo para reconciliar
#[derive(Debug, Clone, Default)]
pub struct ImportBatch {
    pub vehicles: Vec<VehicleRecord>,
    pub customers: Vec<CustomerRecord>,
    pub trips: Vec<TripRecord>,
}

impl ImportBatch {
    /// Un lote sin elementos no toma la compuerta de escritura
    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty() && self.customers.is_empty() && self.trips.is_empty()
    }
}

/// Vehículo importado. Los campos `Option` sólo sobrescriben si vienen informados.
#[derive(Debug, Clone, Default)]
pub struct VehicleRecord {
    pub id: Option<i32>,
    pub license_plate: String,
    pub driver: String,
    pub model: Option<String>,
    pub total_distance: Option<f64>,
    pub distance_since_maintenance: Option<f64>,
    /// Tarifas que se adjuntan con deduplicación por (inicio, origen, destino)
    pub fares: Vec<FareRecord>,
}

#[derive(Debug, Clone)]
pub struct FareRecord {
    pub origin: String,
    pub destination: String,
    pub distance: f64,
    pub paid_amount: Decimal,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CustomerRecord {
    pub id: i32,
    pub name: String,
    pub balance: Decimal,
}

/// Viaje importado por identidad; el importe nunca se recalcula
#[derive(Debug, Clone)]
pub struct TripRecord {
    pub id: i32,
    pub vehicle_id: i32,
    pub customer_id: Option<i32>,
    pub distance: f64,
    pub paid_amount: Decimal,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
}

/// Resumen de una importación
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportReport {
    pub vehicles_inserted: usize,
    pub vehicles_updated: usize,
    pub customers_inserted: usize,
    pub customers_updated: usize,
    pub fares_inserted: usize,
    pub fares_updated: usize,
    pub duplicate_fares_skipped: usize,
    pub warnings: Vec<String>,
}
