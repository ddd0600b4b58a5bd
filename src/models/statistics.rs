//! Modelos de estadísticas
//!
//! Este módulo contiene los modelos del informe de la flota
//! y de los rankings de clientes.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::customer::Customer;
use crate::models::fare::Fare;
use crate::models::vehicle::Vehicle;

/// Gasto acumulado de un cliente
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerSpending {
    pub customer: Customer,
    pub total_spent: Decimal,
}

/// Resumen por vehículo de sus tarifas
#[derive(Debug, Clone, Serialize)]
pub struct VehicleFareSummary {
    pub license_plate: String,
    pub fare_count: usize,
    pub short_trips: usize,
    pub long_trips: usize,
    pub average_fare_distance: f64,
}

/// Informe completo de la flota
#[derive(Debug, Clone, Serialize)]
pub struct FleetStatistics {
    pub generated_at: DateTime<Utc>,

    // Estadísticas de taxi
    pub vehicle_summaries: Vec<VehicleFareSummary>,
    pub longest_fare: Option<Fare>,

    // Estadísticas de car sharing
    pub most_used_car: Option<Vehicle>,
    pub average_car_distance: f64,
    pub vehicles_needing_maintenance: Vec<Vehicle>,
    pub vehicles_overdue_for_service: Vec<Vehicle>,
    pub top_paying_customers: Vec<CustomerSpending>,
    pub customers_with_insufficient_funds: Vec<Customer>,
}
