//! Servicio de estadísticas
//!
//! Genera el informe agregado de la flota a partir de una lectura del
//! almacén. No toma la compuerta de escritura.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;

use crate::models::statistics::{FleetStatistics, VehicleFareSummary};
use crate::models::{Customer, Fare, Vehicle};
use crate::repositories::FleetStore;
use crate::services::queries;
use crate::utils::errors::AppResult;

/// Distancia por debajo de la cual un viaje se considera corto
pub const SHORT_TRIP_DISTANCE: f64 = 10.0;

/// Número de clientes en el ranking del informe
pub const TOP_CUSTOMERS_IN_REPORT: usize = 10;

pub struct StatisticsService {
    store: Arc<dyn FleetStore>,
    maintenance_threshold: f64,
}

impl StatisticsService {
    /// `maintenance_threshold` es el mismo umbral que aplica la política de mantenimiento
    pub fn new(store: Arc<dyn FleetStore>, maintenance_threshold: f64) -> Self {
        Self {
            store,
            maintenance_threshold,
        }
    }

    pub async fn report(&self) -> AppResult<FleetStatistics> {
        let vehicles = self.store.list_vehicles().await?;
        let customers = self.store.list_customers().await?;
        let fares = self.store.list_fares().await?;

        debug!(
            "📊 Generando informe: {} vehículos, {} clientes, {} tarifas",
            vehicles.len(),
            customers.len(),
            fares.len()
        );

        build_report(&vehicles, &customers, &fares, self.maintenance_threshold, Utc::now())
    }
}

fn build_report(
    vehicles: &[Vehicle],
    customers: &[Customer],
    fares: &[Fare],
    maintenance_threshold: f64,
    now: DateTime<Utc>,
) -> AppResult<FleetStatistics> {
    let vehicle_summaries = vehicles
        .iter()
        .map(|vehicle| {
            let own: Vec<&Fare> = fares.iter().filter(|f| f.vehicle_id == vehicle.id).collect();
            let average_fare_distance = if own.is_empty() {
                0.0
            } else {
                own.iter().map(|f| f.distance).sum::<f64>() / own.len() as f64
            };
            VehicleFareSummary {
                license_plate: vehicle.license_plate.clone(),
                fare_count: own.len(),
                short_trips: own.iter().filter(|f| f.distance < SHORT_TRIP_DISTANCE).count(),
                long_trips: own.iter().filter(|f| f.is_long_trip()).count(),
                average_fare_distance,
            }
        })
        .collect();

    // en empate se queda la primera
    let longest_fare = fares
        .iter()
        .fold(None, |best: Option<&Fare>, fare| match best {
            Some(current) if current.distance >= fare.distance => Some(current),
            _ => Some(fare),
        })
        .cloned();

    Ok(FleetStatistics {
        generated_at: now,
        vehicle_summaries,
        longest_fare,
        most_used_car: queries::most_used(vehicles).cloned(),
        average_car_distance: queries::average_distance(vehicles),
        vehicles_needing_maintenance: vehicles
            .iter()
            .filter(|v| v.needs_maintenance(maintenance_threshold))
            .cloned()
            .collect(),
        vehicles_overdue_for_service: vehicles
            .iter()
            .filter(|v| v.is_maintenance_overdue(now))
            .cloned()
            .collect(),
        top_paying_customers: queries::top_paying(fares, customers, TOP_CUSTOMERS_IN_REPORT)?,
        customers_with_insufficient_funds: customers
            .iter()
            .filter(|c| !c.has_sufficient_funds())
            .cloned()
            .collect(),
    })
}
