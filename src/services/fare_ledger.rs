//! Libro de tarifas
//!
//! Crea los registros de tarifa, los asocia a vehículo y cliente y decide
//! qué tarifas importadas son nuevas según la clave (inicio, origen, destino).

use chrono::{DateTime, Utc};
use std::collections::HashSet;

use crate::models::import::FareRecord;
use crate::models::{Customer, Fare, FareKey, Vehicle};
use crate::services::pricing::fare_cost;
use crate::utils::errors::AppResult;

pub const TRIP_ORIGIN: &str = "Trip Start";
pub const TRIP_DESTINATION: &str = "Trip End";

/// Tarifa de un viaje completado, con importe calculado por la tarificación
pub fn trip_fare(
    vehicle: &Vehicle,
    customer: &Customer,
    distance: f64,
    started_at: DateTime<Utc>,
) -> AppResult<Fare> {
    Ok(Fare {
        id: 0,
        vehicle_id: vehicle.id,
        customer_id: Some(customer.id),
        distance,
        paid_amount: fare_cost(distance)?,
        origin: TRIP_ORIGIN.to_string(),
        destination: TRIP_DESTINATION.to_string(),
        started_at,
    })
}

/// Tarifa importada: conserva el importe recibido, sin recalcular
pub fn imported_fare(vehicle_id: i32, record: &FareRecord) -> Fare {
    Fare {
        id: 0,
        vehicle_id,
        customer_id: None,
        distance: record.distance,
        paid_amount: record.paid_amount,
        origin: record.origin.clone(),
        destination: record.destination.clone(),
        started_at: record.started_at,
    }
}

/// Liga una tarifa suministrada al vehículo indicado
pub fn bind_to_vehicle(mut fare: Fare, vehicle: &Vehicle) -> Fare {
    fare.id = 0;
    fare.vehicle_id = vehicle.id;
    fare
}

/// Filtra las tarifas entrantes que ya existen (o que se repiten en la
/// propia entrada) según la clave de deduplicación.
///
/// Devuelve las nuevas en orden de llegada y el número de descartadas.
pub fn new_fares(existing: &[Fare], incoming: Vec<Fare>) -> (Vec<Fare>, usize) {
    let mut seen: HashSet<FareKey> = existing.iter().map(Fare::key).collect();
    let mut skipped = 0;
    let mut accepted = Vec::with_capacity(incoming.len());

    for fare in incoming {
        if seen.insert(fare.key()) {
            accepted.push(fare);
        } else {
            skipped += 1;
        }
    }

    (accepted, skipped)
}
