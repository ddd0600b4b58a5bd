//! Modelo de Fare
//!
//! Una tarifa es un viaje facturado (o importado) ligado a un vehículo y,
//! opcionalmente, a un cliente.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Importe a partir del cual se avisa de una tarifa muy cara
pub const EXPENSIVE_FARE_THRESHOLD: Decimal = Decimal::from_parts(9999, 0, 0, false, 0);

/// Distancia a partir de la cual un viaje se considera largo
pub const LONG_TRIP_DISTANCE: f64 = 100.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Fare {
    pub id: i32,
    pub vehicle_id: i32,
    pub customer_id: Option<i32>,
    pub distance: f64,
    pub paid_amount: Decimal,
    pub origin: String,
    pub destination: String,
    pub started_at: DateTime<Utc>,
}

/// Clave de deduplicación: (inicio, origen, destino)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FareKey {
    pub started_at: DateTime<Utc>,
    pub origin: String,
    pub destination: String,
}

impl Fare {
    pub fn key(&self) -> FareKey {
        FareKey {
            started_at: self.started_at,
            origin: self.origin.clone(),
            destination: self.destination.clone(),
        }
    }

    pub fn is_long_trip(&self) -> bool {
        self.distance > LONG_TRIP_DISTANCE
    }

    pub fn is_expensive(&self) -> bool {
        self.paid_amount > EXPENSIVE_FARE_THRESHOLD
    }
}
