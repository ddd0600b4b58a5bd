//! Tarificación de viajes
//!
//! `coste = tarifa base + distancia × precio por km`.

use rust_decimal::Decimal;

use crate::utils::errors::{AppError, AppResult};
use crate::utils::validation::ensure_distance;

pub const BASE_FEE: f64 = 0.5;
pub const PRICE_PER_KM: f64 = 0.35;

/// Dígitos significativos con los que se fija el resultado en decimal
const SIGNIFICANT_DIGITS: u32 = 15;

/// Coste de un viaje para la distancia dada.
///
/// La fórmula se evalúa en `f64` y se convierte a `Decimal` redondeando a
/// 15 dígitos significativos, de modo que `cost(100)` es exactamente `35.5`.
/// Las distancias negativas, no finitas o mayores que `MAX_DISTANCE` son un
/// error de validación.
pub fn fare_cost(distance: f64) -> AppResult<Decimal> {
    ensure_distance("distance", distance)?;
    let raw = BASE_FEE + distance * PRICE_PER_KM;
    Decimal::from_f64_retain(raw)
        .and_then(|value| value.round_sf(SIGNIFICANT_DIGITS))
        .map(|value| value.normalize())
        .ok_or_else(|| AppError::Internal(format!("cost of {} km is not representable", distance)))
}
