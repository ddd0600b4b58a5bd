//! Utilidades de validación
//!
//! Este módulo contiene funciones helper para validar los valores que
//! llegan a las operaciones de la flota (distancias, importes, textos).

use rust_decimal::Decimal;
use validator::ValidationError;

use crate::utils::errors::{validation_error, AppResult};

/// Distancia máxima aceptada para un viaje o tarifa, en km
pub const MAX_DISTANCE: f64 = 1_000_000_000.0;

/// Validar que una distancia sea finita y esté en `[0, MAX_DISTANCE]`
pub fn validate_distance(value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || !(0.0..=MAX_DISTANCE).contains(&value) {
        let mut error = ValidationError::new("distance");
        error.add_param("value".into(), &value.to_string());
        error.add_param("min".into(), &0.0);
        error.add_param("max".into(), &MAX_DISTANCE);
        return Err(error);
    }
    Ok(())
}

/// Validar que un importe no sea negativo
pub fn validate_non_negative_amount(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        let mut error = ValidationError::new("non_negative");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}

/// Validar que un importe sea estrictamente positivo
pub fn validate_positive_amount(value: &Decimal) -> Result<(), ValidationError> {
    if !value.is_sign_positive() || value.is_zero() {
        let mut error = ValidationError::new("positive");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}

/// Validar que un string no esté vacío
pub fn validate_not_empty(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("not_empty");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}

/// Variante de [`validate_distance`] para las entradas de los servicios
pub fn ensure_distance(field: &'static str, value: f64) -> AppResult<()> {
    validate_distance(value).map_err(|e| validation_error(field, e))
}

/// Variante de [`validate_not_empty`] para las entradas de los servicios
pub fn ensure_not_empty(field: &'static str, value: &str) -> AppResult<()> {
    validate_not_empty(value).map_err(|e| validation_error(field, e))
}

/// Resultado de una operación `checked_*` sobre importes; `None` es desbordamiento
pub fn ensure_amount(field: &'static str, value: Option<Decimal>) -> AppResult<Decimal> {
    value.ok_or_else(|| validation_error(field, ValidationError::new("amount_overflow")))
}
