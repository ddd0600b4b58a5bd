//! Modelo de Customer
//!
//! Clientes de la flota con su saldo en moneda decimal.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Saldo mínimo para poder iniciar un viaje (40 unidades)
pub const MINIMUM_TRIP_BALANCE: Decimal = Decimal::from_parts(40, 0, 0, false, 0);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Customer {
    pub id: i32,
    pub name: String,
    pub balance: Decimal,
}

impl Customer {
    pub fn new(name: impl Into<String>, balance: Decimal) -> Self {
        Self {
            id: 0,
            name: name.into(),
            balance,
        }
    }

    pub fn has_sufficient_funds(&self) -> bool {
        self.balance >= MINIMUM_TRIP_BALANCE
    }
}
