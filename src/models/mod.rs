//! Modelos del sistema
//!
//! Este módulo contiene los modelos de datos de la flota: vehículos,
//! clientes, tarifas, lotes de importación y estadísticas.

pub mod customer;
pub mod fare;
pub mod import;
pub mod statistics;
pub mod vehicle;

pub use customer::Customer;
pub use fare::{Fare, FareKey};
pub use vehicle::Vehicle;
