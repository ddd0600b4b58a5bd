//! Fleet billing
//!
//! Motor de reglas de una flota de coches compartidos: tarificación de
//! viajes, libro de tarifas, mantenimiento, notificaciones e importación de
//! lotes externos, expuesto sobre una API HTTP con Axum.

pub mod config;
pub mod controllers;
pub mod database;
pub mod dto;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;

pub use routes::create_router;
pub use state::AppState;
