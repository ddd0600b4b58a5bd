//! Configuración de variables de entorno
//!
//! Este módulo maneja la configuración del entorno y las variables que
//! gobiernan la política de mantenimiento y el diario de eventos.

use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;

use crate::models::vehicle::MAINTENANCE_DISTANCE_THRESHOLD;

/// Configuración de la política de mantenimiento
#[derive(Debug, Clone, PartialEq)]
pub struct MaintenanceConfig {
    /// Distancia desde el último servicio que obliga a mantenimiento
    pub distance_threshold: f64,
    /// Probabilidad (0-100) de mantenimiento aleatorio por viaje
    pub random_percent: u32,
    /// Semilla opcional para un generador determinista
    pub rng_seed: Option<u64>,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            distance_threshold: MAINTENANCE_DISTANCE_THRESHOLD,
            random_percent: 20,
            rng_seed: None,
        }
    }
}

/// Configuración del entorno
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub environment: String,
    pub port: u16,
    pub host: String,
    pub log_level: String,
    pub database_url: Option<String>,
    pub cors_origins: Vec<String>,
    pub maintenance: MaintenanceConfig,
    pub event_journal_capacity: usize,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            port: 3000,
            host: "0.0.0.0".to_string(),
            log_level: "info".to_string(),
            database_url: None,
            cors_origins: Vec::new(),
            maintenance: MaintenanceConfig::default(),
            event_journal_capacity: 100,
        }
    }
}

/// Leer una variable opcional y convertirla, con error legible si no es válida
fn parse_var<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("{} must be a valid value, got '{}'", name, raw)),
        _ => Ok(None),
    }
}

impl EnvironmentConfig {
    /// Construir la configuración desde las variables de entorno
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let maintenance_defaults = MaintenanceConfig::default();

        let random_percent = parse_var::<u32>("MAINTENANCE_RANDOM_PERCENT")?
            .unwrap_or(maintenance_defaults.random_percent);
        if random_percent > 100 {
            anyhow::bail!("MAINTENANCE_RANDOM_PERCENT must be between 0 and 100");
        }

        Ok(Self {
            environment: env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            port: parse_var("PORT")?.unwrap_or(defaults.port),
            host: env::var("HOST").unwrap_or(defaults.host),
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.trim().is_empty()),
            cors_origins: env::var("CORS_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            maintenance: MaintenanceConfig {
                distance_threshold: parse_var("MAINTENANCE_DISTANCE_THRESHOLD")?
                    .unwrap_or(maintenance_defaults.distance_threshold),
                random_percent,
                rng_seed: parse_var("MAINTENANCE_RNG_SEED")?,
            },
            event_journal_capacity: parse_var("EVENT_JOURNAL_CAPACITY")?
                .unwrap_or(defaults.event_journal_capacity),
        })
    }

    /// Verificar si estamos en modo desarrollo
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Obtener la dirección del servidor
    pub fn server_url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
