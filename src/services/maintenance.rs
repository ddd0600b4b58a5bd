//! Política de mantenimiento
//!
//! Decide si un vehículo pasa por mantenimiento tras un viaje: obligatorio
//! al superar el umbral de distancia, y aleatorio con cierta probabilidad
//! por debajo de él. El azar viene de un [`ChanceSource`] inyectable para
//! que los tests puedan forzar ambas ramas.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::sync::{Arc, Mutex};

use crate::config::MaintenanceConfig;
use crate::models::Vehicle;

/// Fuente de azar: devuelve un valor uniforme en `0..100`
pub trait ChanceSource: Send + Sync {
    fn roll_percent(&self) -> u32;
}

/// Generador del hilo actual (por defecto en producción)
#[derive(Debug, Default)]
pub struct ThreadRngChance;

impl ChanceSource for ThreadRngChance {
    fn roll_percent(&self) -> u32 {
        rand::thread_rng().gen_range(0..100)
    }
}

/// Generador con semilla, reproducible entre ejecuciones
#[derive(Debug)]
pub struct SeededChance {
    rng: Mutex<StdRng>,
}

impl SeededChance {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl ChanceSource for SeededChance {
    fn roll_percent(&self) -> u32 {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        rng.gen_range(0..100)
    }
}

/// Valor fijo; `FixedChance(0)` siempre dispara, `FixedChance(99)` nunca
#[derive(Debug, Clone, Copy)]
pub struct FixedChance(pub u32);

impl ChanceSource for FixedChance {
    fn roll_percent(&self) -> u32 {
        self.0
    }
}

/// Crear la fuente de azar a partir de la configuración
pub fn chance_from_config(config: &MaintenanceConfig) -> Arc<dyn ChanceSource> {
    match config.rng_seed {
        Some(seed) => Arc::new(SeededChance::new(seed)),
        None => Arc::new(ThreadRngChance),
    }
}

/// Motivo por el que se dispara un mantenimiento
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceReason {
    DistanceThreshold,
    RandomCheck,
    Manual,
}

/// Reglas de mantenimiento tras cada viaje
#[derive(Clone)]
pub struct MaintenancePolicy {
    distance_threshold: f64,
    random_percent: u32,
    chance: Arc<dyn ChanceSource>,
}

impl MaintenancePolicy {
    pub fn new(config: &MaintenanceConfig, chance: Arc<dyn ChanceSource>) -> Self {
        Self {
            distance_threshold: config.distance_threshold,
            random_percent: config.random_percent,
            chance,
        }
    }

    /// Evalúa la política; la tirada sólo se consume por debajo del umbral
    pub fn evaluate(&self, vehicle: &Vehicle) -> Option<MaintenanceReason> {
        if vehicle.needs_maintenance(self.distance_threshold) {
            return Some(MaintenanceReason::DistanceThreshold);
        }
        if self.chance.roll_percent() < self.random_percent {
            return Some(MaintenanceReason::RandomCheck);
        }
        None
    }
}

impl std::fmt::Debug for MaintenancePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaintenancePolicy")
            .field("distance_threshold", &self.distance_threshold)
            .field("random_percent", &self.random_percent)
            .finish()
    }
}
