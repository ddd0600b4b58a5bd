//! Canal de notificaciones de la flota
//!
//! Los eventos se entregan de forma síncrona a todos los observadores
//! registrados antes de que la operación que los provoca devuelva el
//! control. Los observadores no deben volver a llamar al servicio.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{Customer, Vehicle};

/// Datos de un viaje iniciado o finalizado
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TripEvent {
    pub vehicle_id: i32,
    pub license_plate: String,
    pub model: String,
    pub customer_id: i32,
    pub customer_name: String,
    pub distance: f64,
    pub cost: Decimal,
}

impl TripEvent {
    pub fn new(vehicle: &Vehicle, customer: &Customer, distance: f64, cost: Decimal) -> Self {
        Self {
            vehicle_id: vehicle.id,
            license_plate: vehicle.license_plate.clone(),
            model: vehicle.model.clone(),
            customer_id: customer.id,
            customer_name: customer.name.clone(),
            distance,
            cost,
        }
    }
}

/// Datos de un mantenimiento realizado
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaintenanceEvent {
    pub vehicle_id: i32,
    pub model: String,
    pub license_plate: String,
    /// Distancia total del vehículo en el momento del disparo
    pub total_distance_at_trigger: f64,
}

/// Datos de un intento de viaje sin saldo suficiente
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsufficientFundsEvent {
    pub customer_id: i32,
    pub customer_name: String,
    pub current_balance: Decimal,
    pub minimum_balance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum FleetEvent {
    TripStarted(TripEvent),
    TripFinished(TripEvent),
    MaintenancePerformed(MaintenanceEvent),
    InsufficientFunds(InsufficientFundsEvent),
}

impl FleetEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            FleetEvent::TripStarted(_) => "trip_started",
            FleetEvent::TripFinished(_) => "trip_finished",
            FleetEvent::MaintenancePerformed(_) => "maintenance_performed",
            FleetEvent::InsufficientFunds(_) => "insufficient_funds",
        }
    }
}

/// Observador de eventos de la flota
pub trait FleetObserver: Send + Sync {
    fn on_event(&self, event: &FleetEvent);
}

/// Distribuidor síncrono de eventos
#[derive(Clone, Default)]
pub struct Notifier {
    observers: Vec<Arc<dyn FleetObserver>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(mut self, observer: Arc<dyn FleetObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn publish(&self, event: FleetEvent) {
        for observer in &self.observers {
            observer.on_event(&event);
        }
    }
}

/// Registra cada evento en el log
#[derive(Debug, Default)]
pub struct TracingObserver;

impl FleetObserver for TracingObserver {
    fn on_event(&self, event: &FleetEvent) {
        match event {
            FleetEvent::TripStarted(e) => info!(
                "🚗 Viaje iniciado: {} ({}) para {} - {:.2} km, coste estimado {}",
                e.license_plate, e.model, e.customer_name, e.distance, e.cost
            ),
            FleetEvent::TripFinished(e) => info!(
                "🏁 Viaje finalizado: {} ({}) para {} - {:.2} km, coste {}",
                e.license_plate, e.model, e.customer_name, e.distance, e.cost
            ),
            FleetEvent::MaintenancePerformed(e) => info!(
                "🔧 Mantenimiento realizado: {} ({}) con {:.2} km totales",
                e.license_plate, e.model, e.total_distance_at_trigger
            ),
            FleetEvent::InsufficientFunds(e) => warn!(
                "💸 Saldo insuficiente: {} (ID: {}) tiene {}, mínimo {}",
                e.customer_name, e.customer_id, e.current_balance, e.minimum_balance
            ),
        }
    }
}

/// Entrada del diario de eventos
#[derive(Debug, Clone, Serialize)]
pub struct JournalEntry {
    pub id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub event: FleetEvent,
}

/// Diario acotado con los últimos eventos emitidos
#[derive(Debug)]
pub struct EventJournal {
    capacity: usize,
    entries: Mutex<VecDeque<JournalEntry>>,
}

impl EventJournal {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(VecDeque::new()),
        }
    }

    /// Copia de las entradas, de la más antigua a la más reciente
    pub fn entries(&self) -> Vec<JournalEntry> {
        self.lock().iter().cloned().collect()
    }

    /// Sólo los eventos, en orden de emisión
    pub fn events(&self) -> Vec<FleetEvent> {
        self.lock().iter().map(|entry| entry.event.clone()).collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<JournalEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl FleetObserver for EventJournal {
    fn on_event(&self, event: &FleetEvent) {
        let mut entries = self.lock();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(JournalEntry {
            id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            event: event.clone(),
        });
    }
}
