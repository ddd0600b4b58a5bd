//! Services module
//!
//! Este módulo contiene la lógica de negocio de la flota: tarificación,
//! libro de tarifas, mantenimiento, notificaciones, el servicio de flota,
//! la importación y las estadísticas.

pub mod fare_ledger;
pub mod fleet_service;
pub mod import_service;
pub mod maintenance;
pub mod notifications;
pub mod pricing;
pub mod queries;
pub mod statistics_service;

pub use fleet_service::{FareReceipt, FleetService, TripReceipt, TripStart, VehicleUpdate, WarningSink};
pub use import_service::ImportService;
pub use maintenance::{ChanceSource, FixedChance, MaintenancePolicy, MaintenanceReason};
pub use notifications::{EventJournal, FleetEvent, FleetObserver, Notifier, TracingObserver};
pub use statistics_service::StatisticsService;
