//! Shared application state
//!
//! Este módulo define el estado compartido de la aplicación que se pasa
//! a través del router de Axum: los servicios de la flota, el diario de
//! eventos y la configuración.

use std::sync::Arc;

use crate::config::environment::EnvironmentConfig;
use crate::repositories::FleetStore;
use crate::services::maintenance::{ChanceSource, MaintenancePolicy};
use crate::services::notifications::{EventJournal, Notifier, TracingObserver};
use crate::services::{FleetService, ImportService, StatisticsService};

#[derive(Clone)]
pub struct AppState {
    pub fleet: Arc<FleetService>,
    pub importer: Arc<ImportService>,
    pub statistics: Arc<StatisticsService>,
    pub journal: Arc<EventJournal>,
    pub config: EnvironmentConfig,
}

impl AppState {
    /// Montar los servicios sobre un almacén. Servicio de flota e importador
    /// comparten la compuerta de escritura.
    pub fn new(store: Arc<dyn FleetStore>, config: EnvironmentConfig, chance: Arc<dyn ChanceSource>) -> Self {
        let journal = Arc::new(EventJournal::new(config.event_journal_capacity));
        let notifier = Notifier::new()
            .subscribe(Arc::new(TracingObserver))
            .subscribe(journal.clone());
        let policy = MaintenancePolicy::new(&config.maintenance, chance);

        let fleet = FleetService::new(Arc::clone(&store), notifier, policy);
        let importer = ImportService::new(Arc::clone(&store), fleet.write_gate());
        let statistics = StatisticsService::new(store, config.maintenance.distance_threshold);

        Self {
            fleet: Arc::new(fleet),
            importer: Arc::new(importer),
            statistics: Arc::new(statistics),
            journal,
            config,
        }
    }
}
