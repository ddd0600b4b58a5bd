//! Servicio de flota
//!
//! Este módulo contiene la lógica de negocio de la flota compartida:
//! alta y edición de vehículos y clientes, inicio y fin de viajes, registro
//! de tarifas, mantenimiento y consultas agregadas.
//!
//! Todas las escrituras pasan por la misma compuerta asíncrona que usa el
//! servicio de importación, de modo que las lecturas-modificaciones de
//! distancias y saldos nunca pierden actualizaciones.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::models::customer::MINIMUM_TRIP_BALANCE;
use crate::models::fare::EXPENSIVE_FARE_THRESHOLD;
use crate::models::statistics::CustomerSpending;
use crate::models::{Customer, Fare, Vehicle};
use crate::repositories::{ChangeSet, FleetStore};
use crate::services::fare_ledger::{bind_to_vehicle, trip_fare};
use crate::services::maintenance::{MaintenancePolicy, MaintenanceReason};
use crate::services::notifications::{
    FleetEvent, InsufficientFundsEvent, MaintenanceEvent, Notifier, TripEvent,
};
use crate::services::pricing::fare_cost;
use crate::services::queries;
use crate::utils::errors::{conflict_error, not_found_error, validation_error, AppError, AppResult};
use crate::utils::validation::{
    ensure_amount, ensure_distance, ensure_not_empty, validate_non_negative_amount,
    validate_positive_amount,
};

/// Receptor opcional de avisos de tarifas caras
pub trait WarningSink: Send + Sync {
    fn warn(&self, message: &str) -> anyhow::Result<()>;
}

impl<F> WarningSink for F
where
    F: Fn(&str) -> anyhow::Result<()> + Send + Sync,
{
    fn warn(&self, message: &str) -> anyhow::Result<()> {
        self(message)
    }
}

/// Resultado de intentar iniciar un viaje
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TripStart {
    Started {
        estimated_cost: Decimal,
    },
    InsufficientFunds {
        current_balance: Decimal,
        minimum_balance: Decimal,
    },
}

impl TripStart {
    pub fn is_started(&self) -> bool {
        matches!(self, TripStart::Started { .. })
    }
}

/// Estado posterior a un viaje finalizado
#[derive(Debug, Clone, Serialize)]
pub struct TripReceipt {
    pub fare: Fare,
    pub vehicle: Vehicle,
    pub customer: Customer,
    pub maintenance: Option<MaintenanceReason>,
}

/// Estado posterior al registro de una tarifa
#[derive(Debug, Clone, Serialize)]
pub struct FareReceipt {
    pub fare: Fare,
    pub vehicle: Vehicle,
    pub maintenance: Option<MaintenanceReason>,
}

/// Campos editables de un vehículo; `None` deja el valor actual
#[derive(Debug, Clone, Default)]
pub struct VehicleUpdate {
    pub driver: Option<String>,
    pub model: Option<String>,
}

pub struct FleetService {
    store: Arc<dyn FleetStore>,
    notifier: Notifier,
    maintenance: MaintenancePolicy,
    write_gate: Arc<Mutex<()>>,
}

impl FleetService {
    pub fn new(store: Arc<dyn FleetStore>, notifier: Notifier, maintenance: MaintenancePolicy) -> Self {
        Self {
            store,
            notifier,
            maintenance,
            write_gate: Arc::new(Mutex::new(())),
        }
    }

    /// Compuerta de escritura, para compartirla con el importador
    pub fn write_gate(&self) -> Arc<Mutex<()>> {
        Arc::clone(&self.write_gate)
    }

    // ----------------------------------------------------------------
    // Vehículos
    // ----------------------------------------------------------------

    pub async fn list_vehicles(&self) -> AppResult<Vec<Vehicle>> {
        self.store.list_vehicles().await
    }

    /// Obtener un vehículo por matrícula con sus tarifas cargadas
    pub async fn get_vehicle(&self, license_plate: &str) -> AppResult<Vehicle> {
        let mut vehicle = self.require_vehicle(license_plate).await?;
        vehicle.fares = self.store.fares_for_vehicle(vehicle.id).await?;
        Ok(vehicle)
    }

    pub async fn get_vehicle_by_id(&self, id: i32) -> AppResult<Vehicle> {
        let mut vehicle = self
            .store
            .find_vehicle_by_id(id)
            .await?
            .ok_or_else(|| not_found_error("Vehicle", &id.to_string()))?;
        vehicle.fares = self.store.fares_for_vehicle(vehicle.id).await?;
        Ok(vehicle)
    }

    /// Dar de alta un vehículo; la matrícula debe ser única
    pub async fn add_vehicle(&self, license_plate: &str, driver: &str, model: &str) -> AppResult<Vehicle> {
        let license_plate = license_plate.trim();
        ensure_not_empty("license_plate", license_plate)?;
        ensure_not_empty("model", model)?;

        let _guard = self.write_gate.lock().await;

        if self.store.find_vehicle_by_plate(license_plate).await?.is_some() {
            return Err(conflict_error("Vehicle", "license_plate", license_plate));
        }

        let mut vehicle = Vehicle::new(license_plate, driver.trim(), model.trim());
        let mut changes = ChangeSet::new();
        changes.insert_vehicle(vehicle.clone());
        let receipt = self.store.commit(changes).await?;
        vehicle.id = first_id(&receipt.vehicle_ids, "vehicle")?;

        info!("🚙 Vehículo registrado: {} (ID: {})", vehicle.license_plate, vehicle.id);
        Ok(vehicle)
    }

    pub async fn update_vehicle(&self, license_plate: &str, update: VehicleUpdate) -> AppResult<Vehicle> {
        if let Some(model) = &update.model {
            ensure_not_empty("model", model)?;
        }

        let _guard = self.write_gate.lock().await;
        let mut vehicle = self.require_vehicle(license_plate).await?;

        if let Some(driver) = update.driver {
            vehicle.driver = driver.trim().to_string();
        }
        if let Some(model) = update.model {
            vehicle.model = model.trim().to_string();
        }

        let mut changes = ChangeSet::new();
        changes.update_vehicle(vehicle.clone());
        self.store.commit(changes).await?;

        info!("✏️ Vehículo actualizado: {}", vehicle.license_plate);
        Ok(vehicle)
    }

    /// Borrar un vehículo junto con sus tarifas
    pub async fn delete_vehicle(&self, license_plate: &str) -> AppResult<()> {
        let _guard = self.write_gate.lock().await;
        let vehicle = self.require_vehicle(license_plate).await?;

        let mut changes = ChangeSet::new();
        changes.delete_vehicle(vehicle.id);
        self.store.commit(changes).await?;

        info!("🗑️ Vehículo eliminado: {} (ID: {})", vehicle.license_plate, vehicle.id);
        Ok(())
    }

    // ----------------------------------------------------------------
    // Clientes
    // ----------------------------------------------------------------

    pub async fn list_customers(&self) -> AppResult<Vec<Customer>> {
        self.store.list_customers().await
    }

    pub async fn get_customer(&self, id: i32) -> AppResult<Customer> {
        self.require_customer(id).await
    }

    /// Buscar un cliente por nombre exacto, sin distinguir mayúsculas
    pub async fn find_customer_by_name(&self, name: &str) -> AppResult<Customer> {
        let wanted = name.trim().to_lowercase();
        self.store
            .list_customers()
            .await?
            .into_iter()
            .find(|c| c.name.trim().to_lowercase() == wanted)
            .ok_or_else(|| not_found_error("Customer", name.trim()))
    }

    pub async fn add_customer(&self, name: &str, balance: Decimal) -> AppResult<Customer> {
        ensure_not_empty("name", name)?;
        validate_non_negative_amount(&balance).map_err(|e| validation_error("balance", e))?;

        let _guard = self.write_gate.lock().await;

        let mut customer = Customer::new(name.trim(), balance);
        let mut changes = ChangeSet::new();
        changes.insert_customer(customer.clone());
        let receipt = self.store.commit(changes).await?;
        customer.id = first_id(&receipt.customer_ids, "customer")?;

        info!("👤 Cliente registrado: {} (ID: {})", customer.name, customer.id);
        Ok(customer)
    }

    pub async fn rename_customer(&self, id: i32, name: &str) -> AppResult<Customer> {
        ensure_not_empty("name", name)?;

        let _guard = self.write_gate.lock().await;
        let mut customer = self.require_customer(id).await?;
        customer.name = name.trim().to_string();

        let mut changes = ChangeSet::new();
        changes.update_customer(customer.clone());
        self.store.commit(changes).await?;

        Ok(customer)
    }

    /// Recargar saldo; el importe debe ser positivo
    pub async fn top_up_balance(&self, id: i32, amount: Decimal) -> AppResult<Customer> {
        validate_positive_amount(&amount).map_err(|e| validation_error("amount", e))?;

        let _guard = self.write_gate.lock().await;
        let mut customer = self.require_customer(id).await?;
        customer.balance = ensure_amount("amount", customer.balance.checked_add(amount))?;

        let mut changes = ChangeSet::new();
        changes.update_customer(customer.clone());
        self.store.commit(changes).await?;

        info!("💰 Recarga de {} para {} (saldo: {})", amount, customer.name, customer.balance);
        Ok(customer)
    }

    /// Borrar un cliente; sus tarifas se conservan sin cliente
    pub async fn delete_customer(&self, id: i32) -> AppResult<()> {
        let _guard = self.write_gate.lock().await;
        let customer = self.require_customer(id).await?;

        let mut changes = ChangeSet::new();
        changes.delete_customer(customer.id);
        self.store.commit(changes).await?;

        info!("🗑️ Cliente eliminado: {} (ID: {})", customer.name, customer.id);
        Ok(())
    }

    // ----------------------------------------------------------------
    // Viajes y tarifas
    // ----------------------------------------------------------------

    /// Comprobar saldo y estimar el coste de un viaje. No modifica nada.
    pub async fn start_trip(
        &self,
        license_plate: &str,
        customer_id: i32,
        estimated_distance: f64,
    ) -> AppResult<TripStart> {
        ensure_distance("estimated_distance", estimated_distance)?;

        let vehicle = self.require_vehicle(license_plate).await?;
        let customer = self.require_customer(customer_id).await?;

        if !customer.has_sufficient_funds() {
            self.notifier
                .publish(FleetEvent::InsufficientFunds(InsufficientFundsEvent {
                    customer_id: customer.id,
                    customer_name: customer.name.clone(),
                    current_balance: customer.balance,
                    minimum_balance: MINIMUM_TRIP_BALANCE,
                }));
            return Ok(TripStart::InsufficientFunds {
                current_balance: customer.balance,
                minimum_balance: MINIMUM_TRIP_BALANCE,
            });
        }

        let estimated_cost = fare_cost(estimated_distance)?;
        self.notifier.publish(FleetEvent::TripStarted(TripEvent::new(
            &vehicle,
            &customer,
            estimated_distance,
            estimated_cost,
        )));

        Ok(TripStart::Started { estimated_cost })
    }

    /// Cerrar un viaje: tarifa, cargo al cliente y distancia en un único commit
    pub async fn finish_trip(
        &self,
        license_plate: &str,
        customer_id: i32,
        actual_distance: f64,
    ) -> AppResult<TripReceipt> {
        ensure_distance("actual_distance", actual_distance)?;

        let _guard = self.write_gate.lock().await;
        let mut vehicle = self.require_vehicle(license_plate).await?;
        let mut customer = self.require_customer(customer_id).await?;

        let mut fare = trip_fare(&vehicle, &customer, actual_distance, Utc::now())?;
        customer.balance = ensure_amount("balance", customer.balance.checked_sub(fare.paid_amount))?;
        vehicle.record_distance(actual_distance);

        let mut changes = ChangeSet::new();
        changes
            .insert_fare(fare.clone())
            .update_customer(customer.clone())
            .update_vehicle(vehicle.clone());
        let receipt = self.store.commit(changes).await?;
        fare.id = first_id(&receipt.fare_ids, "fare")?;

        info!(
            "🏁 Viaje cerrado: {} para {} - {:.2} km, cobrado {}",
            vehicle.license_plate, customer.name, actual_distance, fare.paid_amount
        );
        self.notifier.publish(FleetEvent::TripFinished(TripEvent::new(
            &vehicle,
            &customer,
            actual_distance,
            fare.paid_amount,
        )));

        let maintenance = self.maintenance.evaluate(&vehicle);
        if let Some(reason) = maintenance {
            vehicle = self.apply_maintenance(vehicle, reason).await?;
        }

        Ok(TripReceipt {
            fare,
            vehicle,
            customer,
            maintenance,
        })
    }

    /// Registrar una tarifa suministrada para el vehículo indicado.
    ///
    /// El importe se guarda tal cual. Si supera 9999 se avisa al `sink` antes
    /// de persistir; un fallo del `sink` sólo se registra en el log.
    pub async fn add_fare(
        &self,
        license_plate: &str,
        fare: Fare,
        sink: Option<&dyn WarningSink>,
    ) -> AppResult<FareReceipt> {
        ensure_distance("distance", fare.distance)?;
        validate_non_negative_amount(&fare.paid_amount).map_err(|e| validation_error("paid_amount", e))?;

        let _guard = self.write_gate.lock().await;
        let mut vehicle = self.require_vehicle(license_plate).await?;
        if let Some(customer_id) = fare.customer_id {
            self.require_customer(customer_id).await?;
        }

        if fare.is_expensive() {
            let message = format!(
                "Fare of {} for vehicle {} exceeds {}",
                fare.paid_amount, vehicle.license_plate, EXPENSIVE_FARE_THRESHOLD
            );
            warn!("⚠️ {}", message);
            if let Some(sink) = sink {
                if let Err(e) = sink.warn(&message) {
                    warn!("⚠️ No se pudo entregar el aviso de tarifa cara: {}", e);
                }
            }
        }

        let mut fare = bind_to_vehicle(fare, &vehicle);
        vehicle.record_distance(fare.distance);

        let mut changes = ChangeSet::new();
        changes.insert_fare(fare.clone()).update_vehicle(vehicle.clone());
        let receipt = self.store.commit(changes).await?;
        fare.id = first_id(&receipt.fare_ids, "fare")?;

        debug!("🧾 Tarifa {} registrada en {}", fare.id, vehicle.license_plate);

        let maintenance = self.maintenance.evaluate(&vehicle);
        if let Some(reason) = maintenance {
            vehicle = self.apply_maintenance(vehicle, reason).await?;
        }

        Ok(FareReceipt {
            fare,
            vehicle,
            maintenance,
        })
    }

    /// Mantenimiento manual, siempre se realiza
    pub async fn perform_maintenance(&self, license_plate: &str) -> AppResult<Vehicle> {
        let _guard = self.write_gate.lock().await;
        let vehicle = self.require_vehicle(license_plate).await?;
        self.apply_maintenance(vehicle, MaintenanceReason::Manual).await
    }

    /// Reinicia el contador, persiste y notifica. El llamante ya tiene la compuerta.
    async fn apply_maintenance(&self, mut vehicle: Vehicle, reason: MaintenanceReason) -> AppResult<Vehicle> {
        let total_distance_at_trigger = vehicle.total_distance;
        vehicle.reset_maintenance(Utc::now());

        let mut changes = ChangeSet::new();
        changes.update_vehicle(vehicle.clone());
        self.store.commit(changes).await?;

        info!(
            "🔧 Mantenimiento ({:?}) en {} con {:.2} km totales",
            reason, vehicle.license_plate, total_distance_at_trigger
        );
        self.notifier
            .publish(FleetEvent::MaintenancePerformed(MaintenanceEvent {
                vehicle_id: vehicle.id,
                model: vehicle.model.clone(),
                license_plate: vehicle.license_plate.clone(),
                total_distance_at_trigger,
            }));

        Ok(vehicle)
    }

    // ----------------------------------------------------------------
    // Consultas
    // ----------------------------------------------------------------

    pub async fn search_cars(&self, license_plate: Option<&str>, driver: Option<&str>) -> AppResult<Vec<Vehicle>> {
        let vehicles = self.store.list_vehicles().await?;
        Ok(queries::search_vehicles(vehicles, license_plate, driver))
    }

    pub async fn most_used_car(&self) -> AppResult<Option<Vehicle>> {
        let vehicles = self.store.list_vehicles().await?;
        Ok(queries::most_used(&vehicles).cloned())
    }

    pub async fn top_paying_customers(&self, count: usize) -> AppResult<Vec<CustomerSpending>> {
        let fares = self.store.list_fares().await?;
        let customers = self.store.list_customers().await?;
        queries::top_paying(&fares, &customers, count)
    }

    pub async fn average_car_distance(&self) -> AppResult<f64> {
        let vehicles = self.store.list_vehicles().await?;
        Ok(queries::average_distance(&vehicles))
    }

    async fn require_vehicle(&self, license_plate: &str) -> AppResult<Vehicle> {
        self.store
            .find_vehicle_by_plate(license_plate.trim())
            .await?
            .ok_or_else(|| not_found_error("Vehicle", license_plate))
    }

    async fn require_customer(&self, id: i32) -> AppResult<Customer> {
        self.store
            .find_customer_by_id(id)
            .await?
            .ok_or_else(|| not_found_error("Customer", &id.to_string()))
    }
}

fn first_id(ids: &[i32], entity: &str) -> AppResult<i32> {
    ids.first()
        .copied()
        .ok_or_else(|| AppError::Internal(format!("store did not assign an id to the new {}", entity)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MaintenanceConfig;
    use crate::repositories::InMemoryFleetStore;
    use crate::services::maintenance::FixedChance;
    use crate::services::notifications::EventJournal;
    use std::str::FromStr;
    use std::sync::Mutex as StdMutex;

    fn dec(value: &str) -> Decimal {
        Decimal::from_str(value).unwrap()
    }

    /// Servicio sobre un almacén en memoria con una tirada fija
    fn service_with_roll(roll: u32) -> (FleetService, Arc<EventJournal>, Arc<InMemoryFleetStore>) {
        let store = Arc::new(InMemoryFleetStore::new());
        let journal = Arc::new(EventJournal::new(50));
        let notifier = Notifier::new().subscribe(journal.clone());
        let policy = MaintenancePolicy::new(&MaintenanceConfig::default(), Arc::new(FixedChance(roll)));
        let service = FleetService::new(store.clone(), notifier, policy);
        (service, journal, store)
    }

    async fn seed_vehicle(store: &InMemoryFleetStore, plate: &str, total: f64, since: f64) -> Vehicle {
        let mut vehicle = Vehicle::new(plate, "Anna", "Corsa");
        vehicle.total_distance = total;
        vehicle.distance_since_maintenance = since;
        let mut changes = ChangeSet::new();
        changes.insert_vehicle(vehicle);
        store.commit(changes).await.unwrap();
        store.find_vehicle_by_plate(plate).await.unwrap().unwrap()
    }

    fn kinds(journal: &EventJournal) -> Vec<&'static str> {
        journal.events().iter().map(FleetEvent::kind).collect()
    }

    fn manual_fare(distance: f64, amount: &str) -> Fare {
        Fare {
            id: 0,
            vehicle_id: 0,
            customer_id: None,
            distance,
            paid_amount: dec(amount),
            origin: "Depot".to_string(),
            destination: "Airport".to_string(),
            started_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_long_trip_updates_totals_and_triggers_maintenance() {
        let (service, journal, store) = service_with_roll(99);
        seed_vehicle(&store, "CAR-1", 1000.0, 0.0).await;
        let customer = service.add_customer("Bob", Decimal::from(200)).await.unwrap();

        let receipt = service.finish_trip("CAR-1", customer.id, 2000.0).await.unwrap();

        assert_eq!(receipt.vehicle.total_distance, 3000.0);
        assert_eq!(receipt.vehicle.distance_since_maintenance, 0.0);
        assert_eq!(receipt.customer.balance, dec("-500.5"));
        assert_eq!(receipt.fare.paid_amount, dec("700.5"));
        assert_eq!(receipt.maintenance, Some(MaintenanceReason::DistanceThreshold));
        assert_eq!(kinds(&journal), vec!["trip_finished", "maintenance_performed"]);

        match &journal.events()[1] {
            FleetEvent::MaintenancePerformed(event) => {
                assert_eq!(event.total_distance_at_trigger, 3000.0);
                assert_eq!(event.license_plate, "CAR-1");
            }
            other => panic!("unexpected event {:?}", other),
        }

        let stored = store.find_customer_by_id(customer.id).await.unwrap().unwrap();
        assert_eq!(stored.balance, dec("-500.5"));
        let fares = store.fares_for_vehicle(receipt.vehicle.id).await.unwrap();
        assert_eq!(fares.len(), 1);
        assert_eq!(fares[0].origin, "Trip Start");
        assert_eq!(fares[0].destination, "Trip End");
    }

    #[tokio::test]
    async fn test_short_trip_without_random_check() {
        let (service, journal, _store) = service_with_roll(99);
        service.add_vehicle("CAR-2", "Anna", "Corsa").await.unwrap();
        let customer = service.add_customer("Bob", Decimal::from(100)).await.unwrap();

        let receipt = service.finish_trip("CAR-2", customer.id, 10.0).await.unwrap();

        assert_eq!(receipt.maintenance, None);
        assert_eq!(receipt.vehicle.distance_since_maintenance, 10.0);
        assert_eq!(receipt.customer.balance, dec("96"));
        assert_eq!(kinds(&journal), vec!["trip_finished"]);
    }

    #[tokio::test]
    async fn test_short_trip_with_random_check() {
        let (service, journal, _store) = service_with_roll(0);
        service.add_vehicle("CAR-3", "Anna", "Corsa").await.unwrap();
        let customer = service.add_customer("Bob", Decimal::from(100)).await.unwrap();

        let receipt = service.finish_trip("CAR-3", customer.id, 10.0).await.unwrap();

        assert_eq!(receipt.maintenance, Some(MaintenanceReason::RandomCheck));
        assert_eq!(receipt.vehicle.total_distance, 10.0);
        assert_eq!(receipt.vehicle.distance_since_maintenance, 0.0);
        assert_eq!(kinds(&journal), vec!["trip_finished", "maintenance_performed"]);
    }

    #[tokio::test]
    async fn test_start_trip_outcomes_do_not_mutate() {
        let (service, journal, store) = service_with_roll(99);
        service.add_vehicle("CAR-4", "Anna", "Corsa").await.unwrap();
        let rich = service.add_customer("Rich", Decimal::from(40)).await.unwrap();
        let poor = service.add_customer("Poor", dec("39.99")).await.unwrap();

        let started = service.start_trip("CAR-4", rich.id, 100.0).await.unwrap();
        assert_eq!(started, TripStart::Started { estimated_cost: dec("35.5") });

        let refused = service.start_trip("CAR-4", poor.id, 100.0).await.unwrap();
        assert!(!refused.is_started());
        assert_eq!(
            refused,
            TripStart::InsufficientFunds {
                current_balance: dec("39.99"),
                minimum_balance: Decimal::from(40),
            }
        );

        assert_eq!(kinds(&journal), vec!["trip_started", "insufficient_funds"]);
        assert!(store.list_fares().await.unwrap().is_empty());
        assert_eq!(service.get_customer(rich.id).await.unwrap().balance, Decimal::from(40));
        assert_eq!(service.get_vehicle("CAR-4").await.unwrap().total_distance, 0.0);
    }

    #[tokio::test]
    async fn test_missing_entities_are_not_found() {
        let (service, journal, _store) = service_with_roll(99);
        service.add_vehicle("CAR-5", "Anna", "Corsa").await.unwrap();
        let customer = service.add_customer("Bob", Decimal::from(100)).await.unwrap();

        assert!(matches!(
            service.start_trip("NOPE", customer.id, 1.0).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            service.finish_trip("CAR-5", 999, 1.0).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            service.perform_maintenance("NOPE").await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            service.add_fare("NOPE", manual_fare(1.0, "2"), None).await,
            Err(AppError::NotFound(_))
        ));
        assert!(journal.events().is_empty());
    }

    #[tokio::test]
    async fn test_negative_distance_is_rejected() {
        let (service, _journal, _store) = service_with_roll(99);
        service.add_vehicle("CAR-6", "Anna", "Corsa").await.unwrap();
        let customer = service.add_customer("Bob", Decimal::from(100)).await.unwrap();

        assert!(matches!(
            service.finish_trip("CAR-6", customer.id, -1.0).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            service.start_trip("CAR-6", customer.id, f64::NAN).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_unpriceable_distance_is_rejected_without_changes() {
        let (service, journal, store) = service_with_roll(99);
        service.add_vehicle("CAR-7", "Anna", "Corsa").await.unwrap();
        let customer = service.add_customer("Bob", Decimal::from(200)).await.unwrap();

        for _ in 0..2 {
            assert!(matches!(
                service.finish_trip("CAR-7", customer.id, 1e30).await,
                Err(AppError::Validation(_))
            ));
        }
        assert!(matches!(
            service.start_trip("CAR-7", customer.id, 1e30).await,
            Err(AppError::Validation(_))
        ));

        assert_eq!(service.get_customer(customer.id).await.unwrap().balance, Decimal::from(200));
        assert!(store.list_fares().await.unwrap().is_empty());
        assert!(journal.events().is_empty());
    }

    #[tokio::test]
    async fn test_balance_overflow_is_rejected_without_changes() {
        let (service, _journal, store) = service_with_roll(99);
        service.add_vehicle("CAR-8", "Anna", "Corsa").await.unwrap();
        let mut changes = ChangeSet::new();
        changes.insert_customer(Customer::new("Deep", Decimal::MIN));
        let receipt = store.commit(changes).await.unwrap();
        let deep = receipt.customer_ids[0];
        let rich = service.add_customer("Rich", Decimal::MAX).await.unwrap();

        assert!(matches!(
            service.finish_trip("CAR-8", deep, 10.0).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            service.top_up_balance(rich.id, Decimal::ONE).await,
            Err(AppError::Validation(_))
        ));

        assert_eq!(service.get_customer(deep).await.unwrap().balance, Decimal::MIN);
        assert_eq!(service.get_vehicle("CAR-8").await.unwrap().total_distance, 0.0);
        assert!(store.list_fares().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_fare_warns_for_expensive_amounts() {
        let (service, _journal, _store) = service_with_roll(99);
        service.add_vehicle("CAR-7", "Anna", "Corsa").await.unwrap();

        let warnings = StdMutex::new(Vec::new());
        let sink = |message: &str| -> anyhow::Result<()> {
            warnings.lock().unwrap().push(message.to_string());
            Ok(())
        };

        let receipt = service
            .add_fare("CAR-7", manual_fare(50.0, "10000"), Some(&sink))
            .await
            .unwrap();
        service
            .add_fare("CAR-7", manual_fare(10.0, "9999"), Some(&sink))
            .await
            .unwrap();

        assert_eq!(warnings.lock().unwrap().len(), 1);
        assert!(warnings.lock().unwrap()[0].contains("CAR-7"));
        assert_eq!(receipt.fare.paid_amount, dec("10000"));
        assert_eq!(receipt.vehicle.total_distance, 50.0);

        let vehicle = service.get_vehicle("CAR-7").await.unwrap();
        assert_eq!(vehicle.fares.len(), 2);
        assert_eq!(vehicle.total_distance, 60.0);
    }

    #[tokio::test]
    async fn test_failing_sink_does_not_abort() {
        let (service, _journal, _store) = service_with_roll(99);
        service.add_vehicle("CAR-8", "Anna", "Corsa").await.unwrap();
        let sink = |_: &str| -> anyhow::Result<()> { Err(anyhow::anyhow!("sink offline")) };

        let receipt = service
            .add_fare("CAR-8", manual_fare(5.0, "20000"), Some(&sink))
            .await
            .unwrap();

        assert!(receipt.fare.id > 0);
    }

    #[tokio::test]
    async fn test_add_fare_requires_existing_customer() {
        let (service, _journal, _store) = service_with_roll(99);
        service.add_vehicle("CAR-9", "Anna", "Corsa").await.unwrap();
        let mut fare = manual_fare(5.0, "3");
        fare.customer_id = Some(42);

        assert!(matches!(
            service.add_fare("CAR-9", fare, None).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_add_fare_crossing_threshold_runs_maintenance() {
        let (service, journal, store) = service_with_roll(99);
        seed_vehicle(&store, "CAR-10", 190.0, 190.0).await;

        let receipt = service
            .add_fare("CAR-10", manual_fare(15.0, "6"), None)
            .await
            .unwrap();

        assert_eq!(receipt.maintenance, Some(MaintenanceReason::DistanceThreshold));
        assert_eq!(receipt.vehicle.total_distance, 205.0);
        assert_eq!(receipt.vehicle.distance_since_maintenance, 0.0);
        assert_eq!(kinds(&journal), vec!["maintenance_performed"]);
    }

    #[tokio::test]
    async fn test_manual_maintenance_resets_counter() {
        let (service, journal, store) = service_with_roll(99);
        seed_vehicle(&store, "CAR-11", 120.0, 80.0).await;

        let vehicle = service.perform_maintenance("CAR-11").await.unwrap();

        assert_eq!(vehicle.distance_since_maintenance, 0.0);
        assert_eq!(vehicle.total_distance, 120.0);
        assert_eq!(kinds(&journal), vec!["maintenance_performed"]);
    }

    #[tokio::test]
    async fn test_vehicle_crud() {
        let (service, _journal, _store) = service_with_roll(99);
        let created = service.add_vehicle(" ABC-1 ", "Anna", "Golf").await.unwrap();
        assert_eq!(created.license_plate, "ABC-1");

        assert!(matches!(
            service.add_vehicle("ABC-1", "Other", "Golf").await,
            Err(AppError::Conflict(_))
        ));

        let updated = service
            .update_vehicle(
                "ABC-1",
                VehicleUpdate {
                    driver: Some("Carl".to_string()),
                    model: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.driver, "Carl");
        assert_eq!(updated.model, "Golf");
        assert_eq!(service.get_vehicle_by_id(created.id).await.unwrap().driver, "Carl");

        service.delete_vehicle("ABC-1").await.unwrap();
        assert!(matches!(service.get_vehicle("ABC-1").await, Err(AppError::NotFound(_))));
        assert!(matches!(service.delete_vehicle("ABC-1").await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_customer_crud() {
        let (service, _journal, _store) = service_with_roll(99);
        let customer = service.add_customer("Maria Lopez", Decimal::from(10)).await.unwrap();

        assert!(matches!(
            service.add_customer("Neg", Decimal::from(-1)).await,
            Err(AppError::Validation(_))
        ));
        assert_eq!(service.find_customer_by_name("maria lopez").await.unwrap().id, customer.id);

        let topped = service.top_up_balance(customer.id, dec("30.5")).await.unwrap();
        assert_eq!(topped.balance, dec("40.5"));
        assert!(matches!(
            service.top_up_balance(customer.id, Decimal::ZERO).await,
            Err(AppError::Validation(_))
        ));

        let renamed = service.rename_customer(customer.id, "Maria L.").await.unwrap();
        assert_eq!(renamed.name, "Maria L.");

        service.delete_customer(customer.id).await.unwrap();
        assert!(matches!(
            service.get_customer(customer.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_queries() {
        let (service, _journal, store) = service_with_roll(99);
        assert_eq!(service.average_car_distance().await.unwrap(), 0.0);
        assert!(service.most_used_car().await.unwrap().is_none());

        seed_vehicle(&store, "CAR-A", 100.0, 0.0).await;
        seed_vehicle(&store, "CAR-B", 150.0, 0.0).await;
        let ana = service.add_customer("Ana", Decimal::from(500)).await.unwrap();
        let ben = service.add_customer("Ben", Decimal::from(500)).await.unwrap();

        service.finish_trip("CAR-A", ana.id, 10.0).await.unwrap();
        service.finish_trip("CAR-A", ben.id, 100.0).await.unwrap();

        assert_eq!(service.most_used_car().await.unwrap().unwrap().license_plate, "CAR-A");
        assert_eq!(service.average_car_distance().await.unwrap(), 180.0);

        let top = service.top_paying_customers(1).await.unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].customer.id, ben.id);
        assert_eq!(top[0].total_spent, dec("35.5"));

        assert_eq!(service.search_cars(Some("car-b"), None).await.unwrap().len(), 1);
    }
}
