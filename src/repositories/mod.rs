//! Repositorios
//!
//! Abstracción del almacén de registros de la flota. Los servicios leen por
//! clave y escriben acumulando cambios en un [`ChangeSet`] que se confirma
//! de forma atómica con [`FleetStore::commit`].

pub mod memory_store;
pub mod pg_store;

use async_trait::async_trait;

use crate::models::{Customer, Fare, Vehicle};
use crate::utils::errors::AppResult;

pub use memory_store::InMemoryFleetStore;
pub use pg_store::PgFleetStore;

/// Un cambio pendiente sobre el almacén
#[derive(Debug, Clone)]
pub enum Change {
    /// Inserta el vehículo y las tarifas de `vehicle.fares` como hijas
    InsertVehicle(Vehicle),
    UpdateVehicle(Vehicle),
    /// Borra el vehículo y, en cascada, sus tarifas
    DeleteVehicle(i32),
    InsertCustomer(Customer),
    UpdateCustomer(Customer),
    /// Borra el cliente; sus tarifas quedan sin cliente
    DeleteCustomer(i32),
    InsertFare(Fare),
    UpdateFare(Fare),
}

/// Conjunto ordenado de cambios que se aplica todo o nada.
///
/// Las inserciones con id 0 reciben un id asignado por el almacén; con id
/// explícito se conserva el id.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    changes: Vec<Change>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, change: Change) -> &mut Self {
        self.changes.push(change);
        self
    }

    pub fn insert_vehicle(&mut self, vehicle: Vehicle) -> &mut Self {
        self.push(Change::InsertVehicle(vehicle))
    }

    pub fn update_vehicle(&mut self, vehicle: Vehicle) -> &mut Self {
        self.push(Change::UpdateVehicle(vehicle))
    }

    pub fn delete_vehicle(&mut self, id: i32) -> &mut Self {
        self.push(Change::DeleteVehicle(id))
    }

    pub fn insert_customer(&mut self, customer: Customer) -> &mut Self {
        self.push(Change::InsertCustomer(customer))
    }

    pub fn update_customer(&mut self, customer: Customer) -> &mut Self {
        self.push(Change::UpdateCustomer(customer))
    }

    pub fn delete_customer(&mut self, id: i32) -> &mut Self {
        self.push(Change::DeleteCustomer(id))
    }

    pub fn insert_fare(&mut self, fare: Fare) -> &mut Self {
        self.push(Change::InsertFare(fare))
    }

    pub fn update_fare(&mut self, fare: Fare) -> &mut Self {
        self.push(Change::UpdateFare(fare))
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn into_changes(self) -> Vec<Change> {
        self.changes
    }
}

/// Ids asignados durante un commit, en orden de inserción
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommitReceipt {
    pub vehicle_ids: Vec<i32>,
    pub customer_ids: Vec<i32>,
    pub fare_ids: Vec<i32>,
}

/// Almacén transaccional de vehículos, clientes y tarifas
#[async_trait]
pub trait FleetStore: Send + Sync {
    async fn find_vehicle_by_plate(&self, license_plate: &str) -> AppResult<Option<Vehicle>>;

    async fn find_vehicle_by_id(&self, id: i32) -> AppResult<Option<Vehicle>>;

    async fn list_vehicles(&self) -> AppResult<Vec<Vehicle>>;

    async fn find_customer_by_id(&self, id: i32) -> AppResult<Option<Customer>>;

    async fn list_customers(&self) -> AppResult<Vec<Customer>>;

    async fn find_fare_by_id(&self, id: i32) -> AppResult<Option<Fare>>;

    async fn fares_for_vehicle(&self, vehicle_id: i32) -> AppResult<Vec<Fare>>;

    async fn list_fares(&self) -> AppResult<Vec<Fare>>;

    /// Aplica el conjunto de cambios de forma atómica
    async fn commit(&self, changes: ChangeSet) -> AppResult<CommitReceipt>;
}
