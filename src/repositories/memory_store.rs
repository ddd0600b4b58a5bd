//! Almacén en memoria
//!
//! Implementación de [`FleetStore`] sobre mapas protegidos por un `RwLock`.
//! Cada commit trabaja sobre una copia de las tablas y sólo la publica si
//! todos los cambios son válidos.

use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use crate::models::{Customer, Fare, Vehicle};
use crate::repositories::{Change, ChangeSet, CommitReceipt, FleetStore};
use crate::utils::errors::{AppError, AppResult};

#[derive(Debug, Clone)]
struct FleetTables {
    vehicles: BTreeMap<i32, Vehicle>,
    customers: BTreeMap<i32, Customer>,
    fares: BTreeMap<i32, Fare>,
    next_vehicle_id: i32,
    next_customer_id: i32,
    next_fare_id: i32,
}

impl Default for FleetTables {
    fn default() -> Self {
        Self {
            vehicles: BTreeMap::new(),
            customers: BTreeMap::new(),
            fares: BTreeMap::new(),
            next_vehicle_id: 1,
            next_customer_id: 1,
            next_fare_id: 1,
        }
    }
}

/// Reserva un id: el explícito si viene informado, si no el siguiente libre.
/// Un id cuyo sucesor no cabe en `i32` agotaría la secuencia y se rechaza.
fn allocate(requested: i32, next: &mut i32) -> AppResult<i32> {
    let id = if requested > 0 { requested } else { *next };
    let following = id
        .checked_add(1)
        .ok_or_else(|| AppError::Conflict(format!("id {} exhausts the id sequence", id)))?;
    *next = (*next).max(following);
    Ok(id)
}

impl FleetTables {
    fn apply(&mut self, change: Change, receipt: &mut CommitReceipt) -> AppResult<()> {
        match change {
            Change::InsertVehicle(mut vehicle) => {
                if vehicle.id > 0 && self.vehicles.contains_key(&vehicle.id) {
                    return Err(AppError::Conflict(format!("vehicle {} already exists", vehicle.id)));
                }
                self.ensure_unique_plate(&vehicle.license_plate, None)?;

                let id = allocate(vehicle.id, &mut self.next_vehicle_id)?;
                vehicle.id = id;
                let fares = std::mem::take(&mut vehicle.fares);
                self.vehicles.insert(id, vehicle);
                receipt.vehicle_ids.push(id);

                for mut fare in fares {
                    fare.vehicle_id = id;
                    self.insert_fare(fare, receipt)?;
                }
            }
            Change::UpdateVehicle(mut vehicle) => {
                if !self.vehicles.contains_key(&vehicle.id) {
                    return Err(AppError::Conflict(format!("vehicle {} does not exist", vehicle.id)));
                }
                self.ensure_unique_plate(&vehicle.license_plate, Some(vehicle.id))?;
                vehicle.fares.clear();
                self.vehicles.insert(vehicle.id, vehicle);
            }
            Change::DeleteVehicle(id) => {
                if self.vehicles.remove(&id).is_none() {
                    return Err(AppError::Conflict(format!("vehicle {} does not exist", id)));
                }
                self.fares.retain(|_, fare| fare.vehicle_id != id);
            }
            Change::InsertCustomer(mut customer) => {
                if customer.id > 0 && self.customers.contains_key(&customer.id) {
                    return Err(AppError::Conflict(format!("customer {} already exists", customer.id)));
                }
                let id = allocate(customer.id, &mut self.next_customer_id)?;
                customer.id = id;
                self.customers.insert(id, customer);
                receipt.customer_ids.push(id);
            }
            Change::UpdateCustomer(customer) => {
                if !self.customers.contains_key(&customer.id) {
                    return Err(AppError::Conflict(format!("customer {} does not exist", customer.id)));
                }
                self.customers.insert(customer.id, customer);
            }
            Change::DeleteCustomer(id) => {
                if self.customers.remove(&id).is_none() {
                    return Err(AppError::Conflict(format!("customer {} does not exist", id)));
                }
                for fare in self.fares.values_mut() {
                    if fare.customer_id == Some(id) {
                        fare.customer_id = None;
                    }
                }
            }
            Change::InsertFare(fare) => self.insert_fare(fare, receipt)?,
            Change::UpdateFare(fare) => {
                if !self.fares.contains_key(&fare.id) {
                    return Err(AppError::Conflict(format!("fare {} does not exist", fare.id)));
                }
                self.ensure_fare_references(&fare)?;
                self.fares.insert(fare.id, fare);
            }
        }
        Ok(())
    }

    fn insert_fare(&mut self, mut fare: Fare, receipt: &mut CommitReceipt) -> AppResult<()> {
        if fare.id > 0 && self.fares.contains_key(&fare.id) {
            return Err(AppError::Conflict(format!("fare {} already exists", fare.id)));
        }
        self.ensure_fare_references(&fare)?;
        let id = allocate(fare.id, &mut self.next_fare_id)?;
        fare.id = id;
        self.fares.insert(id, fare);
        receipt.fare_ids.push(id);
        Ok(())
    }

    fn ensure_unique_plate(&self, license_plate: &str, own_id: Option<i32>) -> AppResult<()> {
        let taken = self
            .vehicles
            .values()
            .any(|v| v.license_plate == license_plate && Some(v.id) != own_id);
        if taken {
            return Err(AppError::Conflict(format!(
                "license plate '{}' is already registered",
                license_plate
            )));
        }
        Ok(())
    }

    fn ensure_fare_references(&self, fare: &Fare) -> AppResult<()> {
        if !self.vehicles.contains_key(&fare.vehicle_id) {
            return Err(AppError::Conflict(format!(
                "fare references unknown vehicle {}",
                fare.vehicle_id
            )));
        }
        if let Some(customer_id) = fare.customer_id {
            if !self.customers.contains_key(&customer_id) {
                return Err(AppError::Conflict(format!(
                    "fare references unknown customer {}",
                    customer_id
                )));
            }
        }
        Ok(())
    }
}

/// Almacén en memoria para desarrollo y tests
#[derive(Debug, Default)]
pub struct InMemoryFleetStore {
    tables: RwLock<FleetTables>,
}

impl InMemoryFleetStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FleetStore for InMemoryFleetStore {
    async fn find_vehicle_by_plate(&self, license_plate: &str) -> AppResult<Option<Vehicle>> {
        let tables = self.tables.read().await;
        Ok(tables
            .vehicles
            .values()
            .find(|v| v.license_plate == license_plate)
            .cloned())
    }

    async fn find_vehicle_by_id(&self, id: i32) -> AppResult<Option<Vehicle>> {
        Ok(self.tables.read().await.vehicles.get(&id).cloned())
    }

    async fn list_vehicles(&self) -> AppResult<Vec<Vehicle>> {
        Ok(self.tables.read().await.vehicles.values().cloned().collect())
    }

    async fn find_customer_by_id(&self, id: i32) -> AppResult<Option<Customer>> {
        Ok(self.tables.read().await.customers.get(&id).cloned())
    }

    async fn list_customers(&self) -> AppResult<Vec<Customer>> {
        Ok(self.tables.read().await.customers.values().cloned().collect())
    }

    async fn find_fare_by_id(&self, id: i32) -> AppResult<Option<Fare>> {
        Ok(self.tables.read().await.fares.get(&id).cloned())
    }

    async fn fares_for_vehicle(&self, vehicle_id: i32) -> AppResult<Vec<Fare>> {
        let tables = self.tables.read().await;
        Ok(tables
            .fares
            .values()
            .filter(|f| f.vehicle_id == vehicle_id)
            .cloned()
            .collect())
    }

    async fn list_fares(&self) -> AppResult<Vec<Fare>> {
        Ok(self.tables.read().await.fares.values().cloned().collect())
    }

    async fn commit(&self, changes: ChangeSet) -> AppResult<CommitReceipt> {
        let mut tables = self.tables.write().await;
        let mut staged = tables.clone();
        let mut receipt = CommitReceipt::default();
        let count = changes.len();

        for change in changes.into_changes() {
            staged.apply(change, &mut receipt)?;
        }

        *tables = staged;
        log::debug!("💾 Commit en memoria aplicado: {} cambios", count);
        Ok(receipt)
    }
}
