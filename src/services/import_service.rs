//! Servicio de importación
//!
//! Reconciliación de un [`ImportBatch`] con el estado actual de la flota.
//!
//! - Vehículos: se buscan por id y, si no, por matrícula. En un acierto se
//!   sobrescriben modelo y distancias cuando vienen informados, y matrícula y
//!   conductor sólo si no están vacíos. En un fallo se insertan (modelo
//!   `"Unknown"` si falta, matrícula `CAR-{id}` y conductor `Driver-{id}`
//!   como respaldo).
//! - Tarifas anidadas: se añaden sólo si no existe otra con la misma clave
//!   (inicio, origen, destino).
//! - Clientes y viajes: por id; un acierto sobrescribe, un fallo inserta.
//!   El importe de un viaje nunca se recalcula.
//!
//! Los elementos inválidos se descartan con un aviso en el informe; el resto
//! se confirma en un único `ChangeSet`.

use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::models::import::{CustomerRecord, FareRecord, ImportBatch, ImportReport, TripRecord, VehicleRecord};
use crate::models::vehicle::UNKNOWN_MODEL;
use crate::models::{Customer, Fare, Vehicle};
use crate::repositories::{ChangeSet, FleetStore};
use crate::services::fare_ledger::{imported_fare, new_fares, TRIP_DESTINATION, TRIP_ORIGIN};
use crate::utils::errors::AppResult;
use crate::utils::validation::{validate_distance, validate_non_negative_amount};

/// Ids explícitos que el almacén puede registrar sin agotar su secuencia
fn is_importable_id(id: i32) -> bool {
    id > 0 && id < i32::MAX
}

pub struct ImportService {
    store: Arc<dyn FleetStore>,
    write_gate: Arc<Mutex<()>>,
}

impl ImportService {
    /// `write_gate` debe ser la misma compuerta que usa el servicio de flota
    pub fn new(store: Arc<dyn FleetStore>, write_gate: Arc<Mutex<()>>) -> Self {
        Self { store, write_gate }
    }

    pub async fn import(&self, batch: ImportBatch) -> AppResult<ImportReport> {
        info!(
            "📥 Importando lote: {} vehículos, {} clientes, {} viajes",
            batch.vehicles.len(),
            batch.customers.len(),
            batch.trips.len()
        );
        if batch.is_empty() {
            return Ok(ImportReport::default());
        }

        let _guard = self.write_gate.lock().await;
        let mut merge = Merge::load(self.store.as_ref()).await?;

        for record in batch.customers {
            merge.customer(record);
        }
        for record in batch.vehicles {
            merge.vehicle(record);
        }
        for record in batch.trips {
            merge.trip(record);
        }

        let (changes, report) = merge.finish();
        if !changes.is_empty() {
            self.store.commit(changes).await?;
        }

        for warning in &report.warnings {
            warn!("⚠️ Importación: {}", warning);
        }
        info!(
            "✅ Importación completada: vehículos +{} ~{}, clientes +{} ~{}, tarifas +{} ~{} ({} duplicadas)",
            report.vehicles_inserted,
            report.vehicles_updated,
            report.customers_inserted,
            report.customers_updated,
            report.fares_inserted,
            report.fares_updated,
            report.duplicate_fares_skipped
        );

        Ok(report)
    }
}

struct WorkingVehicle {
    /// Para vehículos nuevos, `vehicle.fares` lleva las tarifas hijas
    vehicle: Vehicle,
    persisted: bool,
    dirty: bool,
    known_fares: Vec<Fare>,
    pending_fares: Vec<Fare>,
}

struct WorkingCustomer {
    customer: Customer,
    persisted: bool,
    dirty: bool,
}

struct WorkingFare {
    fare: Fare,
    persisted: bool,
    dirty: bool,
}

/// Estado de trabajo de una importación, sobre una foto del almacén
struct Merge {
    vehicles: Vec<WorkingVehicle>,
    customers: BTreeMap<i32, WorkingCustomer>,
    fares: BTreeMap<i32, WorkingFare>,
    /// id importado -> id real cuando un vehículo se reconoció por matrícula
    vehicle_aliases: HashMap<i32, i32>,
    report: ImportReport,
}

impl Merge {
    async fn load(store: &dyn FleetStore) -> AppResult<Self> {
        let vehicles = store.list_vehicles().await?;
        let customers = store.list_customers().await?;
        let fares = store.list_fares().await?;

        let mut fares_by_vehicle: HashMap<i32, Vec<Fare>> = HashMap::new();
        for fare in &fares {
            fares_by_vehicle.entry(fare.vehicle_id).or_default().push(fare.clone());
        }

        Ok(Self {
            vehicles: vehicles
                .into_iter()
                .map(|vehicle| WorkingVehicle {
                    known_fares: fares_by_vehicle.remove(&vehicle.id).unwrap_or_default(),
                    vehicle,
                    persisted: true,
                    dirty: false,
                    pending_fares: Vec::new(),
                })
                .collect(),
            customers: customers
                .into_iter()
                .map(|customer| {
                    (
                        customer.id,
                        WorkingCustomer {
                            customer,
                            persisted: true,
                            dirty: false,
                        },
                    )
                })
                .collect(),
            fares: fares
                .into_iter()
                .map(|fare| {
                    (
                        fare.id,
                        WorkingFare {
                            fare,
                            persisted: true,
                            dirty: false,
                        },
                    )
                })
                .collect(),
            vehicle_aliases: HashMap::new(),
            report: ImportReport::default(),
        })
    }

    fn warn(&mut self, message: String) {
        self.report.warnings.push(message);
    }

    fn position_by_id(&self, id: i32) -> Option<usize> {
        if id <= 0 {
            return None;
        }
        self.vehicles.iter().position(|w| w.vehicle.id == id)
    }

    fn position_by_plate(&self, license_plate: &str) -> Option<usize> {
        let license_plate = license_plate.trim();
        if license_plate.is_empty() {
            return None;
        }
        self.vehicles
            .iter()
            .position(|w| w.vehicle.license_plate == license_plate)
    }

    fn customer(&mut self, record: CustomerRecord) {
        if !is_importable_id(record.id) {
            self.warn(format!("customer '{}' skipped: missing or out-of-range id", record.name));
            return;
        }
        if validate_non_negative_amount(&record.balance).is_err() {
            self.warn(format!("customer {} skipped: negative balance", record.id));
            return;
        }

        match self.customers.get_mut(&record.id) {
            Some(working) => {
                if working.customer.name != record.name || working.customer.balance != record.balance {
                    working.customer.name = record.name;
                    working.customer.balance = record.balance;
                    working.dirty = true;
                }
            }
            None => {
                let mut customer = Customer::new(record.name, record.balance);
                customer.id = record.id;
                self.customers.insert(
                    record.id,
                    WorkingCustomer {
                        customer,
                        persisted: false,
                        dirty: true,
                    },
                );
            }
        }
    }

    fn vehicle(&mut self, record: VehicleRecord) {
        let label = match record.id {
            Some(id) => format!("vehicle {}", id),
            None => format!("vehicle '{}'", record.license_plate),
        };

        if record.id.is_none() && record.license_plate.trim().is_empty() {
            self.warn("vehicle skipped: no license plate and no id".to_string());
            return;
        }
        if record.id.is_some_and(|id| id > 0 && !is_importable_id(id)) {
            self.warn(format!("{} skipped: id out of range", label));
            return;
        }
        let distances = [record.total_distance, record.distance_since_maintenance];
        if distances.iter().flatten().any(|d| validate_distance(*d).is_err()) {
            self.warn(format!("{} skipped: invalid distance", label));
            return;
        }

        let position = record
            .id
            .and_then(|id| self.position_by_id(id))
            .or_else(|| self.position_by_plate(&record.license_plate));

        match position {
            Some(index) => self.merge_vehicle(index, record, &label),
            None => self.insert_vehicle(record, &label),
        }
    }

    fn merge_vehicle(&mut self, index: usize, record: VehicleRecord, label: &str) {
        let license_plate = record.license_plate.trim();
        if !license_plate.is_empty() && license_plate != self.vehicles[index].vehicle.license_plate {
            if let Some(other) = self.position_by_plate(license_plate) {
                if other != index {
                    self.warn(format!(
                        "{} skipped: license plate '{}' belongs to another vehicle",
                        label, license_plate
                    ));
                    return;
                }
            }
        }

        let working = &mut self.vehicles[index];
        let vehicle = &mut working.vehicle;
        if let Some(id) = record.id {
            if id != vehicle.id {
                self.vehicle_aliases.insert(id, vehicle.id);
            }
        }

        let mut changed = false;
        if !license_plate.is_empty() && vehicle.license_plate != license_plate {
            vehicle.license_plate = license_plate.to_string();
            changed = true;
        }
        let driver = record.driver.trim();
        if !driver.is_empty() && vehicle.driver != driver {
            vehicle.driver = driver.to_string();
            changed = true;
        }
        if let Some(model) = record.model {
            if vehicle.model != model {
                vehicle.model = model;
                changed = true;
            }
        }
        if let Some(total) = record.total_distance {
            if vehicle.total_distance != total {
                vehicle.total_distance = total;
                changed = true;
            }
        }
        if let Some(since) = record.distance_since_maintenance {
            if vehicle.distance_since_maintenance != since {
                vehicle.distance_since_maintenance = since;
                changed = true;
            }
        }
        working.dirty |= changed;

        self.attach_fares(index, record.fares);
    }

    fn insert_vehicle(&mut self, record: VehicleRecord, label: &str) {
        let id = record.id.unwrap_or(0);
        let license_plate = match record.license_plate.trim() {
            "" => format!("CAR-{}", id),
            plate => plate.to_string(),
        };
        let driver = match record.driver.trim() {
            "" if id > 0 => format!("Driver-{}", id),
            driver => driver.to_string(),
        };

        if self.position_by_plate(&license_plate).is_some() {
            self.warn(format!(
                "{} skipped: license plate '{}' belongs to another vehicle",
                label, license_plate
            ));
            return;
        }

        let model = record
            .model
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_MODEL.to_string());
        let mut vehicle = Vehicle::new(license_plate, driver, model);
        vehicle.id = id;
        vehicle.total_distance = record.total_distance.unwrap_or(0.0);
        vehicle.distance_since_maintenance = record.distance_since_maintenance.unwrap_or(0.0);

        self.vehicles.push(WorkingVehicle {
            vehicle,
            persisted: false,
            dirty: true,
            known_fares: Vec::new(),
            pending_fares: Vec::new(),
        });
        self.attach_fares(self.vehicles.len() - 1, record.fares);
    }

    fn attach_fares(&mut self, index: usize, records: Vec<FareRecord>) {
        if records.is_empty() {
            return;
        }

        let vehicle_id = self.vehicles[index].vehicle.id;
        let plate = self.vehicles[index].vehicle.license_plate.clone();
        let mut incoming = Vec::with_capacity(records.len());
        for record in &records {
            if validate_distance(record.distance).is_err() {
                self.warn(format!(
                    "fare {} -> {} of vehicle '{}' skipped: invalid distance",
                    record.origin, record.destination, plate
                ));
                continue;
            }
            incoming.push(imported_fare(vehicle_id, record));
        }

        let working = &mut self.vehicles[index];
        let skipped = if working.persisted {
            let mut seen = working.known_fares.clone();
            seen.extend(working.pending_fares.iter().cloned());
            let (accepted, skipped) = new_fares(&seen, incoming);
            working.pending_fares.extend(accepted);
            skipped
        } else {
            let (accepted, skipped) = new_fares(&working.vehicle.fares, incoming);
            working.vehicle.fares.extend(accepted);
            skipped
        };

        if skipped > 0 {
            debug!("🔁 {} tarifas duplicadas descartadas en '{}'", skipped, plate);
        }
        self.report.duplicate_fares_skipped += skipped;
    }

    fn trip(&mut self, record: TripRecord) {
        if !is_importable_id(record.id) {
            self.warn(format!("trip {} skipped: missing or out-of-range id", record.id));
            return;
        }
        if validate_distance(record.distance).is_err() {
            self.warn(format!("trip {} skipped: invalid distance", record.id));
            return;
        }

        let vehicle_id = self
            .vehicle_aliases
            .get(&record.vehicle_id)
            .copied()
            .unwrap_or(record.vehicle_id);
        if self.position_by_id(vehicle_id).is_none() {
            self.warn(format!(
                "trip {} skipped: unknown vehicle {}",
                record.id, record.vehicle_id
            ));
            return;
        }
        if let Some(customer_id) = record.customer_id {
            if !self.customers.contains_key(&customer_id) {
                self.warn(format!(
                    "trip {} skipped: unknown customer {}",
                    record.id, customer_id
                ));
                return;
            }
        }

        match self.fares.get_mut(&record.id) {
            Some(working) => {
                let fare = &mut working.fare;
                let mut updated = fare.clone();
                updated.vehicle_id = vehicle_id;
                updated.customer_id = record.customer_id;
                updated.distance = record.distance;
                updated.paid_amount = record.paid_amount;
                if let Some(origin) = record.origin {
                    updated.origin = origin;
                }
                if let Some(destination) = record.destination {
                    updated.destination = destination;
                }
                if let Some(started_at) = record.started_at {
                    updated.started_at = started_at;
                }
                if *fare != updated {
                    *fare = updated;
                    working.dirty = true;
                }
            }
            None => {
                let fare = Fare {
                    id: record.id,
                    vehicle_id,
                    customer_id: record.customer_id,
                    distance: record.distance,
                    paid_amount: record.paid_amount,
                    origin: record.origin.unwrap_or_else(|| TRIP_ORIGIN.to_string()),
                    destination: record.destination.unwrap_or_else(|| TRIP_DESTINATION.to_string()),
                    started_at: record.started_at.unwrap_or_else(Utc::now),
                };
                self.fares.insert(
                    record.id,
                    WorkingFare {
                        fare,
                        persisted: false,
                        dirty: true,
                    },
                );
            }
        }
    }

    /// Ordena los cambios: clientes, vehículos, tarifas nuevas, viajes
    fn finish(self) -> (ChangeSet, ImportReport) {
        let mut report = self.report;
        let mut changes = ChangeSet::new();

        for working in self.customers.into_values() {
            if !working.persisted {
                changes.insert_customer(working.customer);
                report.customers_inserted += 1;
            } else if working.dirty {
                changes.update_customer(working.customer);
                report.customers_updated += 1;
            }
        }

        let mut pending_fares = Vec::new();
        for working in self.vehicles {
            if !working.persisted {
                report.fares_inserted += working.vehicle.fares.len();
                changes.insert_vehicle(working.vehicle);
                report.vehicles_inserted += 1;
            } else {
                if working.dirty {
                    changes.update_vehicle(working.vehicle);
                    report.vehicles_updated += 1;
                }
                pending_fares.extend(working.pending_fares);
            }
        }
        for fare in pending_fares {
            changes.insert_fare(fare);
            report.fares_inserted += 1;
        }

        for working in self.fares.into_values() {
            if !working.persisted {
                changes.insert_fare(working.fare);
                report.fares_inserted += 1;
            } else if working.dirty {
                changes.update_fare(working.fare);
                report.fares_updated += 1;
            }
        }

        (changes, report)
    }
}
