//! Almacén PostgreSQL
//!
//! Implementación de [`FleetStore`] con SQLx. Cada commit abre una
//! transacción y aplica los cambios en orden.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::{Customer, Fare, Vehicle};
use crate::repositories::{Change, ChangeSet, CommitReceipt, FleetStore};
use crate::utils::errors::{AppError, AppResult};

pub struct PgFleetStore {
    pool: PgPool,
}

impl PgFleetStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_vehicle(
        tx: &mut Transaction<'_, Postgres>,
        vehicle: &Vehicle,
    ) -> AppResult<i32> {
        let query = if vehicle.id > 0 {
            sqlx::query_scalar::<_, i32>(
                r#"
                INSERT INTO vehicles (id, license_plate, driver, model, total_distance, distance_since_maintenance, last_service_date)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING id
                "#,
            )
            .bind(vehicle.id)
        } else {
            sqlx::query_scalar::<_, i32>(
                r#"
                INSERT INTO vehicles (license_plate, driver, model, total_distance, distance_since_maintenance, last_service_date)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING id
                "#,
            )
        };

        let id = query
            .bind(&vehicle.license_plate)
            .bind(&vehicle.driver)
            .bind(&vehicle.model)
            .bind(vehicle.total_distance)
            .bind(vehicle.distance_since_maintenance)
            .bind(vehicle.last_service_date)
            .fetch_one(&mut **tx)
            .await
            .map_err(map_constraint)?;

        Ok(id)
    }

    async fn insert_customer(
        tx: &mut Transaction<'_, Postgres>,
        customer: &Customer,
    ) -> AppResult<i32> {
        let query = if customer.id > 0 {
            sqlx::query_scalar::<_, i32>(
                "INSERT INTO customers (id, name, balance) VALUES ($1, $2, $3) RETURNING id",
            )
            .bind(customer.id)
        } else {
            sqlx::query_scalar::<_, i32>(
                "INSERT INTO customers (name, balance) VALUES ($1, $2) RETURNING id",
            )
        };

        let id = query
            .bind(&customer.name)
            .bind(customer.balance)
            .fetch_one(&mut **tx)
            .await
            .map_err(map_constraint)?;

        Ok(id)
    }

    async fn insert_fare(tx: &mut Transaction<'_, Postgres>, fare: &Fare) -> AppResult<i32> {
        let query = if fare.id > 0 {
            sqlx::query_scalar::<_, i32>(
                r#"
                INSERT INTO fares (id, vehicle_id, customer_id, distance, paid_amount, origin, destination, started_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING id
                "#,
            )
            .bind(fare.id)
        } else {
            sqlx::query_scalar::<_, i32>(
                r#"
                INSERT INTO fares (vehicle_id, customer_id, distance, paid_amount, origin, destination, started_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING id
                "#,
            )
        };

        let id = query
            .bind(fare.vehicle_id)
            .bind(fare.customer_id)
            .bind(fare.distance)
            .bind(fare.paid_amount)
            .bind(&fare.origin)
            .bind(&fare.destination)
            .bind(fare.started_at)
            .fetch_one(&mut **tx)
            .await
            .map_err(map_constraint)?;

        Ok(id)
    }

    async fn apply(
        tx: &mut Transaction<'_, Postgres>,
        change: Change,
        receipt: &mut CommitReceipt,
    ) -> AppResult<()> {
        match change {
            Change::InsertVehicle(vehicle) => {
                let id = Self::insert_vehicle(tx, &vehicle).await?;
                receipt.vehicle_ids.push(id);
                for fare in &vehicle.fares {
                    let child = Fare { vehicle_id: id, ..fare.clone() };
                    let fare_id = Self::insert_fare(tx, &child).await?;
                    receipt.fare_ids.push(fare_id);
                }
            }
            Change::UpdateVehicle(vehicle) => {
                let result = sqlx::query(
                    r#"
                    UPDATE vehicles
                    SET license_plate = $2, driver = $3, model = $4, total_distance = $5,
                        distance_since_maintenance = $6, last_service_date = $7
                    WHERE id = $1
                    "#,
                )
                .bind(vehicle.id)
                .bind(&vehicle.license_plate)
                .bind(&vehicle.driver)
                .bind(&vehicle.model)
                .bind(vehicle.total_distance)
                .bind(vehicle.distance_since_maintenance)
                .bind(vehicle.last_service_date)
                .execute(&mut **tx)
                .await
                .map_err(map_constraint)?;
                expect_row(result.rows_affected(), "vehicle", vehicle.id)?;
            }
            Change::DeleteVehicle(id) => {
                let result = sqlx::query("DELETE FROM vehicles WHERE id = $1")
                    .bind(id)
                    .execute(&mut **tx)
                    .await?;
                expect_row(result.rows_affected(), "vehicle", id)?;
            }
            Change::InsertCustomer(customer) => {
                let id = Self::insert_customer(tx, &customer).await?;
                receipt.customer_ids.push(id);
            }
            Change::UpdateCustomer(customer) => {
                let result = sqlx::query("UPDATE customers SET name = $2, balance = $3 WHERE id = $1")
                    .bind(customer.id)
                    .bind(&customer.name)
                    .bind(customer.balance)
                    .execute(&mut **tx)
                    .await?;
                expect_row(result.rows_affected(), "customer", customer.id)?;
            }
            Change::DeleteCustomer(id) => {
                let result = sqlx::query("DELETE FROM customers WHERE id = $1")
                    .bind(id)
                    .execute(&mut **tx)
                    .await?;
                expect_row(result.rows_affected(), "customer", id)?;
            }
            Change::InsertFare(fare) => {
                let id = Self::insert_fare(tx, &fare).await?;
                receipt.fare_ids.push(id);
            }
            Change::UpdateFare(fare) => {
                let result = sqlx::query(
                    r#"
                    UPDATE fares
                    SET vehicle_id = $2, customer_id = $3, distance = $4, paid_amount = $5,
                        origin = $6, destination = $7, started_at = $8
                    WHERE id = $1
                    "#,
                )
                .bind(fare.id)
                .bind(fare.vehicle_id)
                .bind(fare.customer_id)
                .bind(fare.distance)
                .bind(fare.paid_amount)
                .bind(&fare.origin)
                .bind(&fare.destination)
                .bind(fare.started_at)
                .execute(&mut **tx)
                .await
                .map_err(map_constraint)?;
                expect_row(result.rows_affected(), "fare", fare.id)?;
            }
        }
        Ok(())
    }

    /// Las inserciones con id explícito no avanzan las secuencias SERIAL
    async fn sync_sequences(tx: &mut Transaction<'_, Postgres>) -> AppResult<()> {
        for table in ["vehicles", "customers", "fares"] {
            let statement = format!(
                "SELECT setval(pg_get_serial_sequence('{table}', 'id'), COALESCE((SELECT MAX(id) FROM {table}), 0) + 1, false)"
            );
            sqlx::query(&statement).execute(&mut **tx).await?;
        }
        Ok(())
    }
}

fn expect_row(rows_affected: u64, resource: &str, id: i32) -> AppResult<()> {
    if rows_affected == 0 {
        return Err(AppError::Conflict(format!("{} {} does not exist", resource, id)));
    }
    Ok(())
}

/// Las violaciones de unicidad o de claves foráneas se reportan como conflicto
fn map_constraint(error: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_error) = &error {
        if db_error.is_unique_violation() || db_error.is_foreign_key_violation() {
            return AppError::Conflict(db_error.message().to_string());
        }
    }
    AppError::Database(error)
}

#[async_trait]
impl FleetStore for PgFleetStore {
    async fn find_vehicle_by_plate(&self, license_plate: &str) -> AppResult<Option<Vehicle>> {
        let vehicle = sqlx::query_as::<_, Vehicle>("SELECT * FROM vehicles WHERE license_plate = $1")
            .bind(license_plate)
            .fetch_optional(&self.pool)
            .await?;

        Ok(vehicle)
    }

    async fn find_vehicle_by_id(&self, id: i32) -> AppResult<Option<Vehicle>> {
        let vehicle = sqlx::query_as::<_, Vehicle>("SELECT * FROM vehicles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(vehicle)
    }

    async fn list_vehicles(&self) -> AppResult<Vec<Vehicle>> {
        let vehicles = sqlx::query_as::<_, Vehicle>("SELECT * FROM vehicles ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok(vehicles)
    }

    async fn find_customer_by_id(&self, id: i32) -> AppResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(customer)
    }

    async fn list_customers(&self) -> AppResult<Vec<Customer>> {
        let customers = sqlx::query_as::<_, Customer>("SELECT * FROM customers ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok(customers)
    }

    async fn find_fare_by_id(&self, id: i32) -> AppResult<Option<Fare>> {
        let fare = sqlx::query_as::<_, Fare>("SELECT * FROM fares WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(fare)
    }

    async fn fares_for_vehicle(&self, vehicle_id: i32) -> AppResult<Vec<Fare>> {
        let fares = sqlx::query_as::<_, Fare>("SELECT * FROM fares WHERE vehicle_id = $1 ORDER BY id")
            .bind(vehicle_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(fares)
    }

    async fn list_fares(&self) -> AppResult<Vec<Fare>> {
        let fares = sqlx::query_as::<_, Fare>("SELECT * FROM fares ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok(fares)
    }

    async fn commit(&self, changes: ChangeSet) -> AppResult<CommitReceipt> {
        let mut tx = self.pool.begin().await?;
        let mut receipt = CommitReceipt::default();
        let count = changes.len();

        for change in changes.into_changes() {
            Self::apply(&mut tx, change, &mut receipt).await?;
        }
        Self::sync_sequences(&mut tx).await?;

        tx.commit().await?;
        log::debug!("💾 Commit PostgreSQL aplicado: {} cambios", count);
        Ok(receipt)
    }
}
