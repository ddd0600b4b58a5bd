//! Proyecciones de sólo lectura sobre la flota
//!
//! Funciones puras que usan tanto el servicio de flota como el de estadísticas.

use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::models::statistics::CustomerSpending;
use crate::models::{Customer, Fare, Vehicle};
use crate::utils::errors::AppResult;
use crate::utils::validation::ensure_amount;

pub fn search_vehicles(vehicles: Vec<Vehicle>, license_plate: Option<&str>, driver: Option<&str>) -> Vec<Vehicle> {
    vehicles
        .into_iter()
        .filter(|v| v.matches_search(license_plate, driver))
        .collect()
}

/// Vehículo con mayor distancia total; en empate gana el primero
pub fn most_used(vehicles: &[Vehicle]) -> Option<&Vehicle> {
    vehicles.iter().fold(None, |best: Option<&Vehicle>, vehicle| match best {
        Some(current) if current.total_distance >= vehicle.total_distance => Some(current),
        _ => Some(vehicle),
    })
}

pub fn average_distance(vehicles: &[Vehicle]) -> f64 {
    if vehicles.is_empty() {
        return 0.0;
    }
    vehicles.iter().map(|v| v.total_distance).sum::<f64>() / vehicles.len() as f64
}

/// Clientes que más han pagado, de mayor a menor gasto.
///
/// Los empates conservan el orden de primera aparición en `fares`; las
/// tarifas sin cliente y los clientes inexistentes no cuentan. Un total que
/// desborda `Decimal` es un error de validación.
pub fn top_paying(fares: &[Fare], customers: &[Customer], count: usize) -> AppResult<Vec<CustomerSpending>> {
    let mut totals: Vec<(i32, Decimal)> = Vec::new();
    let mut positions: HashMap<i32, usize> = HashMap::new();

    for fare in fares {
        let Some(customer_id) = fare.customer_id else {
            continue;
        };
        match positions.get(&customer_id) {
            Some(&index) => {
                let total = &mut totals[index].1;
                *total = ensure_amount("total_spent", total.checked_add(fare.paid_amount))?;
            }
            None => {
                positions.insert(customer_id, totals.len());
                totals.push((customer_id, fare.paid_amount));
            }
        }
    }

    // sort_by es estable
    totals.sort_by(|a, b| b.1.cmp(&a.1));

    let by_id: HashMap<i32, &Customer> = customers.iter().map(|c| (c.id, c)).collect();
    Ok(totals
        .into_iter()
        .filter_map(|(id, total_spent)| {
            by_id.get(&id).map(|customer| CustomerSpending {
                customer: (*customer).clone(),
                total_spent,
            })
        })
        .take(count)
        .collect())
}
