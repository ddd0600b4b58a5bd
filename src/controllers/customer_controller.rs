use std::sync::Arc;
use validator::Validate;

use crate::dto::fleet_dto::{CreateCustomerRequest, CustomerQuery, RenameCustomerRequest, TopUpRequest};
use crate::dto::ApiResponse;
use crate::models::Customer;
use crate::services::FleetService;
use crate::utils::errors::{AppError, AppResult};

pub struct CustomerController {
    fleet: Arc<FleetService>,
}

impl CustomerController {
    pub fn new(fleet: Arc<FleetService>) -> Self {
        Self { fleet }
    }

    pub async fn create(&self, request: CreateCustomerRequest) -> AppResult<ApiResponse<Customer>> {
        request.validate().map_err(AppError::Validation)?;

        let customer = self.fleet.add_customer(&request.name, request.balance).await?;
        Ok(ApiResponse::success_with_message(
            customer,
            "Cliente creado exitosamente".to_string(),
        ))
    }

    /// Listado completo, o el cliente con ese nombre si se indica `name`
    pub async fn list(&self, query: CustomerQuery) -> AppResult<ApiResponse<Vec<Customer>>> {
        let customers = match query.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => vec![self.fleet.find_customer_by_name(name).await?],
            None => self.fleet.list_customers().await?,
        };
        Ok(ApiResponse::success(customers))
    }

    pub async fn get(&self, id: i32) -> AppResult<ApiResponse<Customer>> {
        let customer = self.fleet.get_customer(id).await?;
        Ok(ApiResponse::success(customer))
    }

    pub async fn rename(&self, id: i32, request: RenameCustomerRequest) -> AppResult<ApiResponse<Customer>> {
        request.validate().map_err(AppError::Validation)?;

        let customer = self.fleet.rename_customer(id, &request.name).await?;
        Ok(ApiResponse::success_with_message(
            customer,
            "Cliente actualizado exitosamente".to_string(),
        ))
    }

    pub async fn top_up(&self, id: i32, request: TopUpRequest) -> AppResult<ApiResponse<Customer>> {
        request.validate().map_err(AppError::Validation)?;

        let customer = self.fleet.top_up_balance(id, request.amount).await?;
        Ok(ApiResponse::success_with_message(
            customer,
            format!("Saldo recargado en {}", request.amount),
        ))
    }

    pub async fn delete(&self, id: i32) -> AppResult<ApiResponse<()>> {
        self.fleet.delete_customer(id).await?;
        Ok(ApiResponse::message("Cliente eliminado exitosamente".to_string()))
    }
}
