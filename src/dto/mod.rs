pub mod fleet_dto;
pub mod import_dto;

pub use fleet_dto::ApiResponse;
