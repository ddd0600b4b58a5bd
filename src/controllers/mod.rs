pub mod customer_controller;
pub mod import_controller;
pub mod statistics_controller;
pub mod trip_controller;
pub mod vehicle_controller;
