pub mod buffered_logger;
pub mod console_logger;
pub mod file_logger;
pub mod memory_fleet_store;
pub mod noop_logger;
pub mod openrouteservice;
pub mod postgres_fleet_store;

pub use buffered_logger::*;
pub use console_logger::*;
pub use file_logger::*;
pub use memory_fleet_store::*;
pub use noop_logger::*;
pub use openrouteservice::*;
pub use postgres_fleet_store::*;
