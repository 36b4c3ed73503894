pub mod errors;
pub mod handlers;
pub mod logging;
pub mod models;
pub mod reports;
pub mod sensor;
pub mod services;
pub mod state;
pub mod utils;
pub mod views;

// Re-export commonly used types
pub use errors::{FleetError, FleetResult, ValidationError};
