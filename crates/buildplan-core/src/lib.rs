pub mod config;
pub mod error;
pub mod intervention;
pub mod io;
pub mod manager;
pub mod paths;
pub mod results;
pub mod store;
pub mod strategy;
pub mod types;

pub use error::{PlanError, Result};
