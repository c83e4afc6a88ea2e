pub mod mappers;
pub mod migrations;
pub mod models;
pub mod pool;
pub mod ports;
pub mod repositories;
pub mod retry;
pub mod schema;
mod executor;

pub use executor::DieselSqliteExecutor;
