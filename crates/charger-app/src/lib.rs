pub mod command;
pub mod config;

pub use config::ChargerConfig;
