pub mod appointment_manager;
pub mod auth;
pub mod backend;
pub mod client;
pub mod configuration;
pub mod configuration_handler;
pub mod database_interface;
pub mod error;
pub mod http;
pub mod local_appointments;
mod schema;
#[cfg(test)]
mod testutils;
pub mod types;
