pub mod auth;
pub mod configuration;
pub mod cookies;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod startup;
pub mod store;
pub mod telemetry;
