mod auth;
mod health_check;

pub use auth::{change_password, login, logout, me, refresh, register};
pub use health_check::health_check;
