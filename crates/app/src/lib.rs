#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod routes;
pub mod session;

pub use config::{AppConfig, ArgsError, print_usage};
pub use error::ApiError;
pub use routes::{AppState, router};
