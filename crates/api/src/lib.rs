pub mod cache;
pub mod config;
pub mod metrics;
pub mod routes;
pub mod session;
pub mod telemetry;

pub use config::AppConfig;
pub use routes::{router, AppState};
