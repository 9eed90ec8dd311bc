pub mod health;
pub mod jwks_handler;
pub mod lti_handler;
pub mod metrics;
pub mod registration_handler;

pub use health::{health_check, readiness_check};
pub use metrics::metrics_handler;
