pub mod deployments;
pub mod nonces;
