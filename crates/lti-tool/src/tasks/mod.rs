//! Background maintenance tasks.

pub mod nonce_cleanup;

pub use nonce_cleanup::start_nonce_cleanup;
