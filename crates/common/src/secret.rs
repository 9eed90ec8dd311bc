//! Secret types for values that must never reach a log line.
//!
//! Re-exports [`secrecy`] so every crate in the workspace names secrets the
//! same way. `SecretString` and `SecretBox<T>` redact themselves in `Debug`,
//! so a struct deriving `Debug` stays safe to trace even when it holds one.
//!
//! Values held as secrets in this workspace:
//! - the `SECRET_KEY` used to key log correlation hashes
//! - LTI 2.0 registration passwords (`reg_password`)
//! - PEM-encoded private key material loaded from disk
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct Registration {
//!     reg_key: String,
//!     reg_password: SecretString,
//! }
//!
//! let reg = Registration {
//!     reg_key: "canvas-key".to_string(),
//!     reg_password: SecretString::from("s3cret"),
//! };
//!
//! assert!(!format!("{reg:?}").contains("s3cret"));
//! assert_eq!(reg.reg_password.expose_secret(), "s3cret");
//! ```

pub use secrecy::{ExposeSecret, SecretBox, SecretString};
