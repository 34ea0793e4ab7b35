//! Secret types for protecting sensitive values from accidental logging.
//!
//! Re-exports the [`secrecy`] types used for the identity signing key, the
//! media backend API secrets, the metadata API key and user passwords.
//!
//! `SecretString` and `SecretBox<T>` implement `Debug` with redaction, so a
//! struct that derives `Debug` over a secret field prints `[REDACTED]` instead
//! of the value. Reading the value requires an explicit `expose_secret()`.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//! use serde::Deserialize;
//!
//! #[derive(Debug, Deserialize)]
//! struct BackendCredentials {
//!     url: String,
//!     api_key: String,
//!     api_secret: SecretString,
//! }
//!
//! let json = r#"{"url": "wss://media", "api_key": "k", "api_secret": "s3cr3t"}"#;
//! let creds: BackendCredentials = serde_json::from_str(json).unwrap();
//!
//! assert!(!format!("{creds:?}").contains("s3cr3t"));
//! assert_eq!(creds.api_secret.expose_secret(), "s3cr3t");
//! ```

pub use secrecy::{ExposeSecret, SecretBox, SecretString};
