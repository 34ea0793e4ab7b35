//! # Voice Session Test Utilities
//!
//! Shared test utilities for the voice session service:
//! - Fixed test ids, secrets and credential entries
//! - Config and account fixtures
//! - Server test harness (`TestVoiceServer` for E2E tests)
//! - Grant token assertions (`GrantAssertions` trait)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vs_test_utils::*;
//!
//! #[sqlx::test(migrations = "../../migrations")]
//! async fn test_example(pool: PgPool) -> Result<(), anyhow::Error> {
//!     let server = TestVoiceServer::spawn(pool).await?;
//!     let sig = server.signer().sign(TEST_UID_ALICE)?;
//!
//!     let bundle: serde_json::Value = reqwest::Client::new()
//!         .post(format!("{}/api/connection-details", server.url()))
//!         .json(&serde_json::json!({"uid": TEST_UID_ALICE, "uidSig": sig}))
//!         .send()
//!         .await?
//!         .json()
//!         .await?;
//!
//!     bundle["participantToken"]
//!         .as_str()
//!         .unwrap()
//!         .to_string()
//!         .assert_grant_for_room("voice_assistant_alice-0001");
//!     Ok(())
//! }
//! ```

pub mod assertions;
pub mod fixtures;
pub mod server_harness;
pub mod test_ids;

pub use assertions::*;
pub use fixtures::*;
pub use server_harness::*;
pub use test_ids::*;
