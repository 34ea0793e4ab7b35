//! Voice Session Service Library
//!
//! Issues short-lived access grants for real-time voice rooms. A caller
//! proves who they are with an HMAC-signed uid (cookies or body), is placed
//! in a room derived from that uid, and receives a grant token signed with
//! the media credentials chosen for their voice and language. Each issuance
//! is recorded as a session that agents can later look up by room.
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> handlers/*.rs -> services/*.rs -> repositories/*.rs
//! ```
//!
//! # Modules
//!
//! - `config` - Immutable configuration from environment
//! - `crypto` - Identity signing and password hashing
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - HTTP metrics middleware
//! - `models` - Data models and wire types
//! - `observability` - Log field hashing and Prometheus metrics
//! - `repositories` - Session and account persistence
//! - `room` - Room name derivation
//! - `routes` - Axum router setup
//! - `services` - Credential resolution, grant minting, issuance, login

pub mod config;
pub mod crypto;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod room;
pub mod routes;
pub mod services;
