//! Business logic for the voice session service.

pub mod connection_service;
pub mod credential_resolver;
pub mod grant_service;
pub mod user_service;
