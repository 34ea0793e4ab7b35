//! Database access for sessions and accounts.

pub mod sessions;
pub mod users;
