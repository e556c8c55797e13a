//! Accounts and bearer-token authentication.

pub mod db;
pub mod handlers;
pub mod middleware;
pub mod password;
pub mod token;

pub use middleware::AuthContext;
