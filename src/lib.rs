pub mod ai;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod gamification;
pub mod handlers;
pub mod services;
pub mod state;
pub mod validation;

#[cfg(test)]
pub mod testing;
