//! Ambient building blocks shared by Shopfront services.

pub mod config;
pub mod health;
pub mod middleware;
pub mod serde;
pub mod tracing;
