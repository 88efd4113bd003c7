//! Auth types shared across Shopfront services.
//!
//! Provides the MFA assurance token (issued once an email code is verified)
//! and the cookie builders that carry it.

pub mod cookie;
pub mod token;
