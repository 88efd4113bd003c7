//! Client side of the Shopfront sign-in verification step.
//!
//! The pieces, in the order a sign-in touches them:
//!
//! - [`pending`] remembers that a code is outstanding, across reloads.
//! - [`api`] talks to the MFA service (issue / verify).
//! - [`code`] models the six digit boxes the shopper types into.
//! - [`countdown`] gates the resend button.
//! - [`session`] decides what the rest of the app sees as "signed in".
//! - [`flow`] drives one attempt; [`controller`] owns everything for the app's lifetime.

pub mod api;
pub mod code;
pub mod config;
pub mod controller;
pub mod countdown;
pub mod error;
pub mod events;
pub mod flow;
pub mod pending;
pub mod provider;
pub mod session;
