//! LINE Messaging API
//!
//! Webhook signature checks, the callback dispatcher and the outbound client.

pub mod callback;
pub mod client;
pub mod signing;

pub use client::{ChatClient, LineClient, LineError};
