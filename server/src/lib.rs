//! Line Bot Server
//!
//! Webhook backend for a LINE bot: echoes chat messages and publishes
//! uploaded images to object storage, a document index and every subscriber.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod images;
pub mod line;
pub mod observability;
pub mod storage;
