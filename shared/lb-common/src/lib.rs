//! Line Bot Common Library
//!
//! Wire types for the LINE Messaging API and the image records shared by the
//! server and its tests.

pub mod types;

pub use types::*;
