//! Shared Types

mod event;
mod image;
mod message;

pub use event::*;
pub use image::*;
pub use message::*;
