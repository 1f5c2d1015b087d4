//! Core types for resurface.

mod memo;
mod review;

pub use memo::*;
pub use review::*;
