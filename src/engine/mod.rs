//! # Engine Module
//!
//! The question/attempt engine and the hint dispatch engine.

pub mod hints;
pub mod question;

pub use hints::*;
pub use question::*;
