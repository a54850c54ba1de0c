//! Domain models for the medkit system.

mod medication;

pub use medication::*;
