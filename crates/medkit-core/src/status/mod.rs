//! Status derivation for tracked medications.
//!
//! The calculator is a pure function of a record's static fields and an
//! explicit evaluation date. Callers that need "now" get it from a [`Clock`].

mod calculator;
mod clock;

pub use calculator::*;
pub use clock::*;
