//! Noise field: a single scalar elevation function `f(x, z, phase) -> [0, 1]`.
//!
//! # Invariants
//! - The field is a pure function of its inputs once built.
//! - Built once at startup; shared read-only across generation workers.

mod field;
mod params;
mod select;

pub use field::NoiseField;
pub use params::{Band, FieldParams};
pub use select::{scurve3, threshold_select};
