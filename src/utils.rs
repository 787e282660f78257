//! Numeric conversion helpers shared by the camera, clock and transport code.

pub mod safe_cast;
