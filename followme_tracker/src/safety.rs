//! Safety module root.
//!
//! Altitude envelope enforcement and the bounded landing procedure.

pub mod altitude;
pub mod landing;
