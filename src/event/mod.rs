//! Event model: the typed shape every other component agrees on.
//!
//! Raw store documents enter through [`Event::from_raw`] or [`materialize`]
//! and leave as validated [`Event`] values.

mod convert;
mod model;

pub use convert::{materialize, Materialized, RejectedRecord};
pub use model::{Category, Event, Measurement, Resolution, Severity};
