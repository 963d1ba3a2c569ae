//! Request and feature schemas
//!
//! `input` defines the per-request `RawInput` record, `columns` the ordered
//! training-time feature layout, and `adapter` batch decoding of requests.

mod adapter;
mod columns;
mod input;

pub use adapter::*;
pub use columns::*;
pub use input::*;
