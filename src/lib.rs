//! Iris: GPU shader photo filters
//!
//! Captures or imports a photograph, applies a fragment-shader filter, and
//! saves the flattened result.

pub mod capture;
pub mod config;
pub mod filter;
pub mod frame;
pub mod output;
pub mod picker;
pub mod render;
pub mod shader;
