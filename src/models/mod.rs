//! Data Models Module
//!
//! The product catalogue served through the cache by the demo binary.

mod product;

pub use product::{Product, ProductRepository};
