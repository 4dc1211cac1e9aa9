//! Data models for asset lookups.
//!
//! These types are shared by the backing database, the cache and the HTTP layer.

mod asset;

pub use asset::*;
