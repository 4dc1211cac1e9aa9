//! Query result cache.
//!
//! - [`ExpiringStore`]: bytes-in/bytes-out SQLite store with per-entry expiry
//! - [`RecordCache`]: typed [`AssetCache`] over the store, JSON encoded
//! - [`CacheKey`]: deterministic keys for the two cacheable query shapes

mod adapter;
mod clock;
mod key;
mod store;
mod traits;

pub use adapter::RecordCache;
pub use clock::{Clock, ManualClock, SystemClock};
pub use key::CacheKey;
pub use store::ExpiringStore;
pub use traits::{AssetCache, CachedResult};
