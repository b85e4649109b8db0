//! Cache module for storing provider responses to disk
//!
//! Derives a filesystem-safe key per city and persists the provider payload
//! with the time it was stored. Reads report whether an entry is fresh or
//! stale so that stale data can still be served when the provider fails.

mod key;
mod store;

pub use key::{derive_key, normalize_city, CacheKey};
pub use store::{CacheEntry, CacheRead, CacheStore};
