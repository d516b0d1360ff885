//! URL handling module for Prefix-Harvest
//!
//! This module provides entry URL normalization, entry dedup keys and the
//! canonical request identity used as the response cache key.

mod identity;
mod normalize;

pub use identity::{RequestIdentity, RequestIdentityBuilder};
pub use normalize::{entry_key, normalize_url};
