//! Cache module - membership cache keyed by run scope and region

pub mod key;
pub mod membership_cache;

pub use key::CacheScope;
pub use membership_cache::{CacheStats, MembershipCache};
