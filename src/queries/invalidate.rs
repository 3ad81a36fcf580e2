//! Invalidation after writes
//!
//! Each function clears every cached read a write to that resource can
//! affect. All return the number of entries removed.

use crate::cache::keys::{prefix, CacheKey};
use crate::cache::ReadThroughCache;

/// After any lead write: listings, details, the board with its stage
/// counts, and every dashboard figure.
pub fn leads(cache: &ReadThroughCache) -> usize {
    [
        prefix::PIPELINE,
        prefix::DASHBOARD,
        prefix::LEADS_PAGES,
        prefix::LEAD,
    ]
    .into_iter()
    .map(|prefix| cache.delete_by_prefix(prefix))
    .sum()
}

pub fn customers(cache: &ReadThroughCache) -> usize {
    cache.delete_by_prefix(prefix::CUSTOMERS_PAGES) + cache.delete_by_prefix(prefix::CUSTOMER)
}

/// Clears the unpaginated list, pages, and single items.
pub fn inventory(cache: &ReadThroughCache) -> usize {
    cache.delete_by_prefix(prefix::INVENTORY)
}

pub fn quotes(cache: &ReadThroughCache) -> usize {
    cache.delete_by_prefix(prefix::QUOTES_PAGES) + cache.delete_by_prefix(prefix::QUOTE)
}

pub fn knowledge_base(cache: &ReadThroughCache) -> usize {
    cache.delete_by_prefix(prefix::KNOWLEDGE_BASE)
}

pub fn pricing(cache: &ReadThroughCache) -> usize {
    cache.delete_by_prefix(prefix::PRICING)
}

/// After reindexing: results for one index, or for all of them.
pub fn search(cache: &ReadThroughCache, index: Option<&str>) -> usize {
    match index {
        Some(index) => cache.delete_by_prefix(&CacheKey::new("search").param(index).as_prefix()),
        None => cache.delete_by_prefix(prefix::SEARCH),
    }
}
