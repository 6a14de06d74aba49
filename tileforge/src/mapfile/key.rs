//! Cache key for index blocks.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::params::SubFileParams;

/// Identifies one index block of one sub-file.
///
/// Two keys are equal when their sub-file parameters compare equal by value
/// (two absent parameter handles are equal to each other and to nothing
/// else) and their block numbers match. The hash is computed once at
/// construction from both fields.
#[derive(Clone)]
pub struct IndexCacheKey {
    params: Option<Arc<SubFileParams>>,
    block_number: i64,
    hash: u64,
}

impl IndexCacheKey {
    pub fn new(params: Option<Arc<SubFileParams>>, block_number: i64) -> Self {
        let hash = compute_hash(params.as_deref(), block_number);
        Self {
            params,
            block_number,
            hash,
        }
    }

    pub fn params(&self) -> Option<&Arc<SubFileParams>> {
        self.params.as_ref()
    }

    pub fn block_number(&self) -> i64 {
        self.block_number
    }

    /// The precomputed hash value.
    pub fn hash_value(&self) -> u64 {
        self.hash
    }
}

fn compute_hash(params: Option<&SubFileParams>, block_number: i64) -> u64 {
    let params_hash = params.map_or(0, |p| {
        let mut hasher = DefaultHasher::new();
        p.hash(&mut hasher);
        hasher.finish()
    });
    let block_hash = (block_number ^ ((block_number as u64) >> 32) as i64) as u64;

    let mut result: u64 = 7;
    result = result.wrapping_mul(31).wrapping_add(params_hash);
    result = result.wrapping_mul(31).wrapping_add(block_hash);
    result
}

impl PartialEq for IndexCacheKey {
    fn eq(&self, other: &Self) -> bool {
        if self.hash != other.hash || self.block_number != other.block_number {
            return false;
        }
        match (&self.params, &other.params) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b) || a == b,
            _ => false,
        }
    }
}

impl Eq for IndexCacheKey {}

impl Hash for IndexCacheKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl fmt::Debug for IndexCacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexCacheKey")
            .field("base_zoom", &self.params.as_ref().map(|p| p.base_zoom()))
            .field("block_number", &self.block_number)
            .field("hash", &self.hash)
            .finish()
    }
}
