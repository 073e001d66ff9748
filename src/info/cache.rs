//! Cache hierarchy table (PPTT cache nodes)

use super::{InfoTable, TableWriter};

#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheType {
    Data,
    Instruction,
    Unified,
}

/// No next level.
pub const CACHE_LAST_LEVEL: u32 = u32::MAX;

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheEntry {
    pub cache_id: u32,
    pub cache_type: CacheType,
    pub size: u32,
    /// Index of the next level cache entry, or `CACHE_LAST_LEVEL`.
    pub next_level: u32,
    pub private: bool,
}

pub type CacheTable = InfoTable<(), CacheEntry>;
pub type CacheWriter<'a> = TableWriter<'a, (), CacheEntry>;

impl CacheTable {
    pub fn by_id(&self, cache_id: u32) -> Option<&CacheEntry> {
        self.entries().iter().find(|cache| cache.cache_id == cache_id)
    }

    /// Follows the next-level links from entry `index` to the last level.
    pub fn last_level(&self, index: usize) -> Option<&CacheEntry> {
        let mut cache = self.get(index)?;
        // Bounded walk; a malformed chain must not spin forever.
        for _ in 0..self.len() {
            if cache.next_level == CACHE_LAST_LEVEL {
                return Some(cache);
            }
            cache = self.get(cache.next_level as usize)?;
        }
        None
    }
}
