//! Bump allocator backing the platform info tables
//!
//! Tables are created once and released together at teardown, so the
//! arena only ever grows until `reset` hands everything back.

pub const PAGE_SIZE: u64 = 4096;

pub struct BumpAllocator {
    start: u64,
    next: u64,
    end: u64,
    allocated: u64,
}

impl BumpAllocator {
    /// # Safety
    /// `start..start + size` must be memory owned by the caller for as long
    /// as the allocator, or anything carved from it, is alive.
    pub const unsafe fn new(start: u64, size: u64) -> Self {
        Self {
            start,
            next: start,
            end: start + size,
            allocated: 0,
        }
    }

    pub fn alloc_page(&mut self) -> Option<u64> {
        self.alloc_aligned(PAGE_SIZE, PAGE_SIZE)
    }

    /// Page-aligned block rounded up to whole pages.
    pub fn alloc_pages(&mut self, size: u64) -> Option<u64> {
        self.alloc_aligned(align_up(size, PAGE_SIZE), PAGE_SIZE)
    }

    pub fn alloc_aligned(&mut self, size: u64, align: u64) -> Option<u64> {
        let aligned = align_up(self.next, align);
        let new_next = aligned.checked_add(size)?;

        if new_next > self.end {
            return None;
        }

        self.next = new_next;
        self.allocated += size;
        Some(aligned)
    }

    pub fn remaining(&self) -> u64 {
        self.end - self.next
    }

    pub fn allocated(&self) -> u64 {
        self.allocated
    }

    /// Hands the whole arena back. Earlier blocks must no longer be used.
    pub fn reset(&mut self) {
        self.next = self.start;
        self.allocated = 0;
    }
}

pub const fn align_up(value: u64, align: u64) -> u64 {
    (value + align - 1) & !(align - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_are_aligned_and_sequential() {
        let mut arena = unsafe { BumpAllocator::new(0x4100_0100, 0x10_0000) };
        let first = arena.alloc_page().unwrap();
        assert_eq!(first, 0x4100_1000);
        assert_eq!(arena.alloc_pages(1).unwrap(), first + PAGE_SIZE);
        assert_eq!(arena.allocated(), 2 * PAGE_SIZE);
    }

    #[test]
    fn exhaustion_and_reset() {
        let mut arena = unsafe { BumpAllocator::new(0x1000, 0x2000) };
        assert!(arena.alloc_pages(0x1800).is_some());
        assert!(arena.alloc_page().is_none());
        arena.reset();
        assert_eq!(arena.remaining(), 0x2000);
        assert_eq!(arena.alloc_page(), Some(0x1000));
    }
}
