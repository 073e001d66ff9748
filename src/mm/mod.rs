//! Memory for the info tables

pub mod allocator;

pub use allocator::{align_up, BumpAllocator, PAGE_SIZE};
