//! Suite configuration
//!
//! Built from the platform overrides in `platform.rs` and normalized once
//! before the run. Tests never mutate it.

use log::{warn, LevelFilter};

use crate::platform;

pub const MIN_LEVEL: u32 = 1;
pub const MAX_LEVEL: u32 = 7;
pub const MAX_SKIP: usize = 16;

/// Console verbosity, 1 (everything) to 5 (errors only).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum PrintLevel {
    Info = 1,
    Debug = 2,
    Test = 3,
    Warn = 4,
    Err = 5,
}

impl PrintLevel {
    /// Clamps `raw` into 1..=5.
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0 | 1 => Self::Info,
            2 => Self::Debug,
            3 => Self::Test,
            4 => Self::Warn,
            _ => Self::Err,
        }
    }

    pub const fn filter(self) -> LevelFilter {
        match self {
            Self::Info => LevelFilter::Trace,
            Self::Debug => LevelFilter::Debug,
            Self::Test => LevelFilter::Info,
            Self::Warn => LevelFilter::Warn,
            Self::Err => LevelFilter::Error,
        }
    }
}

/// Test numbers (or module base numbers) to leave out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SkipList {
    ids: [u32; MAX_SKIP],
    len: usize,
}

impl SkipList {
    pub const fn empty() -> Self {
        Self {
            ids: [0; MAX_SKIP],
            len: 0,
        }
    }

    /// Takes at most [`MAX_SKIP`] ids; the rest are dropped with a warning.
    pub fn from_ids(ids: &[u32]) -> Self {
        let mut list = Self::empty();
        for &id in ids {
            if list.len == MAX_SKIP {
                warn!("skip list longer than {}, ignoring {}", MAX_SKIP, id);
                continue;
            }
            list.ids[list.len] = id;
            list.len += 1;
        }
        list
    }

    pub fn ids(&self) -> &[u32] {
        &self.ids[..self.len]
    }

    pub fn contains(&self, id: u32) -> bool {
        self.ids().contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Default for SkipList {
    fn default() -> Self {
        Self::empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SuiteConfig {
    /// Target compliance level.
    pub level: u32,
    /// Raw print level as configured; see [`SuiteConfig::print_level`].
    pub print_level: u32,
    pub wakeup_timeout_ms: u32,
    pub enable_pcie_tests: bool,
    pub skip: SkipList,
    pub single_test: Option<u32>,
    pub single_module: Option<u32>,
}

impl SuiteConfig {
    pub fn from_platform() -> Self {
        Self {
            level: platform::OVERRIDE_SBSA_LEVEL,
            print_level: platform::OVERRIDE_PRINT_LEVEL,
            wakeup_timeout_ms: platform::OVERRIDE_WAKEUP_TIMEOUT_MS,
            enable_pcie_tests: platform::OVERRIDE_ENABLE_PCIE_TESTS,
            skip: SkipList::from_ids(platform::OVERRIDE_SKIP_LIST),
            single_test: None,
            single_module: None,
        }
    }

    /// Clamps level and print level into their ranges.
    pub fn normalized(mut self) -> Self {
        if !(MIN_LEVEL..=MAX_LEVEL).contains(&self.level) {
            let clamped = self.level.clamp(MIN_LEVEL, MAX_LEVEL);
            warn!("level {} out of range, using {}", self.level, clamped);
            self.level = clamped;
        }
        if !(1..=5).contains(&self.print_level) {
            let clamped = self.print_level.clamp(1, 5);
            warn!("print level {} out of range, using {}", self.print_level, clamped);
            self.print_level = clamped;
        }
        self
    }

    pub fn print_level(&self) -> PrintLevel {
        PrintLevel::from_raw(self.print_level)
    }
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self::from_platform()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_clamps() {
        let config = SuiteConfig {
            level: 9,
            print_level: 0,
            ..SuiteConfig::from_platform()
        }
        .normalized();
        assert_eq!(config.level, MAX_LEVEL);
        assert_eq!(config.print_level(), PrintLevel::Info);
        assert_eq!(PrintLevel::from_raw(3).filter(), LevelFilter::Info);
    }

    #[test]
    fn skip_list_caps_length() {
        let ids: Vec<u32> = (0..20).collect();
        let list = SkipList::from_ids(&ids);
        assert_eq!(list.ids().len(), MAX_SKIP);
        assert!(list.contains(15));
        assert!(!list.contains(16));
    }
}
