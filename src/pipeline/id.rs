//! Identity types for pipeline stages.
//!
//! `StageId` is a newtype over `u32`. Ids handed out by [`StageId::next`] are
//! unique for the lifetime of the process, so they stay distinct across
//! pipelines built in the same program.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_STAGE_ID: AtomicU32 = AtomicU32::new(0);

/// Identity of a stage.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StageId(pub u32);

impl StageId {
    pub const INVALID: StageId = StageId(u32::MAX);

    /// Allocate a fresh, process-unique id.
    pub fn next() -> Self {
        StageId(NEXT_STAGE_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl Default for StageId {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Debug for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            write!(f, "StageId(INVALID)")
        } else {
            write!(f, "StageId({})", self.0)
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_id() {
        let id = StageId(42);
        assert!(id.is_valid());
        assert_eq!(id.index(), 42);
        assert!(!StageId::INVALID.is_valid());
        assert_eq!(StageId::default(), StageId::INVALID);
    }

    #[test]
    fn test_next_ids_are_unique() {
        let a = StageId::next();
        let b = StageId::next();
        assert_ne!(a, b);
        assert!(a.is_valid() && b.is_valid());
    }

    #[test]
    fn test_debug_format() {
        assert_eq!(format!("{:?}", StageId(3)), "StageId(3)");
        assert_eq!(format!("{}", StageId::INVALID), "StageId(INVALID)");
    }
}
