//! Typed identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of one build unit (one spec-file-level build job).
///
/// A single manager instance may process several build units sequentially;
/// contexts and file additions are keyed by this identifier.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct UnitId(pub u64);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unit-{}", self.0)
    }
}
