//! File classifier contract.

use crate::result::BuildResult;
use crate::types::FileClassification;

/// Content-based file classifier.
///
/// Given a disk path and the file's mode, produces the type string, color
/// bitmask, and attribute tokens. A pure function of its inputs; it has no
/// side effects on the module system's state.
pub trait FileClassifier {
    /// Classifies one file.
    fn classify(&self, disk_path: &str, mode: u32) -> BuildResult<FileClassification>;
}
