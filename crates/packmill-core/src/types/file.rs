//! File records and classification results.
//!
//! A [`FileRecord`] is the host pipeline's authoritative description of one
//! on-disk file destined for packaging. The module system never mutates the
//! host's record; it hands modules an independently owned copy.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Per-file packaging attributes (`%doc`, `%config`, `%ghost`, ...).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct FileAttrs: u32 {
        const CONFIG     = 1 << 0;
        const DOC        = 1 << 1;
        const ICON       = 1 << 2;
        const MISSINGOK  = 1 << 3;
        const NOREPLACE  = 1 << 4;
        const GHOST      = 1 << 6;
        const LICENSE    = 1 << 7;
        const README     = 1 << 8;
        const PUBKEY     = 1 << 11;
        const ARTIFACT   = 1 << 12;
    }
}

bitflags! {
    /// Which verification checks apply to a packaged file.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct VerifyFlags: u32 {
        const DIGEST  = 1 << 0;
        const SIZE    = 1 << 1;
        const LINKTO  = 1 << 2;
        const USER    = 1 << 3;
        const GROUP   = 1 << 4;
        const MTIME   = 1 << 5;
        const MODE    = 1 << 6;
        const RDEV    = 1 << 7;
        const CAPS    = 1 << 8;
    }
}

impl VerifyFlags {
    /// The default verification set: everything checked.
    pub fn full() -> Self {
        Self::all()
    }
}

impl Default for FileAttrs {
    fn default() -> Self {
        Self::empty()
    }
}

impl Default for VerifyFlags {
    fn default() -> Self {
        Self::empty()
    }
}

bitflags! {
    /// Which file attributes were explicitly specified in the spec, as
    /// opposed to inherited from active defaults.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct SpecdFlags: u32 {
        const DEF_FILE_MODE = 1 << 0;
        const DEF_DIR_MODE  = 1 << 1;
        const DEF_UID       = 1 << 2;
        const DEF_GID       = 1 << 3;
        const DEF_VERIFY    = 1 << 4;

        const FILE_MODE     = 1 << 8;
        const DIR_MODE      = 1 << 9;
        const UID           = 1 << 10;
        const GID           = 1 << 11;
        const VERIFY        = 1 << 12;
    }
}

impl Default for SpecdFlags {
    fn default() -> Self {
        Self::empty()
    }
}

/// Numeric stat data captured for a discovered file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStat {
    pub dev: u64,
    pub ino: u64,
    pub mode: u32,
    pub nlink: u64,
    pub uid: u32,
    pub gid: u32,
    pub rdev: u64,
    pub size: u64,
    pub mtime: i64,
}

/// One on-disk file destined for packaging.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Stat data of the file on disk.
    pub stat: FileStat,
    /// Where the file is read from.
    pub disk_path: String,
    /// Filename inside the package archive.
    pub archive_path: String,
    /// Owning user name.
    pub uname: String,
    /// Owning group name.
    pub gname: String,
    /// Packaging attribute flags.
    pub attrs: FileAttrs,
    /// Which attributes were explicitly specified.
    pub specd: SpecdFlags,
    /// Verification flags.
    pub verify: VerifyFlags,
    /// Locale tags (`%lang`).
    pub langs: Vec<String>,
    /// Capability string, if any.
    pub caps: Option<String>,
}

impl FileRecord {
    /// Creates a record for the given disk and archive paths with root
    /// ownership and full verification, the defaults the file scanner uses
    /// for an unannotated entry.
    pub fn new(disk_path: impl Into<String>, archive_path: impl Into<String>) -> Self {
        Self {
            disk_path: disk_path.into(),
            archive_path: archive_path.into(),
            uname: "root".to_string(),
            gname: "root".to_string(),
            verify: VerifyFlags::full(),
            ..Self::default()
        }
    }
}

bitflags! {
    /// File color bitmask produced by the classifier.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct FileColor: u32 {
        const ELF32 = 1 << 0;
        const ELF64 = 1 << 1;
    }
}

impl Default for FileColor {
    fn default() -> Self {
        Self::empty()
    }
}

/// Classification results for one file: type string, color bitmask, and
/// attribute tokens. Computed once per file per dispatch pass and shared
/// read-only across all hooks in the pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileClassification {
    /// Human-readable file type (class), e.g. `"ELF 64-bit LSB shared object"`.
    pub ftype: String,
    /// File color bitmask.
    pub color: FileColor,
    /// File attribute tokens, e.g. `["elf"]` or `["python"]`.
    pub attrs: Vec<String>,
}

impl FileClassification {
    /// Whether the classifier tagged the file with the given attribute token.
    pub fn has_attr(&self, attr: &str) -> bool {
        self.attrs.iter().any(|a| a == attr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_defaults() {
        let rec = FileRecord::new("/usr/bin/foo", "/usr/bin/foo");
        assert_eq!(rec.uname, "root");
        assert_eq!(rec.verify, VerifyFlags::full());
        assert!(rec.langs.is_empty());
        assert!(rec.caps.is_none());
    }

    #[test]
    fn test_classification_attr_lookup() {
        let cls = FileClassification {
            ftype: "Python script".to_string(),
            color: FileColor::empty(),
            attrs: vec!["python".to_string()],
        };
        assert!(cls.has_attr("python"));
        assert!(!cls.has_attr("elf"));
    }
}
