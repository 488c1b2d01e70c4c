//! File interception.
//!
//! For every file the packaging pipeline discovers, the dispatcher builds
//! one [`InterceptedFile`] and runs the matching file hooks against it in
//! sorted order. The handle owns an independent copy of the host's file
//! record: hooks mutate the copy, later hooks in the same pass see earlier
//! hooks' edits, and the host's record stays untouched until it commits the
//! results itself.

use tracing::{debug, warn};

use packmill_core::error::BuildError;
use packmill_core::result::BuildResult;
use packmill_core::traits::{BuildUnit, PackageAccess};
use packmill_core::types::{FileClassification, FileRecord, UnitId};

/// One package a file was explicitly added to during a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAddition {
    /// Full name of the target package.
    pub package: String,
    /// The build unit the target package belongs to.
    pub unit: UnitId,
    /// Disk path of the record snapshot that was appended.
    pub(crate) disk_path: String,
}

/// Transient per-file, per-dispatch-pass handle passed to file hooks.
pub struct InterceptedFile {
    disk_path: String,
    classification: FileClassification,
    original_package: String,
    unit: UnitId,
    include_in_original: bool,
    record: FileRecord,
    additions: Vec<FileAddition>,
}

impl InterceptedFile {
    pub(crate) fn new(
        record: &FileRecord,
        classification: FileClassification,
        original_package: &str,
        unit: UnitId,
    ) -> Self {
        Self {
            disk_path: record.disk_path.clone(),
            classification,
            original_package: original_package.to_string(),
            unit,
            include_in_original: true,
            record: record.clone(),
            additions: Vec::new(),
        }
    }

    /// Disk path the file was discovered at. Stable for the whole pass even
    /// if a hook rewrites the record's paths.
    pub fn disk_path(&self) -> &str {
        &self.disk_path
    }

    /// Classification results, computed once per pass and shared read-only
    /// by every hook in it.
    pub fn classification(&self) -> &FileClassification {
        &self.classification
    }

    /// Name of the package the pipeline originally destined the file for.
    pub fn original_package(&self) -> &str {
        &self.original_package
    }

    /// The file record as left by the hooks run so far.
    pub fn record(&self) -> &FileRecord {
        &self.record
    }

    /// Mutable access to the record. Edits are visible to later hooks in the
    /// same pass and to subsequent [`InterceptedFile::add_to`] calls, but
    /// never to packages the file was already added to.
    pub fn record_mut(&mut self) -> &mut FileRecord {
        &mut self.record
    }

    /// Whether the file still goes into its originally destined package.
    pub fn include_in_original(&self) -> bool {
        self.include_in_original
    }

    /// Drops the file from its originally destined package.
    ///
    /// The verdict is sticky: no later hook in the pass can undo it. Only
    /// the host pipeline starts a file over with a fresh handle.
    pub fn exclude_from_original(&mut self) {
        self.include_in_original = false;
    }

    /// Packages the file was explicitly added to so far in this pass.
    pub fn added_packages(&self) -> &[FileAddition] {
        &self.additions
    }

    /// Appends a copy of the current record to `package`'s file list and
    /// records the addition.
    ///
    /// Fails when the target package has no file list yet; the failure is
    /// the caller's to handle and does not end the pass by itself.
    pub fn add_to(&mut self, package: &mut dyn PackageAccess) -> BuildResult<()> {
        if !package.accepts_files() {
            return Err(BuildError::misuse(format!(
                "Cannot append file to package '{}': no file list",
                package.name()
            )));
        }
        package.append_file(self.record.clone())?;
        debug!(
            path = %self.record.disk_path,
            package = package.name(),
            "file added to package"
        );
        self.additions.push(FileAddition {
            package: package.name().to_string(),
            unit: self.unit,
            disk_path: self.record.disk_path.clone(),
        });
        Ok(())
    }

    /// Removes every record this pass appended to target packages. Used by
    /// the dispatcher when a pass fails and rollback is configured.
    pub(crate) fn retract_additions(&self, unit: &mut dyn BuildUnit) {
        for addition in self.additions.iter().rev() {
            match unit.package_by_name_mut(&addition.package) {
                Some(package) => {
                    if !package.remove_file(&addition.disk_path) {
                        warn!(
                            package = %addition.package,
                            path = %addition.disk_path,
                            "rollback could not find the appended record"
                        );
                    }
                }
                None => warn!(
                    package = %addition.package,
                    "rollback could not find the target package"
                ),
            }
        }
    }

    pub(crate) fn into_verdict(self) -> FileVerdict {
        FileVerdict {
            include_in_original: self.include_in_original,
            additions: self.additions,
        }
    }
}

/// Outcome of one file-hook dispatch pass.
#[derive(Debug, Clone)]
pub struct FileVerdict {
    /// Whether the file still belongs in its originally destined package.
    pub include_in_original: bool,
    /// Every package the file was explicitly added to during the pass.
    pub additions: Vec<FileAddition>,
}

impl FileVerdict {
    /// The verdict of a pass no hook fired in.
    pub(crate) fn untouched() -> Self {
        Self {
            include_in_original: true,
            additions: Vec::new(),
        }
    }
}
