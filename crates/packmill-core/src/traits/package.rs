//! Accessor contract for one package of a build unit.

use crate::result::BuildResult;
use crate::types::{
    Changelog, Dep, DepKind, FileRecord, Script, ScriptKind, Tag, Trigger,
};

/// Metadata accessor for one package.
///
/// Implemented by the host pipeline. Every getter returns owned data; every
/// setter replaces the addressed piece of metadata wholesale, which keeps
/// the contract free of host-side representation details.
pub trait PackageAccess: std::fmt::Debug {
    /// Full package name.
    fn name(&self) -> &str;

    /// Reads a header tag value; the qualifier selects a language, scope, or
    /// numeric variant where the tag supports one.
    fn tag(&self, tag: Tag, qualifier: Option<&str>) -> Option<String>;

    /// Writes a header tag value with an optional qualifier.
    fn set_tag(&mut self, tag: Tag, value: &str, qualifier: Option<&str>) -> BuildResult<()>;

    /// Reads one of the seven install-time scripts.
    fn script(&self, kind: ScriptKind) -> Option<Script>;

    /// Replaces one of the install-time scripts.
    fn set_script(&mut self, kind: ScriptKind, script: Script) -> BuildResult<()>;

    /// Removes one of the install-time scripts.
    fn delete_script(&mut self, kind: ScriptKind) -> BuildResult<()>;

    /// Reads the dependency list of one kind.
    fn deps(&self, kind: DepKind) -> Vec<Dep>;

    /// Replaces the dependency list of one kind.
    fn set_deps(&mut self, kind: DepKind, deps: Vec<Dep>) -> BuildResult<()>;

    /// Reads the ordered changelog, newest first.
    fn changelog(&self) -> Vec<Changelog>;

    /// Replaces the changelog.
    fn set_changelog(&mut self, entries: Vec<Changelog>) -> BuildResult<()>;

    /// Reads the trigger list.
    fn triggers(&self) -> Vec<Trigger>;

    /// Replaces the trigger list.
    fn set_triggers(&mut self, triggers: Vec<Trigger>) -> BuildResult<()>;

    /// Raw `%files` section lines.
    fn files_lines(&self) -> Vec<String>;

    /// Appends one raw `%files` section line.
    fn add_files_line(&mut self, entry: &str) -> BuildResult<()>;

    /// Paths of `-f` file lists referenced by the `%files` section.
    fn file_list_refs(&self) -> Vec<String>;

    /// Appends a `-f` file list reference.
    fn add_file_list_ref(&mut self, path: &str) -> BuildResult<()>;

    /// SELinux policy lines attached to the package.
    fn policy_lines(&self) -> Vec<String>;

    /// Appends one SELinux policy line.
    fn add_policy_line(&mut self, policy: &str) -> BuildResult<()>;

    /// Whether the package can accept file records yet (its file list has
    /// been created by the packaging pipeline).
    fn accepts_files(&self) -> bool;

    /// File records assigned to the package so far.
    fn files(&self) -> &[FileRecord];

    /// Appends a file record to the package's file list.
    fn append_file(&mut self, record: FileRecord) -> BuildResult<()>;

    /// Removes the most recently appended record with the given disk path.
    /// Returns whether a record was removed.
    fn remove_file(&mut self, disk_path: &str) -> bool;

    /// Validates architecture restrictions, fills the target os/arch/platform
    /// tags, and adds the package's self-provide entries.
    ///
    /// Must be called exactly once per package after its configuration is
    /// complete; a second call is an error.
    fn finalize(&mut self) -> BuildResult<()>;
}
