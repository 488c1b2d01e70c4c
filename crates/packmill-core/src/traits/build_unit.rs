//! Accessor contract for one build unit (one spec-file-level build job).

use crate::result::BuildResult;
use crate::types::{BuildScriptKind, PackageNaming, UnitAttr, UnitId};

use super::package::PackageAccess;

/// Metadata accessor for one build unit.
///
/// Implemented by the host pipeline. Hook callbacks query and modify the
/// in-progress build through this trait; the module system itself only uses
/// [`BuildUnit::unit_id`] (to key contexts) and
/// [`BuildUnit::expand_macros`] (to expand file-hook glob patterns).
pub trait BuildUnit {
    /// Stable identity of this build unit for the manager's lifetime.
    fn unit_id(&self) -> UnitId;

    /// Reads one of the unit's string attributes.
    fn attr(&self, attr: UnitAttr) -> Option<String>;

    /// Replaces one of the unit's string attributes.
    fn set_attr(&mut self, attr: UnitAttr, value: &str) -> BuildResult<()>;

    /// Number of packages currently defined by the unit.
    fn package_count(&self) -> usize;

    /// Package by position, main package first.
    fn package_mut(&mut self, index: usize) -> Option<&mut dyn PackageAccess>;

    /// Package by full name.
    fn package_by_name_mut(&mut self, name: &str) -> Option<&mut dyn PackageAccess>;

    /// The source package, if the unit has one.
    fn source_package_mut(&mut self) -> Option<&mut dyn PackageAccess>;

    /// Defines a new package.
    ///
    /// Fails when no main package exists yet or when the resulting name is
    /// already taken. With [`PackageNaming::Sub`] the given name is appended
    /// to the main package's name.
    fn add_package(
        &mut self,
        name: &str,
        summary: &str,
        naming: PackageNaming,
    ) -> BuildResult<&mut dyn PackageAccess>;

    /// Reads one of the five build-time script buffers.
    fn build_script(&self, kind: BuildScriptKind) -> Option<String>;

    /// Replaces one of the five build-time script buffers.
    fn set_build_script(&mut self, kind: BuildScriptKind, code: &str) -> BuildResult<()>;

    /// Expands macro references in `text` within this unit's macro scope.
    ///
    /// Macro values can change over the build, so callers must not cache
    /// expansion results.
    fn expand_macros(&self, text: &str) -> BuildResult<String>;
}
