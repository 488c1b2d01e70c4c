//! Hook points, priorities, and the two hook kinds.

use packmill_core::error::BuildError;
use packmill_core::result::BuildResult;

use crate::context::HookCtx;
use crate::intercept::InterceptedFile;

/// Highest priority a hook can have.
pub const HOOK_MIN_PRIORITY: i32 = 0;
/// Lowest priority a hook can have.
pub const HOOK_MAX_PRIORITY: i32 = 10_000;
/// Priority assigned to a hook that never asked for one.
pub const HOOK_DEFAULT_PRIORITY: i32 = 5_000;

/// The pipeline points build hooks may fire at, in execution order.
///
/// The host driver dispatches build hooks at each point in order, and file
/// hooks once per discovered file during the file-processing stage, which
/// runs before [`HookPoint::PostFileProcessing`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HookPoint {
    /// After the spec file has been parsed.
    PostParse,
    /// After the prep script has run.
    PostPrep,
    /// After the build script has run.
    PostBuild,
    /// After the install script has run.
    PostInstall,
    /// After the check script has run.
    PostCheck,
    /// After every discovered file has gone through file processing.
    PostFileProcessing,
    /// After package assembly, the last point before the manager goes away.
    Final,
}

impl HookPoint {
    /// All pipeline points, in execution order.
    pub const ALL: [HookPoint; 7] = [
        Self::PostParse,
        Self::PostPrep,
        Self::PostBuild,
        Self::PostInstall,
        Self::PostCheck,
        Self::PostFileProcessing,
        Self::Final,
    ];

    /// Returns the string name of this pipeline point.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PostParse => "post_parse",
            Self::PostPrep => "post_prep",
            Self::PostBuild => "post_build",
            Self::PostInstall => "post_install",
            Self::PostCheck => "post_check",
            Self::PostFileProcessing => "post_file_processing",
            Self::Final => "final",
        }
    }
}

impl std::fmt::Display for HookPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A build hook's entry point.
pub type BuildHookFn = fn(&mut HookCtx<'_>) -> BuildResult<()>;

/// A file hook's entry point.
pub type FileHookFn = fn(&mut HookCtx<'_>, &mut InterceptedFile) -> BuildResult<()>;

fn validate_priority(priority: i32) -> BuildResult<()> {
    if !(HOOK_MIN_PRIORITY..=HOOK_MAX_PRIORITY).contains(&priority) {
        return Err(BuildError::registration(format!(
            "Hook priority {priority} out of range [{HOOK_MIN_PRIORITY}, {HOOK_MAX_PRIORITY}]"
        )));
    }
    Ok(())
}

/// A callback fired at one pipeline point.
#[derive(Debug)]
pub struct BuildHook {
    pub(crate) func: BuildHookFn,
    pub(crate) point: HookPoint,
    pub(crate) priority: i32,
    pub(crate) name: Option<String>,
}

impl BuildHook {
    /// Creates a hook firing at `point` with the default priority.
    pub fn new(point: HookPoint, func: BuildHookFn) -> Self {
        Self {
            func,
            point,
            priority: HOOK_DEFAULT_PRIORITY,
            name: None,
        }
    }

    /// Sets the priority; 0 is highest, 10000 lowest.
    ///
    /// An out-of-range value is rejected and the hook keeps its previous
    /// priority.
    pub fn set_priority(&mut self, priority: i32) -> BuildResult<()> {
        validate_priority(priority)?;
        self.priority = priority;
        Ok(())
    }

    /// Sets the human-readable name used in log output.
    pub fn set_name(&mut self, name: &str) {
        self.name = Some(name.to_string());
    }

    /// The point this hook fires at.
    pub fn point(&self) -> HookPoint {
        self.point
    }

    /// The hook's priority.
    pub fn priority(&self) -> i32 {
        self.priority
    }
}

/// A callback fired for every discovered file whose disk path matches at
/// least one of the hook's glob patterns.
#[derive(Debug)]
pub struct FileHook {
    pub(crate) func: FileHookFn,
    pub(crate) priority: i32,
    pub(crate) name: Option<String>,
    pub(crate) globs: Vec<String>,
}

impl FileHook {
    /// Creates a file hook with the default priority and no globs.
    ///
    /// A hook with an empty glob set never fires; add at least one pattern.
    pub fn new(func: FileHookFn) -> Self {
        Self {
            func,
            priority: HOOK_DEFAULT_PRIORITY,
            name: None,
            globs: Vec::new(),
        }
    }

    /// Adds a shell-glob pattern; the hook fires if any pattern matches.
    ///
    /// Patterns may contain macro references, expanded in the build unit's
    /// scope each time the pattern is evaluated.
    pub fn add_glob(&mut self, pattern: &str) {
        self.globs.push(pattern.to_string());
    }

    /// Sets the priority; 0 is highest, 10000 lowest.
    ///
    /// An out-of-range value is rejected and the hook keeps its previous
    /// priority.
    pub fn set_priority(&mut self, priority: i32) -> BuildResult<()> {
        validate_priority(priority)?;
        self.priority = priority;
        Ok(())
    }

    /// Sets the human-readable name used in log output.
    pub fn set_name(&mut self, name: &str) {
        self.name = Some(name.to_string());
    }

    /// The hook's priority.
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// The hook's glob patterns.
    pub fn globs(&self) -> &[String] {
        &self.globs
    }
}
