//! Package metadata atoms: scripts, dependencies, changelogs, triggers,
//! header tags, and the build-unit attribute enumeration.
//!
//! These types are plain owned data. The authoritative metadata lives with
//! the host pipeline behind the accessor traits; modules read and write it
//! in terms of these values.

use bitflags::bitflags;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::BuildError;
use crate::result::BuildResult;

/// String attributes of a build unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitAttr {
    /// Path of the spec file being built.
    SpecFile,
    /// Build root directory.
    BuildRoot,
    /// Subdirectory the sources unpack into.
    BuildSubdir,
    /// Root directory for the build.
    RootDir,
    /// Name of the source package.
    SourceName,
    /// The parsed spec text buffer.
    Parsed,
}

/// The five build-time script buffers of a build unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildScriptKind {
    Prep,
    Build,
    Install,
    Check,
    Clean,
}

impl BuildScriptKind {
    /// All build script kinds, in pipeline order.
    pub const ALL: [BuildScriptKind; 5] = [
        Self::Prep,
        Self::Build,
        Self::Install,
        Self::Check,
        Self::Clean,
    ];

    /// Returns the spec-file section name of this script.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Prep => "prep",
            Self::Build => "build",
            Self::Install => "install",
            Self::Check => "check",
            Self::Clean => "clean",
        }
    }
}

/// The seven install-time scripts a package may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptKind {
    PreInstall,
    PostInstall,
    PreUninstall,
    PostUninstall,
    PreTransaction,
    PostTransaction,
    Verify,
}

impl ScriptKind {
    /// All install-time script kinds.
    pub const ALL: [ScriptKind; 7] = [
        Self::PreInstall,
        Self::PostInstall,
        Self::PreUninstall,
        Self::PostUninstall,
        Self::PreTransaction,
        Self::PostTransaction,
        Self::Verify,
    ];

    /// Returns the conventional section name of this script.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PreInstall => "pre",
            Self::PostInstall => "post",
            Self::PreUninstall => "preun",
            Self::PostUninstall => "postun",
            Self::PreTransaction => "pretrans",
            Self::PostTransaction => "posttrans",
            Self::Verify => "verifyscript",
        }
    }
}

bitflags! {
    /// Script execution flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ScriptFlags: u32 {
        /// Macro expansion of the script body.
        const EXPAND  = 1 << 0;
        /// Header query-format expansion of the script body.
        const QFORMAT = 1 << 1;
    }
}

impl Default for ScriptFlags {
    fn default() -> Self {
        Self::empty()
    }
}

/// An install-time script: body, interpreter, optional source file, flags.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Script {
    /// The script body.
    pub code: String,
    /// Interpreter invoked to run the body.
    pub interpreter: String,
    /// Path of a file the body was read from, if any.
    pub file: Option<String>,
    /// Execution flags.
    pub flags: ScriptFlags,
}

impl Script {
    /// Creates a `/bin/sh` script with the given body.
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            interpreter: "/bin/sh".to_string(),
            file: None,
            flags: ScriptFlags::empty(),
        }
    }
}

/// The ten dependency kinds a package may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepKind {
    Requires,
    Provides,
    Conflicts,
    Obsoletes,
    Recommends,
    Suggests,
    Supplements,
    Enhances,
    Order,
    Triggers,
}

impl DepKind {
    /// All dependency kinds.
    pub const ALL: [DepKind; 10] = [
        Self::Requires,
        Self::Provides,
        Self::Conflicts,
        Self::Obsoletes,
        Self::Recommends,
        Self::Suggests,
        Self::Supplements,
        Self::Enhances,
        Self::Order,
        Self::Triggers,
    ];

    /// Returns the spec-file keyword of this dependency kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Requires => "Requires",
            Self::Provides => "Provides",
            Self::Conflicts => "Conflicts",
            Self::Obsoletes => "Obsoletes",
            Self::Recommends => "Recommends",
            Self::Suggests => "Suggests",
            Self::Supplements => "Supplements",
            Self::Enhances => "Enhances",
            Self::Order => "OrderWithRequires",
            Self::Triggers => "Triggers",
        }
    }
}

bitflags! {
    /// Version comparison and scope flags of a dependency.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct DepFlags: u32 {
        const LESS    = 1 << 1;
        const GREATER = 1 << 2;
        const EQUAL   = 1 << 3;
        /// Needed by the pre-install script.
        const PRE     = 1 << 9;
        /// Needed by the post-install script.
        const POST    = 1 << 10;
        /// Needed by the pre-uninstall script.
        const PREUN   = 1 << 11;
        /// Needed by the post-uninstall script.
        const POSTUN  = 1 << 12;
        /// Needed by the verify script.
        const VERIFY  = 1 << 13;
    }
}

impl Default for DepFlags {
    fn default() -> Self {
        Self::empty()
    }
}

impl DepFlags {
    /// Renders the version comparison part of the flags, if any.
    pub fn comparator_str(&self) -> Option<&'static str> {
        if self.contains(Self::LESS | Self::EQUAL) {
            Some("<=")
        } else if self.contains(Self::GREATER | Self::EQUAL) {
            Some(">=")
        } else if self.contains(Self::LESS) {
            Some("<")
        } else if self.contains(Self::GREATER) {
            Some(">")
        } else if self.contains(Self::EQUAL) {
            Some("=")
        } else {
            None
        }
    }
}

/// One dependency entry: name, optional version bound, flags, and the
/// trigger index (only meaningful for trigger dependencies).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dep {
    pub name: String,
    pub version: Option<String>,
    pub flags: DepFlags,
    pub trigger_index: u32,
}

impl Dep {
    /// Creates an unversioned dependency on `name`.
    pub fn on(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Creates a versioned dependency.
    pub fn versioned(name: impl Into<String>, flags: DepFlags, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: Some(version.into()),
            flags,
            trigger_index: 0,
        }
    }
}

impl std::fmt::Display for Dep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)?;
        if let (Some(cmp), Some(version)) = (self.flags.comparator_str(), self.version.as_deref()) {
            write!(f, " {cmp} {version}")?;
        }
        Ok(())
    }
}

/// One changelog entry, newest first in a package's changelog list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Changelog {
    pub time: DateTime<Utc>,
    pub author: String,
    pub text: String,
}

impl Changelog {
    /// Parses the conventional changelog date form, e.g. `"Tue Oct  9 2012"`.
    ///
    /// The weekday is accepted but not cross-checked against the date.
    pub fn parse_date(date: &str) -> BuildResult<DateTime<Utc>> {
        let stripped = date.split_whitespace().skip(1).collect::<Vec<_>>().join(" ");
        let parsed = NaiveDate::parse_from_str(&stripped, "%b %d %Y")
            .map_err(|e| BuildError::validation(format!("Bad changelog date '{date}': {e}")))?;
        match parsed.and_hms_opt(0, 0, 0) {
            Some(naive) => Ok(naive.and_utc()),
            None => Err(BuildError::validation(format!("Bad changelog date '{date}'"))),
        }
    }
}

/// The four trigger kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    PreInstall,
    Install,
    Uninstall,
    PostUninstall,
}

/// A trigger: a script fired when matching packages change state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    pub script: Script,
    pub kind: TriggerKind,
    pub deps: Vec<Dep>,
}

/// How a module-created package is named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PackageNaming {
    /// The given name is the full package name.
    Full,
    /// The given name is appended to the main package's name.
    Sub,
}

/// Header tags settable through the package accessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tag {
    Name,
    Epoch,
    Version,
    Release,
    Summary,
    Description,
    License,
    Group,
    Url,
    Vendor,
    Packager,
    Distribution,
    BuildArch,
    ExcludeArch,
    ExclusiveArch,
    Source,
    Patch,
    Requires,
    Order,
    Os,
    Arch,
    Platform,
    OptFlags,
}

/// What kind of qualifier a tag accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagClass {
    /// No qualifier; one is rejected with a warning.
    Plain,
    /// A language qualifier, e.g. `Summary(cs)`.
    Language,
    /// A dependency scope qualifier, e.g. `Requires(pre)`.
    Scope,
    /// A numeric suffix, e.g. `Source0`.
    Numbered,
}

impl Tag {
    /// Returns what kind of qualifier this tag accepts.
    pub fn class(&self) -> TagClass {
        match self {
            Self::Summary | Self::Description | Self::Group => TagClass::Language,
            Self::Requires | Self::Order => TagClass::Scope,
            Self::Source | Self::Patch => TagClass::Numbered,
            _ => TagClass::Plain,
        }
    }

    /// Returns the spec-file keyword of this tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::Epoch => "Epoch",
            Self::Version => "Version",
            Self::Release => "Release",
            Self::Summary => "Summary",
            Self::Description => "Description",
            Self::License => "License",
            Self::Group => "Group",
            Self::Url => "URL",
            Self::Vendor => "Vendor",
            Self::Packager => "Packager",
            Self::Distribution => "Distribution",
            Self::BuildArch => "BuildArch",
            Self::ExcludeArch => "ExcludeArch",
            Self::ExclusiveArch => "ExclusiveArch",
            Self::Source => "Source",
            Self::Patch => "Patch",
            Self::Requires => "Requires",
            Self::Order => "OrderWithRequires",
            Self::Os => "Os",
            Self::Arch => "Arch",
            Self::Platform => "Platform",
            Self::OptFlags => "OptFlags",
        }
    }
}
