//! Shared data model for the packaging pipeline.

pub mod file;
pub mod id;
pub mod package;

pub use file::{FileAttrs, FileClassification, FileColor, FileRecord, FileStat, SpecdFlags, VerifyFlags};
pub use id::UnitId;
pub use package::{
    BuildScriptKind, Changelog, Dep, DepFlags, DepKind, PackageNaming, Script, ScriptFlags,
    ScriptKind, Tag, TagClass, Trigger, TriggerKind, UnitAttr,
};
