//! # packmill-module-sdk
//!
//! SDK for developing Packmill modules.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use packmill_module_sdk::prelude::*;
//!
//! fn mark_docs(ctx: &mut HookCtx<'_>, file: &mut InterceptedFile) -> BuildResult<()> {
//!     file.record_mut().attrs |= FileAttrs::DOC;
//!     Ok(())
//! }
//!
//! pub fn register(registrar: &mut ModuleRegistrar<'_>) -> BuildResult<()> {
//!     let mut hook = FileHook::new(mark_docs);
//!     hook.add_glob("%{_docdir}/*");
//!     hook.set_name("mark_docs()");
//!     registrar.register_file_hook(hook);
//!     Ok(())
//! }
//!
//! // The crate builds as a cdylib installed as `docs.so`, so the loader
//! // resolves `init_docs`.
//! module_entry!(init_docs, register);
//! ```

pub mod macros;

/// Prelude for convenient imports.
pub mod prelude {
    pub use tracing;
    pub use tracing::{debug, error, info, warn};

    pub use packmill_core::error::{BuildError, ErrorKind};
    pub use packmill_core::result::BuildResult;
    pub use packmill_core::traits::{BuildUnit, FileClassifier, PackageAccess};
    pub use packmill_core::types::{
        BuildScriptKind, Changelog, Dep, DepFlags, DepKind, FileAttrs, FileClassification,
        FileColor, FileRecord, FileStat, PackageNaming, Script, ScriptFlags, ScriptKind,
        SpecdFlags, Tag, Trigger, TriggerKind, UnitAttr, UnitId, VerifyFlags,
    };

    pub use packmill_modules::context::{CleanupCtx, DataSlot, HookCtx};
    pub use packmill_modules::hooks::definitions::{
        BuildHook, FileHook, HookPoint, HOOK_DEFAULT_PRIORITY, HOOK_MAX_PRIORITY,
        HOOK_MIN_PRIORITY,
    };
    pub use packmill_modules::intercept::{FileAddition, FileVerdict, InterceptedFile};
    pub use packmill_modules::manager::ModuleRegistrar;

    pub use crate::module_entry;
}
