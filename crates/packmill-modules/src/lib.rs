//! # packmill-modules
//!
//! Module framework for Packmill. Provides:
//!
//! - Module lifecycle management (load, init, shutdown, unload)
//! - Hook registry with deterministic priority ordering across modules
//! - Build-hook and file-hook dispatch bound to per-build-unit contexts
//! - File interception with sticky verdicts and package rerouting
//! - Dynamic loading via `libloading`, plus a builtin path for statically
//!   linked modules
//!
//! The engine is single-threaded and synchronous: loading, registration, and
//! dispatch are plain nested calls on one thread, and a hook call blocks the
//! host until the module returns.

pub mod context;
pub mod glob;
pub mod hooks;
pub mod intercept;
pub mod loader;
pub mod manager;
pub mod module;

pub use context::{CleanupCtx, DataSlot, HookCtx};
pub use hooks::definitions::{BuildHook, FileHook, HookPoint};
pub use intercept::{FileAddition, FileVerdict, InterceptedFile};
pub use loader::{BuiltinModule, LoadedModules, ModuleLoader};
pub use manager::{ModuleManager, ModuleRegistrar};
pub use module::ModuleInfo;
