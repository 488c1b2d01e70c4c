//! Module records and per-build-unit contexts.

use serde::Serialize;

use packmill_core::types::UnitId;

use crate::context::{CleanupCtx, DataSlot};
use crate::hooks::definitions::HookPoint;
use crate::hooks::registry::{RegisteredBuildHook, RegisteredFileHook};

/// Teardown callback a module may install during init.
pub type ModuleCleanupFn = fn(&mut CleanupCtx<'_>);

/// Dispatch state of one (module, build-unit) context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum DispatchState {
    #[default]
    Idle,
    RunningBuildHook,
    RunningFileHook,
}

/// Per-(module, build-unit) state bag.
///
/// Created lazily on first lookup and kept for the manager's lifetime;
/// repeated lookups for the same pair return the same context.
#[derive(Debug, Default)]
pub(crate) struct BuildContext {
    pub(crate) unit: UnitId,
    pub(crate) user_data: DataSlot,
    pub(crate) state: DispatchState,
    pub(crate) last_point: Option<HookPoint>,
}

impl BuildContext {
    fn new(unit: UnitId) -> Self {
        Self {
            unit,
            ..Self::default()
        }
    }
}

/// One loaded module.
///
/// The staging hook lists are only used between the module's init call and
/// the manager's one-time sort pass; afterwards the hooks live in the
/// manager's global sorted lists.
#[derive(Debug, Default)]
pub(crate) struct ModuleRecord {
    pub(crate) name: String,
    pub(crate) global_data: DataSlot,
    pub(crate) contexts: Vec<BuildContext>,
    pub(crate) staged_build_hooks: Vec<RegisteredBuildHook>,
    pub(crate) staged_file_hooks: Vec<RegisteredFileHook>,
    pub(crate) cleanup: Option<ModuleCleanupFn>,
}

impl ModuleRecord {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Get-or-create the context for `unit` and return it together with the
    /// module-wide data slot.
    pub(crate) fn slots(&mut self, unit: UnitId) -> (&mut DataSlot, &mut BuildContext) {
        let idx = match self.contexts.iter().position(|c| c.unit == unit) {
            Some(idx) => idx,
            None => {
                self.contexts.push(BuildContext::new(unit));
                self.contexts.len() - 1
            }
        };
        (&mut self.global_data, &mut self.contexts[idx])
    }

    /// Runs and removes the cleanup callback, if one was installed.
    pub(crate) fn run_cleanup(&mut self) {
        if let Some(cleanup) = self.cleanup.take() {
            let ModuleRecord {
                name, global_data, ..
            } = self;
            let mut ctx = CleanupCtx::new(name, global_data);
            cleanup(&mut ctx);
            tracing::debug!(module = %name, "module cleanup finished");
        }
    }
}

/// Metadata about a loaded module, for listings and diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleInfo {
    /// Module name (the shared object's validated stem).
    pub name: String,
    /// Number of build hooks the module registered.
    pub build_hooks: usize,
    /// Number of file hooks the module registered.
    pub file_hooks: usize,
    /// Whether the module installed a cleanup callback.
    pub has_cleanup: bool,
}

/// Whether `name` is a valid module name: `[A-Za-z][A-Za-z0-9_]*`.
pub(crate) fn is_valid_module_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
