//! Module manager — registration, deterministic hook dispatch, shutdown.

use tracing::{debug, error, info};

use packmill_core::config::ModulesConfig;
use packmill_core::error::BuildError;
use packmill_core::result::BuildResult;
use packmill_core::traits::{BuildUnit, FileClassifier};
use packmill_core::types::FileRecord;

use crate::context::{DataSlot, DispatchKind, HookCtx};
use crate::glob;
use crate::hooks::definitions::{BuildHook, FileHook, HookPoint};
use crate::hooks::registry::{
    RegisteredBuildHook, RegisteredFileHook, sort_build_hooks, sort_file_hooks,
};
use crate::intercept::{FileVerdict, InterceptedFile};
use crate::module::{
    BuildContext, DispatchState, ModuleCleanupFn, ModuleInfo, ModuleRecord, is_valid_module_name,
};

/// Owns the module records, the per-build-unit contexts nested under them,
/// and the globally sorted hook lists.
///
/// Registration happens while a module's init function runs, through the
/// [`ModuleRegistrar`] the loader stages for it. After the one-time sort
/// pass the hook lists are read-only; dispatch walks them in order and binds
/// each hook to its (module, build-unit) context.
#[derive(Debug)]
pub struct ModuleManager {
    /// Module records, sorted by name ascending.
    modules: Vec<ModuleRecord>,
    /// Globally sorted build hooks; staged per module until the sort pass.
    build_hooks: Vec<RegisteredBuildHook>,
    /// Globally sorted file hooks; staged per module until the sort pass.
    file_hooks: Vec<RegisteredFileHook>,
    /// Whether the sort pass has run.
    sorted: bool,
    /// Registration sequence counter.
    seq: u64,
    /// Whether a failed file-hook pass retracts its package additions.
    rollback_file_additions: bool,
}

impl ModuleManager {
    /// Creates an empty manager with default settings.
    pub fn new() -> Self {
        Self {
            modules: Vec::new(),
            build_hooks: Vec::new(),
            file_hooks: Vec::new(),
            sorted: false,
            seq: 0,
            rollback_file_additions: false,
        }
    }

    /// Creates a manager configured from the module-system settings.
    pub fn from_config(config: &ModulesConfig) -> Self {
        Self {
            rollback_file_additions: config.rollback_file_additions,
            ..Self::new()
        }
    }

    /// Stages a new module record and hands out the registrar its init
    /// function registers through.
    ///
    /// The record only becomes part of the manager when the loader commits
    /// it after a successful init call.
    pub fn begin_module(&mut self, name: &str) -> BuildResult<ModuleRegistrar<'_>> {
        if self.sorted {
            return Err(BuildError::registration(format!(
                "Module '{name}' arrived after hook sorting; modules can only be loaded in one batch"
            )));
        }
        if !is_valid_module_name(name) {
            return Err(BuildError::validation(format!(
                "Invalid module name '{name}'"
            )));
        }
        if self.modules.iter().any(|m| m.name == name) {
            return Err(BuildError::registration(format!(
                "Module '{name}' is already registered"
            )));
        }
        Ok(ModuleRegistrar {
            record: ModuleRecord::new(name),
            manager: self,
        })
    }

    fn next_seq(&mut self) -> u64 {
        let seq = self.seq;
        self.seq += 1;
        seq
    }

    fn commit_record(&mut self, record: ModuleRecord) {
        info!(
            module = %record.name,
            build_hooks = record.staged_build_hooks.len(),
            file_hooks = record.staged_file_hooks.len(),
            "module registered"
        );
        let idx = self.modules.partition_point(|m| m.name < record.name);
        self.modules.insert(idx, record);
    }

    /// Discards every module record and staged hook. Used by the loader to
    /// guarantee that a failed batch leaves zero modules usable.
    pub(crate) fn discard_registrations(&mut self) {
        self.modules.clear();
        self.build_hooks.clear();
        self.file_hooks.clear();
        self.sorted = false;
        self.seq = 0;
    }

    /// The one-time sort pass.
    ///
    /// Drains every module's staging lists into the two global lists and
    /// sorts them with the load-order-independent comparator. From here on
    /// the global lists are the only source of truth and registration is
    /// closed.
    pub fn sort_hooks(&mut self) {
        for module in &mut self.modules {
            self.build_hooks.append(&mut module.staged_build_hooks);
            self.file_hooks.append(&mut module.staged_file_hooks);
        }
        sort_build_hooks(&mut self.build_hooks);
        sort_file_hooks(&mut self.file_hooks);
        self.sorted = true;

        info!(
            modules = self.modules.len(),
            build_hooks = self.build_hooks.len(),
            file_hooks = self.file_hooks.len(),
            "hook tables sorted"
        );
        for hook in &self.build_hooks {
            debug!(
                module = %hook.module,
                hook = hook.label(),
                point = %hook.inner.point,
                priority = hook.inner.priority,
                "registered build hook"
            );
        }
        for hook in &self.file_hooks {
            debug!(
                module = %hook.module,
                hook = hook.label(),
                priority = hook.inner.priority,
                "registered file hook"
            );
        }
    }

    /// Number of registered modules.
    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// Lists all registered modules, name ascending.
    pub fn list_modules(&self) -> Vec<ModuleInfo> {
        self.modules
            .iter()
            .map(|m| {
                let (build_hooks, file_hooks) = if self.sorted {
                    (
                        self.build_hooks.iter().filter(|h| h.module == m.name).count(),
                        self.file_hooks.iter().filter(|h| h.module == m.name).count(),
                    )
                } else {
                    (m.staged_build_hooks.len(), m.staged_file_hooks.len())
                };
                ModuleInfo {
                    name: m.name.clone(),
                    build_hooks,
                    file_hooks,
                    has_cleanup: m.cleanup.is_some(),
                }
            })
            .collect()
    }

    /// Runs all build hooks registered for `point`, in sorted order, bound
    /// to `unit`.
    ///
    /// The first hook failure logs the offending module and aborts the
    /// remaining iteration; mutations already applied by earlier hooks stay
    /// in place. The host driver decides whether the failure aborts the
    /// whole build.
    pub fn call_build_hooks(
        &mut self,
        unit: &mut dyn BuildUnit,
        point: HookPoint,
    ) -> BuildResult<()> {
        if !self.sorted {
            if self.modules.is_empty() {
                return Ok(());
            }
            return Err(BuildError::misuse(
                "Hooks dispatched before the registration sort pass",
            ));
        }

        let unit_id = unit.unit_id();
        let Self {
            modules,
            build_hooks,
            ..
        } = self;

        for hook in build_hooks.iter() {
            if hook.inner.point != point {
                continue;
            }
            let owner = match modules.iter_mut().find(|m| m.name == hook.module) {
                Some(owner) => owner,
                None => {
                    return Err(BuildError::internal(format!(
                        "Hook owner '{}' has no module record",
                        hook.module
                    )));
                }
            };

            debug!(
                module = %hook.module,
                hook = hook.label(),
                point = %point,
                unit = %unit_id,
                "calling build hook"
            );

            let (global_data, context) = owner.slots(unit_id);
            context.state = DispatchState::RunningBuildHook;
            context.last_point = Some(point);
            let BuildContext {
                user_data, state, ..
            } = context;

            let mut ctx = HookCtx::new(
                hook.module.as_str(),
                DispatchKind::Build(point),
                Some(point),
                global_data,
                user_data,
                &mut *unit,
            );
            let result = (hook.inner.func)(&mut ctx);
            drop(ctx);
            *state = DispatchState::Idle;

            if let Err(err) = result {
                error!(
                    module = %hook.module,
                    hook = hook.label(),
                    point = %point,
                    error = %err,
                    "build hook failed"
                );
                return Err(err);
            }
        }

        Ok(())
    }

    /// Runs all matching file hooks for one discovered file, in sorted
    /// order, and returns the final verdict.
    ///
    /// The file is classified once per pass; every hook whose glob set
    /// matches the disk path then runs against one shared intercepted-file
    /// handle. The first failure aborts the pass; whether the pass's package
    /// additions survive a failure is the `rollback_file_additions`
    /// configuration choice.
    pub fn call_file_hooks(
        &mut self,
        unit: &mut dyn BuildUnit,
        classifier: &dyn FileClassifier,
        original_package: &str,
        record: &FileRecord,
    ) -> BuildResult<FileVerdict> {
        if !self.sorted {
            if self.modules.is_empty() {
                return Ok(FileVerdict::untouched());
            }
            return Err(BuildError::misuse(
                "Hooks dispatched before the registration sort pass",
            ));
        }
        if self.file_hooks.is_empty() {
            return Ok(FileVerdict::untouched());
        }

        let classification = classifier.classify(&record.disk_path, record.stat.mode)?;
        let mut file = InterceptedFile::new(record, classification, original_package, unit.unit_id());

        let unit_id = unit.unit_id();
        let rollback = self.rollback_file_additions;
        let Self {
            modules,
            file_hooks,
            ..
        } = self;

        let mut failure = None;
        for hook in file_hooks.iter() {
            let matched = match glob::matches_any(&*unit, hook.inner.globs(), file.disk_path()) {
                Ok(matched) => matched,
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            };
            if !matched {
                continue;
            }

            let owner = match modules.iter_mut().find(|m| m.name == hook.module) {
                Some(owner) => owner,
                None => {
                    failure = Some(BuildError::internal(format!(
                        "Hook owner '{}' has no module record",
                        hook.module
                    )));
                    break;
                }
            };

            debug!(
                module = %hook.module,
                hook = hook.label(),
                path = %file.disk_path(),
                unit = %unit_id,
                "calling file hook"
            );

            let (global_data, context) = owner.slots(unit_id);
            context.state = DispatchState::RunningFileHook;
            // File hooks have no point of their own; the context keeps the
            // last build point the unit passed.
            let last_point = context.last_point;
            let BuildContext {
                user_data, state, ..
            } = context;

            let was_included = file.include_in_original();
            let mut ctx = HookCtx::new(
                hook.module.as_str(),
                DispatchKind::File,
                last_point,
                global_data,
                user_data,
                &mut *unit,
            );
            let result = (hook.inner.func)(&mut ctx, &mut file);
            drop(ctx);
            *state = DispatchState::Idle;

            if was_included && !file.include_in_original() {
                info!(
                    module = %hook.module,
                    path = %file.disk_path(),
                    "file excluded from its original package"
                );
            }

            if let Err(err) = result {
                error!(
                    module = %hook.module,
                    hook = hook.label(),
                    path = %file.disk_path(),
                    error = %err,
                    "file hook failed"
                );
                failure = Some(err);
                break;
            }
        }

        if let Some(err) = failure {
            if rollback {
                file.retract_additions(unit);
            }
            return Err(err);
        }

        Ok(file.into_verdict())
    }

    /// Tears the manager down: runs every module's cleanup callback, in
    /// module-name order, exactly once.
    ///
    /// With dynamically loaded modules this must happen **before** their
    /// libraries are unloaded — the callbacks point into module code.
    pub fn shutdown(&mut self) {
        for module in &mut self.modules {
            module.run_cleanup();
        }
        info!(modules = self.modules.len(), "module manager shut down");
    }
}

impl Default for ModuleManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Registration handle for one module while its init function runs.
///
/// The original design exposed an implicit "current module" to registration
/// calls; here the loader threads the registrar through the init call
/// explicitly, so nothing global carries the module identity.
#[derive(Debug)]
pub struct ModuleRegistrar<'a> {
    manager: &'a mut ModuleManager,
    record: ModuleRecord,
}

impl ModuleRegistrar<'_> {
    /// Name of the module being initialized.
    pub fn module_name(&self) -> &str {
        &self.record.name
    }

    /// Stages a build hook under this module.
    pub fn register_build_hook(&mut self, hook: BuildHook) {
        let seq = self.manager.next_seq();
        debug!(
            module = %self.record.name,
            point = %hook.point,
            priority = hook.priority,
            "staged build hook"
        );
        self.record.staged_build_hooks.push(RegisteredBuildHook {
            inner: hook,
            module: self.record.name.clone(),
            seq,
        });
    }

    /// Stages a file hook under this module.
    pub fn register_file_hook(&mut self, hook: FileHook) {
        let seq = self.manager.next_seq();
        debug!(
            module = %self.record.name,
            priority = hook.priority,
            globs = hook.globs.len(),
            "staged file hook"
        );
        self.record.staged_file_hooks.push(RegisteredFileHook {
            inner: hook,
            module: self.record.name.clone(),
            seq,
        });
    }

    /// The module-wide data slot, for seeding state during init.
    pub fn global_data_mut(&mut self) -> &mut DataSlot {
        &mut self.record.global_data
    }

    /// Installs a callback run once when the manager shuts down.
    pub fn set_cleanup(&mut self, cleanup: ModuleCleanupFn) {
        self.record.cleanup = Some(cleanup);
    }

    /// Commits the staged record into the manager.
    pub(crate) fn commit(self) {
        let Self { manager, record } = self;
        manager.commit_record(record);
    }

    /// Drops the staged record; nothing it registered survives.
    pub(crate) fn abort(self) {
        debug!(module = %self.record.name, "module registration discarded");
    }
}
