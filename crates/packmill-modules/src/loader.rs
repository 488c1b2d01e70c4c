//! Dynamic module loading via `libloading`, plus the builtin path for
//! statically linked modules.
//!
//! A candidate shared object must carry the platform dylib suffix and a
//! stem matching `[A-Za-z][A-Za-z0-9_]*`; the stem is the module name and
//! the module must export `init_<name>`. Loading is fail-fast: one bad
//! candidate aborts the whole batch, already-opened libraries are closed,
//! and zero modules remain registered.

use std::ffi::c_void;
use std::fs;
use std::path::{Path, PathBuf};

use libloading::Library;
use regex::Regex;
use tracing::{error, info};

use packmill_core::config::ModulesConfig;
use packmill_core::error::{BuildError, ErrorKind};
use packmill_core::result::BuildResult;

use crate::manager::{ModuleManager, ModuleRegistrar};
use crate::module::is_valid_module_name;

/// Init entry point a dynamic module exports as `init_<name>`.
///
/// The pointer is the staged [`ModuleRegistrar`]; a negative return value
/// signals failure. The SDK's `module_entry!` macro generates both the
/// symbol and the safe wrapper around this signature.
pub type ModuleInitFn = unsafe extern "C" fn(*mut c_void) -> i32;

/// A statically linked module, loadable without a shared object.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinModule {
    /// Module name, same constraints as a dylib stem.
    pub name: &'static str,
    /// Init function; registration errors abort the batch like a negative
    /// return from a dynamic init symbol.
    pub init: fn(&mut ModuleRegistrar<'_>) -> BuildResult<()>,
}

/// Opaque bundle of the native library handles opened by one load batch.
///
/// Keep it alive for as long as the manager may call into module code;
/// dropping it unloads the libraries. Run [`ModuleManager::shutdown`]
/// first — cleanup callbacks point into module code.
///
/// [`ModuleManager::shutdown`]: crate::manager::ModuleManager::shutdown
pub struct LoadedModules {
    libraries: Vec<Library>,
}

impl LoadedModules {
    /// Number of libraries held open.
    pub fn len(&self) -> usize {
        self.libraries.len()
    }

    /// Whether the batch opened no libraries.
    pub fn is_empty(&self) -> bool {
        self.libraries.is_empty()
    }

    /// Closes every tracked library handle. Idempotent on `None`.
    pub fn unload_all(state: Option<LoadedModules>) {
        if let Some(state) = state {
            let count = state.libraries.len();
            drop(state);
            info!(modules = count, "modules unloaded");
        }
    }
}

impl std::fmt::Debug for LoadedModules {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModules")
            .field("loaded_count", &self.libraries.len())
            .finish()
    }
}

/// Loads modules from a directory into a [`ModuleManager`].
#[derive(Debug, Default)]
pub struct ModuleLoader {
    blacklist: Option<Regex>,
}

impl ModuleLoader {
    /// Creates a loader with no blacklist.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a loader from the module-system settings.
    pub fn from_config(config: &ModulesConfig) -> BuildResult<Self> {
        match config.blacklist.as_deref() {
            Some(pattern) => Self::with_blacklist(pattern),
            None => Ok(Self::new()),
        }
    }

    /// Creates a loader skipping candidates whose module name matches
    /// `pattern`.
    pub fn with_blacklist(pattern: &str) -> BuildResult<Self> {
        let blacklist = Regex::new(pattern).map_err(|e| {
            BuildError::with_source(
                ErrorKind::Configuration,
                format!("Bad module blacklist pattern '{pattern}'"),
                e,
            )
        })?;
        Ok(Self {
            blacklist: Some(blacklist),
        })
    }

    pub(crate) fn is_blacklisted(&self, name: &str) -> bool {
        self.blacklist.as_ref().is_some_and(|re| re.is_match(name))
    }

    /// Loads every candidate module in `dir`, then runs the manager's
    /// one-time hook sort pass.
    ///
    /// Candidates are processed in directory-enumeration order, which is
    /// filesystem dependent; the hook sort's tie-break rules keep dispatch
    /// order independent of it. Returns the opened library handles for
    /// later bulk unloading.
    pub fn load_all(&self, dir: &Path, manager: &mut ModuleManager) -> BuildResult<LoadedModules> {
        let candidates = collect_candidates(dir)?;

        let mut state = LoadedModules {
            libraries: Vec::new(),
        };
        for (name, path) in candidates {
            if self.is_blacklisted(&name) {
                info!(module = %name, "module skipped by blacklist");
                continue;
            }
            match load_one(&name, &path, manager) {
                Ok(library) => state.libraries.push(library),
                Err(err) => {
                    error!(
                        module = %name,
                        path = %path.display(),
                        error = %err,
                        "module load failed, aborting the batch"
                    );
                    manager.discard_registrations();
                    drop(state);
                    return Err(err);
                }
            }
        }

        manager.sort_hooks();
        Ok(state)
    }

    /// Loads statically linked modules with the same batch semantics as
    /// [`ModuleLoader::load_all`], then runs the sort pass.
    pub fn load_builtin(
        manager: &mut ModuleManager,
        modules: &[BuiltinModule],
    ) -> BuildResult<()> {
        for module in modules {
            let mut registrar = match manager.begin_module(module.name) {
                Ok(registrar) => registrar,
                Err(err) => {
                    manager.discard_registrations();
                    return Err(err);
                }
            };
            if let Err(err) = (module.init)(&mut registrar) {
                registrar.abort();
                error!(
                    module = %module.name,
                    error = %err,
                    "module init failed, aborting the batch"
                );
                manager.discard_registrations();
                return Err(err);
            }
            registrar.commit();
        }

        manager.sort_hooks();
        Ok(())
    }
}

fn load_one(name: &str, path: &Path, manager: &mut ModuleManager) -> BuildResult<Library> {
    let path = searchless_path(path);

    // SAFETY: loading a shared object runs its initializers. Module
    // directories are host-controlled; only trusted modules belong there.
    let library = unsafe { Library::new(&path) }.map_err(|e| {
        BuildError::with_source(
            ErrorKind::Load,
            format!("Error while loading module {}", path.display()),
            e,
        )
    })?;

    let symbol_name = format!("init_{name}");
    // SAFETY: the symbol is only trusted to have the documented init
    // signature; that contract is the module ABI.
    let init: ModuleInitFn = unsafe {
        let symbol: libloading::Symbol<'_, ModuleInitFn> =
            library.get(symbol_name.as_bytes()).map_err(|e| {
                BuildError::with_source(
                    ErrorKind::Load,
                    format!(
                        "Error while loading init function of module {}",
                        path.display()
                    ),
                    e,
                )
            })?;
        *symbol
    };

    let mut registrar = manager.begin_module(name)?;
    let registrar_ptr: *mut ModuleRegistrar<'_> = &mut registrar;
    // SAFETY: the pointer is valid for the duration of the call and the
    // module only uses it through the SDK wrapper.
    let rc = unsafe { init(registrar_ptr.cast::<c_void>()) };
    if rc < 0 {
        registrar.abort();
        return Err(BuildError::load(format!(
            "Init function of {} returned {rc}",
            path.display()
        )));
    }
    registrar.commit();

    info!(module = %name, path = %path.display(), "loaded module");
    Ok(library)
}

/// Enumerates loadable candidates in `dir`: `(module name, path)` pairs in
/// directory-enumeration order. Non-candidates are silently skipped; a
/// directory that cannot be opened is an immediate error.
pub(crate) fn collect_candidates(dir: &Path) -> BuildResult<Vec<(String, PathBuf)>> {
    let entries = fs::read_dir(dir).map_err(|e| {
        BuildError::with_source(
            ErrorKind::Load,
            format!("Could not open directory {}", dir.display()),
            e,
        )
    })?;

    let mut candidates = Vec::new();
    for entry in entries.flatten() {
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };
        if let Some(name) = module_name_of(file_name) {
            candidates.push((name, entry.path()));
        }
    }
    Ok(candidates)
}

/// Returns the module name if `file_name` looks like a loadable module:
/// the platform dylib suffix behind a valid name stem.
fn module_name_of(file_name: &str) -> Option<String> {
    let stem = file_name.strip_suffix(std::env::consts::DLL_SUFFIX)?;
    if !is_valid_module_name(stem) {
        return None;
    }
    Some(stem.to_string())
}

/// Pins a bare filename to the filesystem so the dynamic linker does not
/// consult its search path for it.
fn searchless_path(path: &Path) -> PathBuf {
    if path.components().count() == 1 && !path.is_absolute() {
        Path::new(".").join(path)
    } else {
        path.to_path_buf()
    }
}
