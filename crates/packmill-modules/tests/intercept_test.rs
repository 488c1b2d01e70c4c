//! File interception: glob filtering, sticky verdicts, cumulative record
//! edits, copy isolation, addition tracking, and the rollback policy.

mod common;

use common::{trace, trace_of};

use packmill_core::config::ModulesConfig;
use packmill_core::error::BuildError;
use packmill_core::memhost::{MemClassifier, MemPackage, MemUnit};
use packmill_core::result::BuildResult;
use packmill_core::traits::{BuildUnit, PackageAccess};
use packmill_core::types::{FileRecord, UnitId};
use packmill_modules::context::HookCtx;
use packmill_modules::hooks::definitions::{BuildHook, FileHook, HookPoint};
use packmill_modules::intercept::InterceptedFile;
use packmill_modules::loader::{BuiltinModule, ModuleLoader};
use packmill_modules::manager::{ModuleManager, ModuleRegistrar};

fn load(modules: &[BuiltinModule]) -> ModuleManager {
    common::init_logging();
    let mut manager = ModuleManager::new();
    ModuleLoader::load_builtin(&mut manager, modules).expect("builtin load works");
    manager
}

fn unit_with_extras(id: u64) -> MemUnit {
    let mut unit = MemUnit::with_main_package(id, "foo");
    unit.push_package(MemPackage::new("extras"));
    unit.push_package(MemPackage::new("spare"));
    unit
}

fn record_seen(ctx: &mut HookCtx<'_>, file: &mut InterceptedFile) -> BuildResult<()> {
    let tag = format!("seen:{}", file.disk_path());
    trace(ctx, &tag);
    Ok(())
}

fn init_sources_only(registrar: &mut ModuleRegistrar<'_>) -> BuildResult<()> {
    let mut hook = FileHook::new(record_seen);
    hook.add_glob("*.h");
    hook.add_glob("*.c");
    registrar.register_file_hook(hook);
    Ok(())
}

#[test]
fn test_glob_or_semantics_filter_dispatch() {
    let mut manager = load(&[BuiltinModule {
        name: "sources",
        init: init_sources_only,
    }]);
    let mut unit = unit_with_extras(1);

    for path in ["foo.h", "bar.c", "baz.txt"] {
        manager
            .call_file_hooks(&mut unit, &MemClassifier, "foo", &FileRecord::new(path, path))
            .expect("pass works");
    }
    assert_eq!(trace_of(&unit), "seen:foo.h;seen:bar.c");
}

fn init_no_globs(registrar: &mut ModuleRegistrar<'_>) -> BuildResult<()> {
    registrar.register_file_hook(FileHook::new(record_seen));
    Ok(())
}

#[test]
fn test_empty_glob_set_never_fires() {
    let mut manager = load(&[BuiltinModule {
        name: "silent",
        init: init_no_globs,
    }]);
    let mut unit = unit_with_extras(1);
    manager
        .call_file_hooks(
            &mut unit,
            &MemClassifier,
            "foo",
            &FileRecord::new("/anything", "/anything"),
        )
        .expect("pass works");
    assert_eq!(trace_of(&unit), "");
}

fn exclude_hook(_ctx: &mut HookCtx<'_>, file: &mut InterceptedFile) -> BuildResult<()> {
    file.exclude_from_original();
    Ok(())
}

fn observe_verdict(ctx: &mut HookCtx<'_>, file: &mut InterceptedFile) -> BuildResult<()> {
    // A later hook sees the cleared verdict; the handle deliberately has no
    // way to set it back.
    let tag = format!("included:{}", file.include_in_original());
    trace(ctx, &tag);
    Ok(())
}

fn init_excluder(registrar: &mut ModuleRegistrar<'_>) -> BuildResult<()> {
    let mut hook = FileHook::new(exclude_hook);
    hook.add_glob("*.so");
    hook.set_priority(100)?;
    registrar.register_file_hook(hook);
    Ok(())
}

fn init_observer(registrar: &mut ModuleRegistrar<'_>) -> BuildResult<()> {
    let mut hook = FileHook::new(observe_verdict);
    hook.add_glob("*");
    hook.set_priority(200)?;
    registrar.register_file_hook(hook);
    Ok(())
}

#[test]
fn test_verdict_is_sticky_across_hooks() {
    let mut manager = load(&[
        BuiltinModule { name: "excluder", init: init_excluder },
        BuiltinModule { name: "observer", init: init_observer },
    ]);
    let mut unit = unit_with_extras(1);

    let record = FileRecord::new("/lib/libfoo.so", "/lib/libfoo.so");
    let verdict = manager
        .call_file_hooks(&mut unit, &MemClassifier, "foo", &record)
        .expect("pass works");
    assert!(!verdict.include_in_original);
    assert_eq!(trace_of(&unit), "included:false");

    // A file the excluder's globs skip keeps its verdict.
    let record = FileRecord::new("/usr/bin/foo", "/usr/bin/foo");
    let verdict = manager
        .call_file_hooks(&mut unit, &MemClassifier, "foo", &record)
        .expect("pass works");
    assert!(verdict.include_in_original);
}

fn rename_owner(_ctx: &mut HookCtx<'_>, file: &mut InterceptedFile) -> BuildResult<()> {
    file.record_mut().uname = "games".to_string();
    Ok(())
}

fn add_to_extras(ctx: &mut HookCtx<'_>, file: &mut InterceptedFile) -> BuildResult<()> {
    let Some(package) = ctx.unit_mut().package_by_name_mut("extras") else {
        return Err(BuildError::not_found("extras package missing"));
    };
    file.add_to(package)
}

fn rename_then_add_to_spare(ctx: &mut HookCtx<'_>, file: &mut InterceptedFile) -> BuildResult<()> {
    // Earlier hooks' edits are visible here.
    let tag = format!("uname:{}", file.record().uname);
    trace(ctx, &tag);
    file.record_mut().uname = "news".to_string();
    let Some(package) = ctx.unit_mut().package_by_name_mut("spare") else {
        return Err(BuildError::not_found("spare package missing"));
    };
    file.add_to(package)
}

fn init_mutator(registrar: &mut ModuleRegistrar<'_>) -> BuildResult<()> {
    let mut hook = FileHook::new(rename_owner);
    hook.add_glob("*");
    hook.set_priority(100)?;
    registrar.register_file_hook(hook);

    let mut hook = FileHook::new(add_to_extras);
    hook.add_glob("*");
    hook.set_priority(200)?;
    registrar.register_file_hook(hook);

    let mut hook = FileHook::new(rename_then_add_to_spare);
    hook.add_glob("*");
    hook.set_priority(300)?;
    registrar.register_file_hook(hook);
    Ok(())
}

#[test]
fn test_cumulative_edits_and_copy_isolation() {
    let mut manager = load(&[BuiltinModule {
        name: "mutator",
        init: init_mutator,
    }]);
    let mut unit = unit_with_extras(1);

    let record = FileRecord::new("/usr/bin/tool", "/usr/bin/tool");
    let verdict = manager
        .call_file_hooks(&mut unit, &MemClassifier, "foo", &record)
        .expect("pass works");

    // The third hook saw the first hook's edit.
    assert_eq!(trace_of(&unit), "uname:games");

    // Copy isolation: the record stored in "extras" froze at add time and
    // the later rename never reached it; the host's own record is pristine.
    assert_eq!(unit.package("extras").expect("exists").files()[0].uname, "games");
    assert_eq!(unit.package("spare").expect("exists").files()[0].uname, "news");
    assert_eq!(record.uname, "root");

    assert_eq!(verdict.additions.len(), 2);
    assert_eq!(verdict.additions[0].package, "extras");
    assert_eq!(verdict.additions[1].package, "spare");
    assert!(verdict.additions.iter().all(|a| a.unit == UnitId(1)));
    assert!(verdict.include_in_original);
}

fn add_to_listless(ctx: &mut HookCtx<'_>, file: &mut InterceptedFile) -> BuildResult<()> {
    let Some(package) = ctx.unit_mut().package_by_name_mut("unready") else {
        return Err(BuildError::not_found("unready package missing"));
    };
    // The refusal is reported to the hook; swallowing it keeps the pass
    // alive.
    if file.add_to(package).is_err() {
        trace(ctx, "refused");
    }
    Ok(())
}

fn init_listless(registrar: &mut ModuleRegistrar<'_>) -> BuildResult<()> {
    let mut hook = FileHook::new(add_to_listless);
    hook.add_glob("*");
    registrar.register_file_hook(hook);
    Ok(())
}

#[test]
fn test_add_to_package_without_file_list_is_non_fatal() {
    let mut manager = load(&[BuiltinModule {
        name: "listless",
        init: init_listless,
    }]);
    let mut unit = MemUnit::with_main_package(1, "foo");
    unit.push_package(MemPackage::without_file_list("unready"));

    let record = FileRecord::new("/usr/bin/foo", "/usr/bin/foo");
    let verdict = manager
        .call_file_hooks(&mut unit, &MemClassifier, "foo", &record)
        .expect("pass survives the refusal");
    assert_eq!(trace_of(&unit), "refused");
    assert!(verdict.additions.is_empty());
}

fn trace_last_point(ctx: &mut HookCtx<'_>, _file: &mut InterceptedFile) -> BuildResult<()> {
    let phase = ctx
        .last_build_point()
        .map(|p| p.as_str())
        .unwrap_or("none");
    let tag = format!("phase:{phase}");
    trace(ctx, &tag);
    Ok(())
}

fn phase_noop(_ctx: &mut HookCtx<'_>) -> BuildResult<()> {
    Ok(())
}

fn init_phase_witness(registrar: &mut ModuleRegistrar<'_>) -> BuildResult<()> {
    registrar.register_build_hook(BuildHook::new(HookPoint::PostInstall, phase_noop));
    let mut hook = FileHook::new(trace_last_point);
    hook.add_glob("*");
    registrar.register_file_hook(hook);
    Ok(())
}

#[test]
fn test_file_hook_sees_last_build_point() {
    let mut manager = load(&[BuiltinModule {
        name: "witness",
        init: init_phase_witness,
    }]);
    let mut unit = unit_with_extras(1);
    let record = FileRecord::new("/usr/bin/foo", "/usr/bin/foo");

    // Before any build hook ran for this unit, there is no phase yet.
    manager
        .call_file_hooks(&mut unit, &MemClassifier, "foo", &record)
        .expect("pass works");
    manager
        .call_build_hooks(&mut unit, HookPoint::PostInstall)
        .expect("dispatch works");
    manager
        .call_file_hooks(&mut unit, &MemClassifier, "foo", &record)
        .expect("pass works");
    assert_eq!(trace_of(&unit), "phase:none;phase:post_install");
}

fn fail_after_match(_ctx: &mut HookCtx<'_>, _file: &mut InterceptedFile) -> BuildResult<()> {
    Err(BuildError::dispatch("file hook gave up"))
}

fn init_add_then_fail(registrar: &mut ModuleRegistrar<'_>) -> BuildResult<()> {
    let mut hook = FileHook::new(add_to_extras);
    hook.add_glob("*");
    hook.set_priority(100)?;
    registrar.register_file_hook(hook);

    let mut hook = FileHook::new(fail_after_match);
    hook.add_glob("*");
    hook.set_priority(200)?;
    registrar.register_file_hook(hook);
    Ok(())
}

#[test]
fn test_failed_pass_keeps_additions_by_default() {
    let mut manager = load(&[BuiltinModule {
        name: "fragile",
        init: init_add_then_fail,
    }]);
    let mut unit = unit_with_extras(1);

    let record = FileRecord::new("/usr/bin/foo", "/usr/bin/foo");
    manager
        .call_file_hooks(&mut unit, &MemClassifier, "foo", &record)
        .unwrap_err();
    assert_eq!(unit.package("extras").expect("exists").files().len(), 1);
}

#[test]
fn test_failed_pass_rolls_back_when_configured() {
    let config = ModulesConfig {
        rollback_file_additions: true,
        ..ModulesConfig::default()
    };
    let mut manager = ModuleManager::from_config(&config);
    ModuleLoader::load_builtin(
        &mut manager,
        &[BuiltinModule {
            name: "fragile",
            init: init_add_then_fail,
        }],
    )
    .expect("builtin load works");
    let mut unit = unit_with_extras(1);

    let record = FileRecord::new("/usr/bin/foo", "/usr/bin/foo");
    manager
        .call_file_hooks(&mut unit, &MemClassifier, "foo", &record)
        .unwrap_err();
    assert!(unit.package("extras").expect("exists").files().is_empty());
}
