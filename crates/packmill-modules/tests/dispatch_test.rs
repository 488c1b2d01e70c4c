//! Build-hook dispatch: deterministic ordering, point filtering, context
//! identity, fail-fast error propagation, and operation-misuse refusals.

mod common;

use common::{trace, trace_of};

use packmill_core::error::{BuildError, ErrorKind};
use packmill_core::memhost::{MemClassifier, MemUnit};
use packmill_core::result::BuildResult;
use packmill_core::traits::PackageAccess;
use packmill_core::types::{FileRecord, PackageNaming};
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

fn trace_alpha(ctx: &mut HookCtx<'_>) -> BuildResult<()> {
    trace(ctx, "alpha");
    Ok(())
}

fn trace_beta(ctx: &mut HookCtx<'_>) -> BuildResult<()> {
    trace(ctx, "beta");
    Ok(())
}

fn trace_zeta(ctx: &mut HookCtx<'_>) -> BuildResult<()> {
    trace(ctx, "zeta");
    Ok(())
}

fn init_alpha(registrar: &mut ModuleRegistrar<'_>) -> BuildResult<()> {
    let mut hook = BuildHook::new(HookPoint::PostParse, trace_alpha);
    hook.set_priority(100)?;
    registrar.register_build_hook(hook);
    Ok(())
}

fn init_beta(registrar: &mut ModuleRegistrar<'_>) -> BuildResult<()> {
    let mut hook = BuildHook::new(HookPoint::PostParse, trace_beta);
    hook.set_priority(100)?;
    registrar.register_build_hook(hook);
    Ok(())
}

fn init_zeta_high_priority(registrar: &mut ModuleRegistrar<'_>) -> BuildResult<()> {
    let mut hook = BuildHook::new(HookPoint::PostParse, trace_zeta);
    hook.set_priority(50)?;
    registrar.register_build_hook(hook);
    Ok(())
}

#[test]
fn test_name_ascending_breaks_priority_ties() {
    // Enumeration order says beta first; the tie-break must say alpha.
    let mut manager = load(&[
        BuiltinModule { name: "beta", init: init_beta },
        BuiltinModule { name: "alpha", init: init_alpha },
    ]);

    let mut unit = MemUnit::with_main_package(1, "foo");
    manager
        .call_build_hooks(&mut unit, HookPoint::PostParse)
        .expect("dispatch works");
    assert_eq!(trace_of(&unit), "alpha;beta");
}

#[test]
fn test_priority_beats_module_name() {
    let mut manager = load(&[
        BuiltinModule { name: "alpha", init: init_alpha },
        BuiltinModule { name: "zeta", init: init_zeta_high_priority },
    ]);

    let mut unit = MemUnit::with_main_package(1, "foo");
    manager
        .call_build_hooks(&mut unit, HookPoint::PostParse)
        .expect("dispatch works");
    assert_eq!(trace_of(&unit), "zeta;alpha");
}

fn trace_first(ctx: &mut HookCtx<'_>) -> BuildResult<()> {
    trace(ctx, "first");
    Ok(())
}

fn trace_second(ctx: &mut HookCtx<'_>) -> BuildResult<()> {
    trace(ctx, "second");
    Ok(())
}

fn init_twice(registrar: &mut ModuleRegistrar<'_>) -> BuildResult<()> {
    registrar.register_build_hook(BuildHook::new(HookPoint::PostParse, trace_first));
    registrar.register_build_hook(BuildHook::new(HookPoint::PostParse, trace_second));
    Ok(())
}

#[test]
fn test_later_registration_runs_first_within_module() {
    let mut manager = load(&[BuiltinModule { name: "twice", init: init_twice }]);

    let mut unit = MemUnit::with_main_package(1, "foo");
    manager
        .call_build_hooks(&mut unit, HookPoint::PostParse)
        .expect("dispatch works");
    assert_eq!(trace_of(&unit), "second;first");
}

fn init_post_prep(registrar: &mut ModuleRegistrar<'_>) -> BuildResult<()> {
    registrar.register_build_hook(BuildHook::new(HookPoint::PostPrep, trace_alpha));
    Ok(())
}

#[test]
fn test_hooks_fire_only_at_their_point() {
    let mut manager = load(&[BuiltinModule { name: "prep", init: init_post_prep }]);

    let mut unit = MemUnit::with_main_package(1, "foo");
    manager
        .call_build_hooks(&mut unit, HookPoint::PostParse)
        .expect("dispatch works");
    assert_eq!(trace_of(&unit), "");

    manager
        .call_build_hooks(&mut unit, HookPoint::PostPrep)
        .expect("dispatch works");
    assert_eq!(trace_of(&unit), "alpha");
}

fn failing_hook(ctx: &mut HookCtx<'_>) -> BuildResult<()> {
    trace(ctx, "boom");
    Err(BuildError::dispatch("module gave up"))
}

fn init_fail_fast(registrar: &mut ModuleRegistrar<'_>) -> BuildResult<()> {
    let mut first = BuildHook::new(HookPoint::PostParse, trace_first);
    first.set_priority(100)?;
    registrar.register_build_hook(first);

    let mut boom = BuildHook::new(HookPoint::PostParse, failing_hook);
    boom.set_priority(200)?;
    registrar.register_build_hook(boom);

    let mut second = BuildHook::new(HookPoint::PostParse, trace_second);
    second.set_priority(300)?;
    registrar.register_build_hook(second);
    Ok(())
}

#[test]
fn test_dispatch_fails_fast_without_rollback() {
    let mut manager = load(&[BuiltinModule { name: "fragile", init: init_fail_fast }]);

    let mut unit = MemUnit::with_main_package(1, "foo");
    let err = manager
        .call_build_hooks(&mut unit, HookPoint::PostParse)
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Dispatch);
    // The failing hook's own mutations stay; the remaining hook never ran.
    assert_eq!(trace_of(&unit), "first;boom");
}

fn counting_hook(ctx: &mut HookCtx<'_>) -> BuildResult<()> {
    *ctx.global_data_mut().get_or_insert_with(|| 0u32) += 1;
    *ctx.user_data_mut().get_or_insert_with(|| 0u32) += 1;
    Ok(())
}

fn report_counters(ctx: &mut HookCtx<'_>) -> BuildResult<()> {
    let global = ctx.global_data().get::<u32>().copied().unwrap_or(0);
    let user = ctx.user_data().get::<u32>().copied().unwrap_or(0);
    trace(ctx, &format!("global={global},user={user}"));
    Ok(())
}

fn init_counter(registrar: &mut ModuleRegistrar<'_>) -> BuildResult<()> {
    registrar.register_build_hook(BuildHook::new(HookPoint::PostParse, counting_hook));
    registrar.register_build_hook(BuildHook::new(HookPoint::Final, report_counters));
    Ok(())
}

#[test]
fn test_context_identity_and_data_scoping() {
    let mut manager = load(&[BuiltinModule { name: "counter", init: init_counter }]);

    let mut unit1 = MemUnit::with_main_package(1, "foo");
    let mut unit2 = MemUnit::with_main_package(2, "bar");

    manager
        .call_build_hooks(&mut unit1, HookPoint::PostParse)
        .expect("dispatch works");
    manager
        .call_build_hooks(&mut unit1, HookPoint::PostParse)
        .expect("dispatch works");
    manager
        .call_build_hooks(&mut unit2, HookPoint::PostParse)
        .expect("dispatch works");

    // Global data is module-wide; user data sticks to the (module, unit)
    // context, and repeated lookups hit the same context.
    manager
        .call_build_hooks(&mut unit1, HookPoint::Final)
        .expect("dispatch works");
    manager
        .call_build_hooks(&mut unit2, HookPoint::Final)
        .expect("dispatch works");
    assert_eq!(trace_of(&unit1), "global=3,user=2");
    assert_eq!(trace_of(&unit2), "global=3,user=1");
}

fn add_package_hook(ctx: &mut HookCtx<'_>) -> BuildResult<()> {
    let package = ctx.new_package("extra", "Added by module", PackageNaming::Sub)?;
    package.finalize()?;
    Ok(())
}

fn add_package_from_file_hook(
    ctx: &mut HookCtx<'_>,
    _file: &mut InterceptedFile,
) -> BuildResult<()> {
    ctx.new_package("sneaky", "Added by file hook", PackageNaming::Sub)?;
    Ok(())
}

fn init_adds_at_post_install(registrar: &mut ModuleRegistrar<'_>) -> BuildResult<()> {
    registrar.register_build_hook(BuildHook::new(HookPoint::PostInstall, add_package_hook));
    Ok(())
}

fn init_adds_too_late(registrar: &mut ModuleRegistrar<'_>) -> BuildResult<()> {
    registrar.register_build_hook(BuildHook::new(
        HookPoint::PostFileProcessing,
        add_package_hook,
    ));
    Ok(())
}

fn init_adds_from_file_hook(registrar: &mut ModuleRegistrar<'_>) -> BuildResult<()> {
    let mut hook = FileHook::new(add_package_from_file_hook);
    hook.add_glob("*");
    registrar.register_file_hook(hook);
    Ok(())
}

#[test]
fn test_package_creation_is_gated_by_point() {
    let mut manager = load(&[BuiltinModule {
        name: "adder",
        init: init_adds_at_post_install,
    }]);
    let mut unit = MemUnit::with_main_package(1, "foo");
    manager
        .call_build_hooks(&mut unit, HookPoint::PostInstall)
        .expect("dispatch works");
    assert!(unit.package("foo-extra").is_some());
}

#[test]
fn test_package_creation_after_file_processing_is_refused() {
    let mut manager = load(&[BuiltinModule {
        name: "late",
        init: init_adds_too_late,
    }]);
    let mut unit = MemUnit::with_main_package(1, "foo");
    let err = manager
        .call_build_hooks(&mut unit, HookPoint::PostFileProcessing)
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Misuse);
    assert!(unit.package("foo-extra").is_none());
}

#[test]
fn test_package_creation_from_file_hook_is_refused() {
    let mut manager = load(&[BuiltinModule {
        name: "sneaky",
        init: init_adds_from_file_hook,
    }]);
    let mut unit = MemUnit::with_main_package(1, "foo");
    let record = FileRecord::new("/usr/bin/foo", "/usr/bin/foo");
    let err = manager
        .call_file_hooks(&mut unit, &MemClassifier, "foo", &record)
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Misuse);
    assert!(unit.package("foo-sneaky").is_none());
}

#[test]
fn test_dispatch_without_modules_is_a_no_op() {
    let mut manager = ModuleManager::new();
    let mut unit = MemUnit::with_main_package(1, "foo");
    manager
        .call_build_hooks(&mut unit, HookPoint::PostParse)
        .expect("no-op works");
    let verdict = manager
        .call_file_hooks(
            &mut unit,
            &MemClassifier,
            "foo",
            &FileRecord::new("/usr/bin/foo", "/usr/bin/foo"),
        )
        .expect("no-op works");
    assert!(verdict.include_in_original);
}
