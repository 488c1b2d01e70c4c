//! Dependency generation from file classification.
//!
//! A file hook inspects every discovered file's classification and derives
//! provide/require entries for the file's destination package; a build hook
//! at the post-file-processing point writes the collected entries into the
//! package metadata. The build product is installed as `depgen.so`.

use std::collections::BTreeMap;

use packmill_module_sdk::prelude::*;

/// Dependencies collected for one package.
#[derive(Debug, Default)]
struct PackageDeps {
    provides: Vec<Dep>,
    requires: Vec<Dep>,
}

/// Per-build-unit tally of generated dependencies, keyed by package name.
#[derive(Debug, Default)]
struct DepTally {
    by_package: BTreeMap<String, PackageDeps>,
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Derives dependency entries from one file's classification.
fn deps_for(file: &InterceptedFile) -> PackageDeps {
    let mut deps = PackageDeps::default();
    let cls = file.classification();

    if cls.has_attr("elf") && cls.ftype.contains("shared object") {
        let soname = basename(&file.record().archive_path).to_string();
        let suffix = if cls.color.contains(FileColor::ELF64) {
            "()(64bit)"
        } else {
            ""
        };
        deps.provides.push(Dep::on(format!("{soname}{suffix}")));
        deps.requires.push(Dep::on(format!("libc.so.6{suffix}")));
    }

    if cls.has_attr("python") {
        deps.requires.push(Dep::on("python(abi)"));
    }

    if cls.has_attr("script") {
        deps.requires.push(Dep::on("/bin/sh"));
    }

    deps
}

fn collect_classified(ctx: &mut HookCtx<'_>, file: &mut InterceptedFile) -> BuildResult<()> {
    let derived = deps_for(file);
    if derived.provides.is_empty() && derived.requires.is_empty() {
        return Ok(());
    }

    debug!(
        path = file.disk_path(),
        package = file.original_package(),
        provides = derived.provides.len(),
        requires = derived.requires.len(),
        "collected dependencies"
    );

    let tally = ctx.user_data_mut().get_or_insert_with(DepTally::default);
    let entry = tally
        .by_package
        .entry(file.original_package().to_string())
        .or_default();
    entry.provides.extend(derived.provides);
    entry.requires.extend(derived.requires);
    Ok(())
}

fn merge_into(existing: &mut Vec<Dep>, generated: Vec<Dep>) {
    for dep in generated {
        if !existing.contains(&dep) {
            existing.push(dep);
        }
    }
}

fn apply_generated_deps(ctx: &mut HookCtx<'_>) -> BuildResult<()> {
    let Some(tally) = ctx.user_data_mut().take::<DepTally>() else {
        return Ok(());
    };

    for (package_name, generated) in tally.by_package {
        let Some(package) = ctx.unit_mut().package_by_name_mut(&package_name) else {
            warn!(package = %package_name, "generated dependencies for an unknown package");
            continue;
        };

        info!(
            package = %package_name,
            provides = generated.provides.len(),
            requires = generated.requires.len(),
            "applying generated dependencies"
        );

        let mut provides = package.deps(DepKind::Provides);
        merge_into(&mut provides, generated.provides);
        package.set_deps(DepKind::Provides, provides)?;

        let mut requires = package.deps(DepKind::Requires);
        merge_into(&mut requires, generated.requires);
        package.set_deps(DepKind::Requires, requires)?;
    }

    Ok(())
}

/// Registers the dependency-generation hooks.
pub fn register(registrar: &mut ModuleRegistrar<'_>) -> BuildResult<()> {
    let mut filehook = FileHook::new(collect_classified);
    filehook.add_glob("*");
    filehook.set_name("collect_classified()");
    registrar.register_file_hook(filehook);

    let mut buildhook = BuildHook::new(HookPoint::PostFileProcessing, apply_generated_deps);
    buildhook.set_name("apply_generated_deps()");
    registrar.register_build_hook(buildhook);

    Ok(())
}

module_entry!(init_depgen, register);
