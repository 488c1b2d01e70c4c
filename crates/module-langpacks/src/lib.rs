//! Per-language subpackage splitting.
//!
//! A build hook after the install stage scans every package's `%files`
//! lines (and referenced file lists) for `%lang(...)` tags and creates one
//! `<main>-lang-<xx>` subpackage per language found. A file hook then
//! reroutes each locale-tagged file into its language subpackage and drops
//! it from the original package when every one of its languages is covered.
//! The build product is installed as `langpacks.so`.

use std::collections::BTreeMap;

use packmill_module_sdk::prelude::*;

/// Per-build-unit state: language → full subpackage name, plus counters
/// for the final report.
#[derive(Debug, Default)]
struct LangState {
    packages: BTreeMap<String, String>,
    routed_files: usize,
}

/// Languages worth a subpackage. Single-character locales other than `C`
/// and absurdly long ones are spec noise, not languages.
fn is_sane_lang(lang: &str) -> bool {
    match lang.len() {
        0 => false,
        1 => lang == "C",
        len => len < 32,
    }
}

/// Extracts the languages named by `%lang(...)` tags in one `%files` line.
fn parse_lang_tags(line: &str) -> Vec<String> {
    let mut langs = Vec::new();
    let mut rest = line;
    while let Some(start) = rest.find("%lang(") {
        let tail = &rest[start + "%lang(".len()..];
        let Some(end) = tail.find(')') else {
            break;
        };
        for lang in tail[..end].split([',', ' ', '\t']) {
            let lang = lang.trim();
            if is_sane_lang(lang) && !langs.iter().any(|l| l == lang) {
                langs.push(lang.to_string());
            }
        }
        rest = &tail[end + 1..];
    }
    langs
}

fn add_unique(found: Vec<String>, langs: &mut Vec<String>) {
    for lang in found {
        if !langs.contains(&lang) {
            langs.push(lang);
        }
    }
}

fn collect_unit_langs(ctx: &mut HookCtx<'_>) -> Vec<String> {
    let mut langs: Vec<String> = Vec::new();

    let package_count = ctx.unit().package_count();
    let mut list_refs = Vec::new();
    for idx in 0..package_count {
        let Some(package) = ctx.unit_mut().package_mut(idx) else {
            continue;
        };
        for line in package.files_lines() {
            add_unique(parse_lang_tags(&line), &mut langs);
        }
        list_refs.extend(package.file_list_refs());
    }

    // Files named by -f file lists live on disk.
    for path in list_refs {
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                for line in content.lines() {
                    add_unique(parse_lang_tags(line), &mut langs);
                }
            }
            Err(err) => warn!(path = %path, error = %err, "could not read file list"),
        }
    }

    langs.sort();
    langs
}

fn setup_language_packages(ctx: &mut HookCtx<'_>) -> BuildResult<()> {
    let langs = collect_unit_langs(ctx);

    let mut packages = BTreeMap::new();
    for lang in langs {
        info!(lang = %lang, "adding language subpackage");
        let package = ctx.new_package(
            &format!("lang-{lang}"),
            "Language subpackage",
            PackageNaming::Sub,
        )?;
        package.finalize()?;
        packages.insert(lang, package.name().to_string());
    }

    ctx.user_data_mut().set(LangState {
        packages,
        routed_files: 0,
    });
    Ok(())
}

fn route_locale_files(ctx: &mut HookCtx<'_>, file: &mut InterceptedFile) -> BuildResult<()> {
    let langs = file.record().langs.clone();
    if langs.is_empty() {
        return Ok(());
    }

    // One lookup pass against the state, then the mutations; the mapping is
    // cloned so the unit can be borrowed for the additions.
    let targets: Vec<(String, Option<String>)> = {
        let Some(state) = ctx.user_data().get::<LangState>() else {
            return Ok(());
        };
        langs
            .iter()
            .map(|lang| (lang.clone(), state.packages.get(lang).cloned()))
            .collect()
    };

    let mut keep_in_original = false;
    let mut routed = 0usize;
    for (lang, target) in targets {
        let Some(target) = target else {
            // No subpackage for this language; the file stays behind.
            keep_in_original = true;
            continue;
        };
        let Some(package) = ctx.unit_mut().package_by_name_mut(&target) else {
            warn!(package = %target, "language subpackage disappeared");
            keep_in_original = true;
            continue;
        };
        info!(lang = %lang, path = file.disk_path(), package = %target, "routing locale file");
        file.add_to(package)?;
        routed += 1;
    }

    if !keep_in_original {
        file.exclude_from_original();
    }
    if routed > 0
        && let Some(state) = ctx.user_data_mut().get_mut::<LangState>()
    {
        state.routed_files += routed;
    }
    Ok(())
}

fn report_language_packages(ctx: &mut HookCtx<'_>) -> BuildResult<()> {
    if let Some(state) = ctx.user_data_mut().take::<LangState>() {
        info!(
            languages = state.packages.len(),
            routed_files = state.routed_files,
            "language subpackages assembled"
        );
    }
    Ok(())
}

/// Registers the language-splitting hooks.
pub fn register(registrar: &mut ModuleRegistrar<'_>) -> BuildResult<()> {
    let mut buildhook = BuildHook::new(HookPoint::PostInstall, setup_language_packages);
    buildhook.set_name("setup_language_packages()");
    registrar.register_build_hook(buildhook);

    let mut filehook = FileHook::new(route_locale_files);
    filehook.add_glob("*");
    filehook.set_name("route_locale_files()");
    registrar.register_file_hook(filehook);

    let mut buildhook = BuildHook::new(HookPoint::Final, report_language_packages);
    buildhook.set_name("report_language_packages()");
    registrar.register_build_hook(buildhook);

    Ok(())
}

module_entry!(init_langpacks, register);
