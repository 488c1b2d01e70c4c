//! In-memory reference implementations of the collaborator traits.
//!
//! The real build pipeline implements [`BuildUnit`], [`PackageAccess`], and
//! [`FileClassifier`] on top of its own metadata store. These small
//! implementations mirror that contract closely enough to exercise every
//! accessor, and are what the module-system tests and the example modules'
//! tests run against.

use std::collections::HashMap;

use crate::error::BuildError;
use crate::result::BuildResult;
use crate::traits::{BuildUnit, FileClassifier, PackageAccess};
use crate::types::{
    BuildScriptKind, Changelog, Dep, DepKind, FileClassification, FileColor, FileRecord,
    PackageNaming, Script, ScriptKind, Tag, TagClass, Trigger, UnitAttr, UnitId,
};

const TARGET_OS: &str = "linux";
const TARGET_ARCH: &str = "x86_64";
const TARGET_PLATFORM: &str = "x86_64-linux";
const DEFAULT_LANG: &str = "C";

/// One in-memory package.
#[derive(Debug, Default)]
pub struct MemPackage {
    name: String,
    tags: HashMap<(Tag, Option<String>), String>,
    scripts: HashMap<ScriptKind, Script>,
    deps: HashMap<DepKind, Vec<Dep>>,
    changelog: Vec<Changelog>,
    triggers: Vec<Trigger>,
    files_lines: Vec<String>,
    file_list_refs: Vec<String>,
    policy_lines: Vec<String>,
    file_list: Option<Vec<FileRecord>>,
    finalized: bool,
}

impl MemPackage {
    /// Creates a package whose file list already exists.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file_list: Some(Vec::new()),
            ..Self::default()
        }
    }

    /// Creates a package whose file list has not been set up yet, the state
    /// packages are in before the file-processing stage reaches them.
    pub fn without_file_list(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file_list: None,
            ..Self::default()
        }
    }

    /// Appends a raw `%files` line, builder style.
    pub fn with_files_line(mut self, line: &str) -> Self {
        self.files_lines.push(line.to_string());
        self
    }

    fn normalize_qualifier(&self, tag: Tag, qualifier: Option<&str>) -> Option<String> {
        match tag.class() {
            TagClass::Plain => {
                if qualifier.is_some_and(|q| !q.is_empty()) {
                    tracing::warn!(
                        tag = tag.as_str(),
                        "tag does not support a qualifier; ignoring it"
                    );
                }
                None
            }
            TagClass::Language => Some(
                qualifier
                    .filter(|q| !q.is_empty())
                    .unwrap_or(DEFAULT_LANG)
                    .to_string(),
            ),
            TagClass::Scope | TagClass::Numbered => {
                qualifier.filter(|q| !q.is_empty()).map(str::to_string)
            }
        }
    }
}

impl PackageAccess for MemPackage {
    fn name(&self) -> &str {
        &self.name
    }

    fn tag(&self, tag: Tag, qualifier: Option<&str>) -> Option<String> {
        let key = (tag, self.normalize_qualifier(tag, qualifier));
        self.tags.get(&key).cloned()
    }

    fn set_tag(&mut self, tag: Tag, value: &str, qualifier: Option<&str>) -> BuildResult<()> {
        let key = (tag, self.normalize_qualifier(tag, qualifier));
        self.tags.insert(key, value.to_string());
        Ok(())
    }

    fn script(&self, kind: ScriptKind) -> Option<Script> {
        self.scripts.get(&kind).cloned()
    }

    fn set_script(&mut self, kind: ScriptKind, script: Script) -> BuildResult<()> {
        self.scripts.insert(kind, script);
        Ok(())
    }

    fn delete_script(&mut self, kind: ScriptKind) -> BuildResult<()> {
        self.scripts.remove(&kind);
        Ok(())
    }

    fn deps(&self, kind: DepKind) -> Vec<Dep> {
        self.deps.get(&kind).cloned().unwrap_or_default()
    }

    fn set_deps(&mut self, kind: DepKind, deps: Vec<Dep>) -> BuildResult<()> {
        self.deps.insert(kind, deps);
        Ok(())
    }

    fn changelog(&self) -> Vec<Changelog> {
        self.changelog.clone()
    }

    fn set_changelog(&mut self, entries: Vec<Changelog>) -> BuildResult<()> {
        self.changelog = entries;
        Ok(())
    }

    fn triggers(&self) -> Vec<Trigger> {
        self.triggers.clone()
    }

    fn set_triggers(&mut self, triggers: Vec<Trigger>) -> BuildResult<()> {
        self.triggers = triggers;
        Ok(())
    }

    fn files_lines(&self) -> Vec<String> {
        self.files_lines.clone()
    }

    fn add_files_line(&mut self, entry: &str) -> BuildResult<()> {
        self.files_lines.push(entry.to_string());
        Ok(())
    }

    fn file_list_refs(&self) -> Vec<String> {
        self.file_list_refs.clone()
    }

    fn add_file_list_ref(&mut self, path: &str) -> BuildResult<()> {
        self.file_list_refs.push(path.to_string());
        Ok(())
    }

    fn policy_lines(&self) -> Vec<String> {
        self.policy_lines.clone()
    }

    fn add_policy_line(&mut self, policy: &str) -> BuildResult<()> {
        self.policy_lines.push(policy.to_string());
        Ok(())
    }

    fn accepts_files(&self) -> bool {
        self.file_list.is_some()
    }

    fn files(&self) -> &[FileRecord] {
        self.file_list.as_deref().unwrap_or(&[])
    }

    fn append_file(&mut self, record: FileRecord) -> BuildResult<()> {
        match self.file_list.as_mut() {
            Some(list) => {
                list.push(record);
                Ok(())
            }
            None => Err(BuildError::misuse(format!(
                "Cannot append file to package '{}': no file list",
                self.name
            ))),
        }
    }

    fn remove_file(&mut self, disk_path: &str) -> bool {
        let Some(list) = self.file_list.as_mut() else {
            return false;
        };
        match list.iter().rposition(|r| r.disk_path == disk_path) {
            Some(idx) => {
                list.remove(idx);
                true
            }
            None => false,
        }
    }

    fn finalize(&mut self) -> BuildResult<()> {
        if self.finalized {
            return Err(BuildError::misuse(format!(
                "Package '{}' finalized twice",
                self.name
            )));
        }

        if let Some(excluded) = self.tag(Tag::ExcludeArch, None)
            && excluded.split_whitespace().any(|a| a == TARGET_ARCH)
        {
            return Err(BuildError::validation(format!(
                "Package '{}' excludes the target architecture {TARGET_ARCH}",
                self.name
            )));
        }

        if self.tag(Tag::Description, None).is_none() {
            self.set_tag(Tag::Description, "Package created by module", None)?;
        }
        self.set_tag(Tag::Os, TARGET_OS, None)?;
        if self.tag(Tag::Arch, None).is_none() {
            self.set_tag(Tag::Arch, TARGET_ARCH, None)?;
        }
        self.set_tag(Tag::Platform, TARGET_PLATFORM, None)?;

        let version = self.tag(Tag::Version, None).unwrap_or_else(|| "0".to_string());
        let mut provides = self.deps(DepKind::Provides);
        provides.push(Dep::versioned(
            self.name.clone(),
            crate::types::DepFlags::EQUAL,
            version,
        ));
        self.set_deps(DepKind::Provides, provides)?;

        self.finalized = true;
        Ok(())
    }
}

/// One in-memory build unit.
#[derive(Debug)]
pub struct MemUnit {
    id: UnitId,
    attrs: HashMap<UnitAttr, String>,
    build_scripts: HashMap<BuildScriptKind, String>,
    macros: HashMap<String, String>,
    packages: Vec<MemPackage>,
    source_package: Option<MemPackage>,
}

impl MemUnit {
    /// Creates an empty unit.
    pub fn new(id: u64) -> Self {
        Self {
            id: UnitId(id),
            attrs: HashMap::new(),
            build_scripts: HashMap::new(),
            macros: HashMap::new(),
            packages: Vec::new(),
            source_package: None,
        }
    }

    /// Creates a unit with a main package of the given name.
    pub fn with_main_package(id: u64, name: &str) -> Self {
        let mut unit = Self::new(id);
        unit.packages.push(MemPackage::new(name));
        unit
    }

    /// Adds an already-built package.
    pub fn push_package(&mut self, package: MemPackage) {
        self.packages.push(package);
    }

    /// Sets the source package.
    pub fn set_source_package(&mut self, package: MemPackage) {
        self.source_package = Some(package);
    }

    /// Defines a macro for [`BuildUnit::expand_macros`].
    pub fn define_macro(&mut self, name: &str, value: &str) {
        self.macros.insert(name.to_string(), value.to_string());
    }

    /// Immutable package lookup for test assertions.
    pub fn package(&self, name: &str) -> Option<&MemPackage> {
        self.packages.iter().find(|p| p.name == name)
    }
}

impl BuildUnit for MemUnit {
    fn unit_id(&self) -> UnitId {
        self.id
    }

    fn attr(&self, attr: UnitAttr) -> Option<String> {
        self.attrs.get(&attr).cloned()
    }

    fn set_attr(&mut self, attr: UnitAttr, value: &str) -> BuildResult<()> {
        self.attrs.insert(attr, value.to_string());
        Ok(())
    }

    fn package_count(&self) -> usize {
        self.packages.len()
    }

    fn package_mut(&mut self, index: usize) -> Option<&mut dyn PackageAccess> {
        self.packages
            .get_mut(index)
            .map(|p| p as &mut dyn PackageAccess)
    }

    fn package_by_name_mut(&mut self, name: &str) -> Option<&mut dyn PackageAccess> {
        self.packages
            .iter_mut()
            .find(|p| p.name == name)
            .map(|p| p as &mut dyn PackageAccess)
    }

    fn source_package_mut(&mut self) -> Option<&mut dyn PackageAccess> {
        self.source_package
            .as_mut()
            .map(|p| p as &mut dyn PackageAccess)
    }

    fn add_package(
        &mut self,
        name: &str,
        summary: &str,
        naming: PackageNaming,
    ) -> BuildResult<&mut dyn PackageAccess> {
        let main = self
            .packages
            .first()
            .ok_or_else(|| BuildError::misuse(format!("No main package exists; cannot add: {name}")))?;

        let full_name = match naming {
            PackageNaming::Full => name.to_string(),
            PackageNaming::Sub => format!("{}-{}", main.name, name),
        };

        if self.packages.iter().any(|p| p.name == full_name) {
            return Err(BuildError::validation(format!(
                "Package already exists: {full_name}"
            )));
        }

        let mut package = MemPackage::new(full_name);
        package.set_tag(Tag::Summary, summary, None)?;
        self.packages.push(package);

        let idx = self.packages.len() - 1;
        Ok(&mut self.packages[idx])
    }

    fn build_script(&self, kind: BuildScriptKind) -> Option<String> {
        self.build_scripts.get(&kind).cloned()
    }

    fn set_build_script(&mut self, kind: BuildScriptKind, code: &str) -> BuildResult<()> {
        self.build_scripts.insert(kind, code.to_string());
        Ok(())
    }

    fn expand_macros(&self, text: &str) -> BuildResult<String> {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find("%{") {
            out.push_str(&rest[..start]);
            let tail = &rest[start + 2..];
            match tail.find('}') {
                Some(end) => {
                    let name = &tail[..end];
                    match self.macros.get(name) {
                        Some(value) => out.push_str(value),
                        // Unknown macros are left verbatim.
                        None => {
                            out.push_str("%{");
                            out.push_str(name);
                            out.push('}');
                        }
                    }
                    rest = &tail[end + 1..];
                }
                None => {
                    out.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        Ok(out)
    }
}

/// Extension-based classifier, deterministic and side-effect free.
#[derive(Debug, Default)]
pub struct MemClassifier;

impl FileClassifier for MemClassifier {
    fn classify(&self, disk_path: &str, _mode: u32) -> BuildResult<FileClassification> {
        let cls = if disk_path.ends_with(".so") || disk_path.contains(".so.") {
            FileClassification {
                ftype: "ELF 64-bit LSB shared object".to_string(),
                color: FileColor::ELF64,
                attrs: vec!["elf".to_string()],
            }
        } else if disk_path.ends_with(".py") {
            FileClassification {
                ftype: "Python script, ASCII text executable".to_string(),
                color: FileColor::empty(),
                attrs: vec!["python".to_string()],
            }
        } else if disk_path.ends_with(".mo") {
            FileClassification {
                ftype: "GNU message catalog".to_string(),
                color: FileColor::empty(),
                attrs: Vec::new(),
            }
        } else if disk_path.ends_with(".sh") {
            FileClassification {
                ftype: "POSIX shell script, ASCII text executable".to_string(),
                color: FileColor::empty(),
                attrs: vec!["script".to_string()],
            }
        } else {
            FileClassification {
                ftype: "ASCII text".to_string(),
                color: FileColor::empty(),
                attrs: Vec::new(),
            }
        };
        Ok(cls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_package_requires_main() {
        let mut unit = MemUnit::new(1);
        let err = unit
            .add_package("docs", "Documentation", PackageNaming::Sub)
            .unwrap_err();
        assert!(err.to_string().contains("No main package"));
    }

    #[test]
    fn test_add_subname_package() {
        let mut unit = MemUnit::with_main_package(1, "foo");
        let pkg = unit
            .add_package("docs", "Documentation", PackageNaming::Sub)
            .expect("add works");
        assert_eq!(pkg.name(), "foo-docs");
        assert_eq!(pkg.tag(Tag::Summary, None).as_deref(), Some("Documentation"));

        let err = unit
            .add_package("docs", "Documentation", PackageNaming::Sub)
            .unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn test_finalize_once() {
        let mut pkg = MemPackage::new("foo");
        pkg.set_tag(Tag::Version, "1.2", None).expect("set works");
        pkg.finalize().expect("first finalize works");

        assert_eq!(pkg.tag(Tag::Os, None).as_deref(), Some("linux"));
        let provides = pkg.deps(DepKind::Provides);
        assert_eq!(provides.len(), 1);
        assert_eq!(provides[0].to_string(), "foo = 1.2");

        assert!(pkg.finalize().is_err());
    }

    #[test]
    fn test_finalize_checks_excluded_arch() {
        let mut pkg = MemPackage::new("foo");
        pkg.set_tag(Tag::ExcludeArch, "x86_64 s390x", None)
            .expect("set works");
        assert!(pkg.finalize().is_err());
    }

    #[test]
    fn test_language_qualifier_defaults() {
        let mut pkg = MemPackage::new("foo");
        pkg.set_tag(Tag::Summary, "English", None).expect("set works");
        pkg.set_tag(Tag::Summary, "Česky", Some("cs")).expect("set works");
        assert_eq!(pkg.tag(Tag::Summary, None).as_deref(), Some("English"));
        assert_eq!(pkg.tag(Tag::Summary, Some("C")).as_deref(), Some("English"));
        assert_eq!(pkg.tag(Tag::Summary, Some("cs")).as_deref(), Some("Česky"));
    }

    #[test]
    fn test_macro_expansion() {
        let mut unit = MemUnit::new(1);
        unit.define_macro("_libdir", "/usr/lib64");
        let expanded = unit.expand_macros("%{_libdir}/*.so").expect("expand works");
        assert_eq!(expanded, "/usr/lib64/*.so");

        let untouched = unit.expand_macros("%{_unknown}/x").expect("expand works");
        assert_eq!(untouched, "%{_unknown}/x");
    }

    #[test]
    fn test_remove_file_removes_latest_match() {
        let mut pkg = MemPackage::new("foo");
        let mut first = FileRecord::new("/a", "/a");
        first.uname = "alice".to_string();
        let mut second = FileRecord::new("/a", "/a");
        second.uname = "bob".to_string();
        pkg.append_file(first).expect("append works");
        pkg.append_file(second).expect("append works");

        assert!(pkg.remove_file("/a"));
        assert_eq!(pkg.files().len(), 1);
        assert_eq!(pkg.files()[0].uname, "alice");
        assert!(!pkg.remove_file("/missing"));
    }
}
