//! Registered hooks and the one-time deterministic sort.
//!
//! Module load order depends on the filesystem's directory enumeration and
//! is therefore not deterministic. The sort must not let it leak into
//! dispatch order, so ties are broken without reference to load order:
//!
//! - priority ascending (0 runs first),
//! - then module name ascending,
//! - then, within one module, later-registered before earlier-registered.

use std::cmp::Ordering;

use super::definitions::{BuildHook, FileHook};

/// A build hook staged or sorted under its owning module.
#[derive(Debug)]
pub(crate) struct RegisteredBuildHook {
    pub(crate) inner: BuildHook,
    pub(crate) module: String,
    pub(crate) seq: u64,
}

/// A file hook staged or sorted under its owning module.
#[derive(Debug)]
pub(crate) struct RegisteredFileHook {
    pub(crate) inner: FileHook,
    pub(crate) module: String,
    pub(crate) seq: u64,
}

impl RegisteredBuildHook {
    pub(crate) fn label(&self) -> &str {
        self.inner.name.as_deref().unwrap_or("<unnamed>")
    }
}

impl RegisteredFileHook {
    pub(crate) fn label(&self) -> &str {
        self.inner.name.as_deref().unwrap_or("<unnamed>")
    }
}

fn hook_order(
    (priority_a, module_a, seq_a): (i32, &str, u64),
    (priority_b, module_b, seq_b): (i32, &str, u64),
) -> Ordering {
    priority_a
        .cmp(&priority_b)
        .then_with(|| module_a.cmp(module_b))
        .then_with(|| seq_b.cmp(&seq_a))
}

pub(crate) fn sort_build_hooks(hooks: &mut [RegisteredBuildHook]) {
    hooks.sort_by(|a, b| {
        hook_order(
            (a.inner.priority, &a.module, a.seq),
            (b.inner.priority, &b.module, b.seq),
        )
    });
}

pub(crate) fn sort_file_hooks(hooks: &mut [RegisteredFileHook]) {
    hooks.sort_by(|a, b| {
        hook_order(
            (a.inner.priority, &a.module, a.seq),
            (b.inner.priority, &b.module, b.seq),
        )
    });
}
