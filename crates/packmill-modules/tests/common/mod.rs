//! Shared fixtures for the module-system integration tests.
#![allow(dead_code)]

use packmill_core::config::LoggingConfig;
use packmill_core::memhost::MemUnit;
use packmill_core::traits::BuildUnit;
use packmill_core::types::UnitAttr;
use packmill_modules::context::HookCtx;

/// Installs the default tracing subscriber; safe to call repeatedly.
pub fn init_logging() {
    LoggingConfig::default().init();
}

/// Appends `tag` to the unit's parsed-text buffer. Hooks are plain function
/// pointers, so tests observe call order through the build unit instead of
/// captured state.
pub fn trace(ctx: &mut HookCtx<'_>, tag: &str) {
    let unit = ctx.unit_mut();
    let mut log = unit.attr(UnitAttr::Parsed).unwrap_or_default();
    if !log.is_empty() {
        log.push(';');
    }
    log.push_str(tag);
    let _ = unit.set_attr(UnitAttr::Parsed, &log);
}

/// Reads the trace buffer back.
pub fn trace_of(unit: &MemUnit) -> String {
    unit.attr(UnitAttr::Parsed).unwrap_or_default()
}
