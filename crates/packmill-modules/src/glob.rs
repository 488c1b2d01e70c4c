//! Shell-glob matching for file-hook filters.

use tracing::warn;

use packmill_core::result::BuildResult;
use packmill_core::traits::BuildUnit;

/// Whether `path` matches at least one of `patterns`.
///
/// Patterns are OR-combined and an empty set matches nothing. Each pattern
/// is macro-expanded in the build unit's scope before matching, every time
/// it is evaluated — macro values can change over the build, so expansions
/// are never cached. `*` matches across path separators, like plain shell
/// `fnmatch` without pathname mode.
pub fn matches_any(unit: &dyn BuildUnit, patterns: &[String], path: &str) -> BuildResult<bool> {
    for pattern in patterns {
        let expanded = unit.expand_macros(pattern)?;
        match glob::Pattern::new(&expanded) {
            Ok(glob) => {
                if glob.matches(path) {
                    return Ok(true);
                }
            }
            Err(err) => {
                // Cannot be rejected at registration time: the pattern only
                // takes its final shape after expansion.
                warn!(pattern = %expanded, error = %err, "bad glob pattern, treated as non-matching");
            }
        }
    }
    Ok(false)
}
