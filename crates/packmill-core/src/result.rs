//! Convenience result type alias for Packmill.

use crate::error::BuildError;

/// A specialized `Result` type for Packmill operations.
///
/// This is defined as a convenience so that every crate does not need to
/// write `Result<T, BuildError>` explicitly.
pub type BuildResult<T> = Result<T, BuildError>;
