//! # packmill-core
//!
//! Core crate for Packmill. Contains the collaborator traits the module
//! system talks to, configuration schemas, the shared file/package data
//! model, the unified error system, and in-memory reference hosts used by
//! tests.
//!
//! This crate has **no** internal dependencies on other Packmill crates.

pub mod config;
pub mod error;
pub mod memhost;
pub mod result;
pub mod traits;
pub mod types;

pub use error::BuildError;
pub use result::BuildResult;
