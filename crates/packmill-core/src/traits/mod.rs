//! Collaborator contracts consumed by the module system.
//!
//! The package metadata model, the spec parser, and the file classifier are
//! owned by the host pipeline; the module system reaches them only through
//! these traits.

pub mod build_unit;
pub mod classifier;
pub mod package;

pub use build_unit::BuildUnit;
pub use classifier::FileClassifier;
pub use package::PackageAccess;
