//! Loadable package format and temp-artifact lifecycle.
//!
//! A "package" is a small on-disk artifact describing one entry point
//! (receiver or driver) plus the capability flags it declares. The exact
//! layout is an implementation detail; only the declared entry point and
//! flags are contract-relevant. Built packages live in the system temp dir
//! and are swept by the [`cleaner`] registry at process exit or on demand.

mod builder;
pub mod cleaner;
mod manifest;

pub use builder::BuildError;
pub use builder::build;
pub use manifest::CapabilityFlag;
pub use manifest::EntryPoint;
pub use manifest::ManifestError;
pub use manifest::PackageManifest;

/// Human-facing library name stamped into package metadata.
pub const LIBRARY_NAME: &str = "dynattach";

/// Vendor string stamped into package metadata.
pub const LIBRARY_VENDOR: &str = "dynattach project";
