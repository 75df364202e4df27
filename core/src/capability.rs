use std::sync::Arc;

use thiserror::Error;

/// Shared handle to the privileged operation set. Write-once per process:
/// the [`crate::Receiver`] stores the first delivered handle and never
/// replaces it.
pub type CapabilityHandle = Arc<dyn Capability>;

/// Produces the capability object at delivery time.
///
/// The embedding runtime supplies this when the attach endpoint is wired
/// up; it is invoked once, when a receiver package is loaded into the
/// process.
pub type CapabilityFactory = Arc<dyn Fn() -> CapabilityHandle + Send + Sync>;

/// Visibility edits applied by [`Capability::adjust_module_visibility`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ModuleEdits {
    /// Item paths to newly export from the module.
    pub exports: Vec<String>,
    /// Item paths to open up for reflective access.
    pub opens: Vec<String>,
}

/// The privileged introspection/mutation operation set this crate gates.
///
/// Implementations come from the embedding runtime. This crate never
/// interprets the semantics of these operations; it only controls who may
/// invoke them.
pub trait Capability: Send + Sync {
    /// Measured memory footprint of the named unit, in bytes.
    fn object_footprint(&self, unit: &str) -> Result<u64, CapabilityError>;

    /// Identities of every currently loaded code unit.
    fn loaded_units(&self) -> Vec<String>;

    /// Whether the named unit's loaded code may be replaced.
    fn is_redefinable(&self, unit: &str) -> Result<bool, CapabilityError>;

    /// Byte-for-byte replacement of the named unit's loaded code.
    fn redefine_unit(&self, unit: &str, code: &[u8]) -> Result<(), CapabilityError>;

    fn supports_redefine(&self) -> bool;

    fn supports_retransform(&self) -> bool;

    fn supports_call_prefix(&self) -> bool;

    /// Whether the named module's visibility graph may be edited.
    fn is_adjustable_module(&self, module: &str) -> Result<bool, CapabilityError>;

    fn adjust_module_visibility(
        &self,
        module: &str,
        edits: &ModuleEdits,
    ) -> Result<(), CapabilityError>;
}

impl std::fmt::Debug for dyn Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Capability")
    }
}

/// Failures surfaced by the underlying capability operations. The broker
/// passes these through unchanged instead of reinterpreting them.
#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("unit not found: {0}")]
    UnitNotFound(String),
    #[error("unit is not modifiable: {0}")]
    UnitNotModifiable(String),
    #[error("module is not adjustable: {0}")]
    ModuleNotAdjustable(String),
    #[error("operation not supported by this runtime: {0}")]
    Unsupported(&'static str),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
