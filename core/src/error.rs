use thiserror::Error;

use crate::caller::CallerId;
use crate::capability::CapabilityError;

pub type Result<T> = std::result::Result<T, Error>;

/// Failure taxonomy for broker-facing operations.
///
/// State errors and authorization errors are deliberately distinct variants
/// so a consumer can tell "you haven't installed yet" from "you're not
/// allowed". Bootstrap/environment failures never appear here; they
/// collapse to a `false` install result instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error("capability is not installed")]
    NotInstalled,
    #[error("capability is already installed")]
    AlreadyInstalled,
    #[error("caller identity could not be resolved")]
    CallerUnresolved,
    #[error("caller is not authorized: {0}")]
    CallerDenied(CallerId),
    #[error("whitelist entries must be non-empty")]
    EmptyCallerId,
    #[error(transparent)]
    Capability(#[from] CapabilityError),
}
