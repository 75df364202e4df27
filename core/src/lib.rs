//! Gated access to a retrofitted process-instrumentation capability.
//!
//! A process that never asked for the capability at startup can acquire it
//! later through a bootstrap (see `dynattach-bootstrap`) that delivers an
//! opaque [`Capability`] handle to the in-process [`Receiver`]. From then on
//! every use of the handle goes through the [`Broker`], which checks the
//! identity of the immediate caller against a permanent-growth whitelist
//! before forwarding to the underlying operation.
//!
//! The privileged operations themselves are an external concern: embedders
//! implement [`Capability`] and supply it via a [`CapabilityFactory`]. This
//! crate only decides who may reach the handle.

mod broker;
mod caller;
mod capability;
mod error;
mod receiver;

pub use broker::Broker;
pub use broker::Installer;
pub use caller::CallerId;
pub use caller::CallerResolver;
pub use caller::FixedResolver;
pub use capability::Capability;
pub use capability::CapabilityError;
pub use capability::CapabilityFactory;
pub use capability::CapabilityHandle;
pub use capability::ModuleEdits;
pub use error::Error;
pub use error::Result;
pub use receiver::Receiver;
