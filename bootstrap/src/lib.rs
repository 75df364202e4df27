//! Wires the broker to a real self-attach bootstrap.
//!
//! A host process that wants the capability embeds this crate at two
//! points: `package_dispatch()` at the very top of `main`, so the binary
//! can serve as its own driver launcher, and [`self_attach_broker`] to
//! build the broker whose `install` performs the round trip: spawn a
//! driver subprocess, have it connect to our attach endpoint, and load a
//! receiver package that delivers the capability in-process.

mod dispatch;
mod installer;
mod launcher;

use std::sync::Arc;

use dynattach_core::Broker;
use dynattach_core::CallerResolver;
use dynattach_core::CapabilityFactory;
use dynattach_core::Receiver;

pub use dispatch::package_dispatch;
pub use installer::SelfAttachInstaller;
pub use launcher::resolve_launcher;

/// Builds a broker backed by the self-attach installer. `factory` produces
/// the capability object when the receiver package lands; `resolver`
/// supplies caller identities for the whitelist gate.
pub fn self_attach_broker(
    resolver: Arc<dyn CallerResolver>,
    factory: CapabilityFactory,
) -> Broker {
    let receiver = Arc::new(Receiver::new());
    let installer = Arc::new(SelfAttachInstaller::new(receiver.clone(), factory));
    Broker::new(receiver, installer, resolver)
}
