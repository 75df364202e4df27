use std::sync::OnceLock;

use crate::broker;
use crate::caller::CallerId;
use crate::capability::CapabilityHandle;
use crate::error::Error;
use crate::error::Result;

/// Identity the receiver presents at its own lower-level entry point.
pub(crate) const RECEIVER_IDENT: &str = module_path!();

/// In-process landing point for the delivered capability handle.
///
/// One receiver instance is shared between the broker and the attach
/// endpoint. The handle slot is write-once: the first non-empty delivery
/// wins and every later one is ignored, so the handle can be read without a
/// lock once observed present.
#[derive(Default)]
pub struct Receiver {
    slot: OnceLock<CapabilityHandle>,
    startup: OnceLock<()>,
}

impl Receiver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invoked by the attach endpoint when a receiver package is loaded
    /// into this process. Stores the first non-empty capability; never
    /// fails, and a delivery on an already-installed receiver is silently
    /// ignored.
    pub fn deliver(&self, options: Option<&str>, capability: Option<CapabilityHandle>) {
        let _ = options;
        if let Some(capability) = capability {
            let _ = self.slot.set(capability);
        }
    }

    /// Startup-time declaration path: same delivery, plus the launch-origin
    /// mark once the handle is in place.
    pub fn declare_at_launch(&self, options: Option<&str>, capability: Option<CapabilityHandle>) {
        self.deliver(options, capability);
        if self.is_loaded() {
            let _ = self.startup.set(());
        }
    }

    /// Presence of the handle is the installed state; there is no separate
    /// flag to fall out of sync.
    pub fn is_loaded(&self) -> bool {
        self.slot.get().is_some()
    }

    /// Whether the capability arrived through the launch-time declaration
    /// rather than a later self-attach. Informational only.
    pub fn is_startup(&self) -> Result<bool> {
        if !self.is_loaded() {
            return Err(Error::NotInstalled);
        }
        Ok(self.startup.get().is_some())
    }

    /// Lower-level handle access, restricted to the two trusted internal
    /// identities. External traffic is forced through the broker's
    /// whitelist gate; this check exists only so arbitrary code cannot
    /// sidestep it by calling the receiver directly.
    pub fn capability(&self, caller: &CallerId) -> Result<CapabilityHandle> {
        let Some(handle) = self.slot.get() else {
            return Err(Error::NotInstalled);
        };
        if caller.as_str() != RECEIVER_IDENT && caller.as_str() != broker::BROKER_IDENT {
            return Err(Error::CallerDenied(caller.clone()));
        }
        Ok(handle.clone())
    }
}
