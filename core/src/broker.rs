use std::collections::HashSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use tracing::warn;

use crate::caller::CallerId;
use crate::caller::CallerResolver;
use crate::capability::CapabilityHandle;
use crate::capability::ModuleEdits;
use crate::error::Error;
use crate::error::Result;
use crate::receiver::Receiver;

/// Identity the broker presents to the receiver's internal gate.
pub(crate) const BROKER_IDENT: &str = module_path!();

/// Performs (or short-circuits) the bootstrap that delivers the capability.
///
/// `true` means the capability is loaded by the time the call returns;
/// `false` means the attempt failed and nothing changed. A call on an
/// already-installed process must return `true` without re-running the
/// bootstrap. Environment failures are never surfaced as errors across this
/// seam.
pub trait Installer: Send + Sync {
    fn install(&self) -> bool;
}

/// Stable-facing facade over the stored capability.
///
/// Every privileged operation passes three gates before the handle is
/// touched: the capability must be installed, the immediate caller must be
/// resolvable, and the caller must be whitelisted. Whitelist membership is
/// granted by `install` and never shrinks except through the explicit
/// [`Broker::revoke`] operation.
pub struct Broker {
    receiver: Arc<Receiver>,
    installer: Arc<dyn Installer>,
    resolver: Arc<dyn CallerResolver>,
    // One lock covers whitelist mutation and the authorization check, so a
    // concurrent install is never observed half-complete. The handle itself
    // is write-once and needs no lock.
    whitelist: Mutex<HashSet<CallerId>>,
}

impl Broker {
    pub fn new(
        receiver: Arc<Receiver>,
        installer: Arc<dyn Installer>,
        resolver: Arc<dyn CallerResolver>,
    ) -> Self {
        Self {
            receiver,
            installer,
            resolver,
            whitelist: Mutex::new(HashSet::new()),
        }
    }

    /// Acquires the capability for this process and whitelists the caller.
    pub fn install(&self) -> Result<bool> {
        self.install_as(self.resolver.resolve(), &[])
    }

    /// As [`Broker::install`], additionally whitelisting `extra`.
    pub fn install_with(&self, extra: &[CallerId]) -> Result<bool> {
        self.install_as(self.resolver.resolve(), extra)
    }

    /// Caller-qualified install, for hosts that resolve identity
    /// themselves.
    ///
    /// `caller` is `None` only when no identity could be resolved at all;
    /// that is tolerated here (and only here) so restricted environments
    /// can still perform the first install. Every entry of `extra` must be
    /// non-empty or the call fails before any mutation.
    pub fn install_as(&self, caller: Option<CallerId>, extra: &[CallerId]) -> Result<bool> {
        if extra.iter().any(CallerId::is_empty) {
            return Err(Error::EmptyCallerId);
        }
        // The installed check runs before the lock is taken, so two racing
        // installs can both get past it. The installer short-circuits the
        // loser under the lock; see the race test in tests/broker.rs.
        if self.receiver.is_loaded() {
            return Err(Error::AlreadyInstalled);
        }
        let mut whitelist = self.lock_whitelist();
        if !self.installer.install() {
            return Ok(false);
        }
        if let Some(caller) = caller {
            whitelist.insert(caller);
        }
        whitelist.extend(extra.iter().cloned());
        Ok(true)
    }

    pub fn is_installed(&self) -> bool {
        self.receiver.is_loaded()
    }

    /// Returns the capability handle after the full three-gate check.
    pub fn capability(&self) -> Result<CapabilityHandle> {
        self.capability_as(self.resolver.resolve())
    }

    /// Caller-qualified counterpart of [`Broker::capability`].
    pub fn capability_as(&self, caller: Option<CallerId>) -> Result<CapabilityHandle> {
        if !self.receiver.is_loaded() {
            return Err(Error::NotInstalled);
        }
        let Some(caller) = caller else {
            return Err(Error::CallerUnresolved);
        };
        let whitelist = self.lock_whitelist();
        if !whitelist.contains(&caller) {
            warn!(%caller, "capability access denied");
            return Err(Error::CallerDenied(caller));
        }
        drop(whitelist);
        self.receiver.capability(&CallerId::new(BROKER_IDENT))
    }

    pub fn object_footprint(&self, unit: &str) -> Result<u64> {
        Ok(self.capability()?.object_footprint(unit)?)
    }

    pub fn loaded_units(&self) -> Result<Vec<String>> {
        Ok(self.capability()?.loaded_units())
    }

    pub fn is_redefinable(&self, unit: &str) -> Result<bool> {
        Ok(self.capability()?.is_redefinable(unit)?)
    }

    pub fn redefine_unit(&self, unit: &str, code: &[u8]) -> Result<()> {
        Ok(self.capability()?.redefine_unit(unit, code)?)
    }

    pub fn supports_redefine(&self) -> Result<bool> {
        Ok(self.capability()?.supports_redefine())
    }

    pub fn supports_retransform(&self) -> Result<bool> {
        Ok(self.capability()?.supports_retransform())
    }

    pub fn supports_call_prefix(&self) -> Result<bool> {
        Ok(self.capability()?.supports_call_prefix())
    }

    pub fn is_adjustable_module(&self, module: &str) -> Result<bool> {
        Ok(self.capability()?.is_adjustable_module(module)?)
    }

    pub fn adjust_module_visibility(&self, module: &str, edits: &ModuleEdits) -> Result<()> {
        Ok(self.capability()?.adjust_module_visibility(module, edits)?)
    }

    /// Whether `caller` would pass the authorization gate right now.
    pub fn is_authorized(&self, caller: &CallerId) -> bool {
        self.lock_whitelist().contains(caller)
    }

    /// Explicit membership removal. Not part of the install/check path;
    /// membership never shrinks any other way.
    pub fn revoke(&self, caller: &CallerId) -> bool {
        self.lock_whitelist().remove(caller)
    }

    fn lock_whitelist(&self) -> MutexGuard<'_, HashSet<CallerId>> {
        match self.whitelist.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
