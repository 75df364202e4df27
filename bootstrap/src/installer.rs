use std::process::Command;
use std::sync::Arc;
use std::sync::Mutex;

use anyhow::Context;
use anyhow::Result;
use dynattach_attach::AttachEndpoint;
use dynattach_core::CapabilityFactory;
use dynattach_core::Installer;
use dynattach_core::Receiver;
use dynattach_package::CapabilityFlag;
use dynattach_package::EntryPoint;
use dynattach_package::cleaner;
use tracing::debug;
use tracing::warn;

use crate::launcher;

/// Flags stamped into the receiver package the bootstrap delivers.
const RECEIVER_FLAGS: [CapabilityFlag; 3] = [
    CapabilityFlag::RedefineUnits,
    CapabilityFlag::RetransformUnits,
    CapabilityFlag::SetCallPrefix,
];

/// Installs the capability into the current process by spawning a driver
/// subprocess that attaches back into it.
///
/// The sequence per attempt: serve this process's attach endpoint, write
/// driver and receiver packages to disk, re-exec our own launcher against
/// the driver package, and block until the driver exits. The packages are
/// removed afterwards whether or not the attach succeeded.
pub struct SelfAttachInstaller {
    receiver: Arc<Receiver>,
    factory: CapabilityFactory,
    // The endpoint is created once and kept alive for the process lifetime;
    // dropping it would unlink the socket under a racing second attempt.
    endpoint: Mutex<Option<AttachEndpoint>>,
}

impl SelfAttachInstaller {
    pub fn new(receiver: Arc<Receiver>, factory: CapabilityFactory) -> Self {
        Self {
            receiver,
            factory,
            endpoint: Mutex::new(None),
        }
    }

    fn ensure_endpoint(&self) -> std::io::Result<()> {
        let mut guard = match self.endpoint.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if guard.is_none() {
            *guard = Some(dynattach_attach::serve(
                self.receiver.clone(),
                self.factory.clone(),
            )?);
        }
        Ok(())
    }

    fn bootstrap(&self) -> Result<bool> {
        let pid = std::process::id();
        let launcher = launcher::resolve_launcher().context("no usable driver launcher")?;
        self.ensure_endpoint()
            .context("attach endpoint unavailable")?;
        let driver_package = dynattach_package::build(EntryPoint::Driver, &[])?;
        let receiver_package = dynattach_package::build(EntryPoint::Receiver, &RECEIVER_FLAGS)?;
        debug!(
            launcher = %launcher.display(),
            pid,
            "spawning self-attach driver"
        );
        let status = Command::new(&launcher)
            .arg(&driver_package)
            .arg(pid.to_string())
            .arg(&receiver_package)
            .status();
        cleaner::clean(&driver_package);
        cleaner::clean(&receiver_package);
        let status = status.context("driver subprocess failed to spawn")?;
        Ok(status.success() && self.receiver.is_loaded())
    }
}

impl Installer for SelfAttachInstaller {
    fn install(&self) -> bool {
        // Already-delivered means done, never a second bootstrap.
        if self.receiver.is_loaded() {
            return true;
        }
        match self.bootstrap() {
            Ok(done) => done,
            Err(err) => {
                warn!(err = %format!("{err:#}"), "self-attach bootstrap failed");
                false
            }
        }
    }
}
