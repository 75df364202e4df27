use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use dynattach_core::CapabilityFactory;
use dynattach_core::Receiver;

use crate::protocol::AttachEndpoint;
use crate::protocol::AttachError;

pub fn serve(
    _receiver: Arc<Receiver>,
    _factory: CapabilityFactory,
) -> std::io::Result<AttachEndpoint> {
    Err(std::io::Error::from(std::io::ErrorKind::Unsupported))
}

pub fn serve_at(
    _path: PathBuf,
    _receiver: Arc<Receiver>,
    _factory: CapabilityFactory,
) -> std::io::Result<AttachEndpoint> {
    Err(std::io::Error::from(std::io::ErrorKind::Unsupported))
}

pub fn load_package(
    _pid: u32,
    _package: &Path,
    _options: Option<&str>,
) -> Result<(), AttachError> {
    Err(AttachError::Unsupported)
}

pub fn load_package_at(
    _endpoint: &Path,
    _package: &Path,
    _options: Option<&str>,
) -> Result<(), AttachError> {
    Err(AttachError::Unsupported)
}
