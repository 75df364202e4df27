use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::LIBRARY_NAME;
use crate::LIBRARY_VENDOR;

/// Entry points a package can declare.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntryPoint {
    /// Loaded into the target process by its attach endpoint.
    Receiver,
    /// Executed as a subprocess to drive the attach.
    Driver,
}

/// Capability flags a package declares it needs from the runtime.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CapabilityFlag {
    RedefineUnits,
    RetransformUnits,
    SetCallPrefix,
}

/// Declared package metadata.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct PackageManifest {
    pub entry_point: EntryPoint,
    pub flags: Vec<CapabilityFlag>,
    pub name: String,
    pub version: String,
    pub vendor: String,
}

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("package unreadable: {0}")]
    Io(#[from] std::io::Error),
    #[error("package manifest malformed: {0}")]
    Decode(#[from] serde_json::Error),
}

impl PackageManifest {
    pub fn new(entry_point: EntryPoint, flags: &[CapabilityFlag]) -> Self {
        Self {
            entry_point,
            flags: flags.to_vec(),
            name: LIBRARY_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            vendor: LIBRARY_VENDOR.to_string(),
        }
    }

    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }
}
