use std::io::Write;
use std::path::PathBuf;

use thiserror::Error;
use tracing::debug;
use tracing::warn;

use crate::cleaner;
use crate::manifest::CapabilityFlag;
use crate::manifest::EntryPoint;
use crate::manifest::PackageManifest;

/// All build failures fold into one outcome; the caller only needs to know
/// that no usable package exists.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("package I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("package encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Writes a loadable package for `entry_point` to a fresh temp file and
/// registers it with the cleanup registry. On failure the temp file is
/// discarded, so no partial package is ever referenced.
pub fn build(entry_point: EntryPoint, flags: &[CapabilityFlag]) -> Result<PathBuf, BuildError> {
    let manifest = PackageManifest::new(entry_point, flags);
    let mut file = tempfile::Builder::new()
        .prefix("dynattach-")
        .suffix(".pkg")
        .tempfile()?;
    serde_json::to_writer_pretty(&mut file, &manifest)?;
    file.flush()?;
    let (_, path) = file.keep().map_err(|err| BuildError::Io(err.error))?;
    if cleaner::install() {
        cleaner::add_target(&path);
    } else {
        // The package leaks if the process dies before the installer's own
        // clean() call runs; nothing better is available here.
        warn!(path = %path.display(), "cleanup hook unavailable, package not tracked");
    }
    debug!(path = %path.display(), ?entry_point, "built package");
    Ok(path)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn built_package_declares_entry_point_and_flags() {
        let path = build(EntryPoint::Receiver, &[CapabilityFlag::RetransformUnits]).unwrap();
        let manifest = PackageManifest::load(&path).unwrap();
        assert_eq!(manifest.entry_point, EntryPoint::Receiver);
        assert_eq!(manifest.flags, vec![CapabilityFlag::RetransformUnits]);
        assert_eq!(manifest.name, crate::LIBRARY_NAME);
        assert_eq!(manifest.version, env!("CARGO_PKG_VERSION"));

        cleaner::clean(&path);
        assert!(!path.exists());
    }

    #[test]
    fn driver_packages_carry_no_flags() {
        let path = build(EntryPoint::Driver, &[]).unwrap();
        let manifest = PackageManifest::load(&path).unwrap();
        assert_eq!(manifest.entry_point, EntryPoint::Driver);
        assert!(manifest.flags.is_empty());

        cleaner::clean(&path);
    }
}
