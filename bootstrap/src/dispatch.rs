use std::ffi::OsString;
use std::path::Path;

use dynattach_package::EntryPoint;
use dynattach_package::PackageManifest;

/// Re-exec dispatch hook. Call this first in `main`: when this executable
/// was launched with a package manifest as its first argument, it is being
/// used as the driver launcher by a bootstrapping process and must take the
/// driver role instead of its normal one.
///
/// Returns normally when the first argument is not a package, so ordinary
/// invocations fall through to the host's own `main`.
pub fn package_dispatch() {
    let mut args = std::env::args_os();
    let Some(_exe) = args.next() else {
        return;
    };
    let Some(first) = args.next() else {
        return;
    };
    let Ok(manifest) = PackageManifest::load(Path::new(&first)) else {
        return;
    };
    match manifest.entry_point {
        EntryPoint::Driver => {
            // The package path fills the program-name slot; pid and
            // receiver package follow as positionals.
            let mut driver_args: Vec<OsString> = vec![first];
            driver_args.extend(args);
            dynattach_driver::run_main_from(driver_args)
        }
        EntryPoint::Receiver => {
            eprintln!("receiver packages are loaded via attach, not launched");
            std::process::exit(dynattach_driver::EXIT_USAGE);
        }
    }
}
