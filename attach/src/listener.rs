use std::fs;
use std::io::BufRead;
use std::io::BufReader;
use std::io::Write;
use std::os::unix::fs::DirBuilderExt;
use std::os::unix::fs::PermissionsExt;
use std::os::unix::net::UnixListener;
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use dynattach_core::CapabilityFactory;
use dynattach_core::Receiver;
use dynattach_package::EntryPoint;
use dynattach_package::PackageManifest;
use tracing::debug;
use tracing::warn;

use crate::protocol::AttachEndpoint;
use crate::protocol::AttachRequest;
use crate::protocol::AttachResponse;
use crate::protocol::socket_path;

/// Serves the current process's attach endpoint on a background thread.
/// Load requests deliver a capability from `factory` to `receiver`.
pub fn serve(receiver: Arc<Receiver>, factory: CapabilityFactory) -> std::io::Result<AttachEndpoint> {
    serve_at(socket_path(std::process::id()), receiver, factory)
}

/// As [`serve`], at an explicit socket path.
pub fn serve_at(
    path: PathBuf,
    receiver: Arc<Receiver>,
    factory: CapabilityFactory,
) -> std::io::Result<AttachEndpoint> {
    // Bind inside an owner-only directory: a chmod after bind would leave
    // the socket world-connectable for an instant.
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        let mut builder = fs::DirBuilder::new();
        builder.mode(0o700);
        match builder.create(dir) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(err) => return Err(err),
        }
    }
    // A stale socket left by a previous incarnation of this pid would make
    // the bind fail.
    match fs::remove_file(&path) {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => return Err(err),
    }
    let listener = UnixListener::bind(&path)?;
    fs::set_permissions(&path, fs::Permissions::from_mode(0o600))?;
    debug!(path = %path.display(), "attach endpoint listening");
    thread::Builder::new()
        .name("dynattach-attach".to_string())
        .spawn(move || accept_loop(&listener, &receiver, &factory))?;
    Ok(AttachEndpoint { path })
}

fn accept_loop(listener: &UnixListener, receiver: &Receiver, factory: &CapabilityFactory) {
    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                if let Err(err) = handle_connection(stream, receiver, factory) {
                    warn!(%err, "attach connection failed");
                }
            }
            Err(err) => {
                warn!(%err, "attach endpoint accept failed");
                return;
            }
        }
    }
}

fn handle_connection(
    stream: UnixStream,
    receiver: &Receiver,
    factory: &CapabilityFactory,
) -> std::io::Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut line = String::new();
    reader.read_line(&mut line)?;
    let response = match serde_json::from_str::<AttachRequest>(&line) {
        Ok(AttachRequest::Load { package, options }) => {
            load(receiver, factory, &package, options.as_deref())
        }
        Err(err) => reject(format!("malformed request: {err}")),
    };
    respond(stream, &response)
}

fn load(
    receiver: &Receiver,
    factory: &CapabilityFactory,
    package: &Path,
    options: Option<&str>,
) -> AttachResponse {
    let manifest = match PackageManifest::load(package) {
        Ok(manifest) => manifest,
        Err(err) => return reject(format!("unreadable package: {err}")),
    };
    if manifest.entry_point != EntryPoint::Receiver {
        let entry = manifest.entry_point;
        return reject(format!("package entry point {entry:?} cannot be loaded"));
    }
    receiver.deliver(options, Some(factory()));
    debug!(package = %package.display(), "receiver package delivered");
    AttachResponse {
        ok: true,
        error: None,
    }
}

fn reject(reason: String) -> AttachResponse {
    AttachResponse {
        ok: false,
        error: Some(reason),
    }
}

fn respond(mut stream: UnixStream, response: &AttachResponse) -> std::io::Result<()> {
    serde_json::to_writer(&mut stream, response)?;
    stream.write_all(b"\n")?;
    stream.flush()
}
