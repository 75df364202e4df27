use std::io;
use std::path::Path;
use std::path::PathBuf;

/// The executable used to spawn the driver subprocess: this process's own
/// binary, swapped to its console sibling when the current one is a GUI
/// flavor. A GUI launcher must have a console sibling on disk or the
/// bootstrap refuses to run, since a windowed driver could hang waiting for
/// a display.
pub fn resolve_launcher() -> io::Result<PathBuf> {
    let exe = std::env::current_exe()?;
    match console_variant(&exe) {
        Some(console) if console.is_file() => Ok(console),
        Some(console) => {
            let display = console.display();
            Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("console launcher {display} not found"),
            ))
        }
        None => Ok(exe),
    }
}

/// `foo-gui` launches drivers via `foo`; on Windows `foow.exe` uses
/// `foo.exe`. Returns `None` when the name already is the console one.
fn console_variant(exe: &Path) -> Option<PathBuf> {
    let stem = exe.file_stem()?.to_str()?;
    let console_stem = if let Some(stripped) = stem.strip_suffix("-gui") {
        stripped
    } else if cfg!(windows) && stem.len() > 1 && stem.ends_with('w') {
        &stem[..stem.len() - 1]
    } else {
        return None;
    };
    let file_name = match exe.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => format!("{console_stem}.{ext}"),
        None => console_stem.to_string(),
    };
    Some(exe.with_file_name(file_name))
}
