use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

/// Well-known attach endpoint path for a process id. The socket lives in a
/// per-pid directory so the listener can bind inside a 0o700 parent; the
/// socket is never exposed in a world-readable directory, not even between
/// bind and its own chmod.
pub fn socket_path(pid: u32) -> PathBuf {
    std::env::temp_dir()
        .join(format!(".dynattach_pid{pid}"))
        .join("attach")
}

/// One request per connection, newline-terminated JSON.
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "snake_case", tag = "op")]
pub enum AttachRequest {
    /// Load the named package into the receiving process.
    Load {
        package: PathBuf,
        options: Option<String>,
    },
}

#[derive(Debug, Deserialize, Serialize)]
pub struct AttachResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Error)]
pub enum AttachError {
    #[error("attach transport I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed attach traffic: {0}")]
    Protocol(#[from] serde_json::Error),
    #[error("attach rejected by target: {0}")]
    Rejected(String),
    #[error("attach is not supported on this platform")]
    Unsupported,
}

/// Keeps the served endpoint alive; the socket file is unlinked on drop.
pub struct AttachEndpoint {
    pub(crate) path: PathBuf,
}

impl AttachEndpoint {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for AttachEndpoint {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}
