//! Attach transport: how a driver subprocess hands a capability package
//! back into its target process.
//!
//! The target serves a Unix domain socket at a well-known per-pid path; the
//! protocol is one newline-terminated JSON request per connection. Non-Unix
//! platforms compile but report `Unsupported` from every operation.

mod protocol;

#[cfg(unix)]
mod client;
#[cfg(unix)]
mod listener;
#[cfg(not(unix))]
mod unsupported;

pub use protocol::AttachEndpoint;
pub use protocol::AttachError;
pub use protocol::AttachRequest;
pub use protocol::AttachResponse;
pub use protocol::socket_path;

#[cfg(unix)]
pub use client::load_package;
#[cfg(unix)]
pub use client::load_package_at;
#[cfg(unix)]
pub use listener::serve;
#[cfg(unix)]
pub use listener::serve_at;

#[cfg(not(unix))]
pub use unsupported::load_package;
#[cfg(not(unix))]
pub use unsupported::load_package_at;
#[cfg(not(unix))]
pub use unsupported::serve;
#[cfg(not(unix))]
pub use unsupported::serve_at;
