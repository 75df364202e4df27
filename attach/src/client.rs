use std::io::BufRead;
use std::io::BufReader;
use std::io::Write;
use std::os::unix::net::UnixStream;
use std::path::Path;

use tracing::debug;

use crate::protocol::AttachError;
use crate::protocol::AttachRequest;
use crate::protocol::AttachResponse;
use crate::protocol::socket_path;

/// Asks the process `pid` to load `package`. Blocks until the target
/// acknowledges or the connection fails.
pub fn load_package(pid: u32, package: &Path, options: Option<&str>) -> Result<(), AttachError> {
    load_package_at(&socket_path(pid), package, options)
}

/// As [`load_package`], against an explicit endpoint path.
pub fn load_package_at(
    endpoint: &Path,
    package: &Path,
    options: Option<&str>,
) -> Result<(), AttachError> {
    let mut stream = UnixStream::connect(endpoint)?;
    let request = AttachRequest::Load {
        package: package.to_path_buf(),
        options: options.map(str::to_owned),
    };
    serde_json::to_writer(&mut stream, &request)?;
    stream.write_all(b"\n")?;
    stream.flush()?;

    let mut line = String::new();
    BufReader::new(stream).read_line(&mut line)?;
    let response: AttachResponse = serde_json::from_str(&line)?;
    if response.ok {
        debug!(endpoint = %endpoint.display(), "attach acknowledged");
        Ok(())
    } else {
        Err(AttachError::Rejected(
            response.error.unwrap_or_else(|| "unspecified".to_string()),
        ))
    }
}
