//! Docker client construction using bollard.

use bollard::{API_DEFAULT_VERSION, Docker};

const CONNECT_TIMEOUT_SECS: u64 = 120;

/// Connect to the Docker daemon over the configured unix socket.
pub fn connect(socket_path: &str) -> Result<Docker, bollard::errors::Error> {
    Docker::connect_with_unix(socket_path, CONNECT_TIMEOUT_SECS, API_DEFAULT_VERSION)
}
