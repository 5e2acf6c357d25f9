//! Daemon endpoint resolution

use std::path::PathBuf;

/// Default TCP port the daemon listens on
pub const DEFAULT_TCP_PORT: u16 = 8423;

/// Get the socket path for the daemon
///
/// Priority:
/// 1. `VOLTD_SOCKET` environment variable (if set)
/// 2. `$XDG_RUNTIME_DIR/voltd.sock` (if XDG_RUNTIME_DIR is set)
/// 3. `/tmp/voltd.sock` (fallback)
pub fn socket_path() -> PathBuf {
    if let Ok(path) = std::env::var("VOLTD_SOCKET") {
        return PathBuf::from(path);
    }
    dirs::runtime_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("voltd.sock")
}
