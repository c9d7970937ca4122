use crate::error::{RwmError, Result};
use std::fs;
use std::io::ErrorKind;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use tracing::{debug, warn};

/// Longest path a Unix socket address can hold (`sun_path` minus the NUL)
pub const MAX_SOCKET_PATH: usize = 107;

/// Check that `path` fits in a Unix socket address
pub fn check_socket_path(path: &Path) -> Result<()> {
    let len = path.as_os_str().len();
    if len > MAX_SOCKET_PATH {
        return Err(RwmError::Internal(format!(
            "Socket path too long ({} bytes, at most {}): {:?}",
            len, MAX_SOCKET_PATH, path
        )));
    }
    Ok(())
}

/// Remove an endpoint left behind by a previous instance
pub fn remove_stale_endpoint(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!("Removed stale endpoint {:?}", path);
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(RwmError::Internal(format!(
            "Could not remove stale endpoint {:?}: {}",
            path, e
        ))),
    }
}

/// Restrict who may connect: the socket's file mode is the only access control
pub fn apply_socket_mode(path: &Path, mode: u32) -> Result<()> {
    fs::set_permissions(path, fs::Permissions::from_mode(mode))?;

    if mode & 0o002 != 0 {
        warn!("Control socket {:?} is writable by every user (mode {:o})", path, mode);
    }
    Ok(())
}

pub fn socket_mode(path: &Path) -> Result<u32> {
    Ok(fs::metadata(path)?.permissions().mode() & 0o777)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_path_length() {
        assert!(check_socket_path(Path::new("/tmp/rwm-socket")).is_ok());
        let long = format!("/tmp/{}", "x".repeat(MAX_SOCKET_PATH));
        assert!(check_socket_path(Path::new(&long)).is_err());
    }

    #[test]
    fn test_remove_stale_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stale");

        // Missing is fine
        remove_stale_endpoint(&path).unwrap();

        fs::write(&path, b"").unwrap();
        remove_stale_endpoint(&path).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_apply_socket_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("endpoint");
        fs::write(&path, b"").unwrap();

        apply_socket_mode(&path, 0o600).unwrap();
        assert_eq!(socket_mode(&path).unwrap(), 0o600);
    }
}
