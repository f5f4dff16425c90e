//! # Storage Module
//!
//! Private on-disk files for the navigator: the identity keys and the trust
//! store.
//!
//! ## Write Path
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        ATOMIC FILE WRITE                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  1. create_dir_all(parent)                                             │
//! │  2. open  .<name>.<random>.tmp   (create_new, mode 0600)               │
//! │  3. write_all(bytes) + sync_all()                                      │
//! │  4. rename(tmp, target)          (atomic on the same filesystem)       │
//! │                                                                         │
//! │  A crash at any step leaves either the old file or the new one,        │
//! │  never a truncated mix. A failed write removes its temp file.          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Files are protected only by their permission bits. That is the trust
//! boundary: anyone who can read the data directory as the navigator's user
//! can read every shared secret.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::crypto::generate_random_id;
use crate::error::{Error, Result};

/// File name of the persisted identity inside the data directory
pub const IDENTITY_FILE: &str = "navigator_keys.json";

/// File name of the trust store inside the data directory
pub const TRUST_FILE: &str = "trusted_mates.json";

/// Atomically replace `path` with `bytes`, readable only by the owner.
pub fn write_private_file(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            Error::Persistence(format!("cannot create {}: {}", parent.display(), e))
        })?;
    }

    let tmp = temp_sibling(path);
    let result = write_and_sync(&tmp, bytes).and_then(|()| {
        fs::rename(&tmp, path).map_err(|e| {
            Error::Persistence(format!("cannot replace {}: {}", path.display(), e))
        })
    });

    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

/// Read a file, returning `None` when it does not exist
pub fn read_optional(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::Persistence(format!(
            "cannot read {}: {}",
            path.display(),
            e
        ))),
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "state".to_string());
    path.with_file_name(format!(".{}.{}.tmp", name, generate_random_id(4)))
}

fn write_and_sync(tmp: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = open_private(tmp)
        .map_err(|e| Error::Persistence(format!("cannot create {}: {}", tmp.display(), e)))?;
    file.write_all(bytes)?;
    file.sync_all()?;
    Ok(())
}

#[cfg(unix)]
fn open_private(path: &Path) -> std::io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;

    OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().write(true).create_new(true).open(path)
}

// ============================================================================
// TESTS
// ============================================================================
