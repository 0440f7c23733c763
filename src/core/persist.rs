//! Whole-document JSON persistence
//!
//! Every document is rewritten in full. Writes go to a temp file in the same
//! directory and are renamed over the target, so a crash leaves either the
//! old or the new document on disk, never a truncated one.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use crate::core::error::{AatError, Result};

/// Serialize with the 4-space indentation the documents have always used
pub fn to_pretty_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    buf.push(b'\n');
    Ok(buf)
}

/// Write `value` as pretty JSON to `path` atomically (tempfile + rename)
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = to_pretty_json(value)?;
    let parent = path.parent().unwrap_or_else(|| Path::new("."));

    let mut temp_file = tempfile::NamedTempFile::new_in(parent)?;
    temp_file.write_all(&content)?;
    temp_file.as_file().sync_all()?;
    temp_file.persist(path)?;
    Ok(())
}

/// Write `value` only if nothing exists at `path` yet
pub fn write_json_new<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = to_pretty_json(value)?;
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    file.write_all(&content)?;
    file.sync_all()?;
    Ok(())
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Exclusive advisory lock on a sibling `.lock` file
///
/// The lock is an OS `flock` held on an open handle, so it is released when
/// the guard drops or the process dies. The lock file itself stays on disk;
/// a leftover file from a crashed run is simply locked again.
#[derive(Debug)]
pub struct FileLock {
    path: PathBuf,
    _file: File,
}

impl FileLock {
    const RETRY_INTERVAL: Duration = Duration::from_millis(25);

    /// Acquire the lock for `target`, retrying until `timeout` elapses
    pub fn acquire(target: &Path, timeout: Duration) -> Result<Self> {
        let path = lock_path(target);
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;
        let started = Instant::now();

        while !try_flock_exclusive(&file)? {
            if started.elapsed() >= timeout {
                return Err(AatError::SettingsLocked(path.display().to_string()));
            }
            thread::sleep(Self::RETRY_INTERVAL);
        }

        // Owner pid, for whoever inspects a lock that is held too long
        file.set_len(0)?;
        writeln!(file, "{}", std::process::id())?;
        Ok(Self { path, _file: file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// `flock(LOCK_EX | LOCK_NB)`; `Ok(false)` when another handle holds it
fn try_flock_exclusive(file: &File) -> io::Result<bool> {
    #[cfg(unix)]
    {
        use std::os::unix::io::AsRawFd;
        let fd = file.as_raw_fd();
        // SAFETY: fd is a valid descriptor owned by `file` for the whole call.
        let result = unsafe { libc::flock(fd, libc::LOCK_EX | libc::LOCK_NB) };
        if result == 0 {
            return Ok(true);
        }
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::WouldBlock || err.raw_os_error() == Some(libc::EWOULDBLOCK) {
            return Ok(false);
        }
        Err(err)
    }
    #[cfg(not(unix))]
    {
        let _ = file;
        Ok(true)
    }
}

fn lock_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".lock");
    target.with_file_name(name)
}
