use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::error::{Result, TransportError};

/// A duplex byte-stream connection to the device.
///
/// Exactly one logical connection is active at a time; the handle is
/// exclusively owned by whichever component currently holds it. Peer
/// closure surfaces as `Ok(0)` from `read` — the layer above maps that
/// to its own closed-connection error.
pub trait Link: Read + Write + Sized {
    /// Duplicate the handle so reader and writer halves can be owned
    /// separately. Both halves refer to the same underlying connection.
    fn try_clone(&self) -> Result<Self>;

    /// Number of bytes currently readable without blocking.
    ///
    /// This is the probe the hang-recovery protocol polls: a positive
    /// count proves the device produced output. An error here means the
    /// connection itself is gone.
    fn unread_bytes(&self) -> Result<usize>;
}

/// Queries the kernel receive queue depth for a file descriptor.
#[cfg(unix)]
fn fionread(fd: std::os::fd::RawFd) -> std::io::Result<usize> {
    let mut count: libc::c_int = 0;
    // SAFETY: `fd` is an open descriptor owned by the caller and `count`
    // is a valid writable pointer for the ioctl's output.
    let rc = unsafe { libc::ioctl(fd, libc::FIONREAD, &mut count) };
    if rc == 0 {
        Ok(count.max(0) as usize)
    } else {
        Err(std::io::Error::last_os_error())
    }
}

/// A link over a serial character device or a simulator PTY.
pub struct TtyLink {
    file: File,
    path: PathBuf,
}

impl TtyLink {
    /// Open the device node at `path` read-write (blocking).
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|source| TransportError::Open {
                path: path.clone(),
                source,
            })?;
        tracing::debug!(?path, "opened tty link");
        Ok(Self { file, path })
    }

    /// The device node this link was opened on.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Read for TtyLink {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.file.read(buf)
    }
}

impl Write for TtyLink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.file.flush()
    }
}

impl Link for TtyLink {
    fn try_clone(&self) -> Result<Self> {
        let file = self.file.try_clone()?;
        Ok(Self {
            file,
            path: self.path.clone(),
        })
    }

    #[cfg(unix)]
    fn unread_bytes(&self) -> Result<usize> {
        use std::os::fd::AsRawFd;
        Ok(fionread(self.file.as_raw_fd())?)
    }

    #[cfg(not(unix))]
    fn unread_bytes(&self) -> Result<usize> {
        Err(TransportError::Io(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "unread byte count requires unix",
        )))
    }
}

impl std::fmt::Debug for TtyLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtyLink").field("path", &self.path).finish()
    }
}

/// Loopback links for tests and in-process emulators.
#[cfg(unix)]
impl Link for std::os::unix::net::UnixStream {
    fn try_clone(&self) -> Result<Self> {
        Ok(std::os::unix::net::UnixStream::try_clone(self)?)
    }

    fn unread_bytes(&self) -> Result<usize> {
        use std::os::fd::AsRawFd;
        Ok(fionread(self.as_raw_fd())?)
    }
}
