//! Non-blocking I/O over raw file descriptors.
//!
//! Every operation first tries the syscall. `WouldBlock` never reaches the
//! caller: it becomes a readiness registration in the reactor and the call
//! is retried once the descriptor is ready. Any other OS error is returned
//! as is, without retrying.
//!
//! Descriptors must already be in non-blocking mode; see
//! [`set_nonblocking`].

use crate::reactor::io::Direction;
use crate::reactor::poller::unix::{
    domain_of, sys_connect, sys_get_socket_error, sys_read, sys_set_nonblocking, sys_socket,
    sys_write,
};

pub use crate::reactor::future::Readiness;

use std::io;
use std::net::SocketAddr;
use std::os::fd::{AsRawFd, BorrowedFd, FromRawFd, OwnedFd, RawFd};

/// Resolves once `fd` is readable.
///
/// # Examples
///
/// ```rust
/// use std::os::fd::{AsFd, AsRawFd};
/// use std::os::unix::net::UnixStream;
/// use std::io::Write;
///
/// #[tessera::main]
/// async fn main() {
///     let (mut writer, reader) = UnixStream::pair().unwrap();
///     writer.write_all(b"ping").unwrap();
///
///     tessera::io::wait_readable(reader.as_raw_fd()).await.unwrap();
///
///     let mut buf = [0u8; 4];
///     tessera::io::read(reader.as_fd(), &mut buf).await.unwrap();
///     assert_eq!(&buf, b"ping");
/// }
/// ```
pub fn wait_readable(fd: RawFd) -> Readiness {
    Readiness::new(fd, Direction::Read)
}

/// Resolves once `fd` is writable.
pub fn wait_writable(fd: RawFd) -> Readiness {
    Readiness::new(fd, Direction::Write)
}

/// Puts `fd` in non-blocking mode.
pub fn set_nonblocking(fd: BorrowedFd<'_>) -> io::Result<()> {
    sys_set_nonblocking(fd.as_raw_fd())
}

/// Reads into `buf`, waiting for data if none is available yet.
///
/// Returns the number of bytes read; `0` means end of stream.
pub async fn read(fd: BorrowedFd<'_>, buf: &mut [u8]) -> io::Result<usize> {
    let fd = fd.as_raw_fd();

    loop {
        let n = sys_read(fd, buf);
        if n >= 0 {
            return Ok(n as usize);
        }

        let err = io::Error::last_os_error();
        match err.kind() {
            io::ErrorKind::WouldBlock => wait_readable(fd).await?,
            io::ErrorKind::Interrupted => {}
            _ => return Err(err),
        }
    }
}

/// Writes the whole of `buf`, waiting for room as needed.
///
/// # Errors
///
/// Fails with [`io::ErrorKind::WriteZero`] if the descriptor accepts no
/// more bytes.
pub async fn write(fd: BorrowedFd<'_>, buf: &[u8]) -> io::Result<()> {
    let fd = fd.as_raw_fd();
    let mut written = 0;

    while written < buf.len() {
        let n = sys_write(fd, &buf[written..]);

        if n > 0 {
            written += n as usize;
            continue;
        }

        if n == 0 {
            return Err(io::ErrorKind::WriteZero.into());
        }

        let err = io::Error::last_os_error();
        match err.kind() {
            io::ErrorKind::WouldBlock => wait_writable(fd).await?,
            io::ErrorKind::Interrupted => {}
            _ => return Err(err),
        }
    }

    Ok(())
}

/// Opens a non-blocking TCP connection to `addr`.
///
/// The connect is started without blocking; the returned future waits for
/// the socket to become writable and then reports the outcome of the
/// handshake.
pub async fn connect(addr: SocketAddr) -> io::Result<OwnedFd> {
    let raw = sys_socket(domain_of(&addr))?;

    // Safety: `raw` was just created and is owned by nobody else.
    let socket = unsafe { OwnedFd::from_raw_fd(raw) };

    match sys_connect(raw, &addr) {
        Ok(()) => return Ok(socket),
        Err(err) if err.raw_os_error() == Some(libc::EINPROGRESS) => {}
        Err(err) => return Err(err),
    }

    wait_writable(raw).await?;
    sys_get_socket_error(raw)?;

    Ok(socket)
}
