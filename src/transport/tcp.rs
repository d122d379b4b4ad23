//! TCP opener (C2): DNS resolution, connect-loop over address candidates,
//! and the socket options the handshake relies on.

use std::io::{self, IoSlice, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::error::Error;
use crate::transport::Transport;

/// A connected TCP transport.
///
/// `TcpStream::connect` already performs the "resolve, try each candidate,
/// first success wins, failed sockets are dropped" loop that the original
/// C client implements by hand against raw `getaddrinfo` results, so this
/// wrapper doesn't re-implement that search — it just applies the socket
/// options the handshake needs once a connection exists.
pub struct TcpTransport {
    stream: TcpStream,
    open: bool,
}

impl TcpTransport {
    /// Resolve `host:port` and connect, trying each candidate address in
    /// turn. Mirrors `(host, port).to_socket_addrs()`'s own iteration order.
    pub fn connect(host: &str, port: u16) -> Result<Self, Error> {
        let candidates: Vec<_> = (host, port)
            .to_socket_addrs()
            .map_err(|_| Error::HostnameResolutionFailed { host: host.to_string(), port })?
            .collect();
        if candidates.is_empty() {
            return Err(Error::HostnameResolutionFailed { host: host.to_string(), port });
        }

        let mut last_err = None;
        for addr in candidates {
            match TcpStream::connect(addr) {
                Ok(stream) => return Ok(Self::from_stream(stream)),
                Err(e) => last_err = Some(e),
            }
        }
        Err(Error::Socket(
            last_err.map(|e| e.to_string()).unwrap_or_else(|| "no candidate addresses".into()),
        ))
    }

    fn from_stream(stream: TcpStream) -> Self {
        let _ = stream.set_nodelay(true);
        #[cfg(target_os = "macos")]
        disable_sigpipe(&stream);
        Self { stream, open: true }
    }
}

#[cfg(target_os = "macos")]
fn disable_sigpipe(stream: &TcpStream) {
    use std::os::unix::io::AsRawFd;
    let fd = stream.as_raw_fd();
    let enable: libc::c_int = 1;
    unsafe {
        libc::setsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_NOSIGPIPE,
            &enable as *const _ as *const libc::c_void,
            std::mem::size_of_val(&enable) as libc::socklen_t,
        );
    }
}

impl Transport for TcpTransport {
    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }

    fn send(&mut self, buf: &[u8]) -> io::Result<()> {
        self.stream.write_all(buf)
    }

    /// `write_vectored` may write fewer bytes than the sum of all slices in
    /// one call; loop, advancing past fully-written slices and re-slicing a
    /// partially-written one, until everything is sent.
    fn writev(&mut self, bufs: &[IoSlice<'_>]) -> io::Result<usize> {
        let total: usize = bufs.iter().map(|b| b.len()).sum();
        let mut owned: Vec<Vec<u8>> = bufs.iter().map(|b| b.to_vec()).collect();
        let mut start = 0;
        while start < owned.len() {
            let slices: Vec<IoSlice<'_>> = owned[start..].iter().map(|v| IoSlice::new(v)).collect();
            let mut n = self.stream.write_vectored(&slices)?;
            if n == 0 {
                return Err(io::Error::from(io::ErrorKind::WriteZero));
            }
            while n > 0 && start < owned.len() {
                if n < owned[start].len() {
                    owned[start].drain(..n);
                    break;
                }
                n -= owned[start].len();
                start += 1;
            }
        }
        Ok(total)
    }

    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        self.stream.set_read_timeout(timeout)
    }

    fn shutdown(&mut self) -> io::Result<()> {
        self.open = false;
        self.stream.shutdown(std::net::Shutdown::Both)
    }

    fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.stream.peer_addr()
    }

    fn is_open(&self) -> bool {
        self.open
    }
}
