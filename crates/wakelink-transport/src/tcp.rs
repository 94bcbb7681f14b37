// ============================================
// File: crates/wakelink-transport/src/tcp.rs
// ============================================
//! # TCP Line Transport
//!
//! ## Creation Reason
//! Devices accept one JSON envelope per TCP connection, terminated by a
//! newline, and answer with one line before closing.
//!
//! ## Main Functionality
//! - `TcpLineListener`: Accepts connections (socket2 setup like the UDP side)
//! - `LineConnection`: Bounded, timed line read plus single-line reply
//! - `request_line`: Client helper that sends a line and waits for the reply
//!
//! ## Exchange
//! ```text
//! client                         device
//!   │ ── connect ──────────────────► │
//!   │ ── {"device_id":..}\n ───────► │  read ≤ 1023 bytes, ≤ 5 s
//!   │ ◄───────────── {..reply..}\n ─ │
//!   │ ◄──────────────────── close ── │
//! ```
//!
//! ## Read Rules
//! - Stop at `\n`, EOF or timeout; whatever arrived is the request
//! - More than 1023 bytes without a newline drops the connection
//! - Surrounding whitespace is trimmed; an empty request closes silently
//!
//! ## ⚠️ Important Note for Next Developer
//! - Replies are larger than requests (a full 500-byte frame is 1036 hex
//!   chars alone); the client side uses a bigger limit
//!
//! ## Last Modified
//! v0.1.0 - Initial TCP line transport

use std::net::SocketAddr;
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tracing::{debug, info, trace};

use crate::error::{Result, TransportError};
use crate::traits::PeerInfo;

// ============================================
// Constants
// ============================================

/// Longest accepted request line, excluding the newline.
pub const MAX_REQUEST_LINE: usize = 1023;

/// Longest accepted reply line on the client side.
pub const MAX_REPLY_LINE: usize = 8 * 1024;

/// Time allowed for a request line to arrive.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Listen backlog.
const LISTEN_BACKLOG: i32 = 128;

// ============================================
// LineLimits
// ============================================

/// Size and time bounds for reading one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineLimits {
    /// Maximum line length, excluding the newline.
    pub max_len: usize,
    /// Maximum time to wait for the line.
    pub read_timeout: Duration,
}

impl LineLimits {
    /// Limits for inbound requests.
    #[must_use]
    pub const fn request() -> Self {
        Self {
            max_len: MAX_REQUEST_LINE,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    /// Limits for replies read by a client.
    #[must_use]
    pub const fn reply(read_timeout: Duration) -> Self {
        Self {
            max_len: MAX_REPLY_LINE,
            read_timeout,
        }
    }
}

impl Default for LineLimits {
    fn default() -> Self {
        Self::request()
    }
}

// ============================================
// TcpLineListener
// ============================================

/// Listening socket for line-delimited requests.
pub struct TcpLineListener {
    listener: TcpListener,
    local_addr: SocketAddr,
    limits: LineLimits,
}

impl TcpLineListener {
    /// Binds a listener to `addr`.
    ///
    /// # Socket Options
    /// - `SO_REUSEADDR`: Enabled for quick rebinding
    /// - Non-blocking: Required for async operations
    ///
    /// # Errors
    /// - `AddressInUse` if the port is taken
    /// - `BindFailed` for any other bind error
    pub async fn bind(addr: SocketAddr, limits: LineLimits) -> Result<Self> {
        info!("Binding TCP listener to {}", addr);

        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))
            .map_err(|e| TransportError::io("creating TCP socket", e))?;
        socket
            .set_reuse_address(true)
            .map_err(|e| TransportError::io("setting SO_REUSEADDR", e))?;
        socket
            .set_nonblocking(true)
            .map_err(|e| TransportError::io("setting non-blocking", e))?;
        socket.bind(&addr.into()).map_err(|e| {
            if e.kind() == std::io::ErrorKind::AddrInUse {
                TransportError::AddressInUse { addr }
            } else {
                TransportError::bind_failed(addr, e.to_string())
            }
        })?;
        socket
            .listen(LISTEN_BACKLOG)
            .map_err(|e| TransportError::io("listening", e))?;

        let std_listener: std::net::TcpListener = socket.into();
        let listener = TcpListener::from_std(std_listener)
            .map_err(|e| TransportError::io("converting to Tokio listener", e))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| TransportError::io("getting local address", e))?;

        info!("TCP listener bound to {}", local_addr);
        Ok(Self {
            listener,
            local_addr,
            limits,
        })
    }

    /// Waits for the next connection.
    ///
    /// # Errors
    /// Returns an `Io` error if accept fails.
    pub async fn accept(&self) -> Result<(LineConnection, PeerInfo)> {
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(|e| TransportError::io("accepting connection", e))?;
        trace!("Accepted connection from {}", addr);
        Ok((LineConnection::new(stream, self.limits), PeerInfo::new(addr)))
    }

    /// Returns the bound address.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl std::fmt::Debug for TcpLineListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpLineListener")
            .field("local_addr", &self.local_addr)
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

// ============================================
// LineConnection
// ============================================

/// One TCP connection speaking newline-terminated lines.
pub struct LineConnection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    limits: LineLimits,
}

impl LineConnection {
    /// Wraps a connected stream.
    #[must_use]
    pub fn new(stream: TcpStream, limits: LineLimits) -> Self {
        let (read, write) = stream.into_split();
        Self {
            reader: BufReader::new(read),
            writer: write,
            limits,
        }
    }

    /// Reads one trimmed line.
    ///
    /// Returns `Ok(None)` when nothing but whitespace arrived.
    ///
    /// # Errors
    /// - `LineTooLong` when no newline arrives within the size limit
    /// - `Io` on a socket error
    pub async fn read_line(&mut self) -> Result<Option<String>> {
        let mut buf = Vec::with_capacity(256);
        let max_len = self.limits.max_len;

        let read = {
            let mut limited = (&mut self.reader).take(max_len as u64 + 1);
            timeout(self.limits.read_timeout, limited.read_until(b'\n', &mut buf)).await
        };

        match read {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(TransportError::io("reading line", e)),
            Err(_) => trace!(bytes = buf.len(), "Line read timed out, using partial data"),
        }

        if buf.last() == Some(&b'\n') {
            buf.pop();
        } else if buf.len() > max_len {
            debug!(limit = max_len, "Line too long, dropping connection");
            return Err(TransportError::LineTooLong { limit: max_len });
        }

        let line = String::from_utf8_lossy(&buf);
        let line = line.trim();
        if line.is_empty() {
            Ok(None)
        } else {
            Ok(Some(line.to_string()))
        }
    }

    /// Writes `line` plus a newline and flushes.
    ///
    /// # Errors
    /// Returns an `Io` error if the write fails.
    pub async fn write_line(&mut self, line: &str) -> Result<()> {
        let mut out = Vec::with_capacity(line.len() + 1);
        out.extend_from_slice(line.as_bytes());
        out.push(b'\n');

        self.writer
            .write_all(&out)
            .await
            .map_err(|e| TransportError::io("writing line", e))?;
        self.writer
            .flush()
            .await
            .map_err(|e| TransportError::io("flushing line", e))
    }

    /// Closes the write side.
    ///
    /// # Errors
    /// Returns an `Io` error if shutdown fails.
    pub async fn close(mut self) -> Result<()> {
        self.writer
            .shutdown()
            .await
            .map_err(|e| TransportError::io("closing connection", e))
    }
}

impl std::fmt::Debug for LineConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineConnection")
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

// ============================================
// Client Helper
// ============================================

/// Sends one line to `addr` and returns the reply line.
///
/// `io_timeout` bounds the connect and the reply read separately.
///
/// # Errors
/// - `ConnectFailed` / `Timeout` if the device is unreachable
/// - `ConnectionClosed` if the device closes without replying
pub async fn request_line(addr: SocketAddr, line: &str, io_timeout: Duration) -> Result<String> {
    let stream = timeout(io_timeout, TcpStream::connect(addr))
        .await
        .map_err(|_| TransportError::timeout(format!("connect to {addr}"), io_timeout))?
        .map_err(|e| TransportError::ConnectFailed {
            addr,
            reason: e.to_string(),
        })?;

    let mut conn = LineConnection::new(stream, LineLimits::reply(io_timeout));
    conn.write_line(line).await?;
    debug!(%addr, bytes = line.len(), "Request sent");

    conn.read_line().await?.ok_or(TransportError::ConnectionClosed)
}

// ============================================
// Tests
// ============================================
