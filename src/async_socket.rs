use socket2::SockAddr;
use std::net::SocketAddr;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, RawFd};
use tokio::io::unix::AsyncFd;
use tokio::io::Interest;
use tracing::debug;

use crate::addr_list::{self, PackedAddrs};
use crate::error::{Result, SctpError};
use crate::msg::{self, ReceivedMessage, SendOptions};
use crate::socket::SctpSocket;
use crate::sys::common::sctp_assoc_t;

/// An SCTP socket driven by the tokio reactor.
///
/// Sends and receives wait for readiness instead of blocking a runtime
/// thread. Everything else (options, address enumeration) is reached through
/// [`get_ref`](Self::get_ref).
///
/// # Examples
///
/// ```no_run
/// use sctp_sockapi::{AsyncSctpSocket, SctpSocket, SendOptions, SocketStyle};
/// use socket2::Domain;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let socket = SctpSocket::new(Domain::IPV4, SocketStyle::OneToOne)?;
///     let socket = AsyncSctpSocket::connect(socket, "127.0.0.1:2905".parse()?).await?;
///
///     socket.send_msg(b"hello world!", None, &SendOptions::default()).await?;
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct AsyncSctpSocket {
    inner: AsyncFd<SctpSocket>,
}

impl AsyncSctpSocket {
    /// Registers `socket` with the reactor, switching it to non-blocking mode.
    pub fn new(socket: SctpSocket) -> Result<Self> {
        socket.set_nonblocking(true)?;
        let inner = AsyncFd::new(socket).map_err(SctpError::syscall("epoll_ctl"))?;
        Ok(AsyncSctpSocket { inner })
    }

    /// Issues a non-blocking connect and waits for the association to come
    /// up.
    pub async fn connect(socket: SctpSocket, addr: SocketAddr) -> Result<Self> {
        let socket = AsyncSctpSocket::new(socket)?;
        match socket.get_ref().connect(addr) {
            Err(e) if e.errno() == Some(libc::EINPROGRESS) || e.is_would_block() => {}
            Err(e) => return Err(e),
            Ok(()) => return Ok(socket),
        }
        socket.wait_connected().await?;
        Ok(socket)
    }

    /// Connects to a multi-homed peer, returning the socket and the id of the
    /// new association.
    pub async fn connectx(socket: SctpSocket, addrs: &PackedAddrs) -> Result<(Self, sctp_assoc_t)> {
        let socket = AsyncSctpSocket::new(socket)?;
        let connecting = addr_list::connectx_start(socket.as_fd(), addrs)?;
        if !connecting.in_progress {
            return Ok((socket, connecting.assoc_id));
        }
        socket.wait_connected().await?;

        let assoc_id = match connecting.assoc_id {
            // the fallback path cannot report the id; on a one-to-one socket
            // the status of the only association has it
            0 => socket.get_ref().status(0)?.assoc_id,
            id => id,
        };
        Ok((socket, assoc_id))
    }

    // Once we've connected, wait for the socket to be writable as that's when
    // the actual connection has been initiated.
    async fn wait_connected(&self) -> Result<()> {
        let _ = self
            .inner
            .writable()
            .await
            .map_err(SctpError::syscall("wait until writable"))?;
        // Check if we hit an error on connect
        if let Some(e) = self.get_ref().take_error()? {
            return Err(SctpError::SystemCall {
                call: "connect",
                source: e,
            });
        }
        debug!("connected fd {}", self.as_raw_fd());
        Ok(())
    }

    /// Accept a new association on a listening one-to-one socket.
    pub async fn accept(&self) -> Result<(AsyncSctpSocket, SocketAddr)> {
        let (socket, addr) = self.io(Interest::READABLE, |s| s.accept()).await?;
        Ok((AsyncSctpSocket::new(socket)?, addr))
    }

    /// Send a message once the socket has room for it.
    pub async fn send_msg(&self, payload: &[u8], to: Option<SocketAddr>, opts: &SendOptions) -> Result<usize> {
        let to = to.map(SockAddr::from);
        self.io(Interest::WRITABLE, |s| msg::send_msg(s.as_fd(), payload, to.as_ref(), opts))
            .await
    }

    /// Wait for the next message or notification.
    pub async fn recv_msg(&self, max_len: usize) -> Result<ReceivedMessage> {
        self.io(Interest::READABLE, |s| msg::recv_msg(s.as_fd(), max_len))
            .await
    }

    /// Moves association `assoc_id` to a socket of its own, registered with
    /// the reactor as well.
    pub fn peeloff(&self, assoc_id: sctp_assoc_t) -> Result<AsyncSctpSocket> {
        AsyncSctpSocket::new(self.get_ref().peeloff(assoc_id)?)
    }

    pub fn get_ref(&self) -> &SctpSocket {
        self.inner.get_ref()
    }

    pub fn into_inner(self) -> SctpSocket {
        self.inner.into_inner()
    }

    /// Runs `op` whenever the socket is ready for `interest`, until it stops
    /// reporting `EAGAIN`.
    async fn io<R>(&self, interest: Interest, mut op: impl FnMut(&SctpSocket) -> Result<R>) -> Result<R> {
        loop {
            let mut guard = self
                .inner
                .ready(interest)
                .await
                .map_err(SctpError::syscall("wait for readiness"))?;
            match op(self.inner.get_ref()) {
                Err(e) if e.is_would_block() => guard.clear_ready(),
                res => return res,
            }
        }
    }
}

impl AsFd for AsyncSctpSocket {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.inner.get_ref().as_fd()
    }
}

impl AsRawFd for AsyncSctpSocket {
    #[inline]
    fn as_raw_fd(&self) -> RawFd {
        self.inner.get_ref().as_raw_fd()
    }
}
