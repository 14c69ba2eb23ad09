use socket2::{Domain, SockAddr, Socket, Type};
use std::net::{Shutdown, SocketAddr};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, FromRawFd, OwnedFd, RawFd};
use std::time::Duration;
use tracing::debug;

use crate::addr_list::{self, BindxFlag, PackedAddrs};
use crate::config::Capabilities;
use crate::error::{Result, SctpError};
use crate::msg::{self, ReceivedMessage, SendOptions};
use crate::options::{self, *};
use crate::sys::common::{sctp_assoc_t, IPPROTO_SCTP};
use crate::sys::linux;

/// Association model of a socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketStyle {
    /// `SOCK_STREAM`: one association per socket, set up with
    /// connect/accept.
    OneToOne,
    /// `SOCK_SEQPACKET`: any number of associations on one socket, told apart
    /// by association id.
    OneToMany,
}

impl SocketStyle {
    fn socket_type(self) -> Type {
        match self {
            SocketStyle::OneToOne => Type::STREAM,
            SocketStyle::OneToMany => Type::SEQPACKET,
        }
    }
}

/// Extracts association `assoc_id` of a one-to-many socket into a new
/// one-to-one descriptor.
///
/// This corresponds to `sctp_peeloff(3)`.
pub fn peeloff(fd: BorrowedFd<'_>, assoc_id: sctp_assoc_t) -> Result<OwnedFd> {
    let raw = linux::peeloff(fd.as_raw_fd(), assoc_id).map_err(SctpError::syscall("sctp_peeloff"))?;
    debug!("peeled association {} off fd {} as fd {}", assoc_id, fd.as_raw_fd(), raw);
    // SAFETY: the kernel just created `raw` and nothing else owns it.
    Ok(unsafe { OwnedFd::from_raw_fd(raw) })
}

/// `SctpSocket` wraps an operating system socket and enables the caller to
/// configure the socket, set up associations and exchange messages with
/// per-message SCTP parameters.
///
/// Every method issues a blocking system call unless the socket was made
/// non-blocking; see [`AsyncSctpSocket`](crate::AsyncSctpSocket) for use on a
/// tokio runtime.
///
/// The underlying socket is closed when the `SctpSocket` value is dropped.
#[derive(Debug)]
pub struct SctpSocket {
    inner: Socket,
    caps: Capabilities,
}

impl SctpSocket {
    /// Create a new SCTP socket configured for the given domain and style.
    ///
    /// Per-message `sctp_sndrcvinfo` reception is enabled right away so that
    /// [`recv_msg`](Self::recv_msg) reports stream and ppid.
    pub fn new(domain: Domain, style: SocketStyle) -> Result<Self> {
        let inner = Socket::new(domain, style.socket_type(), Some(IPPROTO_SCTP.into()))
            .map_err(SctpError::syscall("socket"))?;
        let socket = SctpSocket {
            inner,
            caps: Capabilities::current(),
        };
        socket.enable_notifications()?;
        Ok(socket)
    }

    /// Wraps an existing SCTP descriptor, e.g. the result of [`peeloff`].
    pub fn from_fd(fd: OwnedFd) -> Self {
        SctpSocket {
            inner: Socket::from(fd),
            caps: Capabilities::current(),
        }
    }

    /// Uses `caps` instead of the process-wide capability set for the codecs
    /// of this socket.
    pub fn with_capabilities(mut self, caps: Capabilities) -> Self {
        self.caps = caps;
        self
    }

    pub fn capabilities(&self) -> Capabilities {
        self.caps
    }

    // Enables sctp_sndrcvinfo structure to be filled in on recvmsg(2)
    fn enable_notifications(&self) -> Result<()> {
        let mut events = self.events()?;
        events.data_io = true;
        self.set_events(&events)
    }

    /// Binds this socket to the specified address.
    pub fn bind(&self, addr: SocketAddr) -> Result<()> {
        debug!("bind fd {} to {}", self.as_raw_fd(), addr);
        self.inner
            .bind(&SockAddr::from(addr))
            .map_err(SctpError::syscall("bind"))
    }

    /// Adds or removes a subset of local addresses, for multi-homing.
    ///
    /// This corresponds to `sctp_bindx(3)`.
    pub fn bindx(&self, addrs: &PackedAddrs, flag: BindxFlag) -> Result<()> {
        addr_list::bindx(self.as_fd(), addrs, flag)
    }

    /// Initiate a connection on this socket to the specified address.
    ///
    /// This directly corresponds to `connect(2)`. On a non-blocking socket the
    /// call fails with `EINPROGRESS`; see
    /// [`AsyncSctpSocket::connect`](crate::AsyncSctpSocket::connect).
    pub fn connect(&self, addr: SocketAddr) -> Result<()> {
        debug!("connect fd {} to {}", self.as_raw_fd(), addr);
        self.inner
            .connect(&SockAddr::from(addr))
            .map_err(SctpError::syscall("connect"))
    }

    /// Initiate a connection to a multi-homed endpoint.
    ///
    /// The stack may use any of the addresses while setting the association
    /// up. They need not be the set the peer ends up using; ask
    /// [`peer_addrs`](Self::peer_addrs) once the association is up.
    pub fn connectx(&self, addrs: &PackedAddrs) -> Result<sctp_assoc_t> {
        addr_list::connectx(self.as_fd(), addrs)
    }

    /// Mark a socket as ready to accept incoming associations.
    pub fn listen(&self, backlog: i32) -> Result<()> {
        self.inner.listen(backlog).map_err(SctpError::syscall("listen"))
    }

    /// Accept a new association on a listening one-to-one socket.
    pub fn accept(&self) -> Result<(SctpSocket, SocketAddr)> {
        let (socket, addr) = self.inner.accept().map_err(SctpError::syscall("accept"))?;
        let addr = crate::addr::decode_address(&addr)?;
        debug!("accepted association from {} on fd {}", addr, self.as_raw_fd());
        Ok((
            SctpSocket {
                inner: socket,
                caps: self.caps,
            },
            addr,
        ))
    }

    /// Moves association `assoc_id` to a socket of its own.
    pub fn peeloff(&self, assoc_id: sctp_assoc_t) -> Result<SctpSocket> {
        let fd = peeloff(self.as_fd(), assoc_id)?;
        Ok(SctpSocket::from_fd(fd).with_capabilities(self.caps))
    }

    /// Shuts down the read, write, or both halves of this connection.
    pub fn shutdown(&self, how: Shutdown) -> Result<()> {
        self.inner.shutdown(how).map_err(SctpError::syscall("shutdown"))
    }

    /// Returns the socket address of the local half of this socket.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        let addr = self.inner.local_addr().map_err(SctpError::syscall("getsockname"))?;
        crate::addr::decode_address(&addr)
    }

    /// Returns the socket address of the remote peer of this socket.
    pub fn peer_addr(&self) -> Result<SocketAddr> {
        let addr = self.inner.peer_addr().map_err(SctpError::syscall("getpeername"))?;
        crate::addr::decode_address(&addr)
    }

    /// All addresses of the peer of `assoc_id`.
    pub fn peer_addrs(&self, assoc_id: sctp_assoc_t) -> Result<Vec<Option<SocketAddr>>> {
        addr_list::peer_addrs(self.as_fd(), assoc_id)
    }

    /// All addresses bound locally for `assoc_id`, or for the socket with `0`.
    pub fn local_addrs(&self, assoc_id: sctp_assoc_t) -> Result<Vec<Option<SocketAddr>>> {
        addr_list::local_addrs(self.as_fd(), assoc_id)
    }

    /// Send a message, to `to` or along the association's primary path.
    pub fn send_msg(&self, payload: &[u8], to: Option<SocketAddr>, opts: &SendOptions) -> Result<usize> {
        let to = to.map(SockAddr::from);
        msg::send_msg(self.as_fd(), payload, to.as_ref(), opts)
    }

    /// Receive one message or notification of at most `max_len` bytes.
    pub fn recv_msg(&self, max_len: usize) -> Result<ReceivedMessage> {
        msg::recv_msg(self.as_fd(), max_len)
    }

    /// Get the value of the `SO_ERROR` option on this socket.
    ///
    /// This will retrieve the stored error in the underlying socket, clearing
    /// the field in the process.
    pub fn take_error(&self) -> Result<Option<std::io::Error>> {
        self.inner.take_error().map_err(SctpError::syscall("getsockopt(SO_ERROR)"))
    }

    /// Set the value for the `O_NONBLOCK` option on this socket
    pub fn set_nonblocking(&self, nonblocking: bool) -> Result<()> {
        self.inner
            .set_nonblocking(nonblocking)
            .map_err(SctpError::syscall("fcntl(O_NONBLOCK)"))
    }

    /// Set value for the `SO_LINGER` option on this socket.
    ///
    /// If `linger` is not `None`, a close(2) or shutdown(2) will not return
    /// until all queued messages for the socket have been successfully sent or
    /// the linger timeout has been reached. A zero timeout aborts the
    /// associations on close.
    pub fn set_linger(&self, duration: Option<Duration>) -> Result<()> {
        self.inner
            .set_linger(duration)
            .map_err(SctpError::syscall("setsockopt(SO_LINGER)"))
    }

    /// Get the value of the `SO_LINGER` option on this socket.
    pub fn linger(&self) -> Result<Option<Duration>> {
        self.inner.linger().map_err(SctpError::syscall("getsockopt(SO_LINGER)"))
    }

    /// Sets the value of the SO_REUSEADDR option on this socket.
    pub fn set_reuseaddr(&self, reuse: bool) -> Result<()> {
        self.inner
            .set_reuse_address(reuse)
            .map_err(SctpError::syscall("setsockopt(SO_REUSEADDR)"))
    }

    pub fn init_params(&self) -> Result<InitParams> {
        options::init_params(self.as_fd())
    }

    /// Set the value for the `SCTP_INITMSG` option on this socket
    pub fn set_init_params(&self, params: &InitParams) -> Result<()> {
        options::set_init_params(self.as_fd(), params)
    }

    pub fn rto_info(&self, assoc_id: sctp_assoc_t) -> Result<RtoInfo> {
        options::rto_info(self.as_fd(), assoc_id)
    }

    pub fn set_rto_info(&self, rto: &RtoInfo) -> Result<()> {
        options::set_rto_info(self.as_fd(), rto)
    }

    pub fn assoc_params(&self, assoc_id: sctp_assoc_t) -> Result<AssocParams> {
        options::assoc_params(self.as_fd(), assoc_id)
    }

    pub fn set_assoc_params(&self, params: &AssocParams) -> Result<()> {
        options::set_assoc_params(self.as_fd(), params)
    }

    /// Peer address parameters, decoded against this socket's capabilities.
    pub fn peer_addr_params(&self, assoc_id: sctp_assoc_t, address: Option<SocketAddr>) -> Result<PeerAddrParams> {
        options::peer_addr_params(self.as_fd(), assoc_id, address, self.caps)
    }

    pub fn set_peer_addr_params(&self, params: &PeerAddrParams) -> Result<()> {
        options::set_peer_addr_params(self.as_fd(), params, self.caps)
    }

    pub fn peer_addr_info(&self, assoc_id: sctp_assoc_t, address: SocketAddr) -> Result<PeerAddrInfo> {
        options::peer_addr_info(self.as_fd(), assoc_id, address)
    }

    /// Get the value of the `SCTP_STATUS` option on this socket.
    pub fn status(&self, assoc_id: sctp_assoc_t) -> Result<Status> {
        options::status(self.as_fd(), assoc_id)
    }

    pub fn events(&self) -> Result<EventSubscription> {
        options::events(self.as_fd())
    }

    pub fn set_events(&self, events: &EventSubscription) -> Result<()> {
        options::set_events(self.as_fd(), events)
    }

    /// Gets the value of the SCTP_NODELAY option on this socket.
    pub fn nodelay(&self) -> Result<bool> {
        options::nodelay(self.as_fd())
    }

    /// Sets the value of the SCTP_NODELAY option on this socket.
    pub fn set_nodelay(&self, nodelay: bool) -> Result<()> {
        options::set_nodelay(self.as_fd(), nodelay)
    }

    pub fn mapped_v4(&self) -> Result<bool> {
        options::mapped_v4(self.as_fd())
    }

    pub fn set_mapped_v4(&self, enable: bool) -> Result<()> {
        options::set_mapped_v4(self.as_fd(), enable)
    }

    pub fn maxseg(&self, assoc_id: sctp_assoc_t) -> Result<u32> {
        options::maxseg(self.as_fd(), assoc_id)
    }

    pub fn set_maxseg(&self, assoc_id: sctp_assoc_t, size: u32) -> Result<()> {
        options::set_maxseg(self.as_fd(), assoc_id, size)
    }

    pub fn disable_fragments(&self) -> Result<bool> {
        options::disable_fragments(self.as_fd())
    }

    pub fn set_disable_fragments(&self, disable: bool) -> Result<()> {
        options::set_disable_fragments(self.as_fd(), disable)
    }

    pub fn autoclose(&self) -> Result<u32> {
        options::autoclose(self.as_fd())
    }

    pub fn set_autoclose(&self, seconds: u32) -> Result<()> {
        options::set_autoclose(self.as_fd(), seconds)
    }

    pub fn adaptation_layer(&self) -> Result<u32> {
        options::adaptation_layer(self.as_fd())
    }

    pub fn set_adaptation_layer(&self, indication: u32) -> Result<()> {
        options::set_adaptation_layer(self.as_fd(), indication)
    }

    pub fn send_buffer_size(&self) -> Result<usize> {
        options::send_buffer_size(self.as_fd())
    }

    pub fn set_send_buffer_size(&self, size: usize) -> Result<()> {
        options::set_send_buffer_size(self.as_fd(), size)
    }

    pub fn recv_buffer_size(&self) -> Result<usize> {
        options::recv_buffer_size(self.as_fd())
    }

    pub fn set_recv_buffer_size(&self, size: usize) -> Result<()> {
        options::set_recv_buffer_size(self.as_fd(), size)
    }

    /// Selects the peer address used as primary path of `assoc_id`.
    pub fn set_primary(&self, assoc_id: sctp_assoc_t, address: SocketAddr) -> Result<()> {
        options::set_primary(self.as_fd(), assoc_id, address)
    }

    /// Asks the peer to make our `address` its primary path.
    pub fn set_peer_primary(&self, assoc_id: sctp_assoc_t, address: SocketAddr) -> Result<()> {
        options::set_peer_primary(self.as_fd(), assoc_id, address)
    }
}

impl AsFd for SctpSocket {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.inner.as_fd()
    }
}

impl AsRawFd for SctpSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.inner.as_raw_fd()
    }
}

impl From<SctpSocket> for OwnedFd {
    fn from(socket: SctpSocket) -> OwnedFd {
        socket.inner.into()
    }
}
