//! Typed socket options.
//!
//! Each getter zeroes the kernel structure, fills in the query key and reads
//! it back with `getsockopt`; each setter zeroes the structure, writes every
//! field and hands it to `setsockopt`. Lengths are always the size of the
//! kernel structure.

use bitflags::bitflags;
use socket2::SockRef;
use std::net::SocketAddr;
use std::os::fd::{AsRawFd, BorrowedFd};
use tracing::{trace, warn};

use crate::addr::{decode_storage, to_storage};
use crate::config::Capabilities;
use crate::error::{Result, SctpError};
use crate::sys::common::*;
use crate::sys::linux::{self, *};

/// SCTP Initiation Structure
///
/// Default parameters for the INIT sent when an association is set up.
/// Zero in any field selects the endpoint's default.
///
/// <https://datatracker.ietf.org/doc/html/rfc6458#section-8.1.3>
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct InitParams {
    /// Number of streams the application wishes to send on. Negotiated with
    /// the peer and confirmed in the `COMM_UP` notification.
    pub num_ostreams: u16,
    /// Maximum number of inbound streams the application supports.
    pub max_instreams: u16,
    /// How many times the INIT is retransmitted.
    pub max_attempts: u16,
    /// Largest RTO, in milliseconds, used while retransmitting the INIT.
    pub max_init_timeout: u16,
}

/// Retransmission timeout parameters, in milliseconds.
///
/// <https://datatracker.ietf.org/doc/html/rfc6458#section-8.1.1>
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct RtoInfo {
    pub assoc_id: sctp_assoc_t,
    pub initial: u32,
    pub min: u32,
    pub max: u32,
}

/// Association parameters.
///
/// <https://datatracker.ietf.org/doc/html/rfc6458#section-8.1.2>
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct AssocParams {
    pub assoc_id: sctp_assoc_t,
    /// Maximum retransmissions before the association is considered
    /// unreachable.
    pub max_retransmits: u16,
    /// Read only; the number of peer addresses.
    pub number_peer_destinations: u16,
    /// Read only; the peer's receive window.
    pub peer_rwnd: u32,
    /// Read only; the local receive window.
    pub local_rwnd: u32,
    /// Lifetime of the state cookie, in milliseconds.
    pub cookie_life: u32,
}

bitflags! {
    /// `spp_flags` of the peer address parameters.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PeerAddrFlags: u32 {
        const HB_ENABLE = SPP_HB_ENABLE;
        const HB_DISABLE = SPP_HB_DISABLE;
        const HB_DEMAND = SPP_HB_DEMAND;
        const PMTUD_ENABLE = SPP_PMTUD_ENABLE;
        const PMTUD_DISABLE = SPP_PMTUD_DISABLE;
        const SACKDELAY_ENABLE = SPP_SACKDELAY_ENABLE;
        const SACKDELAY_DISABLE = SPP_SACKDELAY_DISABLE;
        const HB_TIME_IS_ZERO = SPP_HB_TIME_IS_ZERO;
    }
}

impl PeerAddrFlags {
    fn check(self) -> Result<()> {
        let conflicts = [
            (
                PeerAddrFlags::HB_ENABLE | PeerAddrFlags::HB_DISABLE,
                "heartbeat both enabled and disabled",
            ),
            (
                PeerAddrFlags::PMTUD_ENABLE | PeerAddrFlags::PMTUD_DISABLE,
                "path MTU discovery both enabled and disabled",
            ),
            (
                PeerAddrFlags::SACKDELAY_ENABLE | PeerAddrFlags::SACKDELAY_DISABLE,
                "SACK delay both enabled and disabled",
            ),
        ];
        for (pair, reason) in conflicts {
            if self.contains(pair) {
                return Err(SctpError::InvalidField {
                    field: "flags",
                    reason,
                });
            }
        }
        Ok(())
    }
}

/// Peer Address Parameters
///
/// Heartbeat and retransmission settings of one peer address, or of every
/// address of the association when `address` is `None`.
///
/// `path_mtu`, `sack_delay` and `flags` only exist when the kernel has
/// [`Capabilities::PEER_ADDR_PARAMS_EXT`]. Without it they read back as
/// `None` and are sent as zero.
///
/// <https://datatracker.ietf.org/doc/html/rfc6458#section-8.1.12>
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct PeerAddrParams {
    pub assoc_id: sctp_assoc_t,
    pub address: Option<SocketAddr>,
    /// Heartbeat interval, in milliseconds.
    pub hb_interval: u32,
    /// Retransmissions before this address is considered unreachable.
    pub path_max_retransmits: u16,
    pub path_mtu: Option<u32>,
    /// Delayed SACK timer, in milliseconds.
    pub sack_delay: Option<u32>,
    pub flags: Option<PeerAddrFlags>,
}

impl PeerAddrParams {
    fn encode(&self, caps: Capabilities) -> Result<SctpPaddrParams> {
        let mut raw: SctpPaddrParams = linux::zeroed();
        raw.assoc_id = self.assoc_id;
        if let Some(a) = &self.address {
            raw.address = to_storage(a);
        }
        raw.hbinterval = self.hb_interval;
        raw.pathmaxrxt = self.path_max_retransmits;

        if caps.have_peer_addr_params_ext() {
            let flags = self.flags.ok_or(SctpError::MissingField("flags"))?;
            raw.pathmtu = self.path_mtu.ok_or(SctpError::MissingField("path_mtu"))?;
            raw.sackdelay = self.sack_delay.ok_or(SctpError::MissingField("sack_delay"))?;
            flags.check()?;
            raw.flags = flags.bits();
        } else if self.path_mtu.is_some() || self.sack_delay.is_some() || self.flags.is_some() {
            warn!("peer address parameters extension unavailable, ignoring path_mtu, sack_delay and flags");
        }
        Ok(raw)
    }

    fn decode(raw: &SctpPaddrParams, caps: Capabilities) -> Self {
        let address = { raw.address };
        let (path_mtu, sack_delay, flags) = (raw.pathmtu, raw.sackdelay, raw.flags);
        let ext = caps.have_peer_addr_params_ext();
        PeerAddrParams {
            assoc_id: { raw.assoc_id },
            address: decode_storage(&address).ok(),
            hb_interval: { raw.hbinterval },
            path_max_retransmits: { raw.pathmaxrxt },
            path_mtu: ext.then_some(path_mtu),
            sack_delay: ext.then_some(sack_delay),
            flags: ext.then_some(PeerAddrFlags::from_bits_truncate(flags)),
        }
    }
}

/// Reachability of a peer address (`spinfo_state`).
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum PathState {
    #[default]
    Inactive,
    PotentiallyFailed,
    Active,
    Unconfirmed,
    Other(i32),
}

impl From<i32> for PathState {
    fn from(v: i32) -> Self {
        match v {
            SCTP_INACTIVE => PathState::Inactive,
            SCTP_PF => PathState::PotentiallyFailed,
            SCTP_ACTIVE => PathState::Active,
            SCTP_UNCONFIRMED => PathState::Unconfirmed,
            other => PathState::Other(other),
        }
    }
}

/// Peer Address Information
///
/// Read-only state of one peer address: reachability, congestion window and
/// retransmission timer values.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct PeerAddrInfo {
    pub assoc_id: sctp_assoc_t,
    /// `None` when the kernel reports an address family this crate does not
    /// decode, which happens for the primary path of a closed association.
    pub address: Option<SocketAddr>,
    pub state: PathState,
    /// Congestion window.
    pub cwnd: u32,
    /// Smoothed round-trip time, in milliseconds.
    pub srtt: u32,
    /// Retransmission timeout, in milliseconds.
    pub rto: u32,
    /// Path MTU.
    pub mtu: u32,
}

impl From<&SctpPaddrInfo> for PeerAddrInfo {
    fn from(raw: &SctpPaddrInfo) -> Self {
        let address = { raw.address };
        PeerAddrInfo {
            assoc_id: { raw.assoc_id },
            address: decode_storage(&address).ok(),
            state: PathState::from({ raw.state }),
            cwnd: { raw.cwnd },
            srtt: { raw.srtt },
            rto: { raw.rto },
            mtu: { raw.mtu },
        }
    }
}

/// Association state (`sstat_state`).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AssocState {
    Empty,
    Closed,
    CookieWait,
    CookieEchoed,
    Established,
    ShutdownPending,
    ShutdownSent,
    ShutdownReceived,
    ShutdownAckSent,
    /// A value this crate has no name for, passed through unchanged.
    Other(i32),
}

impl From<i32> for AssocState {
    fn from(v: i32) -> Self {
        match v {
            SCTP_EMPTY => AssocState::Empty,
            SCTP_CLOSED => AssocState::Closed,
            SCTP_COOKIE_WAIT => AssocState::CookieWait,
            SCTP_COOKIE_ECHOED => AssocState::CookieEchoed,
            SCTP_ESTABLISHED => AssocState::Established,
            SCTP_SHUTDOWN_PENDING => AssocState::ShutdownPending,
            SCTP_SHUTDOWN_SENT => AssocState::ShutdownSent,
            SCTP_SHUTDOWN_RECEIVED => AssocState::ShutdownReceived,
            SCTP_SHUTDOWN_ACK_SENT => AssocState::ShutdownAckSent,
            other => AssocState::Other(other),
        }
    }
}

impl From<AssocState> for i32 {
    fn from(s: AssocState) -> i32 {
        match s {
            AssocState::Empty => SCTP_EMPTY,
            AssocState::Closed => SCTP_CLOSED,
            AssocState::CookieWait => SCTP_COOKIE_WAIT,
            AssocState::CookieEchoed => SCTP_COOKIE_ECHOED,
            AssocState::Established => SCTP_ESTABLISHED,
            AssocState::ShutdownPending => SCTP_SHUTDOWN_PENDING,
            AssocState::ShutdownSent => SCTP_SHUTDOWN_SENT,
            AssocState::ShutdownReceived => SCTP_SHUTDOWN_RECEIVED,
            AssocState::ShutdownAckSent => SCTP_SHUTDOWN_ACK_SENT,
            AssocState::Other(v) => v,
        }
    }
}

/// The SCTP association status
///
/// Current state of an association, including the peer's receive window,
/// the number of unacknowledged DATA chunks and the number pending receipt.
/// This information is read-only.
///
/// <https://www.rfc-editor.org/rfc/rfc6458#section-8.2.1>
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Status {
    pub assoc_id: sctp_assoc_t,
    pub state: AssocState,
    /// The peer's current receive window.
    pub rwnd: u32,
    /// Unacknowledged DATA chunks.
    pub unackdata: u16,
    /// DATA chunks pending receipt.
    pub penddata: u16,
    /// Streams the peer will use outbound.
    pub instrms: u16,
    /// Outbound streams the endpoint may use.
    pub outstrms: u16,
    /// Size at which fragmentation occurs.
    pub fragmentation_point: u32,
    /// The current primary peer address.
    pub primary: PeerAddrInfo,
}

impl From<&SctpStatus> for Status {
    fn from(raw: &SctpStatus) -> Self {
        let primary = raw.primary;
        Status {
            assoc_id: raw.assoc_id,
            state: AssocState::from(raw.state),
            rwnd: raw.rwnd,
            unackdata: raw.unackdata,
            penddata: raw.penddata,
            instrms: raw.instrms,
            outstrms: raw.outstrms,
            fragmentation_point: raw.fragmentation_point,
            primary: PeerAddrInfo::from(&primary),
        }
    }
}

/// Which notifications are delivered on the data path.
///
/// <https://datatracker.ietf.org/doc/html/rfc6458#section-6.2.1>
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct EventSubscription {
    /// Per-message `sctp_sndrcvinfo` ancillary data on receive. Not a
    /// notification as such.
    pub data_io: bool,
    pub association: bool,
    pub address: bool,
    pub send_failure: bool,
    pub peer_error: bool,
    pub shutdown: bool,
    pub partial_delivery: bool,
    pub adaptation_layer: bool,
}

impl From<&SctpEventSubscribe> for EventSubscription {
    fn from(raw: &SctpEventSubscribe) -> Self {
        EventSubscription {
            data_io: raw.data_io_event != 0,
            association: raw.association_event != 0,
            address: raw.address_event != 0,
            send_failure: raw.send_failure_event != 0,
            peer_error: raw.peer_error_event != 0,
            shutdown: raw.shutdown_event != 0,
            partial_delivery: raw.partial_delivery_event != 0,
            adaptation_layer: raw.adaptation_layer_event != 0,
        }
    }
}

impl From<&EventSubscription> for SctpEventSubscribe {
    fn from(e: &EventSubscription) -> Self {
        SctpEventSubscribe {
            data_io_event: e.data_io as u8,
            association_event: e.association as u8,
            address_event: e.address as u8,
            send_failure_event: e.send_failure as u8,
            peer_error_event: e.peer_error as u8,
            shutdown_event: e.shutdown as u8,
            partial_delivery_event: e.partial_delivery as u8,
            adaptation_layer_event: e.adaptation_layer as u8,
            ..Default::default()
        }
    }
}

/// Caller must ensure `T` is the kernel structure of `opt`.
unsafe fn get<T: Copy>(fd: BorrowedFd<'_>, opt: libc::c_int, call: &'static str, query: T) -> Result<T> {
    trace!("{} on fd {}", call, fd.as_raw_fd());
    linux::getsockopt(fd.as_raw_fd(), SOL_SCTP, opt, query).map_err(SctpError::syscall(call))
}

/// Caller must ensure `T` is the kernel structure of `opt`.
unsafe fn set<T>(fd: BorrowedFd<'_>, opt: libc::c_int, call: &'static str, value: &T) -> Result<()> {
    trace!("{} on fd {}", call, fd.as_raw_fd());
    linux::setsockopt(fd.as_raw_fd(), SOL_SCTP, opt, value).map_err(SctpError::syscall(call))
}

fn get_int(fd: BorrowedFd<'_>, opt: libc::c_int, call: &'static str) -> Result<libc::c_int> {
    unsafe { get::<libc::c_int>(fd, opt, call, 0) }
}

fn set_int(fd: BorrowedFd<'_>, opt: libc::c_int, call: &'static str, value: libc::c_int) -> Result<()> {
    unsafe { set(fd, opt, call, &value) }
}

/// Reads `SCTP_INITMSG`.
pub fn init_params(fd: BorrowedFd<'_>) -> Result<InitParams> {
    let raw: SctpInitMsg = unsafe { get(fd, SCTP_INITMSG, "getsockopt(SCTP_INITMSG)", linux::zeroed())? };
    Ok(InitParams {
        num_ostreams: raw.num_ostreams,
        max_instreams: raw.max_instreams,
        max_attempts: raw.max_attempts,
        max_init_timeout: raw.max_init_timeo,
    })
}

/// Writes `SCTP_INITMSG`. Applies to associations set up afterwards.
pub fn set_init_params(fd: BorrowedFd<'_>, p: &InitParams) -> Result<()> {
    let raw = SctpInitMsg {
        num_ostreams: p.num_ostreams,
        max_instreams: p.max_instreams,
        max_attempts: p.max_attempts,
        max_init_timeo: p.max_init_timeout,
    };
    unsafe { set(fd, SCTP_INITMSG, "setsockopt(SCTP_INITMSG)", &raw) }
}

pub fn rto_info(fd: BorrowedFd<'_>, assoc_id: sctp_assoc_t) -> Result<RtoInfo> {
    let query = SctpRtoInfo {
        assoc_id,
        ..Default::default()
    };
    let raw = unsafe { get(fd, SCTP_RTOINFO, "getsockopt(SCTP_RTOINFO)", query)? };
    Ok(RtoInfo {
        assoc_id: raw.assoc_id,
        initial: raw.initial,
        min: raw.min,
        max: raw.max,
    })
}

/// Writes `SCTP_RTOINFO`. A zero field leaves the current value unchanged.
pub fn set_rto_info(fd: BorrowedFd<'_>, r: &RtoInfo) -> Result<()> {
    let raw = SctpRtoInfo {
        assoc_id: r.assoc_id,
        initial: r.initial,
        max: r.max,
        min: r.min,
    };
    unsafe { set(fd, SCTP_RTOINFO, "setsockopt(SCTP_RTOINFO)", &raw) }
}

pub fn assoc_params(fd: BorrowedFd<'_>, assoc_id: sctp_assoc_t) -> Result<AssocParams> {
    let query = SctpAssocParams {
        assoc_id,
        ..Default::default()
    };
    let raw = unsafe { get(fd, SCTP_ASSOCINFO, "getsockopt(SCTP_ASSOCINFO)", query)? };
    Ok(AssocParams {
        assoc_id: raw.assoc_id,
        max_retransmits: raw.asocmaxrxt,
        number_peer_destinations: raw.number_peer_destinations,
        peer_rwnd: raw.peer_rwnd,
        local_rwnd: raw.local_rwnd,
        cookie_life: raw.cookie_life,
    })
}

pub fn set_assoc_params(fd: BorrowedFd<'_>, a: &AssocParams) -> Result<()> {
    let raw = SctpAssocParams {
        assoc_id: a.assoc_id,
        asocmaxrxt: a.max_retransmits,
        number_peer_destinations: a.number_peer_destinations,
        peer_rwnd: a.peer_rwnd,
        local_rwnd: a.local_rwnd,
        cookie_life: a.cookie_life,
    };
    unsafe { set(fd, SCTP_ASSOCINFO, "setsockopt(SCTP_ASSOCINFO)", &raw) }
}

/// Reads `SCTP_PEER_ADDR_PARAMS` for `address`, or for the whole association
/// when `address` is `None`.
pub fn peer_addr_params(
    fd: BorrowedFd<'_>,
    assoc_id: sctp_assoc_t,
    address: Option<SocketAddr>,
    caps: Capabilities,
) -> Result<PeerAddrParams> {
    let mut query: SctpPaddrParams = linux::zeroed();
    query.assoc_id = assoc_id;
    if let Some(a) = &address {
        query.address = to_storage(a);
    }
    let raw = unsafe {
        get(
            fd,
            SCTP_PEER_ADDR_PARAMS,
            "getsockopt(SCTP_PEER_ADDR_PARAMS)",
            query,
        )?
    };
    Ok(PeerAddrParams::decode(&raw, caps))
}

/// Writes `SCTP_PEER_ADDR_PARAMS`.
///
/// With [`Capabilities::PEER_ADDR_PARAMS_EXT`], `path_mtu`, `sack_delay` and
/// `flags` must all be present; otherwise [`SctpError::MissingField`] is
/// returned before anything reaches the kernel.
pub fn set_peer_addr_params(fd: BorrowedFd<'_>, p: &PeerAddrParams, caps: Capabilities) -> Result<()> {
    let raw = p.encode(caps)?;
    unsafe {
        set(
            fd,
            SCTP_PEER_ADDR_PARAMS,
            "setsockopt(SCTP_PEER_ADDR_PARAMS)",
            &raw,
        )
    }
}

pub fn peer_addr_info(fd: BorrowedFd<'_>, assoc_id: sctp_assoc_t, address: SocketAddr) -> Result<PeerAddrInfo> {
    let mut query: SctpPaddrInfo = linux::zeroed();
    query.assoc_id = assoc_id;
    query.address = to_storage(&address);
    let raw = unsafe {
        get(
            fd,
            SCTP_GET_PEER_ADDR_INFO,
            "getsockopt(SCTP_GET_PEER_ADDR_INFO)",
            query,
        )?
    };
    Ok(PeerAddrInfo::from(&raw))
}

pub fn status(fd: BorrowedFd<'_>, assoc_id: sctp_assoc_t) -> Result<Status> {
    let mut query: SctpStatus = linux::zeroed();
    query.assoc_id = assoc_id;
    let raw = unsafe { get(fd, SCTP_STATUS, "getsockopt(SCTP_STATUS)", query)? };
    Ok(Status::from(&raw))
}

pub fn events(fd: BorrowedFd<'_>) -> Result<EventSubscription> {
    let raw: SctpEventSubscribe =
        unsafe { get(fd, SCTP_EVENTS, "getsockopt(SCTP_EVENTS)", SctpEventSubscribe::default())? };
    Ok(EventSubscription::from(&raw))
}

pub fn set_events(fd: BorrowedFd<'_>, e: &EventSubscription) -> Result<()> {
    let raw = SctpEventSubscribe::from(e);
    unsafe { set(fd, SCTP_EVENTS, "setsockopt(SCTP_EVENTS)", &raw) }
}

/// Gets the value of the `SCTP_NODELAY` option.
pub fn nodelay(fd: BorrowedFd<'_>) -> Result<bool> {
    get_int(fd, SCTP_NODELAY, "getsockopt(SCTP_NODELAY)").map(|v| v != 0)
}

/// Sets the value of the `SCTP_NODELAY` option, disabling Nagle-like
/// bundling delays.
pub fn set_nodelay(fd: BorrowedFd<'_>, nodelay: bool) -> Result<()> {
    set_int(fd, SCTP_NODELAY, "setsockopt(SCTP_NODELAY)", nodelay as libc::c_int)
}

/// Whether IPv4 peers are reported as v4-mapped IPv6 addresses.
pub fn mapped_v4(fd: BorrowedFd<'_>) -> Result<bool> {
    get_int(fd, SCTP_I_WANT_MAPPED_V4_ADDR, "getsockopt(SCTP_I_WANT_MAPPED_V4_ADDR)").map(|v| v != 0)
}

pub fn set_mapped_v4(fd: BorrowedFd<'_>, enable: bool) -> Result<()> {
    set_int(
        fd,
        SCTP_I_WANT_MAPPED_V4_ADDR,
        "setsockopt(SCTP_I_WANT_MAPPED_V4_ADDR)",
        enable as libc::c_int,
    )
}

/// Maximum fragment size of association `assoc_id`. Zero means the path MTU
/// decides.
pub fn maxseg(fd: BorrowedFd<'_>, assoc_id: sctp_assoc_t) -> Result<u32> {
    let query = SctpAssocValue {
        assoc_id,
        assoc_value: 0,
    };
    let raw = unsafe { get(fd, SCTP_MAXSEG, "getsockopt(SCTP_MAXSEG)", query)? };
    Ok(raw.assoc_value)
}

pub fn set_maxseg(fd: BorrowedFd<'_>, assoc_id: sctp_assoc_t, size: u32) -> Result<()> {
    let raw = SctpAssocValue {
        assoc_id,
        assoc_value: size,
    };
    unsafe { set(fd, SCTP_MAXSEG, "setsockopt(SCTP_MAXSEG)", &raw) }
}

pub fn disable_fragments(fd: BorrowedFd<'_>) -> Result<bool> {
    get_int(fd, SCTP_DISABLE_FRAGMENTS, "getsockopt(SCTP_DISABLE_FRAGMENTS)").map(|v| v != 0)
}

pub fn set_disable_fragments(fd: BorrowedFd<'_>, disable: bool) -> Result<()> {
    set_int(
        fd,
        SCTP_DISABLE_FRAGMENTS,
        "setsockopt(SCTP_DISABLE_FRAGMENTS)",
        disable as libc::c_int,
    )
}

/// Idle time in seconds after which an association of a one-to-many socket
/// is closed. Zero disables it.
pub fn autoclose(fd: BorrowedFd<'_>) -> Result<u32> {
    get_int(fd, SCTP_AUTOCLOSE, "getsockopt(SCTP_AUTOCLOSE)").map(|v| v as u32)
}

pub fn set_autoclose(fd: BorrowedFd<'_>, seconds: u32) -> Result<()> {
    set_int(fd, SCTP_AUTOCLOSE, "setsockopt(SCTP_AUTOCLOSE)", seconds as libc::c_int)
}

/// Adaptation layer indication sent to peers in INIT/INIT-ACK.
pub fn adaptation_layer(fd: BorrowedFd<'_>) -> Result<u32> {
    let raw = unsafe {
        get(
            fd,
            SCTP_ADAPTATION_LAYER,
            "getsockopt(SCTP_ADAPTATION_LAYER)",
            SctpSetAdaptation::default(),
        )?
    };
    Ok(raw.adaptation_ind)
}

pub fn set_adaptation_layer(fd: BorrowedFd<'_>, indication: u32) -> Result<()> {
    let raw = SctpSetAdaptation {
        adaptation_ind: indication,
    };
    unsafe { set(fd, SCTP_ADAPTATION_LAYER, "setsockopt(SCTP_ADAPTATION_LAYER)", &raw) }
}

/// `SO_SNDBUF`
pub fn send_buffer_size(fd: BorrowedFd<'_>) -> Result<usize> {
    SockRef::from(&fd)
        .send_buffer_size()
        .map_err(SctpError::syscall("getsockopt(SO_SNDBUF)"))
}

pub fn set_send_buffer_size(fd: BorrowedFd<'_>, size: usize) -> Result<()> {
    SockRef::from(&fd)
        .set_send_buffer_size(size)
        .map_err(SctpError::syscall("setsockopt(SO_SNDBUF)"))
}

/// `SO_RCVBUF`
pub fn recv_buffer_size(fd: BorrowedFd<'_>) -> Result<usize> {
    SockRef::from(&fd)
        .recv_buffer_size()
        .map_err(SctpError::syscall("getsockopt(SO_RCVBUF)"))
}

pub fn set_recv_buffer_size(fd: BorrowedFd<'_>, size: usize) -> Result<()> {
    SockRef::from(&fd)
        .set_recv_buffer_size(size)
        .map_err(SctpError::syscall("setsockopt(SO_RCVBUF)"))
}

/// Makes `address` the primary path for sending to the peer.
pub fn set_primary(fd: BorrowedFd<'_>, assoc_id: sctp_assoc_t, address: SocketAddr) -> Result<()> {
    let mut raw: SctpPrim = linux::zeroed();
    raw.assoc_id = assoc_id;
    raw.addr = to_storage(&address);
    unsafe { set(fd, SCTP_PRIMARY_ADDR, "setsockopt(SCTP_PRIMARY_ADDR)", &raw) }
}

/// Asks the peer to use the local `address` as its primary path to us.
pub fn set_peer_primary(fd: BorrowedFd<'_>, assoc_id: sctp_assoc_t, address: SocketAddr) -> Result<()> {
    let mut raw: SctpPrim = linux::zeroed();
    raw.assoc_id = assoc_id;
    raw.addr = to_storage(&address);
    unsafe {
        set(
            fd,
            SCTP_SET_PEER_PRIMARY_ADDR,
            "setsockopt(SCTP_SET_PEER_PRIMARY_ADDR)",
            &raw,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> PeerAddrParams {
        PeerAddrParams {
            assoc_id: 3,
            address: Some("10.0.0.1:2905".parse().unwrap()),
            hb_interval: 5000,
            path_max_retransmits: 4,
            path_mtu: Some(1400),
            sack_delay: Some(200),
            flags: Some(PeerAddrFlags::HB_ENABLE | PeerAddrFlags::PMTUD_DISABLE),
        }
    }

    #[test]
    fn peer_addr_params_with_extension() {
        let caps = Capabilities::PEER_ADDR_PARAMS_EXT;
        let raw = params().encode(caps).unwrap();
        assert_eq!({ raw.pathmtu }, 1400);
        assert_eq!({ raw.sackdelay }, 200);
        assert_eq!({ raw.flags }, SPP_HB_ENABLE | SPP_PMTUD_DISABLE);
        assert_eq!(PeerAddrParams::decode(&raw, caps), params());
    }

    #[test]
    fn event_subscription_clears_unmodelled_events() {
        let raw = SctpEventSubscribe::from(&EventSubscription {
            data_io: true,
            shutdown: true,
            ..Default::default()
        });
        assert_eq!(raw.data_io_event, 1);
        assert_eq!(raw.shutdown_event, 1);
        assert_eq!(raw.authentication_event, 0);
        assert_eq!(raw.sender_dry_event, 0);
        assert_eq!(raw.stream_reset_event, 0);
        assert_eq!(raw.assoc_reset_event, 0);
        assert_eq!(raw.stream_change_event, 0);
        assert_eq!(raw.send_failure_event_event, 0);
    }

    #[test]
    fn peer_addr_flags_drop_flowlabel_and_dscp() {
        let caps = Capabilities::PEER_ADDR_PARAMS_EXT;
        let mut raw = params().encode(caps).unwrap();
        // SPP_IPV6_FLOWLABEL | SPP_DSCP, whose values are not carried
        raw.flags = { raw.flags } | 0x100 | 0x200;

        let back = PeerAddrParams::decode(&raw, caps);
        assert_eq!(back.flags, params().flags);
        assert_eq!({ back.encode(caps).unwrap().flags }, SPP_HB_ENABLE | SPP_PMTUD_DISABLE);
    }

    #[test]
    fn peer_addr_params_without_extension() {
        let caps = Capabilities::empty();
        let raw = params().encode(caps).unwrap();
        assert_eq!({ raw.pathmtu }, 0);
        assert_eq!({ raw.sackdelay }, 0);
        assert_eq!({ raw.flags }, 0);

        let back = PeerAddrParams::decode(&raw, caps);
        assert_eq!(back.hb_interval, 5000);
        assert_eq!(back.path_max_retransmits, 4);
        assert_eq!(back.path_mtu, None);
        assert_eq!(back.sack_delay, None);
        assert_eq!(back.flags, None);
    }

    #[test]
    fn missing_gated_field_is_reported() {
        let caps = Capabilities::PEER_ADDR_PARAMS_EXT;
        let p = PeerAddrParams {
            sack_delay: None,
            ..params()
        };
        assert!(matches!(p.encode(caps), Err(SctpError::MissingField("sack_delay"))));

        // the same record is fine when the fields do not exist
        assert!(p.encode(Capabilities::empty()).is_ok());
    }

    #[test]
    fn contradictory_flags_are_rejected() {
        let caps = Capabilities::PEER_ADDR_PARAMS_EXT;
        let p = PeerAddrParams {
            flags: Some(PeerAddrFlags::SACKDELAY_ENABLE | PeerAddrFlags::SACKDELAY_DISABLE),
            ..params()
        };
        assert!(matches!(
            p.encode(caps),
            Err(SctpError::InvalidField { field: "flags", .. })
        ));
    }

    #[test]
    fn wildcard_address_decodes_to_none() {
        let p = PeerAddrParams {
            address: None,
            ..params()
        };
        let raw = p.encode(Capabilities::all()).unwrap();
        assert_eq!(PeerAddrParams::decode(&raw, Capabilities::all()).address, None);
    }

    #[test]
    fn unknown_states_pass_through() {
        assert_eq!(AssocState::from(SCTP_ESTABLISHED), AssocState::Established);
        assert_eq!(AssocState::from(42), AssocState::Other(42));
        assert_eq!(i32::from(AssocState::Other(42)), 42);
        assert_eq!(i32::from(AssocState::ShutdownAckSent), 8);
        assert_eq!(PathState::from(SCTP_PF), PathState::PotentiallyFailed);
    }

    #[test]
    fn status_decodes_primary_path() {
        let mut raw: SctpStatus = linux::zeroed();
        raw.assoc_id = 7;
        raw.state = SCTP_ESTABLISHED;
        raw.outstrms = 10;
        let mut primary: SctpPaddrInfo = linux::zeroed();
        primary.address = to_storage(&"[::1]:9".parse().unwrap());
        primary.state = SCTP_ACTIVE;
        primary.mtu = 1500;
        raw.primary = primary;

        let status = Status::from(&raw);
        assert_eq!(status.state, AssocState::Established);
        assert_eq!(status.outstrms, 10);
        assert_eq!(status.primary.address, Some("[::1]:9".parse().unwrap()));
        assert_eq!(status.primary.state, PathState::Active);
        assert_eq!(status.primary.mtu, 1500);

        raw.primary = linux::zeroed();
        assert_eq!(Status::from(&raw).primary.address, None);
    }

    #[test]
    fn event_subscription_maps_field_by_field() {
        let e = EventSubscription {
            shutdown: true,
            ..Default::default()
        };
        let raw = SctpEventSubscribe::from(&e);
        assert_eq!(raw.shutdown_event, 1);
        assert_eq!(raw.data_io_event, 0);
        assert_eq!(raw.sender_dry_event, 0);
        assert_eq!(EventSubscription::from(&raw), e);
    }
}
