//! Linux uapi layouts and the raw calls behind the lksctp API.
//!
//! `libsctp` implements `sctp_bindx`, `sctp_connectx`, `sctp_peeloff`,
//! `sctp_getpaddrs`, `sctp_sendmsg` and `sctp_recvmsg` as thin wrappers around
//! socket options and `sendmsg`/`recvmsg`. They are issued directly here so
//! nothing has to link against the library.
#![allow(unused)]

use libc::{c_int, c_void, socklen_t};
use std::io;
use std::mem::{self, size_of};
use std::os::unix::io::RawFd;
use std::ptr;

use super::common::*;

pub const SCTP_RTOINFO: c_int = 0;
pub const SCTP_ASSOCINFO: c_int = 1;
pub const SCTP_INITMSG: c_int = 2;
pub const SCTP_NODELAY: c_int = 3;
pub const SCTP_AUTOCLOSE: c_int = 4;
pub const SCTP_SET_PEER_PRIMARY_ADDR: c_int = 5;
pub const SCTP_PRIMARY_ADDR: c_int = 6;
pub const SCTP_ADAPTATION_LAYER: c_int = 7;
pub const SCTP_DISABLE_FRAGMENTS: c_int = 8;
pub const SCTP_PEER_ADDR_PARAMS: c_int = 9;
pub const SCTP_DEFAULT_SEND_PARAM: c_int = 10;
pub const SCTP_EVENTS: c_int = 11;
pub const SCTP_I_WANT_MAPPED_V4_ADDR: c_int = 12;
pub const SCTP_MAXSEG: c_int = 13;
pub const SCTP_STATUS: c_int = 14;
pub const SCTP_GET_PEER_ADDR_INFO: c_int = 15;

pub const SCTP_SOCKOPT_BINDX_ADD: c_int = 100;
pub const SCTP_SOCKOPT_BINDX_REM: c_int = 101;
pub const SCTP_SOCKOPT_PEELOFF: c_int = 102;
pub const SCTP_GET_PEER_ADDRS: c_int = 108;
pub const SCTP_GET_LOCAL_ADDRS: c_int = 109;
pub const SCTP_SOCKOPT_CONNECTX: c_int = 110;
pub const SCTP_SOCKOPT_CONNECTX3: c_int = 111;

/// `struct sctp_initmsg`
#[derive(Debug, Copy, Clone, Default)]
#[repr(C)]
pub struct SctpInitMsg {
    pub num_ostreams: u16,
    pub max_instreams: u16,
    pub max_attempts: u16,
    pub max_init_timeo: u16,
}

/// `struct sctp_rtoinfo`
#[derive(Debug, Copy, Clone, Default)]
#[repr(C)]
pub struct SctpRtoInfo {
    pub assoc_id: sctp_assoc_t,
    pub initial: u32,
    pub max: u32,
    pub min: u32,
}

/// `struct sctp_assocparams`
#[derive(Debug, Copy, Clone, Default)]
#[repr(C)]
pub struct SctpAssocParams {
    pub assoc_id: sctp_assoc_t,
    pub asocmaxrxt: u16,
    pub number_peer_destinations: u16,
    pub peer_rwnd: u32,
    pub local_rwnd: u32,
    pub cookie_life: u32,
}

/// `struct sctp_paddrparams`, declared `packed, aligned(4)` by the kernel.
/// `spp_pathmtu` sits at an unaligned offset, hence `packed` plus explicit
/// tail padding.
#[derive(Copy, Clone)]
#[repr(C, packed)]
pub struct SctpPaddrParams {
    pub assoc_id: sctp_assoc_t,
    pub address: libc::sockaddr_storage,
    pub hbinterval: u32,
    pub pathmaxrxt: u16,
    pub pathmtu: u32,
    pub sackdelay: u32,
    pub flags: u32,
    pub ipv6_flowlabel: u32,
    pub dscp: u8,
    _pad: u8,
}

/// `struct sctp_paddrinfo`, `packed, aligned(4)`
#[derive(Copy, Clone)]
#[repr(C, packed(4))]
pub struct SctpPaddrInfo {
    pub assoc_id: sctp_assoc_t,
    pub address: libc::sockaddr_storage,
    pub state: i32,
    pub cwnd: u32,
    pub srtt: u32,
    pub rto: u32,
    pub mtu: u32,
}

/// `struct sctp_status`
#[derive(Copy, Clone)]
#[repr(C)]
pub struct SctpStatus {
    pub assoc_id: sctp_assoc_t,
    pub state: i32,
    pub rwnd: u32,
    pub unackdata: u16,
    pub penddata: u16,
    pub instrms: u16,
    pub outstrms: u16,
    pub fragmentation_point: u32,
    pub primary: SctpPaddrInfo,
}

/// `struct sctp_event_subscribe`
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
#[repr(C)]
pub struct SctpEventSubscribe {
    pub data_io_event: u8,
    pub association_event: u8,
    pub address_event: u8,
    pub send_failure_event: u8,
    pub peer_error_event: u8,
    pub shutdown_event: u8,
    pub partial_delivery_event: u8,
    pub adaptation_layer_event: u8,
    pub authentication_event: u8,
    pub sender_dry_event: u8,
    pub stream_reset_event: u8,
    pub assoc_reset_event: u8,
    pub stream_change_event: u8,
    pub send_failure_event_event: u8,
}

/// `struct sctp_assoc_value`
#[derive(Debug, Copy, Clone, Default)]
#[repr(C)]
pub struct SctpAssocValue {
    pub assoc_id: sctp_assoc_t,
    pub assoc_value: u32,
}

/// `struct sctp_setadaptation`
#[derive(Debug, Copy, Clone, Default)]
#[repr(C)]
pub struct SctpSetAdaptation {
    pub adaptation_ind: u32,
}

/// `struct sctp_prim` and `struct sctp_setpeerprim` share this layout
#[derive(Copy, Clone)]
#[repr(C, packed(4))]
pub struct SctpPrim {
    pub assoc_id: sctp_assoc_t,
    pub addr: libc::sockaddr_storage,
}

/// `sctp_peeloff_arg_t`
#[derive(Debug, Copy, Clone, Default)]
#[repr(C)]
pub struct SctpPeeloffArg {
    pub assoc_id: sctp_assoc_t,
    pub sd: c_int,
}

/// `struct sctp_getaddrs`, followed in memory by `addr_num` packed addresses
#[derive(Debug, Copy, Clone, Default)]
#[repr(C)]
pub struct SctpGetAddrs {
    pub assoc_id: sctp_assoc_t,
    pub addr_num: u32,
}

/// `struct sctp_getaddrs_old`, the argument of `SCTP_SOCKOPT_CONNECTX3`.
/// `addr_num` is the size of the packed list in bytes.
#[derive(Debug, Copy, Clone)]
#[repr(C)]
pub struct SctpGetAddrsOld {
    pub assoc_id: sctp_assoc_t,
    pub addr_num: c_int,
    pub addrs: *mut libc::sockaddr,
}

/// `struct sctp_assoc_change`
#[derive(Debug, Copy, Clone, Default)]
#[repr(C)]
pub struct SctpAssocChange {
    pub header: SctpSnHeader,
    pub state: u16,
    pub error: u16,
    pub outbound_streams: u16,
    pub inbound_streams: u16,
    pub assoc_id: sctp_assoc_t,
}

/// `struct sctp_paddr_change`, `packed, aligned(4)`
#[derive(Copy, Clone)]
#[repr(C, packed(4))]
pub struct SctpPaddrChange {
    pub header: SctpSnHeader,
    pub addr: libc::sockaddr_storage,
    pub state: c_int,
    pub error: c_int,
    pub assoc_id: sctp_assoc_t,
}

/// `struct sctp_send_failed`, followed by the undelivered data
#[derive(Debug, Copy, Clone, Default)]
#[repr(C)]
pub struct SctpSendFailed {
    pub header: SctpSnHeader,
    pub error: u32,
    pub info: SctpSndRcvInfo,
    pub assoc_id: sctp_assoc_t,
}

/// `struct sctp_remote_error`, followed by the ERROR chunk body
#[derive(Debug, Copy, Clone, Default)]
#[repr(C)]
pub struct SctpRemoteError {
    pub header: SctpSnHeader,
    pub error: u16,
    pub assoc_id: sctp_assoc_t,
}

/// `struct sctp_shutdown_event`
#[derive(Debug, Copy, Clone, Default)]
#[repr(C)]
pub struct SctpShutdownEvent {
    pub header: SctpSnHeader,
    pub assoc_id: sctp_assoc_t,
}

/// `struct sctp_pdapi_event` (the leading part common to every kernel)
#[derive(Debug, Copy, Clone, Default)]
#[repr(C)]
pub struct SctpPdapiEvent {
    pub header: SctpSnHeader,
    pub indication: u32,
    pub assoc_id: sctp_assoc_t,
}

/// `struct sctp_adaptation_event`
#[derive(Debug, Copy, Clone, Default)]
#[repr(C)]
pub struct SctpAdaptationEvent {
    pub header: SctpSnHeader,
    pub adaptation_ind: u32,
    pub assoc_id: sctp_assoc_t,
}

/// An all-zero value of a kernel structure.
///
/// Every type in this module is plain old data for which all-zero bytes is a
/// valid value.
pub(crate) fn zeroed<T: Copy>() -> T {
    unsafe { mem::zeroed() }
}

/// Copies at most `size_of::<T>()` bytes of `buf` into a zeroed `T`.
///
/// # Safety
///
/// `T` must be plain old data valid for any byte pattern.
pub(crate) unsafe fn read_prefix<T: Copy>(buf: &[u8]) -> T {
    let mut value: T = mem::zeroed();
    let n = buf.len().min(size_of::<T>());
    ptr::copy_nonoverlapping(buf.as_ptr(), &mut value as *mut T as *mut u8, n);
    value
}

/// Caller must ensure `T` is the correct type for `opt` and `val`.
pub(crate) unsafe fn setsockopt<T>(
    fd: RawFd,
    opt: c_int,
    val: c_int,
    payload: &T,
) -> io::Result<()> {
    let payload = payload as *const T as *const c_void;
    match libc::setsockopt(fd, opt, val, payload, size_of::<T>() as socklen_t) {
        -1 => Err(io::Error::last_os_error()),
        _ => Ok(()),
    }
}

/// Caller must ensure `T` is the correct type for `opt` and `val`.
///
/// `payload` is passed in both directions: the caller fills in the query key
/// (association id, address) of an otherwise zeroed structure and gets the
/// kernel's answer back.
pub(crate) unsafe fn getsockopt<T>(
    fd: RawFd,
    opt: c_int,
    val: c_int,
    mut payload: T,
) -> io::Result<T> {
    let mut len = size_of::<T>() as socklen_t;
    match libc::getsockopt(
        fd,
        opt,
        val,
        &mut payload as *mut T as *mut c_void,
        &mut len,
    ) {
        -1 => Err(io::Error::last_os_error()),
        _ => Ok(payload),
    }
}

/// `sctp_bindx(3)` over `SCTP_SOCKOPT_BINDX_ADD`/`_REM`
pub(crate) fn bindx(fd: RawFd, packed: &[u8], flags: c_int) -> io::Result<()> {
    let opt = match flags {
        SCTP_BINDX_ADD_ADDR => SCTP_SOCKOPT_BINDX_ADD,
        SCTP_BINDX_REM_ADDR => SCTP_SOCKOPT_BINDX_REM,
        _ => return Err(io::Error::from_raw_os_error(libc::EINVAL)),
    };
    let res = unsafe {
        libc::setsockopt(
            fd,
            SOL_SCTP,
            opt,
            packed.as_ptr() as *const c_void,
            packed.len() as socklen_t,
        )
    };
    match res {
        -1 => Err(io::Error::last_os_error()),
        _ => Ok(()),
    }
}

/// Outcome of [`connectx`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct Connecting {
    pub assoc_id: sctp_assoc_t,
    /// The socket is non-blocking and the handshake is still running.
    pub in_progress: bool,
}

/// `sctp_connectx(3)`.
///
/// Goes through `SCTP_SOCKOPT_CONNECTX3`, which reports the association id
/// even when a non-blocking connect returns `EINPROGRESS`, and falls back to
/// `SCTP_SOCKOPT_CONNECTX` on kernels without it.
pub(crate) fn connectx(fd: RawFd, packed: &[u8]) -> io::Result<Connecting> {
    let mut arg = SctpGetAddrsOld {
        assoc_id: 0,
        addr_num: packed.len() as c_int,
        addrs: packed.as_ptr() as *mut libc::sockaddr,
    };
    let mut len = size_of::<SctpGetAddrsOld>() as socklen_t;
    let res = unsafe {
        libc::getsockopt(
            fd,
            SOL_SCTP,
            SCTP_SOCKOPT_CONNECTX3,
            &mut arg as *mut SctpGetAddrsOld as *mut c_void,
            &mut len,
        )
    };
    if res == 0 {
        return Ok(Connecting {
            assoc_id: arg.assoc_id,
            in_progress: false,
        });
    }
    let err = io::Error::last_os_error();
    match err.raw_os_error() {
        Some(libc::EINPROGRESS) => Ok(Connecting {
            assoc_id: arg.assoc_id,
            in_progress: true,
        }),
        Some(libc::ENOPROTOOPT) => {
            // The return value of this option is the association id.
            let res = unsafe {
                libc::setsockopt(
                    fd,
                    SOL_SCTP,
                    SCTP_SOCKOPT_CONNECTX,
                    packed.as_ptr() as *const c_void,
                    packed.len() as socklen_t,
                )
            };
            match res {
                -1 => {
                    let err = io::Error::last_os_error();
                    match err.raw_os_error() {
                        // the id is lost here; callers look it up once connected
                        Some(libc::EINPROGRESS) => Ok(Connecting {
                            assoc_id: 0,
                            in_progress: true,
                        }),
                        _ => Err(err),
                    }
                }
                id => Ok(Connecting {
                    assoc_id: id,
                    in_progress: false,
                }),
            }
        }
        _ => Err(err),
    }
}

/// `sctp_peeloff(3)`
pub(crate) fn peeloff(fd: RawFd, assoc_id: sctp_assoc_t) -> io::Result<RawFd> {
    let arg = SctpPeeloffArg { assoc_id, sd: -1 };
    let arg = unsafe { getsockopt(fd, SOL_SCTP, SCTP_SOCKOPT_PEELOFF, arg)? };
    Ok(arg.sd)
}

const GETADDRS_INITIAL: usize = 4096;
const GETADDRS_LIMIT: usize = 1 << 20;

/// `sctp_getpaddrs(3)`/`sctp_getladdrs(3)`.
///
/// Returns the address count announced by the kernel and the packed address
/// bytes. The buffer starts at 4 KiB and doubles while the kernel reports
/// `ENOMEM`.
pub(crate) fn getaddrs(fd: RawFd, opt: c_int, assoc_id: sctp_assoc_t) -> io::Result<(usize, Vec<u8>)> {
    let header = size_of::<SctpGetAddrs>();
    let mut size = GETADDRS_INITIAL;
    loop {
        let mut buf = vec![0u8; size];
        let query = SctpGetAddrs {
            assoc_id,
            addr_num: 0,
        };
        unsafe { ptr::write_unaligned(buf.as_mut_ptr() as *mut SctpGetAddrs, query) };

        let mut len = size as socklen_t;
        let res = unsafe {
            libc::getsockopt(
                fd,
                SOL_SCTP,
                opt,
                buf.as_mut_ptr() as *mut c_void,
                &mut len,
            )
        };
        if res == -1 {
            let err = io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::ENOMEM) && size < GETADDRS_LIMIT {
                size *= 2;
                continue;
            }
            return Err(err);
        }

        let reply: SctpGetAddrs = unsafe { ptr::read_unaligned(buf.as_ptr() as *const SctpGetAddrs) };
        let end = (len as usize).clamp(header, size);
        buf.truncate(end);
        buf.drain(..header);
        return Ok((reply.addr_num as usize, buf));
    }
}

/// Result of a raw `recvmsg(2)` on an SCTP socket
pub(crate) struct RawRecv {
    pub len: usize,
    pub from: libc::sockaddr_storage,
    pub from_len: socklen_t,
    pub info: SctpSndRcvInfo,
    pub flags: c_int,
}

fn cmsg_space() -> usize {
    unsafe { libc::CMSG_SPACE(size_of::<SctpSndRcvInfo>() as u32) as usize }
}

/// `sctp_sendmsg(3)`: `sendmsg(2)` with an `SCTP_SNDRCV` control message.
///
/// `to` is the raw destination record; `None` sends a null `msg_name`.
pub(crate) fn sendmsg(
    fd: RawFd,
    msg: &[u8],
    to: Option<(*const libc::sockaddr, socklen_t)>,
    info: &SctpSndRcvInfo,
) -> io::Result<usize> {
    let mut iov = libc::iovec {
        iov_base: msg.as_ptr() as *mut c_void,
        iov_len: msg.len(),
    };
    // u64 words keep the control buffer aligned for cmsghdr
    let space = cmsg_space();
    let mut control = vec![0u64; (space + 7) / 8];

    let mut hdr: libc::msghdr = zeroed();
    if let Some((name, namelen)) = to {
        hdr.msg_name = name as *mut c_void;
        hdr.msg_namelen = namelen;
    }
    hdr.msg_iov = &mut iov;
    hdr.msg_iovlen = 1;
    hdr.msg_control = control.as_mut_ptr() as *mut c_void;
    hdr.msg_controllen = space as _;

    unsafe {
        let cmsg = libc::CMSG_FIRSTHDR(&hdr);
        if cmsg.is_null() {
            return Err(io::Error::from_raw_os_error(libc::EINVAL));
        }
        (*cmsg).cmsg_level = IPPROTO_SCTP;
        (*cmsg).cmsg_type = SCTP_SNDRCV;
        (*cmsg).cmsg_len = libc::CMSG_LEN(size_of::<SctpSndRcvInfo>() as u32) as _;
        ptr::write_unaligned(libc::CMSG_DATA(cmsg) as *mut SctpSndRcvInfo, *info);

        match libc::sendmsg(fd, &hdr, 0) {
            n if n >= 0 => Ok(n as usize),
            _ => Err(io::Error::last_os_error()),
        }
    }
}

/// `sctp_recvmsg(3)`: `recvmsg(2)` collecting the `SCTP_SNDRCV` control message.
pub(crate) fn recvmsg(fd: RawFd, buf: &mut [u8]) -> io::Result<RawRecv> {
    let mut iov = libc::iovec {
        iov_base: buf.as_mut_ptr() as *mut c_void,
        iov_len: buf.len(),
    };
    let space = cmsg_space();
    let mut control = vec![0u64; (space + 7) / 8];
    let mut from: libc::sockaddr_storage = zeroed();

    let mut hdr: libc::msghdr = zeroed();
    hdr.msg_name = &mut from as *mut libc::sockaddr_storage as *mut c_void;
    hdr.msg_namelen = size_of::<libc::sockaddr_storage>() as socklen_t;
    hdr.msg_iov = &mut iov;
    hdr.msg_iovlen = 1;
    hdr.msg_control = control.as_mut_ptr() as *mut c_void;
    hdr.msg_controllen = (control.len() * 8) as _;

    let n = unsafe { libc::recvmsg(fd, &mut hdr, 0) };
    if n < 0 {
        return Err(io::Error::last_os_error());
    }

    let mut info = SctpSndRcvInfo::default();
    unsafe {
        let mut cmsg = libc::CMSG_FIRSTHDR(&hdr);
        while !cmsg.is_null() {
            if (*cmsg).cmsg_level == IPPROTO_SCTP && (*cmsg).cmsg_type == SCTP_SNDRCV {
                info = ptr::read_unaligned(libc::CMSG_DATA(cmsg) as *const SctpSndRcvInfo);
            }
            cmsg = libc::CMSG_NXTHDR(&hdr, cmsg);
        }
    }

    Ok(RawRecv {
        len: n as usize,
        from,
        from_len: hdr.msg_namelen,
        info,
        flags: hdr.msg_flags,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{align_of, size_of};

    #[test]
    fn option_layouts_match_uapi() {
        assert_eq!(size_of::<SctpInitMsg>(), 8);
        assert_eq!(size_of::<SctpRtoInfo>(), 16);
        assert_eq!(size_of::<SctpAssocParams>(), 20);
        assert_eq!(size_of::<SctpPaddrParams>(), 156);
        assert_eq!(size_of::<SctpPaddrInfo>(), 152);
        assert_eq!(align_of::<SctpPaddrInfo>(), 4);
        assert_eq!(size_of::<SctpStatus>(), 176);
        assert_eq!(size_of::<SctpEventSubscribe>(), 14);
        assert_eq!(size_of::<SctpPrim>(), 132);
        assert_eq!(size_of::<SctpAssocValue>(), 8);
        assert_eq!(size_of::<SctpPeeloffArg>(), 8);
        assert_eq!(size_of::<SctpGetAddrs>(), 8);
        #[cfg(target_pointer_width = "64")]
        assert_eq!(size_of::<SctpGetAddrsOld>(), 16);
        assert_eq!(size_of::<SctpSndRcvInfo>(), 32);
    }

    #[test]
    fn notification_layouts_match_uapi() {
        assert_eq!(size_of::<SctpSnHeader>(), 8);
        assert_eq!(size_of::<SctpAssocChange>(), 20);
        assert_eq!(size_of::<SctpPaddrChange>(), 148);
        assert_eq!(size_of::<SctpSendFailed>(), 48);
        assert_eq!(size_of::<SctpRemoteError>(), 16);
        assert_eq!(size_of::<SctpShutdownEvent>(), 12);
        assert_eq!(size_of::<SctpPdapiEvent>(), 16);
        assert_eq!(size_of::<SctpAdaptationEvent>(), 16);
    }

    #[test]
    fn read_prefix_zero_fills_short_input() {
        let bytes = [0x01u8, 0x80, 0x02, 0x00];
        let header: SctpSnHeader = unsafe { read_prefix(&bytes) };
        assert_eq!(header.sn_type, u16::from_ne_bytes([0x01, 0x80]));
        assert_eq!(header.sn_flags, u16::from_ne_bytes([0x02, 0x00]));
        assert_eq!(header.sn_length, 0);
    }
}
