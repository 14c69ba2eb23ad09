#![allow(unused)]

use libc::c_int;

pub const SOL_SCTP: c_int = 132;
pub const IPPROTO_SCTP: c_int = libc::IPPROTO_SCTP;
pub const SOCK_SEQPACKET: c_int = 5;
pub const SOCK_STREAM: c_int = 1;

/// Ancillary data type carrying an `sctp_initmsg`
pub const SCTP_INIT: c_int = 0;
/// Ancillary data type carrying an `sctp_sndrcvinfo`
pub const SCTP_SNDRCV: c_int = 1;

/// `recvmsg` flag marking the buffer as a notification rather than data
pub const MSG_NOTIFICATION: c_int = 0x8000;
/// `sinfo_flags` value used to gracefully shut an association down
pub const MSG_FIN: c_int = 0x200;

#[allow(non_camel_case_types)]
pub type sctp_assoc_t = i32;

/// The sctp_sndrcvinfo type
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
#[repr(C)]
pub struct SctpSndRcvInfo {
    /// Stream sending to
    pub stream: u16,
    /// Valid for recv only
    pub ssn: u16,
    /// Flags to control sending
    pub flags: u16,
    /// ppid field
    pub ppid: u32,
    /// context field
    pub context: u32,
    /// timetolive for PR-SCTP
    pub timetolive: u32,
    /// valid for recv only
    pub tsn: u32,
    /// valid for recv only
    pub cumtsn: u32,
    /// The association id
    pub assoc_id: sctp_assoc_t,
}

/// Common header of every notification
#[derive(Debug, Copy, Clone, Default)]
#[repr(C)]
pub struct SctpSnHeader {
    pub sn_type: u16,
    pub sn_flags: u16,
    pub sn_length: u32,
}

pub const SCTP_SN_TYPE_BASE: u16 = 1 << 15;
pub const SCTP_DATA_IO_EVENT: u16 = SCTP_SN_TYPE_BASE;
pub const SCTP_ASSOC_CHANGE: u16 = SCTP_SN_TYPE_BASE + 1;
pub const SCTP_PEER_ADDR_CHANGE: u16 = SCTP_SN_TYPE_BASE + 2;
pub const SCTP_SEND_FAILED: u16 = SCTP_SN_TYPE_BASE + 3;
pub const SCTP_REMOTE_ERROR: u16 = SCTP_SN_TYPE_BASE + 4;
pub const SCTP_SHUTDOWN_EVENT: u16 = SCTP_SN_TYPE_BASE + 5;
pub const SCTP_PARTIAL_DELIVERY_EVENT: u16 = SCTP_SN_TYPE_BASE + 6;
pub const SCTP_ADAPTATION_INDICATION: u16 = SCTP_SN_TYPE_BASE + 7;

// sac_state
pub const SCTP_COMM_UP: u16 = 0;
pub const SCTP_COMM_LOST: u16 = 1;
pub const SCTP_RESTART: u16 = 2;
pub const SCTP_SHUTDOWN_COMP: u16 = 3;
pub const SCTP_CANT_STR_ASSOC: u16 = 4;

// spc_state
pub const SCTP_ADDR_AVAILABLE: c_int = 0;
pub const SCTP_ADDR_UNREACHABLE: c_int = 1;
pub const SCTP_ADDR_REMOVED: c_int = 2;
pub const SCTP_ADDR_ADDED: c_int = 3;
pub const SCTP_ADDR_MADE_PRIM: c_int = 4;
pub const SCTP_ADDR_CONFIRMED: c_int = 5;

// ssf_flags
pub const SCTP_DATA_UNSENT: u16 = 0;
pub const SCTP_DATA_SENT: u16 = 1;

// pdapi_indication
pub const SCTP_PARTIAL_DELIVERY_ABORTED: u32 = 0;

// spinfo_state
pub const SCTP_INACTIVE: c_int = 0;
pub const SCTP_PF: c_int = 1;
pub const SCTP_ACTIVE: c_int = 2;
pub const SCTP_UNCONFIRMED: c_int = 3;

// sstat_state
pub const SCTP_EMPTY: c_int = 0;
pub const SCTP_CLOSED: c_int = 1;
pub const SCTP_COOKIE_WAIT: c_int = 2;
pub const SCTP_COOKIE_ECHOED: c_int = 3;
pub const SCTP_ESTABLISHED: c_int = 4;
pub const SCTP_SHUTDOWN_PENDING: c_int = 5;
pub const SCTP_SHUTDOWN_SENT: c_int = 6;
pub const SCTP_SHUTDOWN_RECEIVED: c_int = 7;
pub const SCTP_SHUTDOWN_ACK_SENT: c_int = 8;

// sinfo_flags
pub const SCTP_UNORDERED: u16 = 1;
pub const SCTP_ADDR_OVER: u16 = 2;
pub const SCTP_ABORT: u16 = 4;
pub const SCTP_SACK_IMMEDIATELY: u16 = 8;
pub const SCTP_SENDALL: u16 = 64;
pub const SCTP_EOF: u16 = MSG_FIN as u16;

// spp_flags
pub const SPP_HB_ENABLE: u32 = 1 << 0;
pub const SPP_HB_DISABLE: u32 = 1 << 1;
pub const SPP_HB_DEMAND: u32 = 1 << 2;
pub const SPP_PMTUD_ENABLE: u32 = 1 << 3;
pub const SPP_PMTUD_DISABLE: u32 = 1 << 4;
pub const SPP_SACKDELAY_ENABLE: u32 = 1 << 5;
pub const SPP_SACKDELAY_DISABLE: u32 = 1 << 6;
pub const SPP_HB_TIME_IS_ZERO: u32 = 1 << 7;

// Error causes reported in sac_error / spc_error
pub const SCTP_FAILED_THRESHOLD: c_int = 0x0004;
pub const SCTP_RECEIVED_SACK: c_int = 0x0040;
pub const SCTP_HEARTBEAT_SUCCESS: c_int = 0x0008;
pub const SCTP_RESPONSE_TO_USER_REQ: c_int = 0x000f;
pub const SCTP_INTERNAL_ERROR: c_int = 0x0010;
pub const SCTP_SHUTDOWN_GUARD_EXPIRES: c_int = 0x0020;
pub const SCTP_PEER_FAULTY: c_int = 0x0080;

pub const SCTP_BINDX_ADD_ADDR: c_int = 0x01;
pub const SCTP_BINDX_REM_ADDR: c_int = 0x02;
