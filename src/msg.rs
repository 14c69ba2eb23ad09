//! Message send/receive with per-message SCTP parameters.

use bitflags::bitflags;
use bytes::Bytes;
use socket2::SockAddr;
use std::net::SocketAddr;
use std::os::fd::{AsRawFd, BorrowedFd};
use tracing::trace;

use crate::addr::encode_address;
use crate::error::{Result, SctpError};
use crate::notification::{decode_notification, Notification};
use crate::sys::common::*;
use crate::sys::linux;

bitflags! {
    /// `sinfo_flags` of a send
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SendFlags: u16 {
        /// Deliver the message without ordering it within the stream.
        const UNORDERED = SCTP_UNORDERED;
        /// Send to the given address instead of the primary path.
        const ADDR_OVER = SCTP_ADDR_OVER;
        /// Abort the association, sending the payload as the ABORT cause.
        const ABORT = SCTP_ABORT;
        /// Acknowledge the message without delay.
        const SACK_IMMEDIATELY = SCTP_SACK_IMMEDIATELY;
        /// Send to every association of a one-to-many socket.
        const SENDALL = SCTP_SENDALL;
        /// Gracefully shut the association down once queued data is sent.
        const EOF = SCTP_EOF;
    }
}

bitflags! {
    /// Flags returned from recvmsg()
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RecvFlags: i32 {
        /// The buffer holds the end of a message.
        const EOR = libc::MSG_EOR;
        /// The buffer was too small and the message was cut.
        const TRUNC = libc::MSG_TRUNC;
        const CTRUNC = libc::MSG_CTRUNC;
        /// <https://github.com/torvalds/linux/blob/e2b542100719a93f8cdf6d90185410d38a57a4c1/include/uapi/linux/sctp.h#L181>
        const NOTIFICATION = MSG_NOTIFICATION;
    }
}

/// `sctp_sndrcvinfo` as seen by the application.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct SndRcvInfo {
    /// The stream the message arrived on.
    pub stream: u16,

    /// The stream sequence number the peer placed in the DATA chunk. The
    /// same for every part of a fragmented message.
    pub ssn: u16,

    /// `SCTP_UNORDERED` when the message was sent unordered.
    pub flags: u16,

    /// Payload protocol identifier, passed through untouched. No byte order
    /// conversion happens in either direction.
    pub ppid: u32,

    pub context: u32,

    pub timetolive: u32,

    /// Transmission Sequence Number of one of the DATA chunks of the message.
    pub tsn: u32,

    /// The current cumulative TSN as known by the stack.
    pub cumtsn: u32,

    pub assoc_id: sctp_assoc_t,
}

impl From<SctpSndRcvInfo> for SndRcvInfo {
    fn from(v: SctpSndRcvInfo) -> Self {
        SndRcvInfo {
            stream: v.stream,
            ssn: v.ssn,
            flags: v.flags,
            ppid: v.ppid,
            context: v.context,
            timetolive: v.timetolive,
            tsn: v.tsn,
            cumtsn: v.cumtsn,
            assoc_id: v.assoc_id,
        }
    }
}

/// Parameters for sctp_sendmsg(3)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendOptions {
    /// an opaque unsigned value that is passed to the remote end along with the message
    pub ppid: u32,
    pub flags: SendFlags,
    /// identifies the stream number that the application wishes to send this message to
    pub stream: u16,
    /// specifies the time duration in milliseconds. The sending side will expire the message if the message has not been sent to the peer within this time period. A value of 0 indicates that no timeout should occur on this message
    pub ttl: u32,
    /// Returned in a send failure notification if the message is not delivered.
    pub context: u32,
    /// Association to send on when no destination address is given on a
    /// one-to-many socket.
    pub assoc_id: sctp_assoc_t,
}

impl SendOptions {
    fn to_raw(self) -> SctpSndRcvInfo {
        SctpSndRcvInfo {
            stream: self.stream,
            flags: self.flags.bits(),
            ppid: self.ppid,
            context: self.context,
            timetolive: self.ttl,
            assoc_id: self.assoc_id,
            ..Default::default()
        }
    }
}

/// What a receive produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecvContent {
    Data { payload: Bytes, info: SndRcvInfo },
    Notification(Notification),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessage {
    /// Source address, if the kernel reported one this crate can decode.
    pub from: Option<SocketAddr>,
    pub flags: RecvFlags,
    pub content: RecvContent,
}

impl ReceivedMessage {
    pub fn is_notification(&self) -> bool {
        matches!(self.content, RecvContent::Notification(_))
    }
}

/// Destination for [`send_msg`] from a textual host; an empty host means
/// none, so the association's primary path is used.
pub fn destination(host: &str, port: u16) -> Result<Option<SockAddr>> {
    if host.is_empty() {
        return Ok(None);
    }
    encode_address(host, port).map(Some)
}

/// Sends one message.
///
/// An empty `payload` is only accepted together with [`SendFlags::EOF`] and
/// is otherwise rejected before the system call. Returns the number of bytes
/// sent, which is the whole payload as SCTP sends are atomic.
pub fn send_msg(
    fd: BorrowedFd<'_>,
    payload: &[u8],
    to: Option<&SockAddr>,
    opts: &SendOptions,
) -> Result<usize> {
    if payload.is_empty() && !opts.flags.contains(SendFlags::EOF) {
        return Err(SctpError::EmptyMessage);
    }
    trace!(
        "sendmsg {} bytes on stream {} fd {}",
        payload.len(),
        opts.stream,
        fd.as_raw_fd()
    );
    let to = to.map(|a| (a.as_ptr(), a.len()));
    let n = linux::sendmsg(fd.as_raw_fd(), payload, to, &opts.to_raw())
        .map_err(SctpError::syscall("sctp_sendmsg"))?;
    debug_assert!(n == payload.len());
    Ok(n)
}

/// Receives one message or notification of at most `max_len` bytes.
pub fn recv_msg(fd: BorrowedFd<'_>, max_len: usize) -> Result<ReceivedMessage> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(max_len)
        .map_err(|_| SctpError::AllocationFailed(max_len))?;
    buf.resize(max_len, 0);

    let raw = linux::recvmsg(fd.as_raw_fd(), &mut buf).map_err(SctpError::syscall("sctp_recvmsg"))?;
    buf.truncate(raw.len);
    trace!("recvmsg {} bytes flags {:#x} fd {}", raw.len, raw.flags, fd.as_raw_fd());

    let from = if raw.from_len > 0 {
        // SAFETY: the kernel wrote a record of `from_len` bytes into the
        // zeroed storage.
        unsafe { SockAddr::new(raw.from, raw.from_len) }.as_socket()
    } else {
        None
    };
    let flags = RecvFlags::from_bits_retain(raw.flags);
    let content = if flags.contains(RecvFlags::NOTIFICATION) {
        RecvContent::Notification(decode_notification(&buf))
    } else {
        RecvContent::Data {
            payload: Bytes::from(buf),
            info: SndRcvInfo::from(raw.info),
        }
    };
    Ok(ReceivedMessage {
        from,
        flags,
        content,
    })
}
