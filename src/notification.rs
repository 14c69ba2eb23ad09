//! Decoding of notifications delivered in place of data when `recvmsg`
//! returns with `MSG_NOTIFICATION` set.

use bytes::Bytes;
use std::mem::size_of;
use std::net::SocketAddr;
use tracing::warn;

use crate::addr::decode_storage;
use crate::msg::SndRcvInfo;
use crate::sys::common::*;
use crate::sys::linux::*;

/// `{sn_type, sn_flags, sn_length}`, shared by every notification.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct NotificationHeader {
    pub kind: u16,
    pub flags: u16,
    pub length: u32,
}

impl From<SctpSnHeader> for NotificationHeader {
    fn from(h: SctpSnHeader) -> Self {
        NotificationHeader {
            kind: h.sn_type,
            flags: h.sn_flags,
            length: h.sn_length,
        }
    }
}

/// `sac_state`
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AssocChangeState {
    CommUp,
    CommLost,
    Restart,
    ShutdownComplete,
    CantStartAssoc,
    Other(u16),
}

impl From<u16> for AssocChangeState {
    fn from(v: u16) -> Self {
        match v {
            SCTP_COMM_UP => AssocChangeState::CommUp,
            SCTP_COMM_LOST => AssocChangeState::CommLost,
            SCTP_RESTART => AssocChangeState::Restart,
            SCTP_SHUTDOWN_COMP => AssocChangeState::ShutdownComplete,
            SCTP_CANT_STR_ASSOC => AssocChangeState::CantStartAssoc,
            other => AssocChangeState::Other(other),
        }
    }
}

/// `spc_state`
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PeerAddrChangeState {
    Available,
    Unreachable,
    Removed,
    Added,
    MadePrimary,
    Confirmed,
    Other(i32),
}

impl From<i32> for PeerAddrChangeState {
    fn from(v: i32) -> Self {
        match v {
            SCTP_ADDR_AVAILABLE => PeerAddrChangeState::Available,
            SCTP_ADDR_UNREACHABLE => PeerAddrChangeState::Unreachable,
            SCTP_ADDR_REMOVED => PeerAddrChangeState::Removed,
            SCTP_ADDR_ADDED => PeerAddrChangeState::Added,
            SCTP_ADDR_MADE_PRIM => PeerAddrChangeState::MadePrimary,
            SCTP_ADDR_CONFIRMED => PeerAddrChangeState::Confirmed,
            other => PeerAddrChangeState::Other(other),
        }
    }
}

/// An association came up, went down or restarted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssocChange {
    pub header: NotificationHeader,
    pub state: AssocChangeState,
    pub error: u16,
    pub outbound_streams: u16,
    pub inbound_streams: u16,
    pub assoc_id: sctp_assoc_t,
}

/// A destination address of a multi-homed peer changed state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerAddrChange {
    pub header: NotificationHeader,
    /// `None` when the address family is not one this crate decodes.
    pub address: Option<SocketAddr>,
    pub state: PeerAddrChangeState,
    pub error: i32,
    pub assoc_id: sctp_assoc_t,
}

/// The part of a send failure that follows the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendFailedBody {
    pub error: u32,
    /// Parameters of the failed send.
    pub info: SndRcvInfo,
    pub assoc_id: sctp_assoc_t,
    /// The undelivered message, or its leading part.
    pub data: Bytes,
}

/// The part of a remote error that follows the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteErrorBody {
    pub error: u16,
    pub assoc_id: sctp_assoc_t,
    /// The ERROR chunk as received from the peer.
    pub data: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    AssocChange(AssocChange),
    PeerAddrChange(PeerAddrChange),
    /// `body` is `None` when the notification is too short to carry its
    /// fixed part.
    SendFailed {
        header: NotificationHeader,
        body: Option<SendFailedBody>,
    },
    /// `body` is `None` when the notification is too short to carry its
    /// fixed part.
    RemoteError {
        header: NotificationHeader,
        body: Option<RemoteErrorBody>,
    },
    /// The peer sent a SHUTDOWN; no more data may be sent.
    Shutdown {
        header: NotificationHeader,
        assoc_id: sctp_assoc_t,
    },
    PartialDelivery {
        header: NotificationHeader,
        indication: u32,
        assoc_id: sctp_assoc_t,
    },
    AdaptationIndication {
        header: NotificationHeader,
        adaptation_ind: u32,
        assoc_id: sctp_assoc_t,
    },
    /// A type this crate does not know about.
    Unknown(NotificationHeader),
}

impl Notification {
    pub fn header(&self) -> &NotificationHeader {
        match self {
            Notification::AssocChange(n) => &n.header,
            Notification::PeerAddrChange(n) => &n.header,
            Notification::SendFailed { header, .. }
            | Notification::RemoteError { header, .. }
            | Notification::Shutdown { header, .. }
            | Notification::PartialDelivery { header, .. }
            | Notification::AdaptationIndication { header, .. }
            | Notification::Unknown(header) => header,
        }
    }

    /// The association the notification is about, when it carries one.
    pub fn assoc_id(&self) -> Option<sctp_assoc_t> {
        match self {
            Notification::AssocChange(n) => Some(n.assoc_id),
            Notification::PeerAddrChange(n) => Some(n.assoc_id),
            Notification::SendFailed { body, .. } => body.as_ref().map(|b| b.assoc_id),
            Notification::RemoteError { body, .. } => body.as_ref().map(|b| b.assoc_id),
            Notification::Shutdown { assoc_id, .. }
            | Notification::PartialDelivery { assoc_id, .. }
            | Notification::AdaptationIndication { assoc_id, .. } => Some(*assoc_id),
            Notification::Unknown(_) => None,
        }
    }
}

/// Reads the fixed part `T` from `buf`, zero-filling whatever is missing.
fn fixed<T: Copy>(buf: &[u8]) -> T {
    if buf.len() < size_of::<T>() {
        warn!(
            "notification truncated: {} of {} bytes",
            buf.len(),
            size_of::<T>()
        );
    }
    // SAFETY: only called with the plain old data notification structures.
    unsafe { read_prefix(buf) }
}

/// Decodes a notification buffer as returned by `recvmsg`.
///
/// Never fails. Missing bytes of a fixed part read as zero, except for the
/// two notifications that carry trailing data, whose body is left out when
/// the buffer cannot hold the fixed part.
pub fn decode_notification(buf: &[u8]) -> Notification {
    let header = NotificationHeader::from(fixed::<SctpSnHeader>(buf));

    match header.kind {
        SCTP_ASSOC_CHANGE => {
            let raw: SctpAssocChange = fixed(buf);
            Notification::AssocChange(AssocChange {
                header,
                state: AssocChangeState::from(raw.state),
                error: raw.error,
                outbound_streams: raw.outbound_streams,
                inbound_streams: raw.inbound_streams,
                assoc_id: raw.assoc_id,
            })
        }
        SCTP_PEER_ADDR_CHANGE => {
            let raw: SctpPaddrChange = fixed(buf);
            let addr = { raw.addr };
            Notification::PeerAddrChange(PeerAddrChange {
                header,
                address: decode_storage(&addr).ok(),
                state: PeerAddrChangeState::from({ raw.state }),
                error: { raw.error },
                assoc_id: { raw.assoc_id },
            })
        }
        SCTP_SEND_FAILED => {
            let body = buf.len().checked_sub(size_of::<SctpSendFailed>()).map(|_| {
                // SAFETY: the buffer holds the full fixed part.
                let raw: SctpSendFailed = unsafe { read_prefix(buf) };
                SendFailedBody {
                    error: raw.error,
                    info: SndRcvInfo::from(raw.info),
                    assoc_id: raw.assoc_id,
                    data: Bytes::copy_from_slice(&buf[size_of::<SctpSendFailed>()..]),
                }
            });
            if body.is_none() {
                warn!("send failure notification of {} bytes has no body", buf.len());
            }
            Notification::SendFailed { header, body }
        }
        SCTP_REMOTE_ERROR => {
            let body = buf.len().checked_sub(size_of::<SctpRemoteError>()).map(|_| {
                // SAFETY: the buffer holds the full fixed part.
                let raw: SctpRemoteError = unsafe { read_prefix(buf) };
                RemoteErrorBody {
                    error: raw.error,
                    assoc_id: raw.assoc_id,
                    data: Bytes::copy_from_slice(&buf[size_of::<SctpRemoteError>()..]),
                }
            });
            if body.is_none() {
                warn!("remote error notification of {} bytes has no body", buf.len());
            }
            Notification::RemoteError { header, body }
        }
        SCTP_SHUTDOWN_EVENT => {
            let raw: SctpShutdownEvent = fixed(buf);
            Notification::Shutdown {
                header,
                assoc_id: raw.assoc_id,
            }
        }
        SCTP_PARTIAL_DELIVERY_EVENT => {
            let raw: SctpPdapiEvent = fixed(buf);
            Notification::PartialDelivery {
                header,
                indication: raw.indication,
                assoc_id: raw.assoc_id,
            }
        }
        SCTP_ADAPTATION_INDICATION => {
            let raw: SctpAdaptationEvent = fixed(buf);
            Notification::AdaptationIndication {
                header,
                adaptation_ind: raw.adaptation_ind,
                assoc_id: raw.assoc_id,
            }
        }
        _ => Notification::Unknown(header),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addr::to_storage;

    fn bytes_of<T: Copy>(value: &T) -> Vec<u8> {
        let ptr = value as *const T as *const u8;
        unsafe { std::slice::from_raw_parts(ptr, size_of::<T>()) }.to_vec()
    }

    fn header(kind: u16, length: usize) -> SctpSnHeader {
        SctpSnHeader {
            sn_type: kind,
            sn_flags: 0,
            sn_length: length as u32,
        }
    }

    #[test]
    fn assoc_change() {
        let raw = SctpAssocChange {
            header: header(SCTP_ASSOC_CHANGE, 20),
            state: SCTP_COMM_UP,
            error: 0,
            outbound_streams: 10,
            inbound_streams: 5,
            assoc_id: 42,
        };
        match decode_notification(&bytes_of(&raw)) {
            Notification::AssocChange(n) => {
                assert_eq!(n.state, AssocChangeState::CommUp);
                assert_eq!(n.outbound_streams, 10);
                assert_eq!(n.inbound_streams, 5);
                assert_eq!(n.assoc_id, 42);
                assert_eq!(n.header.length, 20);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn peer_addr_change() {
        let mut raw: SctpPaddrChange = zeroed();
        raw.header = header(SCTP_PEER_ADDR_CHANGE, size_of::<SctpPaddrChange>());
        raw.addr = to_storage(&"10.0.0.7:2905".parse().unwrap());
        raw.state = SCTP_ADDR_UNREACHABLE;
        raw.error = 0x0004;
        raw.assoc_id = 3;

        let n = decode_notification(&bytes_of(&raw));
        assert_eq!(n.assoc_id(), Some(3));
        match n {
            Notification::PeerAddrChange(n) => {
                assert_eq!(n.address, Some("10.0.0.7:2905".parse().unwrap()));
                assert_eq!(n.state, PeerAddrChangeState::Unreachable);
                assert_eq!(n.error, 4);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn send_failed_carries_undelivered_data() {
        let raw = SctpSendFailed {
            header: header(SCTP_SEND_FAILED, 48 + 5),
            error: 1,
            info: SctpSndRcvInfo {
                stream: 2,
                ppid: 46,
                ..Default::default()
            },
            assoc_id: 9,
        };
        let mut buf = bytes_of(&raw);
        buf.extend_from_slice(b"hello");

        match decode_notification(&buf) {
            Notification::SendFailed { body: Some(body), .. } => {
                assert_eq!(body.error, 1);
                assert_eq!(body.info.stream, 2);
                assert_eq!(body.info.ppid, 46);
                assert_eq!(body.assoc_id, 9);
                assert_eq!(&body.data[..], b"hello");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn truncated_send_failed_has_no_body() {
        let raw = SctpSendFailed {
            header: header(SCTP_SEND_FAILED, 48),
            ..Default::default()
        };
        let buf = bytes_of(&raw);

        match decode_notification(&buf[..30]) {
            Notification::SendFailed { header, body } => {
                assert_eq!(header.kind, SCTP_SEND_FAILED);
                assert!(body.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn remote_error() {
        // zeroed so the padding after `error` is initialised
        let mut raw: SctpRemoteError = zeroed();
        raw.header = header(SCTP_REMOTE_ERROR, 20);
        raw.error = 0x0b;
        raw.assoc_id = 4;
        let mut buf = bytes_of(&raw);
        buf.extend_from_slice(&[0, 0x0b, 0, 4]);

        match decode_notification(&buf) {
            Notification::RemoteError { body: Some(body), .. } => {
                assert_eq!(body.error, 0x0b);
                assert_eq!(body.assoc_id, 4);
                assert_eq!(&body.data[..], &[0, 0x0b, 0, 4]);
            }
            other => panic!("unexpected {:?}", other),
        }

        assert!(matches!(
            decode_notification(&buf[..12]),
            Notification::RemoteError { body: None, .. }
        ));
    }

    #[test]
    fn shutdown_partial_delivery_and_adaptation() {
        let raw = SctpShutdownEvent {
            header: header(SCTP_SHUTDOWN_EVENT, 12),
            assoc_id: 5,
        };
        assert!(matches!(
            decode_notification(&bytes_of(&raw)),
            Notification::Shutdown { assoc_id: 5, .. }
        ));

        let raw = SctpPdapiEvent {
            header: header(SCTP_PARTIAL_DELIVERY_EVENT, 16),
            indication: SCTP_PARTIAL_DELIVERY_ABORTED,
            assoc_id: 6,
        };
        assert!(matches!(
            decode_notification(&bytes_of(&raw)),
            Notification::PartialDelivery {
                indication: 0,
                assoc_id: 6,
                ..
            }
        ));

        let raw = SctpAdaptationEvent {
            header: header(SCTP_ADAPTATION_INDICATION, 16),
            adaptation_ind: 0x1234,
            assoc_id: 7,
        };
        assert!(matches!(
            decode_notification(&bytes_of(&raw)),
            Notification::AdaptationIndication {
                adaptation_ind: 0x1234,
                assoc_id: 7,
                ..
            }
        ));
    }

    #[test]
    fn short_fixed_part_reads_as_zero() {
        let raw = SctpShutdownEvent {
            header: header(SCTP_SHUTDOWN_EVENT, 12),
            assoc_id: 5,
        };
        let buf = bytes_of(&raw);
        assert!(matches!(
            decode_notification(&buf[..8]),
            Notification::Shutdown { assoc_id: 0, .. }
        ));
    }

    #[test]
    fn unknown_type_keeps_header() {
        let buf = bytes_of(&header(SCTP_SN_TYPE_BASE + 0x20, 8));
        let n = decode_notification(&buf);
        assert_eq!(
            n,
            Notification::Unknown(NotificationHeader {
                kind: SCTP_SN_TYPE_BASE + 0x20,
                flags: 0,
                length: 8,
            })
        );
        assert_eq!(n.assoc_id(), None);
    }
}
