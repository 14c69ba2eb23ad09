//! # sctp-sockapi
//!
//! `sctp-sockapi` gives typed access to the Linux kernel SCTP socket API: the
//! SCTP socket options, packed address lists for multi-homing, per-message
//! ancillary data on send and receive, and the notifications delivered on the
//! data path. The lksctp calls (`sctp_bindx`, `sctp_connectx`,
//! `sctp_sendmsg`, ...) are issued directly against the kernel, so building
//! does not require the lksctp-tools package.
//!
//! The codecs are free functions over a borrowed descriptor, grouped by
//! module. [`SctpSocket`] bundles them as methods on an owned socket and
//! [`AsyncSctpSocket`] runs the blocking calls on the tokio reactor.
//!
//! Optional kernel features are described by [`Capabilities`], resolved once
//! per process from the `SCTP_CAPABILITIES` environment variable or the Linux
//! defaults.
pub mod addr;
pub mod addr_list;
pub mod constants;
pub mod msg;
pub mod notification;
pub mod options;

mod async_socket;
pub use async_socket::AsyncSctpSocket;

mod config;
pub use config::{Capabilities, CAPABILITIES_ENV};

mod error;
pub use error::{Result, SctpError};

mod socket;
pub use socket::{peeloff, SctpSocket, SocketStyle};

mod sys;

pub use addr_list::{BindxFlag, PackedAddrs};
pub use msg::{ReceivedMessage, RecvContent, RecvFlags, SendFlags, SendOptions, SndRcvInfo};
pub use notification::Notification;
pub use options::{
    AssocParams, AssocState, EventSubscription, InitParams, PeerAddrFlags, PeerAddrInfo, PeerAddrParams,
    RtoInfo, Status,
};

/// Association identifier (`sctp_assoc_t`). `0` names the only association
/// of a one-to-one socket.
pub type AssocId = sys::common::sctp_assoc_t;
