//! Protocol constants by name.
//!
//! A few entries depend on optional kernel features. When the feature is
//! missing from the [`Capabilities`] they are aliased to a sentinel (`0` or
//! `-1`), so callers that need to tell "absent" from "present and zero" must
//! check the capability itself.

use libc::c_int;

use crate::config::Capabilities;
use crate::sys::common::*;
use crate::sys::linux::*;

enum Value {
    Fixed(c_int),
    Gated {
        requires: Capabilities,
        value: c_int,
        fallback: c_int,
    },
}

const fn gated(requires: Capabilities, value: c_int, fallback: c_int) -> Value {
    Value::Gated {
        requires,
        value,
        fallback,
    }
}

// Linux has no BOUND/LISTEN association states; these are the values used by
// the stacks that report them.
const SCTP_BOUND: c_int = 9;
const SCTP_LISTEN: c_int = 10;

static CONSTANTS: &[(&str, Value)] = &[
    ("BINDX_ADD", Value::Fixed(SCTP_BINDX_ADD_ADDR)),
    ("BINDX_REMOVE", Value::Fixed(SCTP_BINDX_REM_ADDR)),
    ("SOL_SCTP", Value::Fixed(SOL_SCTP)),
    ("IPPROTO_SCTP", Value::Fixed(IPPROTO_SCTP)),
    ("SOCK_SEQPACKET", Value::Fixed(SOCK_SEQPACKET)),
    ("SOCK_STREAM", Value::Fixed(SOCK_STREAM)),
    ("MSG_UNORDERED", Value::Fixed(SCTP_UNORDERED as c_int)),
    ("MSG_ADDR_OVER", Value::Fixed(SCTP_ADDR_OVER as c_int)),
    ("MSG_SENDALL", gated(Capabilities::SENDALL, SCTP_SENDALL as c_int, 0)),
    ("MSG_ABORT", Value::Fixed(SCTP_ABORT as c_int)),
    ("MSG_EOF", Value::Fixed(SCTP_EOF as c_int)),
    ("MSG_EOR", Value::Fixed(libc::MSG_EOR)),
    ("MSG_FIN", Value::Fixed(MSG_FIN)),
    ("MSG_DONTROUTE", Value::Fixed(libc::MSG_DONTROUTE)),
    ("MSG_NOTIFICATION", Value::Fixed(MSG_NOTIFICATION)),
    ("SCTP_COMM_UP", Value::Fixed(SCTP_COMM_UP as c_int)),
    ("SCTP_COMM_LOST", Value::Fixed(SCTP_COMM_LOST as c_int)),
    ("SCTP_DATA_UNSENT", Value::Fixed(SCTP_DATA_UNSENT as c_int)),
    (
        "SCTP_PARTIAL_DELIVERY_ABORTED",
        Value::Fixed(SCTP_PARTIAL_DELIVERY_ABORTED as c_int),
    ),
    (
        "SPP_HB_DISABLED",
        gated(Capabilities::PEER_ADDR_PARAMS_EXT, SPP_HB_DISABLE as c_int, 0),
    ),
    (
        "SPP_HB_ENABLED",
        gated(Capabilities::PEER_ADDR_PARAMS_EXT, SPP_HB_ENABLE as c_int, 0),
    ),
    (
        "SPP_PMTUD_DISABLED",
        gated(Capabilities::PEER_ADDR_PARAMS_EXT, SPP_PMTUD_DISABLE as c_int, 0),
    ),
    (
        "SPP_PMTUD_ENABLED",
        gated(Capabilities::PEER_ADDR_PARAMS_EXT, SPP_PMTUD_ENABLE as c_int, 0),
    ),
    (
        "SPP_SACKDELAY_DISABLED",
        gated(Capabilities::PEER_ADDR_PARAMS_EXT, SPP_SACKDELAY_DISABLE as c_int, 0),
    ),
    (
        "SPP_SACKDELAY_ENABLED",
        gated(Capabilities::PEER_ADDR_PARAMS_EXT, SPP_SACKDELAY_ENABLE as c_int, 0),
    ),
    ("SCTP_BOUND", gated(Capabilities::SOCKET_STATES, SCTP_BOUND, -1)),
    ("SCTP_LISTEN", gated(Capabilities::SOCKET_STATES, SCTP_LISTEN, -1)),
    ("SCTP_DATA_SENT", Value::Fixed(SCTP_DATA_SENT as c_int)),
    ("SCTP_RESTART", Value::Fixed(SCTP_RESTART as c_int)),
    ("SCTP_SHUTDOWN_COMP", Value::Fixed(SCTP_SHUTDOWN_COMP as c_int)),
    ("SCTP_CANT_STR_ASSOC", Value::Fixed(SCTP_CANT_STR_ASSOC as c_int)),
    ("SCTP_FAILED_THRESHOLD", Value::Fixed(SCTP_FAILED_THRESHOLD)),
    ("SCTP_RECEIVED_SACK", Value::Fixed(SCTP_RECEIVED_SACK)),
    ("SCTP_HEARTBEAT_SUCCESS", Value::Fixed(SCTP_HEARTBEAT_SUCCESS)),
    ("SCTP_RESPONSE_TO_USER_REQ", Value::Fixed(SCTP_RESPONSE_TO_USER_REQ)),
    ("SCTP_INTERNAL_ERROR", Value::Fixed(SCTP_INTERNAL_ERROR)),
    ("SCTP_SHUTDOWN_GUARD_EXPIRES", Value::Fixed(SCTP_SHUTDOWN_GUARD_EXPIRES)),
    ("SCTP_PEER_FAULTY", Value::Fixed(SCTP_PEER_FAULTY)),
    ("SCTP_ADDR_AVAILABLE", Value::Fixed(SCTP_ADDR_AVAILABLE)),
    ("SCTP_ADDR_UNREACHABLE", Value::Fixed(SCTP_ADDR_UNREACHABLE)),
    ("SCTP_ADDR_REMOVED", Value::Fixed(SCTP_ADDR_REMOVED)),
    ("SCTP_ADDR_MADE_PRIM", Value::Fixed(SCTP_ADDR_MADE_PRIM)),
    ("SCTP_ADDR_ADDED", Value::Fixed(SCTP_ADDR_ADDED)),
    ("SCTP_ADDR_CONFIRMED", Value::Fixed(SCTP_ADDR_CONFIRMED)),
    ("SCTP_INACTIVE", Value::Fixed(SCTP_INACTIVE)),
    ("SCTP_PF", Value::Fixed(SCTP_PF)),
    ("SCTP_ACTIVE", Value::Fixed(SCTP_ACTIVE)),
    ("SCTP_UNCONFIRMED", Value::Fixed(SCTP_UNCONFIRMED)),
    ("SCTP_EMPTY", Value::Fixed(SCTP_EMPTY)),
    ("SCTP_CLOSED", Value::Fixed(SCTP_CLOSED)),
    ("SCTP_COOKIE_WAIT", Value::Fixed(SCTP_COOKIE_WAIT)),
    ("SCTP_COOKIE_ECHOED", Value::Fixed(SCTP_COOKIE_ECHOED)),
    ("SCTP_ESTABLISHED", Value::Fixed(SCTP_ESTABLISHED)),
    ("SCTP_SHUTDOWN_PENDING", Value::Fixed(SCTP_SHUTDOWN_PENDING)),
    ("SCTP_SHUTDOWN_SENT", Value::Fixed(SCTP_SHUTDOWN_SENT)),
    ("SCTP_SHUTDOWN_RECEIVED", Value::Fixed(SCTP_SHUTDOWN_RECEIVED)),
    ("SCTP_SHUTDOWN_ACK_SENT", Value::Fixed(SCTP_SHUTDOWN_ACK_SENT)),
    ("SCTP_SN_TYPE_BASE", Value::Fixed(SCTP_SN_TYPE_BASE as c_int)),
    ("SCTP_ASSOC_CHANGE", Value::Fixed(SCTP_ASSOC_CHANGE as c_int)),
    ("SCTP_PEER_ADDR_CHANGE", Value::Fixed(SCTP_PEER_ADDR_CHANGE as c_int)),
    ("SCTP_SEND_FAILED", Value::Fixed(SCTP_SEND_FAILED as c_int)),
    ("SCTP_REMOTE_ERROR", Value::Fixed(SCTP_REMOTE_ERROR as c_int)),
    ("SCTP_SHUTDOWN_EVENT", Value::Fixed(SCTP_SHUTDOWN_EVENT as c_int)),
    (
        "SCTP_PARTIAL_DELIVERY_EVENT",
        Value::Fixed(SCTP_PARTIAL_DELIVERY_EVENT as c_int),
    ),
    (
        "SCTP_ADAPTATION_INDICATION",
        Value::Fixed(SCTP_ADAPTATION_INDICATION as c_int),
    ),
    ("SCTP_RTOINFO", Value::Fixed(SCTP_RTOINFO)),
    ("SCTP_ASSOCINFO", Value::Fixed(SCTP_ASSOCINFO)),
    ("SCTP_INITMSG", Value::Fixed(SCTP_INITMSG)),
    ("SCTP_NODELAY", Value::Fixed(SCTP_NODELAY)),
    ("SCTP_AUTOCLOSE", Value::Fixed(SCTP_AUTOCLOSE)),
    ("SCTP_PRIMARY_ADDR", Value::Fixed(SCTP_PRIMARY_ADDR)),
    ("SCTP_PEER_ADDR_PARAMS", Value::Fixed(SCTP_PEER_ADDR_PARAMS)),
    ("SCTP_EVENTS", Value::Fixed(SCTP_EVENTS)),
    ("SCTP_STATUS", Value::Fixed(SCTP_STATUS)),
];

/// Looks `name` up against the given capability set.
pub fn lookup(name: &str, caps: Capabilities) -> Option<c_int> {
    CONSTANTS
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(_, value)| match value {
            Value::Fixed(v) => *v,
            Value::Gated {
                requires,
                value,
                fallback,
            } => {
                if caps.contains(*requires) {
                    *value
                } else {
                    *fallback
                }
            }
        })
}

/// Looks `name` up against [`Capabilities::current`].
pub fn get(name: &str) -> Option<c_int> {
    lookup(name, Capabilities::current())
}

/// Every constant name known to the table.
pub fn names() -> impl Iterator<Item = &'static str> {
    CONSTANTS.iter().map(|(key, _)| *key)
}
