use bitflags::bitflags;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use tracing::debug;

use crate::error::{Result, SctpError};

/// Environment variable overriding the detected capability set.
///
/// The value is a comma separated list of capability names (see
/// [`Capabilities::NAMES`]) or `none`.
pub const CAPABILITIES_ENV: &str = "SCTP_CAPABILITIES";

bitflags! {
    /// Optional features of the SCTP implementation.
    ///
    /// The set is resolved once per process (see [`Capabilities::current`])
    /// and consulted at run time by the codecs whose structures or constants
    /// depend on it. Every socket handle carries its own copy, so both layouts
    /// can be exercised in one build.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u32 {
        /// Multiple buffers per message.
        const MULTIBUF = 1 << 0;
        /// Implicit association setup on one-to-many sockets.
        const NOCONNECT = 1 << 1;
        /// Partially reliable SCTP (time-to-live on sends).
        const PRSCTP = 1 << 2;
        /// Satellite network tuning.
        const SAT_NETWORK = 1 << 3;
        /// `SCTP_PRIMARY_ADDR` / `SCTP_SET_PEER_PRIMARY_ADDR` are honoured.
        const CAN_SET_PRIMARY = 1 << 4;
        /// Dynamic address reconfiguration.
        const ADDIP = 1 << 5;
        /// `sctp_paddrparams` carries `spp_pathmtu`, `spp_sackdelay` and
        /// `spp_flags`.
        const PEER_ADDR_PARAMS_EXT = 1 << 6;
        /// The `SCTP_SENDALL` send flag exists.
        const SENDALL = 1 << 7;
        /// `sstat_state` reports the `BOUND` and `LISTEN` socket states.
        const SOCKET_STATES = 1 << 8;
    }
}

static CURRENT: OnceLock<Capabilities> = OnceLock::new();

impl Capabilities {
    /// Names accepted by the [`FromStr`] implementation.
    pub const NAMES: &'static [(&'static str, Capabilities)] = &[
        ("multibuf", Capabilities::MULTIBUF),
        ("noconnect", Capabilities::NOCONNECT),
        ("prsctp", Capabilities::PRSCTP),
        ("sat_network", Capabilities::SAT_NETWORK),
        ("can_set_primary", Capabilities::CAN_SET_PRIMARY),
        ("addip", Capabilities::ADDIP),
        ("peer_addr_params_ext", Capabilities::PEER_ADDR_PARAMS_EXT),
        ("sendall", Capabilities::SENDALL),
        ("socket_states", Capabilities::SOCKET_STATES),
    ];

    /// What the Linux kernel SCTP implementation offers.
    pub const fn linux_default() -> Capabilities {
        Capabilities::PRSCTP
            .union(Capabilities::CAN_SET_PRIMARY)
            .union(Capabilities::ADDIP)
            .union(Capabilities::PEER_ADDR_PARAMS_EXT)
            .union(Capabilities::SENDALL)
    }

    /// Reads [`CAPABILITIES_ENV`], if set.
    pub fn from_env() -> Result<Option<Capabilities>> {
        match std::env::var(CAPABILITIES_ENV) {
            Ok(v) => v.parse().map(Some),
            Err(std::env::VarError::NotPresent) => Ok(None),
            Err(e) => Err(SctpError::InvalidConfig(format!("{}: {}", CAPABILITIES_ENV, e))),
        }
    }

    /// The process-wide capability set, resolved on first use.
    ///
    /// An unparsable [`CAPABILITIES_ENV`] is ignored in favour of
    /// [`Capabilities::linux_default`]; use [`Capabilities::install`] to fail
    /// hard instead.
    pub fn current() -> Capabilities {
        *CURRENT.get_or_init(|| {
            let caps = match Capabilities::from_env() {
                Ok(Some(caps)) => caps,
                Ok(None) => Capabilities::linux_default(),
                Err(e) => {
                    tracing::warn!("ignoring {}: {}", CAPABILITIES_ENV, e);
                    Capabilities::linux_default()
                }
            };
            debug!("SCTP capabilities resolved to {}", caps);
            caps
        })
    }

    /// Fixes the process-wide capability set. Returns the set that ends up
    /// installed, which differs from `caps` if it was already resolved.
    pub fn install(caps: Capabilities) -> Capabilities {
        *CURRENT.get_or_init(|| {
            debug!("SCTP capabilities installed as {}", caps);
            caps
        })
    }

    pub fn have_multibuf(&self) -> bool {
        self.contains(Capabilities::MULTIBUF)
    }

    pub fn have_noconnect(&self) -> bool {
        self.contains(Capabilities::NOCONNECT)
    }

    pub fn have_prsctp(&self) -> bool {
        self.contains(Capabilities::PRSCTP)
    }

    pub fn have_sat_network(&self) -> bool {
        self.contains(Capabilities::SAT_NETWORK)
    }

    pub fn have_set_primary(&self) -> bool {
        self.contains(Capabilities::CAN_SET_PRIMARY)
    }

    pub fn have_addip(&self) -> bool {
        self.contains(Capabilities::ADDIP)
    }

    pub fn have_peer_addr_params_ext(&self) -> bool {
        self.contains(Capabilities::PEER_ADDR_PARAMS_EXT)
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Capabilities::linux_default()
    }
}

impl FromStr for Capabilities {
    type Err = SctpError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("none") {
            return Ok(Capabilities::empty());
        }
        s.split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .try_fold(Capabilities::empty(), |acc, name| {
                Capabilities::NAMES
                    .iter()
                    .find(|(n, _)| n.eq_ignore_ascii_case(name))
                    .map(|(_, cap)| acc | *cap)
                    .ok_or_else(|| SctpError::InvalidConfig(format!("unknown capability `{}`", name)))
            })
    }
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let mut first = true;
        for (name, cap) in Capabilities::NAMES {
            if self.contains(*cap) {
                if !first {
                    f.write_str(",")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_capability_list() {
        let caps: Capabilities = "prsctp, addip,PEER_ADDR_PARAMS_EXT".parse().unwrap();
        assert_eq!(
            caps,
            Capabilities::PRSCTP | Capabilities::ADDIP | Capabilities::PEER_ADDR_PARAMS_EXT
        );
        assert!(caps.have_peer_addr_params_ext());
        assert!(!caps.have_multibuf());
    }

    #[test]
    fn none_is_empty() {
        assert_eq!("none".parse::<Capabilities>().unwrap(), Capabilities::empty());
        assert_eq!("".parse::<Capabilities>().unwrap(), Capabilities::empty());
    }

    #[test]
    fn rejects_unknown_names() {
        let err = "prsctp,warp_drive".parse::<Capabilities>().unwrap_err();
        assert!(matches!(err, SctpError::InvalidConfig(msg) if msg.contains("warp_drive")));
    }

    #[test]
    fn display_parses_back() {
        let caps = Capabilities::linux_default();
        assert_eq!(caps.to_string().parse::<Capabilities>().unwrap(), caps);
        assert_eq!(Capabilities::empty().to_string(), "none");
    }
}
