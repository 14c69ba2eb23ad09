//! Textual host/port pairs <-> binary socket address records.

use socket2::SockAddr;
use std::mem::size_of;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::ptr;

use crate::error::{Result, SctpError};

/// Host string resolving to the IPv4 broadcast address.
pub const BROADCAST_HOST: &str = "<broadcast>";

/// Size of the binary record for `addr`'s family.
pub fn record_len(addr: &SocketAddr) -> usize {
    match addr {
        SocketAddr::V4(_) => size_of::<libc::sockaddr_in>(),
        SocketAddr::V6(_) => size_of::<libc::sockaddr_in6>(),
    }
}

/// Classifies a textual host.
///
/// An empty string is IPv4 ANY and `"<broadcast>"` is IPv4 BROADCAST.
/// Otherwise the text is tried as IPv6 first, then as IPv4.
pub fn resolve(host: &str, port: u16) -> Result<SocketAddr> {
    let ip = if host.is_empty() {
        IpAddr::V4(Ipv4Addr::UNSPECIFIED)
    } else if host == BROADCAST_HOST {
        IpAddr::V4(Ipv4Addr::BROADCAST)
    } else if let Ok(v6) = host.parse::<Ipv6Addr>() {
        IpAddr::V6(v6)
    } else if let Ok(v4) = host.parse::<Ipv4Addr>() {
        IpAddr::V4(v4)
    } else {
        return Err(SctpError::InvalidAddress(host.to_owned()));
    };
    Ok(SocketAddr::new(ip, port))
}

/// Encodes `host`/`port` into a binary socket address record.
pub fn encode_address(host: &str, port: u16) -> Result<SockAddr> {
    resolve(host, port).map(SockAddr::from)
}

/// Decodes a binary record back into an address.
pub fn decode_address(raw: &SockAddr) -> Result<SocketAddr> {
    raw.as_socket()
        .ok_or_else(|| SctpError::UnsupportedFamily(raw.family()))
}

/// The bytes of a binary record, exactly `raw.len()` long.
pub fn record_bytes(raw: &SockAddr) -> &[u8] {
    // SAFETY: `as_ptr` points at storage that is at least `len` bytes long
    // and lives as long as `raw`.
    unsafe { std::slice::from_raw_parts(raw.as_ptr() as *const u8, raw.len() as usize) }
}

/// Decodes the record at the start of `buf`.
///
/// Returns the address and the size of the record consumed, which is where
/// the next record of a packed list starts.
pub fn decode_address_bytes(buf: &[u8]) -> Result<(SocketAddr, usize)> {
    if buf.len() < size_of::<libc::sa_family_t>() {
        return Err(SctpError::InvalidAddress(format!(
            "{} bytes is too short for an address record",
            buf.len()
        )));
    }
    let family = u16::from_ne_bytes([buf[0], buf[1]]);
    let len = match family as libc::c_int {
        libc::AF_INET => size_of::<libc::sockaddr_in>(),
        libc::AF_INET6 => size_of::<libc::sockaddr_in6>(),
        _ => return Err(SctpError::UnsupportedFamily(family)),
    };
    if buf.len() < len {
        return Err(SctpError::InvalidAddress(format!(
            "record of family {} truncated to {} bytes",
            family,
            buf.len()
        )));
    }

    let mut storage: libc::sockaddr_storage = crate::sys::linux::zeroed();
    // SAFETY: `len` is at most the size of `sockaddr_in6`, well within
    // `sockaddr_storage`, and `buf` holds at least `len` bytes.
    unsafe {
        ptr::copy_nonoverlapping(
            buf.as_ptr(),
            &mut storage as *mut libc::sockaddr_storage as *mut u8,
            len,
        );
    }
    let addr = from_storage(&storage, len)?;
    Ok((addr, len))
}

/// Decodes a `sockaddr_storage` embedded in a kernel structure.
pub(crate) fn decode_storage(storage: &libc::sockaddr_storage) -> Result<SocketAddr> {
    let len = match storage.ss_family as libc::c_int {
        libc::AF_INET => size_of::<libc::sockaddr_in>(),
        libc::AF_INET6 => size_of::<libc::sockaddr_in6>(),
        _ => return Err(SctpError::UnsupportedFamily(storage.ss_family)),
    };
    from_storage(storage, len)
}

fn from_storage(storage: &libc::sockaddr_storage, len: usize) -> Result<SocketAddr> {
    // SAFETY: the family matches `len` and the storage is fully initialised.
    let raw = unsafe { SockAddr::new(*storage, len as libc::socklen_t) };
    decode_address(&raw)
}

/// A `sockaddr_storage` holding `addr`, zero beyond the record.
pub(crate) fn to_storage(addr: &SocketAddr) -> libc::sockaddr_storage {
    let raw = SockAddr::from(*addr);
    let bytes = record_bytes(&raw);
    let mut storage: libc::sockaddr_storage = crate::sys::linux::zeroed();
    // SAFETY: a socket address record never exceeds `sockaddr_storage`.
    unsafe {
        ptr::copy_nonoverlapping(
            bytes.as_ptr(),
            &mut storage as *mut libc::sockaddr_storage as *mut u8,
            bytes.len(),
        );
    }
    storage
}

/// Result of [`describe`]: what a host/port pair turns into on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressReport {
    pub family: u16,
    pub record_len: usize,
    pub address: SocketAddr,
}

impl std::fmt::Display for AddressReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "family {}, size {}, address {}.{}",
            self.family,
            self.record_len,
            self.address.ip(),
            self.address.port()
        )
    }
}

/// Runs `host`/`port` through a full encode/decode round trip.
pub fn describe(host: &str, port: u16) -> Result<AddressReport> {
    let raw = encode_address(host, port)?;
    let (address, record_len) = decode_address_bytes(record_bytes(&raw))?;
    Ok(AddressReport {
        family: raw.family(),
        record_len,
        address,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ipv4_round_trip() {
        for (host, port) in [("127.0.0.1", 0u16), ("10.1.2.3", 2905), ("192.168.0.255", 65535)] {
            let raw = encode_address(host, port).unwrap();
            assert_eq!(raw.len() as usize, size_of::<libc::sockaddr_in>());
            assert_eq!(raw.family(), libc::AF_INET as u16);

            let addr = decode_address(&raw).unwrap();
            assert_eq!(addr.ip().to_string(), host);
            assert_eq!(addr.port(), port);
        }
    }

    #[test]
    fn ipv6_round_trip_is_canonical() {
        let raw = encode_address("2001:db8:0:0:0:0:0:1", 36412).unwrap();
        assert_eq!(raw.len() as usize, size_of::<libc::sockaddr_in6>());
        assert_eq!(raw.family(), libc::AF_INET6 as u16);

        let addr = decode_address(&raw).unwrap();
        assert_eq!(addr.ip().to_string(), "2001:db8::1");
        assert_eq!(addr.port(), 36412);
    }

    #[test]
    fn port_is_network_order() {
        let raw = encode_address("1.2.3.4", 0x1234).unwrap();
        let bytes = record_bytes(&raw);
        // sin_port follows the two byte family
        assert_eq!(&bytes[2..4], &[0x12, 0x34]);
        assert_eq!(&bytes[4..8], &[1, 2, 3, 4]);
    }

    #[test]
    fn special_hosts() {
        let any = resolve("", 80).unwrap();
        assert_eq!(any, "0.0.0.0:80".parse().unwrap());

        let bcast = resolve(BROADCAST_HOST, 9).unwrap();
        assert_eq!(bcast, "255.255.255.255:9".parse().unwrap());
    }

    #[test]
    fn v4_mapped_text_is_ipv6() {
        let addr = resolve("::ffff:10.0.0.1", 1).unwrap();
        assert!(addr.is_ipv6());
    }

    #[test]
    fn garbage_is_rejected() {
        let err = encode_address("not-an-address", 1).unwrap_err();
        assert!(matches!(err, SctpError::InvalidAddress(h) if h == "not-an-address"));
    }

    #[test]
    fn unknown_family_is_an_error() {
        let mut bytes = [0u8; 16];
        bytes[..2].copy_from_slice(&(libc::AF_UNIX as u16).to_ne_bytes());
        let err = decode_address_bytes(&bytes).unwrap_err();
        assert!(matches!(err, SctpError::UnsupportedFamily(f) if f == libc::AF_UNIX as u16));
    }

    #[test]
    fn truncated_record_is_an_error() {
        let raw = encode_address("::1", 5).unwrap();
        let bytes = record_bytes(&raw);
        let err = decode_address_bytes(&bytes[..20]).unwrap_err();
        assert!(matches!(err, SctpError::InvalidAddress(_)));
    }

    #[test]
    fn storage_round_trip() {
        let addr: SocketAddr = "[fe80::1]:7".parse().unwrap();
        let storage = to_storage(&addr);
        assert_eq!(decode_storage(&storage).unwrap(), addr);

        let empty: libc::sockaddr_storage = crate::sys::linux::zeroed();
        assert!(matches!(
            decode_storage(&empty),
            Err(SctpError::UnsupportedFamily(0))
        ));
    }

    #[test]
    fn describe_reports_family_and_size() {
        let report = describe("127.0.0.1", 2905).unwrap();
        assert_eq!(report.family, libc::AF_INET as u16);
        assert_eq!(report.record_len, 16);
        assert_eq!(report.to_string(), "family 2, size 16, address 127.0.0.1.2905");
    }
}
