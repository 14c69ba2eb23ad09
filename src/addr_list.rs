//! Packed address lists, as consumed by `sctp_bindx`/`sctp_connectx` and
//! produced by `sctp_getpaddrs`/`sctp_getladdrs`.
//!
//! A packed list is the binary records of its addresses laid end to end, each
//! occupying exactly the size of its family's record.

use bytes::{Bytes, BytesMut};
use std::io;
use std::mem;
use std::net::SocketAddr;
use std::os::fd::{AsRawFd, BorrowedFd};
use tracing::{debug, warn};

use crate::addr::{self, decode_address_bytes, encode_address};
use crate::error::{Result, SctpError};
use crate::sys::common::{sctp_assoc_t, SCTP_BINDX_ADD_ADDR, SCTP_BINDX_REM_ADDR};
use crate::sys::linux::{self, SCTP_GET_LOCAL_ADDRS, SCTP_GET_PEER_ADDRS};

/// A contiguous buffer of socket address records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedAddrs {
    buf: Bytes,
    count: usize,
}

impl PackedAddrs {
    /// Packs already parsed addresses.
    pub fn from_socket_addrs(addrs: &[SocketAddr]) -> Result<Self> {
        if addrs.is_empty() {
            return Err(SctpError::EmptyAddressList);
        }
        let total = addrs.iter().map(addr::record_len).sum();
        let mut buf = BytesMut::with_capacity(total);
        for a in addrs {
            let raw = socket2::SockAddr::from(*a);
            buf.extend_from_slice(addr::record_bytes(&raw));
        }
        Ok(PackedAddrs {
            buf: buf.freeze(),
            count: addrs.len(),
        })
    }

    /// Number of address records.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Total size in bytes, the sum of the record sizes.
    pub fn byte_len(&self) -> usize {
        self.buf.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Decodes the records back into addresses.
    pub fn addrs(&self) -> Result<Vec<Option<SocketAddr>>> {
        decode_list(&self.buf, self.count)
    }
}

/// Encodes a sequence of textual host/port pairs into one packed buffer.
pub fn encode_list<I, S>(addrs: I) -> Result<PackedAddrs>
where
    I: IntoIterator<Item = (S, u16)>,
    S: AsRef<str>,
{
    let mut buf = BytesMut::new();
    let mut count = 0;
    for (index, (host, port)) in addrs.into_iter().enumerate() {
        let raw = encode_address(host.as_ref(), port).map_err(|e| SctpError::InvalidAddressAt {
            index,
            source: Box::new(e),
        })?;
        buf.extend_from_slice(addr::record_bytes(&raw));
        count += 1;
    }
    if count == 0 {
        return Err(SctpError::EmptyAddressList);
    }
    Ok(PackedAddrs {
        buf: buf.freeze(),
        count,
    })
}

/// Decodes up to `count` records from `buf`.
///
/// Always returns `count` slots. Decoding stops at the first record that
/// cannot be read (unknown family or truncated) and every slot from there on
/// is `None`. A `count` too large to allocate is `AllocationFailed`.
pub fn decode_list(buf: &[u8], count: usize) -> Result<Vec<Option<SocketAddr>>> {
    let mut out = Vec::new();
    out.try_reserve_exact(count)
        .map_err(|_| SctpError::AllocationFailed(count.saturating_mul(mem::size_of::<Option<SocketAddr>>())))?;
    let mut offset = 0;
    while out.len() < count {
        match decode_address_bytes(&buf[offset.min(buf.len())..]) {
            Ok((a, used)) => {
                out.push(Some(a));
                offset += used;
            }
            Err(e) => {
                warn!(
                    "address list decode stopped at record {} of {}: {}",
                    out.len(),
                    count,
                    e
                );
                out.resize(count, None);
            }
        }
    }
    Ok(out)
}

/// Whether [`bindx`] adds or removes addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindxFlag {
    Add,
    Remove,
}

impl BindxFlag {
    fn raw(self) -> libc::c_int {
        match self {
            BindxFlag::Add => SCTP_BINDX_ADD_ADDR,
            BindxFlag::Remove => SCTP_BINDX_REM_ADDR,
        }
    }
}

/// Adds addresses to, or removes them from, the set bound to `fd`.
///
/// This corresponds to `sctp_bindx(3)`.
pub fn bindx(fd: BorrowedFd<'_>, addrs: &PackedAddrs, flag: BindxFlag) -> Result<()> {
    debug!("bindx {:?} of {} addresses on fd {}", flag, addrs.len(), fd.as_raw_fd());
    linux::bindx(fd.as_raw_fd(), addrs.as_bytes(), flag.raw()).map_err(SctpError::syscall("sctp_bindx"))
}

/// Starts an association to a multi-homed peer and returns its id.
///
/// This corresponds to `sctp_connectx(3)`. On a non-blocking socket the call
/// fails with `EINPROGRESS` while the handshake proceeds; use
/// [`AsyncSctpSocket::connectx`](crate::AsyncSctpSocket::connectx) to wait
/// for it.
pub fn connectx(fd: BorrowedFd<'_>, addrs: &PackedAddrs) -> Result<sctp_assoc_t> {
    let c = connectx_start(fd, addrs)?;
    if c.in_progress {
        return Err(SctpError::SystemCall {
            call: "sctp_connectx",
            source: io::Error::from_raw_os_error(libc::EINPROGRESS),
        });
    }
    Ok(c.assoc_id)
}

/// Like [`connectx`], but reports a handshake still in progress instead of
/// failing.
pub(crate) fn connectx_start(fd: BorrowedFd<'_>, addrs: &PackedAddrs) -> Result<linux::Connecting> {
    debug!("connectx to {} addresses on fd {}", addrs.len(), fd.as_raw_fd());
    linux::connectx(fd.as_raw_fd(), addrs.as_bytes()).map_err(SctpError::syscall("sctp_connectx"))
}

/// Addresses of the peer of association `assoc`.
pub fn peer_addrs(fd: BorrowedFd<'_>, assoc: sctp_assoc_t) -> Result<Vec<Option<SocketAddr>>> {
    let (count, buf) = linux::getaddrs(fd.as_raw_fd(), SCTP_GET_PEER_ADDRS, assoc)
        .map_err(SctpError::syscall("sctp_getpaddrs"))?;
    decode_list(&buf, count)
}

/// Addresses bound locally, for association `assoc` or the endpoint (`0`).
pub fn local_addrs(fd: BorrowedFd<'_>, assoc: sctp_assoc_t) -> Result<Vec<Option<SocketAddr>>> {
    let (count, buf) = linux::getaddrs(fd.as_raw_fd(), SCTP_GET_LOCAL_ADDRS, assoc)
        .map_err(SctpError::syscall("sctp_getladdrs"))?;
    decode_list(&buf, count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_list_is_rejected() {
        let none: [(&str, u16); 0] = [];
        assert!(matches!(encode_list(none), Err(SctpError::EmptyAddressList)));
        assert!(matches!(
            PackedAddrs::from_socket_addrs(&[]),
            Err(SctpError::EmptyAddressList)
        ));
    }

    #[test]
    fn packs_records_back_to_back() {
        let list = encode_list([("127.0.0.1", 2905), ("::1", 2905), ("10.0.0.2", 36412)]).unwrap();
        assert_eq!(list.len(), 3);
        assert_eq!(list.byte_len(), 16 + 28 + 16);

        let addrs = decode_list(list.as_bytes(), 3).unwrap();
        assert_eq!(
            addrs,
            vec![
                Some("127.0.0.1:2905".parse().unwrap()),
                Some("[::1]:2905".parse().unwrap()),
                Some("10.0.0.2:36412".parse().unwrap()),
            ]
        );
    }

    #[test]
    fn typed_and_textual_forms_agree() {
        let typed = PackedAddrs::from_socket_addrs(&[
            "192.168.1.1:5000".parse().unwrap(),
            "[2001:db8::5]:5000".parse().unwrap(),
        ])
        .unwrap();
        let textual = encode_list([("192.168.1.1", 5000), ("2001:db8::5", 5000)]).unwrap();
        assert_eq!(typed, textual);
    }

    #[test]
    fn bad_element_reports_its_index() {
        let err = encode_list([("127.0.0.1", 1), ("::1", 2), ("nope", 3)]).unwrap_err();
        match err {
            SctpError::InvalidAddressAt { index, source } => {
                assert_eq!(index, 2);
                assert!(matches!(*source, SctpError::InvalidAddress(_)));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn unsupported_family_cuts_the_list_short() {
        let first = encode_list([("10.1.1.1", 80)]).unwrap();
        let mut buf = first.as_bytes().to_vec();
        let mut bogus = [0u8; 16];
        bogus[..2].copy_from_slice(&(libc::AF_UNIX as u16).to_ne_bytes());
        buf.extend_from_slice(&bogus);
        buf.extend_from_slice(first.as_bytes());

        let addrs = decode_list(&buf, 3).unwrap();
        assert_eq!(addrs, vec![Some("10.1.1.1:80".parse().unwrap()), None, None]);
    }

    #[test]
    fn short_buffer_yields_absent_slots() {
        let list = encode_list([("10.1.1.1", 80)]).unwrap();
        assert_eq!(decode_list(list.as_bytes(), 2).unwrap().len(), 2);
        assert_eq!(decode_list(&[], 2).unwrap(), vec![None, None]);
    }

    #[test]
    fn oversized_count_is_an_allocation_error() {
        assert!(matches!(
            decode_list(&[], usize::MAX / 2),
            Err(SctpError::AllocationFailed(_))
        ));
    }
}
