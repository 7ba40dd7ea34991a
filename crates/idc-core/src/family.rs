//! Address families and the integer widths that back them
//!
//! Both pipelines (IPv4 and IPv6) are written once against
//! [`SegmentAddr`]. IPv4 addresses are `u32`, IPv6 addresses are native
//! `u128`; all range arithmetic goes through the checked
//! [`SegmentAddr::successor`] / [`SegmentAddr::predecessor`] pair so a
//! carry or borrow out of the top word can never wrap silently.

use ipnet::{Ipv4Net, Ipv6Net};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// IP address family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressFamily {
    /// IPv4
    V4,
    /// IPv6
    V6,
}

impl AddressFamily {
    /// Both families, in refresh order
    pub const ALL: [AddressFamily; 2] = [AddressFamily::V4, AddressFamily::V6];

    /// Stable lowercase name used in logs and events
    pub fn as_str(&self) -> &'static str {
        match self {
            AddressFamily::V4 => "ipv4",
            AddressFamily::V6 => "ipv6",
        }
    }

    /// Family of a parsed address
    pub fn of(ip: &IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => AddressFamily::V4,
            IpAddr::V6(_) => AddressFamily::V6,
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unsigned integer wide enough to hold one address of a family
///
/// Ordering of the integer is the numeric ordering of the address, so
/// `Ord` on the implementor is exactly the comparison used by the
/// flattener and by lookups.
pub trait SegmentAddr: Copy + Ord + Hash + fmt::Debug + Send + Sync + 'static {
    /// Family this width represents
    const FAMILY: AddressFamily;

    /// `self + 1`, or `None` at the top of the address space
    fn successor(self) -> Option<Self>;

    /// `self - 1`, or `None` at the bottom of the address space
    fn predecessor(self) -> Option<Self>;

    /// Parse `address/prefix` into inclusive `(network, broadcast)` bounds
    ///
    /// Host bits are masked off, so `10.8.1.0/16` yields the bounds of
    /// `10.8.0.0/16`. Networks of the other family yield `None`.
    fn parse_cidr(text: &str) -> Option<(Self, Self)>;

    /// Render back to an IP address for logs
    fn to_ip(self) -> IpAddr;
}

impl SegmentAddr for u32 {
    const FAMILY: AddressFamily = AddressFamily::V4;

    fn successor(self) -> Option<Self> {
        self.checked_add(1)
    }

    fn predecessor(self) -> Option<Self> {
        self.checked_sub(1)
    }

    fn parse_cidr(text: &str) -> Option<(Self, Self)> {
        let net: Ipv4Net = text.parse().ok()?;
        Some((u32::from(net.network()), u32::from(net.broadcast())))
    }

    fn to_ip(self) -> IpAddr {
        IpAddr::V4(Ipv4Addr::from(self))
    }
}

impl SegmentAddr for u128 {
    const FAMILY: AddressFamily = AddressFamily::V6;

    fn successor(self) -> Option<Self> {
        self.checked_add(1)
    }

    fn predecessor(self) -> Option<Self> {
        self.checked_sub(1)
    }

    fn parse_cidr(text: &str) -> Option<(Self, Self)> {
        let net: Ipv6Net = text.parse().ok()?;
        Some((u128::from(net.network()), u128::from(net.broadcast())))
    }

    fn to_ip(self) -> IpAddr {
        IpAddr::V6(Ipv6Addr::from(self))
    }
}

/// Split a 128-bit address into four big-endian 32-bit words
pub fn to_words(value: u128) -> [u32; 4] {
    [
        (value >> 96) as u32,
        (value >> 64) as u32,
        (value >> 32) as u32,
        value as u32,
    ]
}

/// Rebuild a 128-bit address from four big-endian 32-bit words
pub fn from_words(words: [u32; 4]) -> u128 {
    words
        .iter()
        .fold(0u128, |acc, word| (acc << 32) | u128::from(*word))
}
