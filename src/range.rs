//! Inclusive ranges of IP addresses and the address arithmetic the
//! permutation relies on.
//!
//! Every offset is carried as `u128`, which covers the widest IPv6 range.
//! Only the count of the complete `::/0` space (2^128) does not fit, so
//! [`AddressRange::count`] returns `None` for it.

use std::fmt;
use std::net::{AddrParseError, IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use ipnetwork::{IpNetwork, IpNetworkError};
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RangeError {
    /// Start lies after end, which also covers the empty range.
    #[error("wrong order: {start} is higher than {end}")]
    WrongOrder { start: IpAddr, end: IpAddr },

    #[error("mixed IPv4 and IPv6 addresses: {start} - {end}")]
    MixedFamilies { start: IpAddr, end: IpAddr },

    #[error("invalid address: {0}")]
    InvalidAddress(
        #[from]
        #[source]
        AddrParseError,
    ),

    #[error("invalid network: {0}")]
    InvalidNetwork(
        #[from]
        #[source]
        IpNetworkError,
    ),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AddressFamily {
    V4,
    V6,
}

impl AddressFamily {
    pub fn of(addr: &IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => Self::V4,
            IpAddr::V6(_) => Self::V6,
        }
    }

    pub fn unspecified(self) -> IpAddr {
        match self {
            Self::V4 => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            Self::V6 => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
        }
    }

    // Callers keep `bits` within the family's width.
    fn addr_from_bits(self, bits: u128) -> IpAddr {
        match self {
            Self::V4 => IpAddr::V4(Ipv4Addr::from(bits as u32)),
            Self::V6 => IpAddr::V6(Ipv6Addr::from(bits)),
        }
    }
}

fn addr_to_bits(addr: &IpAddr) -> u128 {
    match addr {
        IpAddr::V4(v4) => u128::from(u32::from(*v4)),
        IpAddr::V6(v6) => u128::from(*v6),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AddressRange {
    start: IpAddr,
    end: IpAddr,
}

impl AddressRange {
    pub fn new(start: IpAddr, end: IpAddr) -> Result<Self, RangeError> {
        match (start, end) {
            (IpAddr::V4(_), IpAddr::V4(_)) | (IpAddr::V6(_), IpAddr::V6(_)) => {}
            _ => return Err(RangeError::MixedFamilies { start, end }),
        }
        if start > end {
            return Err(RangeError::WrongOrder { start, end });
        }
        Ok(Self { start, end })
    }

    // Network and broadcast included.
    pub fn from_network(net: IpNetwork) -> Self {
        let (start, end) = match net {
            IpNetwork::V4(v4) => (IpAddr::V4(v4.network()), IpAddr::V4(v4.broadcast())),
            IpNetwork::V6(v6) => {
                let network = u128::from(v6.network());
                let last = network | !u128::from(v6.mask());
                (IpAddr::V6(v6.network()), IpAddr::V6(Ipv6Addr::from(last)))
            }
        };
        Self { start, end }
    }

    pub fn start(&self) -> IpAddr {
        self.start
    }

    pub fn end(&self) -> IpAddr {
        self.end
    }

    pub fn family(&self) -> AddressFamily {
        AddressFamily::of(&self.start)
    }

    pub fn contains(&self, addr: &IpAddr) -> bool {
        AddressFamily::of(addr) == self.family() && self.start <= *addr && *addr <= self.end
    }

    pub fn last_offset(&self) -> u128 {
        addr_to_bits(&self.end) - addr_to_bits(&self.start)
    }

    /// Number of addresses in the range; `None` only for the full IPv6 space.
    pub fn count(&self) -> Option<u128> {
        self.last_offset().checked_add(1)
    }

    pub fn offset(&self, n: u128) -> Option<IpAddr> {
        if n > self.last_offset() {
            return None;
        }
        Some(self.offset_unchecked(n))
    }

    // Drops `n` addresses from both ends; needs `2 * n <= last_offset()`.
    pub(crate) fn trimmed(&self, n: u128) -> Self {
        debug_assert!(n.saturating_mul(2) <= self.last_offset());
        Self {
            start: self.offset_unchecked(n),
            end: self.offset_unchecked(self.last_offset() - n),
        }
    }

    pub(crate) fn offset_unchecked(&self, n: u128) -> IpAddr {
        debug_assert!(n <= self.last_offset());
        self.family()
            .addr_from_bits(addr_to_bits(&self.start) + n)
    }
}

impl TryFrom<(IpAddr, IpAddr)> for AddressRange {
    type Error = RangeError;

    fn try_from((start, end): (IpAddr, IpAddr)) -> Result<Self, Self::Error> {
        Self::new(start, end)
    }
}

impl From<IpNetwork> for AddressRange {
    fn from(net: IpNetwork) -> Self {
        Self::from_network(net)
    }
}

impl FromStr for AddressRange {
    type Err = RangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // start-end, otherwise CIDR
        if let Some((start, end)) = s.split_once('-') {
            let start: IpAddr = start.trim().parse()?;
            let end: IpAddr = end.trim().parse()?;
            return Self::new(start, end);
        }
        let net: IpNetwork = s.trim().parse()?;
        Ok(Self::from_network(net))
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}
