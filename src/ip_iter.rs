use ipnetwork::IpNetwork;
use rand::Rng;
use std::iter::FusedIterator;
use std::net::IpAddr;

use crate::permutation::AddressRangePermutation;
use crate::range::AddressRange;

/// Range of the usable host addresses in `net`.
///
/// For IPv4 the network and broadcast addresses are left out, except on /31
/// and /32 where every address is a host. IPv6 has no broadcast address, so
/// the whole network is returned.
pub fn usable_hosts(net: IpNetwork) -> AddressRange {
    let whole = AddressRange::from_network(net);
    match net {
        // At least four addresses below /31
        IpNetwork::V4(v4) if v4.prefix() < 31 => whole.trimmed(1),
        _ => whole,
    }
}

/// Iterator over a permutation, yielding every address of the range once.
pub struct ShuffledAddrs<R> {
    inner: AddressRangePermutation<R>,
}

impl<R: Rng> ShuffledAddrs<R> {
    pub fn new(inner: AddressRangePermutation<R>) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> AddressRangePermutation<R> {
        self.inner
    }
}

impl<R: Rng> Iterator for ShuffledAddrs<R> {
    type Item = IpAddr;

    fn next(&mut self) -> Option<IpAddr> {
        // The final address comes with done = true, so check before drawing
        if self.inner.exhausted() {
            return None;
        }
        let (addr, _) = self.inner.next();
        Some(addr)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.inner.remaining().map(usize::try_from) {
            Some(Ok(n)) => (n, Some(n)),
            _ => (usize::MAX, None),
        }
    }
}

impl<R: Rng> FusedIterator for ShuffledAddrs<R> {}

impl<R: Rng> IntoIterator for AddressRangePermutation<R> {
    type Item = IpAddr;
    type IntoIter = ShuffledAddrs<R>;

    fn into_iter(self) -> ShuffledAddrs<R> {
        ShuffledAddrs::new(self)
    }
}
