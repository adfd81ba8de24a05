//! Random permutation of an address range based on the Fisher-Yates shuffle.
//!
//! The addresses of the range are treated as a virtual array in increasing
//! order, `a[i] = start + i`. Each call picks a random slot up to the cursor,
//! returns its value and moves the value at the cursor into that slot. Only
//! slots whose value differs from `start + i` are kept in a map, and the value
//! being returned is never stored, so memory grows with the number of calls
//! rather than with the size of the range.
//!
//! With the range `192.0.2.1-192.0.2.5` the cursor starts at 4. Picking slot 1
//! returns `192.0.2.2` and records `a[1] = 192.0.2.5`. The cursor drops to 3;
//! picking slot 0 returns `192.0.2.1` and records `a[0] = 192.0.2.4`, and so on
//! until slot 0 is the only one left. Picking the cursor slot itself returns
//! its value and records nothing.

use std::collections::HashMap;
use std::net::IpAddr;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::range::{AddressRange, RangeError};

pub struct AddressRangePermutation<R = StdRng> {
    range: AddressRange,
    // Index of the last slot still in play.
    cursor: u128,
    overrides: HashMap<u128, IpAddr>,
    done: bool,
    rng: R,
}

impl AddressRangePermutation<StdRng> {
    pub fn new(range: AddressRange) -> Self {
        Self::with_rng(range, StdRng::from_entropy())
    }

    pub fn from_bounds(start: IpAddr, end: IpAddr) -> Result<Self, RangeError> {
        Ok(Self::new(AddressRange::new(start, end)?))
    }
}

impl<R: Rng> AddressRangePermutation<R> {
    pub fn with_rng(range: AddressRange, rng: R) -> Self {
        log::debug!("New permutation over {} ({:?} addresses)", range, range.count());
        Self {
            range,
            cursor: range.last_offset(),
            overrides: HashMap::new(),
            done: false,
            rng,
        }
    }

    pub fn range(&self) -> &AddressRange {
        &self.range
    }

    pub fn exhausted(&self) -> bool {
        self.done
    }

    /// Returns the next random address and whether the range is now exhausted.
    ///
    /// The first `count` calls return every address of the range exactly once;
    /// the last of them reports `done = true`. Any call after that returns the
    /// unspecified address of the range's family, again with `done = true`.
    pub fn next(&mut self) -> (IpAddr, bool) {
        if self.done {
            return (self.range.family().unspecified(), true);
        }

        if self.cursor == 0 {
            self.done = true;
            let last = self.value_at(0);
            self.overrides.clear();
            log::debug!("Permutation over {} exhausted", self.range);
            return (last, true);
        }

        // The cursor slot is a candidate too, otherwise the highest address
        // could never come first.
        let picked = self.rng.gen_range(0..=self.cursor);

        // The cursor slot leaves the active range for good, so its value only
        // needs to survive in the picked slot. What was in the picked slot is
        // handed to the caller and forgotten.
        let cursor_addr = self
            .overrides
            .remove(&self.cursor)
            .unwrap_or_else(|| self.range.offset_unchecked(self.cursor));
        let picked_addr = if picked == self.cursor {
            cursor_addr
        } else {
            let addr = self.value_at(picked);
            self.overrides.insert(picked, cursor_addr);
            addr
        };
        self.cursor -= 1;

        log::trace!(
            "slot {} -> {}, cursor {} ({} overrides)",
            picked,
            picked_addr,
            self.cursor,
            self.overrides.len()
        );
        (picked_addr, false)
    }

    fn value_at(&self, slot: u128) -> IpAddr {
        match self.overrides.get(&slot) {
            Some(addr) => *addr,
            None => self.range.offset_unchecked(slot),
        }
    }

    /// Number of addresses still to be returned, if it fits in `u128`.
    pub fn remaining(&self) -> Option<u128> {
        if self.done {
            Some(0)
        } else {
            self.cursor.checked_add(1)
        }
    }

    #[cfg(test)]
    pub(crate) fn overrides_len(&self) -> usize {
        self.overrides.len()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::net::{Ipv4Addr, Ipv6Addr};

    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    fn seeded(range: &str, seed: u64) -> AddressRangePermutation<StdRng> {
        AddressRangePermutation::with_rng(range.parse().unwrap(), StdRng::seed_from_u64(seed))
    }

    #[test]
    fn test_ipv4_scenario() {
        let _ = env_logger::try_init();
        let mut perm = AddressRangePermutation::from_bounds(ip("192.0.2.1"), ip("192.0.2.5")).unwrap();
        let mut seen = HashSet::new();
        for i in 0..5 {
            assert!(!perm.exhausted());
            let (addr, done) = perm.next();
            assert_eq!(done, i == 4);
            assert!(seen.insert(addr), "{} returned twice", addr);
        }
        let expected: HashSet<IpAddr> = (1..=5)
            .map(|n| IpAddr::V4(Ipv4Addr::new(192, 0, 2, n)))
            .collect();
        assert_eq!(seen, expected);
        assert!(perm.exhausted());
        assert_eq!(perm.next(), (IpAddr::V4(Ipv4Addr::UNSPECIFIED), true));
    }

    #[test]
    fn test_ipv6_scenario() {
        let mut perm = seeded("2001:db8::1-2001:db8::2", 7);
        let (first, done) = perm.next();
        assert!(!done);
        let (second, done) = perm.next();
        assert!(done);
        let got: HashSet<IpAddr> = [first, second].into_iter().collect();
        assert_eq!(got, [ip("2001:db8::1"), ip("2001:db8::2")].into_iter().collect());
        assert_eq!(perm.next(), (IpAddr::V6(Ipv6Addr::UNSPECIFIED), true));
    }

    #[test]
    fn test_singleton() {
        let mut perm = seeded("198.51.100.7-198.51.100.7", 1);
        assert_eq!(perm.remaining(), Some(1));
        assert_eq!(perm.next(), (ip("198.51.100.7"), true));
        assert!(perm.exhausted());
        assert_eq!(perm.remaining(), Some(0));
    }

    #[test]
    fn test_idempotent_after_exhaustion() {
        let mut perm = seeded("10.0.0.0/30", 3);
        for _ in 0..4 {
            perm.next();
        }
        for _ in 0..10 {
            assert_eq!(perm.next(), (ip("0.0.0.0"), true));
            assert!(perm.exhausted());
        }
    }

    #[test]
    fn test_complete_and_unique() {
        for seed in 0..20 {
            let mut perm = seeded("10.1.0.0/22", seed);
            let mut seen = HashSet::new();
            let mut calls = 0;
            loop {
                let (addr, done) = perm.next();
                calls += 1;
                assert!(perm.range().contains(&addr));
                assert!(seen.insert(addr));
                assert_eq!(perm.exhausted(), done);
                if done {
                    break;
                }
            }
            assert_eq!(calls, 1024);
            assert_eq!(seen.len(), 1024);
        }
    }

    #[test]
    fn test_override_growth() {
        let mut perm = seeded("172.16.0.0/24", 11);
        let mut previous = perm.overrides_len();
        assert_eq!(previous, 0);
        for call in 1..256 {
            perm.next();
            let now = perm.overrides_len();
            assert!(now <= previous + 1);
            assert!(now <= call);
            assert!(now < 256);
            previous = now;
        }
        let (_, done) = perm.next();
        assert!(done);
        assert_eq!(perm.overrides_len(), 0);
    }

    #[test]
    fn test_full_ipv6_space() {
        let mut perm = seeded("::/0", 5);
        assert_eq!(perm.remaining(), None);
        let mut seen = HashSet::new();
        for _ in 0..1000 {
            let (addr, done) = perm.next();
            assert!(!done);
            assert!(addr.is_ipv6());
            assert!(seen.insert(addr));
        }
        assert_eq!(perm.remaining(), Some(u128::MAX - 999));
        assert!(perm.overrides_len() <= 1000);
    }

    #[test]
    fn test_full_ipv4_space() {
        let mut perm = seeded("0.0.0.0/0", 9);
        assert_eq!(perm.remaining(), Some(1 << 32));
        for _ in 0..100 {
            let (addr, done) = perm.next();
            assert!(!done);
            assert!(addr.is_ipv4());
        }
    }

    #[test]
    fn test_every_address_can_come_first_and_last() {
        let range: AddressRange = "192.0.2.0-192.0.2.3".parse().unwrap();
        let mut first = [0usize; 4];
        let mut last = [0usize; 4];
        for seed in 0..400 {
            let addrs: Vec<IpAddr> =
                AddressRangePermutation::with_rng(range, StdRng::seed_from_u64(seed))
                    .into_iter()
                    .collect();
            assert_eq!(addrs.len(), 4);
            let index = |addr: &IpAddr| match addr {
                IpAddr::V4(v4) => v4.octets()[3] as usize,
                IpAddr::V6(_) => panic!("unexpected family: {}", addr),
            };
            first[index(&addrs[0])] += 1;
            last[index(&addrs[3])] += 1;
        }
        for slot in 0..4 {
            assert!(first[slot] > 50, "address {} first {} times", slot, first[slot]);
            assert!(last[slot] > 50, "address {} last {} times", slot, last[slot]);
        }
    }

    #[test]
    fn test_picking_cursor_slot_records_nothing() {
        let high = ip("192.0.2.2");
        let mut picked_high = 0;
        for seed in 0..64 {
            let mut perm = seeded("192.0.2.1-192.0.2.2", seed);
            let (addr, done) = perm.next();
            assert!(!done);
            if addr == high {
                picked_high += 1;
                assert_eq!(perm.overrides_len(), 0);
            } else {
                assert_eq!(perm.overrides_len(), 1);
            }
            assert_ne!(perm.next(), (addr, true));
        }
        assert!(picked_high > 0 && picked_high < 64);
    }

    #[test]
    fn test_no_positional_bias() {
        const RUNS: usize = 4000;
        const LEN: usize = 8;
        let range: AddressRange = "192.0.2.0-192.0.2.7".parse().unwrap();
        let mut rank_sums = [0usize; LEN];
        let mut perm_rng = StdRng::seed_from_u64(42);
        for _ in 0..RUNS {
            let mut perm = AddressRangePermutation::with_rng(
                range,
                StdRng::seed_from_u64(perm_rng.gen()),
            );
            for rank in 0..LEN {
                let (addr, _) = perm.next();
                let IpAddr::V4(v4) = addr else {
                    panic!("unexpected family: {}", addr);
                };
                rank_sums[v4.octets()[3] as usize] += rank;
            }
        }
        let midpoint = (LEN - 1) as f64 / 2.0;
        for (slot, sum) in rank_sums.iter().enumerate() {
            let mean = *sum as f64 / RUNS as f64;
            assert!(
                (mean - midpoint).abs() < 0.25,
                "address {} has mean rank {}",
                slot,
                mean
            );
        }
    }
}
