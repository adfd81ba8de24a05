use lru::LruCache;
use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::num::NonZeroUsize;

/// Bounded two-way assignment of keys to values drawn from an iterator.
///
/// Fed with a shuffled address iterator this hands out addresses in random
/// order. When the table is full the least recently used key loses its value,
/// which goes back into a recycle queue ahead of fresh values.
pub struct LookupPool<A, B, I> {
    iterator: I,
    pool: VecDeque<B>,
    forward: LruCache<A, B>,
    reverse: HashMap<B, A>,
}

impl<A, B, I> LookupPool<A, B, I>
where
    A: Eq + Hash + Clone,
    B: Eq + Hash + Copy,
    I: Iterator<Item = B>,
{
    pub fn new(iterator: I, capacity: NonZeroUsize) -> Self {
        Self {
            iterator,
            pool: VecDeque::new(),
            forward: LruCache::new(capacity),
            reverse: HashMap::new(),
        }
    }

    /// Value assigned to `a`, assigning a fresh one if needed.
    ///
    /// The flag is true when `a` already had a value. Returns `None` once the
    /// iterator and the recycle queue are both empty.
    pub fn get_forward(&mut self, a: &A) -> Option<(bool, B)> {
        if let Some(b) = self.forward.get(a) {
            return Some((true, *b));
        }
        loop {
            let b = self.pool.pop_front().or_else(|| self.iterator.next())?;
            // insert_forward can reserve anything, so skip values already taken
            if self.reverse.contains_key(&b) {
                log::trace!("skipping reserved value");
                continue;
            }
            self.assign(a, b);
            return Some((false, b));
        }
    }

    pub fn get_reverse(&self, b: &B) -> Option<&A> {
        self.reverse.get(b)
    }

    pub fn insert_forward(&mut self, a: &A, b: B) {
        self.assign(a, b);
    }

    fn assign(&mut self, a: &A, b: B) {
        if let Some((evicted, v)) = self.forward.push(a.clone(), b) {
            if v != b {
                // Only drop the reverse entry if it still points at the old key
                if self.reverse.get(&v) == Some(&evicted) {
                    self.reverse.remove(&v);
                }
                self.pool.push_back(v);
            }
        }
        if let Some(previous) = self.reverse.insert(b, a.clone()) {
            // A value belongs to one key only; the reservation wins
            if previous != *a {
                self.forward.pop(&previous);
            }
        }
    }

    pub fn cap(&self) -> usize {
        self.forward.cap().get()
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// Forgets every assignment and draws from `iterator` from now on.
    pub fn reset(&mut self, iterator: I, capacity: NonZeroUsize) {
        self.iterator = iterator;
        self.pool.clear();
        self.reverse.clear();
        self.forward.clear();
        self.forward.resize(capacity);
    }

    pub fn contains(&self, a: &A) -> bool {
        self.forward.contains(a)
    }
}
