use crate::comparer::{DefaultComparer, EqualityComparer};

const EMPTY: usize = usize::MAX;
const TOMBSTONE: usize = usize::MAX - 1;
const MINIMUM_BUCKETS: usize = 8;

#[derive(Debug, Clone)]
struct Entry<T> {
    hash: u64,
    value: T,
}

/// An open-addressed hash set that enumerates in insertion order.
///
/// Buckets hold indexes into an entry list. Entries are appended on
/// insertion and blanked on removal, so iteration order is first-insertion
/// order. The bucket table uses linear probing; removed buckets become
/// tombstones that are reclaimed the next time the table is rebuilt.
///
/// The return value of [`Set::add`] is what the dedup operators key on:
/// `true` exactly when the value was not yet present.
#[derive(Debug, Clone)]
pub struct Set<T, C = DefaultComparer> {
    comparer: C,
    buckets: Vec<usize>,
    entries: Vec<Option<Entry<T>>>,
    len: usize,
    tombstones: usize,
}

impl<T> Set<T, DefaultComparer>
where
    DefaultComparer: EqualityComparer<T>,
{
    pub fn new() -> Self {
        Self::with_comparer(DefaultComparer::new())
    }
}

impl<T> Default for Set<T, DefaultComparer>
where
    DefaultComparer: EqualityComparer<T>,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, C: EqualityComparer<T>> Set<T, C> {
    pub fn with_comparer(comparer: C) -> Self {
        Self {
            comparer,
            buckets: Vec::new(),
            entries: Vec::new(),
            len: 0,
            tombstones: 0,
        }
    }

    pub fn with_capacity(capacity: usize, comparer: C) -> Self {
        let mut set = Self::with_comparer(comparer);
        if capacity > 0 {
            set.buckets = vec![EMPTY; bucket_count_for(capacity)];
            set.entries.reserve(capacity);
        }
        set
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn comparer(&self) -> &C {
        &self.comparer
    }

    /// Insert a value. Returns `false` if an equal value was already present,
    /// in which case the set is left unchanged.
    pub fn add(&mut self, value: T) -> bool {
        self.reserve_one();
        let hash = self.comparer.hash(&value);
        let slot = match self.probe(&value, hash) {
            Probe::Found(_) => return false,
            Probe::Vacant(slot) => slot,
        };
        if self.buckets[slot] == TOMBSTONE {
            self.tombstones -= 1;
        }
        self.entries.push(Some(Entry { hash, value }));
        self.buckets[slot] = self.entries.len() - 1;
        self.len += 1;
        true
    }

    /// Remove a value. Returns `true` if it was present.
    pub fn remove(&mut self, value: &T) -> bool {
        if self.len == 0 {
            return false;
        }
        let hash = self.comparer.hash(value);
        match self.probe(value, hash) {
            Probe::Found(slot) => {
                let index = self.buckets[slot];
                self.entries[index] = None;
                self.buckets[slot] = TOMBSTONE;
                self.tombstones += 1;
                self.len -= 1;
                true
            }
            Probe::Vacant(_) => false,
        }
    }

    pub fn contains(&self, value: &T) -> bool {
        if self.len == 0 {
            return false;
        }
        let hash = self.comparer.hash(value);
        matches!(self.probe(value, hash), Probe::Found(_))
    }

    pub fn clear(&mut self) {
        self.buckets.iter_mut().for_each(|bucket| *bucket = EMPTY);
        self.entries.clear();
        self.len = 0;
        self.tombstones = 0;
    }

    /// Values in insertion order.
    pub fn iter(&self) -> SetIter<'_, T> {
        SetIter {
            entries: self.entries.iter(),
            remaining: self.len,
        }
    }

    /// Consume the set, returning values in insertion order.
    pub fn into_vec(self) -> Vec<T> {
        let mut values = Vec::with_capacity(self.len);
        values.extend(self.entries.into_iter().flatten().map(|entry| entry.value));
        values
    }

    fn probe(&self, value: &T, hash: u64) -> Probe {
        let mask = self.buckets.len() - 1;
        let mut slot = (hash as usize) & mask;
        let mut first_tombstone = None;
        // the load factor guarantees at least one empty bucket, so this
        // always terminates
        loop {
            match self.buckets[slot] {
                EMPTY => return Probe::Vacant(first_tombstone.unwrap_or(slot)),
                TOMBSTONE => {
                    if first_tombstone.is_none() {
                        first_tombstone = Some(slot);
                    }
                }
                index => {
                    if let Some(entry) = &self.entries[index] {
                        if entry.hash == hash && self.comparer.equals(&entry.value, value) {
                            return Probe::Found(slot);
                        }
                    }
                }
            }
            slot = (slot + 1) & mask;
        }
    }

    fn reserve_one(&mut self) {
        let capacity = self.buckets.len();
        if (self.len + self.tombstones + 1) * 4 <= capacity * 3 {
            return;
        }
        let buckets = if (self.len + 1) * 4 > capacity * 3 / 2 {
            // genuinely full: grow geometrically
            (capacity * 2).max(MINIMUM_BUCKETS)
        } else {
            // mostly tombstones: rebuild at the same size
            capacity
        };
        self.rebuild(buckets);
    }

    fn rebuild(&mut self, bucket_count: usize) {
        let entries: Vec<Option<Entry<T>>> = std::mem::take(&mut self.entries)
            .into_iter()
            .filter(Option::is_some)
            .collect();
        self.buckets = vec![EMPTY; bucket_count];
        let mask = bucket_count - 1;
        for (index, entry) in entries.iter().enumerate() {
            if let Some(entry) = entry {
                let mut slot = (entry.hash as usize) & mask;
                while self.buckets[slot] != EMPTY {
                    slot = (slot + 1) & mask;
                }
                self.buckets[slot] = index;
            }
        }
        self.entries = entries;
        self.tombstones = 0;
    }
}

impl<T, C: EqualityComparer<T>> Extend<T> for Set<T, C> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.add(value);
        }
    }
}

impl<T> FromIterator<T> for Set<T, DefaultComparer>
where
    DefaultComparer: EqualityComparer<T>,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Set::new();
        set.extend(iter);
        set
    }
}

enum Probe {
    Found(usize),
    Vacant(usize),
}

fn bucket_count_for(capacity: usize) -> usize {
    // keep the requested capacity under the 3/4 load factor
    let needed = capacity.saturating_mul(4) / 3 + 1;
    needed.next_power_of_two().max(MINIMUM_BUCKETS)
}

/// Iterator over a [`Set`] in insertion order.
pub struct SetIter<'a, T> {
    entries: std::slice::Iter<'a, Option<Entry<T>>>,
    remaining: usize,
}

impl<'a, T> Iterator for SetIter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        for entry in self.entries.by_ref() {
            if let Some(entry) = entry {
                self.remaining -= 1;
                return Some(&entry.value);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}
