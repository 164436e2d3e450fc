use tracing::debug;

/// Hard ceiling on table capacity. Past this point growth silently stops and
/// probe chains lengthen instead; insertion never fails.
const MAX_CAPACITY: usize = (i32::MAX - 8) as usize;

/// Stored hashes are masked non-negative before probing so the slot index
/// arithmetic stays in range.
const HASH_MASK: u32 = 0x7FFF_FFFF;

/// Open-addressed dictionary mapping hashes of byte-sequence prefixes to
/// buffer offsets.
///
/// The key bytes are never stored, only their hash, so `get` returns
/// *candidate* offsets that may include false positives. Callers must verify
/// every candidate against the actual buffer contents before trusting it;
/// hash collisions here are expected operation, not a fault.
///
/// Slots hold `value + 1` so that a zeroed table reads as all-empty.
pub struct HashOnlyDictionary {
    values: Vec<u32>,
    hashes: Vec<u32>,
    elements: usize,
    load_factor: f32,
    threshold: usize,
}

fn threshold_for(capacity: usize, load_factor: f32) -> usize {
    ((capacity as f64 * f64::from(load_factor)) as usize).min(MAX_CAPACITY + 1)
}

/// One step of the polynomial rolling hash, unmasked.
fn extend_hash(hash: u32, byte: u8) -> u32 {
    hash.wrapping_mul(31).wrapping_add(u32::from(byte))
}

fn prefix_hash(key: &[u8], offset: usize, len: usize) -> u32 {
    let mut hash: u32 = 1;
    for &byte in &key[offset..offset + len] {
        hash = extend_hash(hash, byte);
    }
    hash & HASH_MASK
}

impl HashOnlyDictionary {
    pub fn new(initial_capacity: usize, load_factor: f32) -> Self {
        let capacity = initial_capacity.max(1);
        Self {
            values: vec![0; capacity],
            hashes: vec![0; capacity],
            elements: 0,
            load_factor,
            threshold: threshold_for(capacity, load_factor),
        }
    }

    /// Number of entries stored.
    pub fn len(&self) -> usize {
        self.elements
    }

    /// Returns `true` if no entries are stored.
    pub fn is_empty(&self) -> bool {
        self.elements == 0
    }

    /// Current slot count.
    pub fn capacity(&self) -> usize {
        self.values.len()
    }

    /// Bytes of table storage: two `u32` arrays.
    pub fn space_used(&self) -> u64 {
        (self.values.len() * 2 * std::mem::size_of::<u32>()) as u64
    }

    /// Store `value` under the first `len` bytes of `key` at `offset`.
    ///
    /// Rehashes first when occupancy has reached the load-factor threshold.
    /// Deletion is unsupported, so slots only ever fill.
    pub fn put(&mut self, key: &[u8], offset: usize, len: usize, value: u32) {
        if self.elements >= self.threshold {
            self.rehash();
        }
        let hash = prefix_hash(key, offset, len);
        let capacity = self.values.len();
        let mut slot = (hash as usize) % capacity;
        while self.values[slot] != 0 {
            slot = (slot + 1) % capacity;
        }
        self.values[slot] = value + 1;
        self.hashes[slot] = hash;
        self.elements += 1;
    }

    /// Candidate offsets for the first `len` bytes of `key` at `offset`.
    ///
    /// Scans the contiguous occupied run from the hash's home slot; entries
    /// with other hashes inside the run are collision debris and are skipped,
    /// not stopped at.
    pub fn get(&self, key: &[u8], offset: usize, len: usize) -> Vec<u32> {
        self.candidates(prefix_hash(key, offset, len))
    }

    /// Index of the last byte of the longest prefix of `key[offset..]` that
    /// has at least one candidate, considering at most `max_len` bytes.
    ///
    /// The rolling hash is extended one byte at a time, so a full scan of an
    /// n-byte range costs O(n) hash work rather than O(n^2). Returns `None`
    /// when even the one-byte prefix has no candidate.
    pub fn index_of_longest_possible_prefix(
        &self,
        key: &[u8],
        offset: usize,
        max_len: usize,
    ) -> Option<usize> {
        let mut raw: u32 = 1;
        let mut best = None;
        for len in 1..=max_len {
            raw = extend_hash(raw, key[offset + len - 1]);
            if !self.has_candidate(raw & HASH_MASK) {
                break;
            }
            best = Some(len - 1);
        }
        best
    }

    fn candidates(&self, hash: u32) -> Vec<u32> {
        let capacity = self.values.len();
        let start = (hash as usize) % capacity;
        let mut result = Vec::new();
        for probed in 0..capacity {
            let slot = (start + probed) % capacity;
            if self.values[slot] == 0 {
                break;
            }
            if self.hashes[slot] == hash {
                result.push(self.values[slot] - 1);
            }
        }
        result
    }

    fn has_candidate(&self, hash: u32) -> bool {
        let capacity = self.values.len();
        let start = (hash as usize) % capacity;
        for probed in 0..capacity {
            let slot = (start + probed) % capacity;
            if self.values[slot] == 0 {
                return false;
            }
            if self.hashes[slot] == hash {
                return true;
            }
        }
        false
    }

    /// Double-plus-one the table and re-insert every entry with the same
    /// linear-probe discipline. At `MAX_CAPACITY` growth stops for good.
    fn rehash(&mut self) {
        let old_capacity = self.values.len();
        if old_capacity == MAX_CAPACITY {
            return;
        }
        let new_capacity = (old_capacity * 2 + 1).min(MAX_CAPACITY);
        debug!(
            from = old_capacity,
            to = new_capacity,
            elements = self.elements,
            "dictionary rehash"
        );
        let old_values = std::mem::replace(&mut self.values, vec![0; new_capacity]);
        let old_hashes = std::mem::replace(&mut self.hashes, vec![0; new_capacity]);
        self.threshold = threshold_for(new_capacity, self.load_factor);
        for (value, hash) in old_values.into_iter().zip(old_hashes) {
            if value != 0 {
                let mut slot = (hash as usize) % new_capacity;
                while self.values[slot] != 0 {
                    slot = (slot + 1) % new_capacity;
                }
                self.values[slot] = value;
                self.hashes[slot] = hash;
            }
        }
    }
}

impl std::fmt::Debug for HashOnlyDictionary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashOnlyDictionary")
            .field("elements", &self.elements)
            .field("capacity", &self.values.len())
            .finish()
    }
}
