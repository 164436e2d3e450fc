use std::cell::Cell;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::handle::{content_hash, Braid, NULL_HASH};
use crate::knot::KnotShared;

/// Where a mutable braid's current value lives.
///
/// Null is a sentinel state here rather than a storage delegation; interned
/// values are slot indexes into a fixed common-string table, since a
/// constant [`Braid`] cannot represent a value that may be reassigned.
pub(crate) enum Slot {
    Null,
    Interned { interner: usize, entry: usize },
    Stored { index: u32 },
}

/// Flyweight handle whose value may be reassigned.
///
/// Same content-based equality contract as [`Braid`], including across the
/// two handle types. Every `set` re-runs the knot's interning decision, so a
/// value may move between the engine and an interner table over the handle's
/// lifetime. The constructor always runs `set`, so an unset state is not
/// reachable.
pub struct MutableBraid {
    knot: Rc<KnotShared>,
    slot: Slot,
    /// Cached content hash; zero means not yet computed. Invalidated by
    /// `set`.
    hash: Cell<u64>,
}

impl MutableBraid {
    pub(crate) fn new(knot: Rc<KnotShared>, value: Option<&str>) -> Self {
        let mut braid = Self {
            knot,
            slot: Slot::Null,
            hash: Cell::new(0),
        };
        braid.set(value);
        braid
    }

    /// Decompress and return the current value; `None` means set to null.
    pub fn get(&self) -> Option<String> {
        match &self.slot {
            Slot::Null => None,
            Slot::Interned { interner, entry } => {
                Some(self.knot.interned_value(*interner, *entry))
            }
            Slot::Stored { index } => Some(self.knot.lookup(*index)),
        }
    }

    /// Reassign the value, re-running the interning decision.
    pub fn set(&mut self, value: Option<&str>) {
        self.hash.set(0);
        self.slot = match value {
            None => Slot::Null,
            Some(value) => self.knot.place(value),
        };
    }

    pub(crate) fn hash_value(&self) -> u64 {
        if matches!(self.slot, Slot::Null) {
            return NULL_HASH;
        }
        let mut cached = self.hash.get();
        if cached == 0 {
            cached = content_hash(self.get().expect("non-null slot").as_str());
            self.hash.set(cached);
        }
        cached
    }
}

impl PartialEq for MutableBraid {
    fn eq(&self, other: &Self) -> bool {
        self.hash_value() == other.hash_value() && self.get() == other.get()
    }
}

impl Eq for MutableBraid {}

impl PartialEq<Braid> for MutableBraid {
    fn eq(&self, other: &Braid) -> bool {
        self.hash_value() == other.hash_value() && self.get() == other.get()
    }
}

impl Hash for MutableBraid {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash_value());
    }
}

impl std::fmt::Debug for MutableBraid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.slot {
            Slot::Null => f.write_str("MutableBraid(null)"),
            Slot::Interned { interner, entry } => {
                write!(f, "MutableBraid(interned {interner}:{entry})")
            }
            Slot::Stored { index } => write!(f, "MutableBraid(stored @{index})"),
        }
    }
}
