use std::cell::Cell;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::knot::KnotShared;
use crate::mutable::MutableBraid;

/// Fixed hash for the process-wide null sentinel.
pub(crate) const NULL_HASH: u64 = 0;

/// Content hash shared by every handle type: polynomial over the UTF-8
/// bytes, seeded so the empty string hashes to a fixed nonzero value.
pub(crate) fn content_hash(value: &str) -> u64 {
    value
        .bytes()
        .fold(1u64, |hash, byte| hash.wrapping_mul(31).wrapping_add(u64::from(byte)))
}

/// Immutable flyweight handle to one compressed string.
///
/// A braid is either one of two process-wide sentinels (null, empty string),
/// a constant interned string, or an offset into a knot's compressed
/// storage. `get` on a stored braid re-decompresses on every call; only the
/// content hash is cached.
///
/// Equality and hashing are content-based: two braids are equal exactly when
/// their decompressed contents are equal, regardless of which knot (if any)
/// backs them. Hashes are compared first, and contents are decompressed for
/// comparison on every hash tie.
#[derive(Clone)]
pub struct Braid {
    repr: Repr,
}

#[derive(Clone)]
enum Repr {
    Null,
    Empty,
    Interned(Rc<str>),
    Stored {
        knot: Rc<KnotShared>,
        index: u32,
        /// Cached content hash; zero means not yet computed.
        hash: Cell<u64>,
    },
}

impl Braid {
    pub(crate) fn null() -> Self {
        Self { repr: Repr::Null }
    }

    pub(crate) fn empty() -> Self {
        Self { repr: Repr::Empty }
    }

    pub(crate) fn interned(value: Rc<str>) -> Self {
        Self {
            repr: Repr::Interned(value),
        }
    }

    pub(crate) fn stored(knot: Rc<KnotShared>, index: u32) -> Self {
        Self {
            repr: Repr::Stored {
                knot,
                index,
                hash: Cell::new(0),
            },
        }
    }

    /// Decompress and return the value; `None` is the null braid.
    pub fn get(&self) -> Option<String> {
        match &self.repr {
            Repr::Null => None,
            Repr::Empty => Some(String::new()),
            Repr::Interned(value) => Some(value.to_string()),
            Repr::Stored { knot, index, .. } => Some(knot.lookup(*index)),
        }
    }

    pub(crate) fn hash_value(&self) -> u64 {
        match &self.repr {
            Repr::Null => NULL_HASH,
            Repr::Empty => content_hash(""),
            Repr::Interned(value) => content_hash(value),
            Repr::Stored { knot, index, hash } => {
                let mut cached = hash.get();
                if cached == 0 {
                    cached = content_hash(&knot.lookup(*index));
                    hash.set(cached);
                }
                cached
            }
        }
    }
}

impl PartialEq for Braid {
    fn eq(&self, other: &Self) -> bool {
        self.hash_value() == other.hash_value() && self.get() == other.get()
    }
}

impl Eq for Braid {}

impl PartialEq<MutableBraid> for Braid {
    fn eq(&self, other: &MutableBraid) -> bool {
        self.hash_value() == other.hash_value() && self.get() == other.get()
    }
}

impl Hash for Braid {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash_value());
    }
}

impl std::fmt::Debug for Braid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.repr {
            Repr::Null => f.write_str("Braid(null)"),
            Repr::Empty => f.write_str("Braid(\"\")"),
            Repr::Interned(value) => write!(f, "Braid(interned {value:?})"),
            Repr::Stored { index, .. } => write!(f, "Braid(stored @{index})"),
        }
    }
}
