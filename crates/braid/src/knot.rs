use std::cell::RefCell;
use std::rc::Rc;

use braid_codec::Lz78Engine;
use tracing::debug;

use crate::builder::KnotBuilder;
use crate::handle::Braid;
use crate::intern::{CommonStringInterner, MutableCommonStringInterner, Rememberer};
use crate::mutable::{MutableBraid, Slot};

/// Shared interior of a knot: the engine plus the interning policies chosen
/// at build time. Braids hold an `Rc` to this, which is what keeps a knot's
/// storage alive while any handle still references it.
pub(crate) struct KnotShared {
    storage: RefCell<Lz78Engine>,
    interners: Vec<CommonStringInterner>,
    rememberer: Rememberer,
    mutable_interners: Vec<MutableCommonStringInterner>,
}

impl KnotShared {
    pub(crate) fn new(
        engine: Lz78Engine,
        interners: Vec<CommonStringInterner>,
        rememberer: Rememberer,
        mutable_interners: Vec<MutableCommonStringInterner>,
    ) -> Self {
        Self {
            storage: RefCell::new(engine),
            interners,
            rememberer,
            mutable_interners,
        }
    }

    /// Compress `value` and return its storage index.
    pub(crate) fn store(&self, value: &str) -> u32 {
        self.storage
            .borrow_mut()
            .store(value.as_bytes())
            .expect("engine rejected a write")
    }

    /// Decompress the record at `index`.
    ///
    /// Indexes only ever come from this knot's own `store`, so decode
    /// failure means the engine's buffer invariants were broken.
    pub(crate) fn lookup(&self, index: u32) -> String {
        let bytes = self
            .storage
            .borrow()
            .lookup(index)
            .expect("corrupt compressed record");
        String::from_utf8(bytes).expect("stored record is not valid UTF-8")
    }

    /// Storage decision for a mutable handle: mutable interners first, then
    /// the engine.
    pub(crate) fn place(&self, value: &str) -> Slot {
        for (interner, policy) in self.mutable_interners.iter().enumerate() {
            if let Some(entry) = policy.attempt_to_intern(value) {
                return Slot::Interned { interner, entry };
            }
        }
        Slot::Stored {
            index: self.store(value),
        }
    }

    pub(crate) fn interned_value(&self, interner: usize, entry: usize) -> String {
        self.mutable_interners[interner].value(entry).to_string()
    }
}

/// Owner of one compression engine plus interning and memoization policy.
///
/// A knot is the unit of shared compressed storage: braids created through
/// it all compress into the same buffer and can share token chains. One knot
/// serves one thread; it is deliberately neither `Send` nor `Sync`, and the
/// `Rc` interior makes that explicit in the type system.
pub struct Knot {
    shared: Rc<KnotShared>,
}

impl Knot {
    /// Start configuring a new knot.
    pub fn builder() -> KnotBuilder {
        KnotBuilder::default()
    }

    pub(crate) fn from_shared(shared: Rc<KnotShared>) -> Self {
        Self { shared }
    }

    /// Wrap `value` in an immutable flyweight handle.
    ///
    /// `None` and the empty string map to process-wide sentinels without
    /// touching storage. Otherwise the rememberer is consulted first (it is
    /// cheaper than the interners on bursty repeats), then each interner in
    /// order, and only then is the value compressed into the engine.
    pub fn braid(&self, value: Option<&str>) -> Braid {
        let value = match value {
            None => return Braid::null(),
            Some(value) => value,
        };
        if value.is_empty() {
            return Braid::empty();
        }
        if let Some(recalled) = self.shared.rememberer.maybe_recall(value) {
            return recalled;
        }
        for interner in &self.shared.interners {
            if let Some(interned) = interner.attempt_to_intern(value) {
                return interned;
            }
        }
        let braid = Braid::stored(Rc::clone(&self.shared), self.shared.store(value));
        self.shared.rememberer.maybe_remember(value, &braid);
        braid
    }

    /// Wrap `value` in a mutable handle whose value can be reassigned.
    pub fn mutable_braid(&self, value: Option<&str>) -> MutableBraid {
        MutableBraid::new(Rc::clone(&self.shared), value)
    }

    /// Bytes held by the engine: buffer capacity plus dictionary tables.
    pub fn space_used(&self) -> u64 {
        self.shared.storage.borrow().space_used()
    }

    /// Discard the engine's dictionary, keeping the buffer.
    ///
    /// Existing braids stay valid; future stores lose cross-references to
    /// strings stored before the flush. Trades compression ratio for a
    /// bounded dictionary.
    pub fn flush(&self) {
        self.shared.storage.borrow_mut().flush();
        debug!(space = self.space_used(), "knot flushed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // Basic braid lifecycle
    // -----------------------------------------------------------------------

    #[test]
    fn braid_roundtrips_a_string() {
        let knot = Knot::builder().build().unwrap();
        let braid = knot.braid(Some("the theory"));
        assert_eq!(braid.get().as_deref(), Some("the theory"));
    }

    #[test]
    fn braids_share_one_compressed_pool() {
        let knot = Knot::builder().build().unwrap();
        let braids: Vec<Braid> = ["this", "that", "the other", "this", "that"]
            .into_iter()
            .map(|s| knot.braid(Some(s)))
            .collect();
        for (braid, expected) in braids.iter().zip(["this", "that", "the other", "this", "that"])
        {
            assert_eq!(braid.get().as_deref(), Some(expected));
        }
    }

    #[test]
    fn null_and_empty_are_sentinels() {
        let knot = Knot::builder().build().unwrap();
        let space_before = knot.space_used();
        let null = knot.braid(None);
        let empty = knot.braid(Some(""));
        assert_eq!(null.get(), None);
        assert_eq!(empty.get().as_deref(), Some(""));
        assert_ne!(null, empty);
        assert_ne!(null, knot.braid(Some("a")));
        assert_ne!(empty, knot.braid(Some("a")));
        // Sentinels never touched the engine; the "a" store may have.
        assert!(knot.space_used() >= space_before);
    }

    #[test]
    fn first_write_space_floor() {
        let knot = Knot::builder().build().unwrap();
        let braid = knot.braid(Some("this that the other"));
        assert!(knot.space_used() >= 128);
        assert_eq!(braid.get().as_deref(), Some("this that the other"));
    }

    // -----------------------------------------------------------------------
    // Rememberer
    // -----------------------------------------------------------------------

    #[test]
    fn remember_last_avoids_a_second_store() {
        let knot = Knot::builder().remember_last(1).build().unwrap();
        let first = knot.braid(Some("Hello World"));
        let space_after_first = knot.space_used();

        let second = knot.braid(Some("Hello World"));
        assert_eq!(knot.space_used(), space_after_first);
        assert_eq!(first, second);
        assert_eq!(second.get().as_deref(), Some("Hello World"));
    }

    #[test]
    fn rememberer_is_displaced_by_a_new_string() {
        let knot = Knot::builder().remember_last(1).build().unwrap();
        let hello = knot.braid(Some("hello"));
        knot.braid(Some("goodbye"));
        // "hello" is no longer remembered; a fresh record is stored but the
        // contents still agree.
        let hello_again = knot.braid(Some("hello"));
        assert_eq!(hello, hello_again);
    }

    // -----------------------------------------------------------------------
    // Interners
    // -----------------------------------------------------------------------

    #[test]
    fn common_strings_never_reach_the_engine() {
        let knot = Knot::builder().common(["Anonymous"]).build().unwrap();
        let space_before = knot.space_used();
        let braid = knot.braid(Some("Anonymous"));
        assert_eq!(knot.space_used(), space_before);
        assert_eq!(braid.get().as_deref(), Some("Anonymous"));
    }

    #[test]
    fn non_common_strings_still_compress() {
        let knot = Knot::builder().common(["Anonymous"]).build().unwrap();
        let braid = knot.braid(Some("Ada Lovelace"));
        assert_eq!(braid.get().as_deref(), Some("Ada Lovelace"));
        assert_eq!(braid, knot.braid(Some("Ada Lovelace")));
    }

    // -----------------------------------------------------------------------
    // Flush
    // -----------------------------------------------------------------------

    #[test]
    fn flush_preserves_existing_braids() {
        let knot = Knot::builder().build().unwrap();
        let braid = knot.braid(Some("before the flush"));
        let space_before = knot.space_used();
        knot.flush();
        assert!(knot.space_used() <= space_before);
        assert_eq!(braid.get().as_deref(), Some("before the flush"));
        let after = knot.braid(Some("after the flush"));
        assert_eq!(after.get().as_deref(), Some("after the flush"));
    }

    // -----------------------------------------------------------------------
    // Compression ratio (reference workload)
    // -----------------------------------------------------------------------

    #[test]
    fn repetitive_corpus_compresses_below_five_percent() {
        let knot = Knot::builder().build().unwrap();
        let line =
            "Science is the great antidote to the poison of enthusiasm and superstition.";
        let mut uncompressed_utf16 = 0u64;
        for _ in 0..10_000 {
            uncompressed_utf16 += 2 * line.len() as u64 + 2;
            knot.braid(Some(line));
        }
        let ratio = knot.space_used() as f64 / uncompressed_utf16 as f64;
        assert!(ratio < 0.05, "ratio {ratio} too large");

        let before = knot.space_used();
        knot.flush();
        assert!(knot.space_used() < before);
    }

    // -----------------------------------------------------------------------
    // Equality across configurations
    // -----------------------------------------------------------------------

    #[test]
    fn equality_holds_across_knot_configurations() {
        let configurations: Vec<fn() -> Knot> = vec![
            || Knot::builder().build().unwrap(),
            || Knot::builder().direct().build().unwrap(),
            || Knot::builder().remember_last(1).build().unwrap(),
            || Knot::builder().common(["a"]).build().unwrap(),
            || Knot::builder().common(["a", "Hello"]).build().unwrap(),
            || Knot::builder().common(["", "Hello"]).build().unwrap(),
            || Knot::builder().lz78(8).build().unwrap(),
        ];
        for first in &configurations {
            for second in &configurations {
                let k1 = first();
                let k2 = second();
                assert_eq!(k1.braid(None), k2.braid(None));
                assert_eq!(k1.braid(Some("")), k2.braid(Some("")));
                assert_eq!(k1.braid(Some("a")), k2.braid(Some("a")));
                assert_ne!(k1.braid(Some("a")), k2.braid(Some("b")));
                assert_ne!(k1.braid(None), k2.braid(Some("")));
            }
        }
    }

    #[test]
    fn hash_is_consistent_with_equality() {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        fn hash_of(braid: &Braid) -> u64 {
            let mut hasher = DefaultHasher::new();
            braid.hash(&mut hasher);
            hasher.finish()
        }

        let k1 = Knot::builder().build().unwrap();
        let k2 = Knot::builder().common(["shared"]).build().unwrap();
        let stored = k1.braid(Some("shared"));
        let interned = k2.braid(Some("shared"));
        assert_eq!(stored, interned);
        assert_eq!(hash_of(&stored), hash_of(&interned));
        // Repeated calls are stable.
        assert_eq!(hash_of(&stored), hash_of(&stored));
    }

    // -----------------------------------------------------------------------
    // Braids outlive the knot handle
    // -----------------------------------------------------------------------

    #[test]
    fn braid_keeps_storage_alive_after_knot_drop() {
        let braid = {
            let knot = Knot::builder().build().unwrap();
            knot.braid(Some("outlives its knot"))
        };
        assert_eq!(braid.get().as_deref(), Some("outlives its knot"));
    }
}
