use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::handle::Braid;

/// Interner over a fixed set of common strings.
///
/// Constant braids for every registered string are pre-built at construction;
/// a hit hands one of them out without ever touching the engine. The set is
/// expected to be small, so lookup is a linear equality scan.
pub(crate) struct CommonStringInterner {
    entries: Vec<(Rc<str>, Braid)>,
}

impl CommonStringInterner {
    pub(crate) fn new(strings: &[Rc<str>]) -> Self {
        Self {
            entries: strings
                .iter()
                .map(|s| (Rc::clone(s), Braid::interned(Rc::clone(s))))
                .collect(),
        }
    }

    pub(crate) fn attempt_to_intern(&self, value: &str) -> Option<Braid> {
        self.entries
            .iter()
            .find(|(s, _)| **s == *value)
            .map(|(_, braid)| braid.clone())
    }
}

/// Mutable-handle variant of the common-string interner.
///
/// A mutable braid cannot hold a constant [`Braid`] (its value changes), so a
/// hit is reported as a slot index into the fixed table instead.
pub(crate) struct MutableCommonStringInterner {
    lookup: HashMap<Rc<str>, usize>,
    entries: Vec<Rc<str>>,
}

impl MutableCommonStringInterner {
    pub(crate) fn new(strings: &[Rc<str>]) -> Self {
        let entries: Vec<Rc<str>> = strings.iter().map(Rc::clone).collect();
        let lookup = entries
            .iter()
            .enumerate()
            .map(|(index, s)| (Rc::clone(s), index))
            .collect();
        Self { lookup, entries }
    }

    pub(crate) fn attempt_to_intern(&self, value: &str) -> Option<usize> {
        self.lookup.get(value).copied()
    }

    pub(crate) fn value(&self, entry: usize) -> &str {
        &self.entries[entry]
    }
}

/// Short-circuit cache consulted before the engine stores a string.
///
/// Strategies form a closed set picked at build time. The shipped policy
/// remembers the single most recent (string, braid) pair, which pays off on
/// bursty repeated access to one value.
pub(crate) enum Rememberer {
    None,
    LastOne(RefCell<Option<(String, Braid)>>),
}

impl Rememberer {
    pub(crate) fn last_one() -> Self {
        Self::LastOne(RefCell::new(None))
    }

    pub(crate) fn maybe_remember(&self, key: &str, value: &Braid) {
        match self {
            Self::None => {}
            Self::LastOne(cell) => {
                *cell.borrow_mut() = Some((key.to_owned(), value.clone()));
            }
        }
    }

    pub(crate) fn maybe_recall(&self, key: &str) -> Option<Braid> {
        match self {
            Self::None => None,
            Self::LastOne(cell) => cell
                .borrow()
                .as_ref()
                .and_then(|(last_key, braid)| (last_key == key).then(|| braid.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rcs(strings: &[&str]) -> Vec<Rc<str>> {
        strings.iter().map(|s| Rc::from(*s)).collect()
    }

    #[test]
    fn common_interner_hits_and_misses() {
        let interner = CommonStringInterner::new(&rcs(&["Anonymous", "Unknown"]));
        assert!(interner.attempt_to_intern("Anonymous").is_some());
        assert!(interner.attempt_to_intern("Unknown").is_some());
        assert!(interner.attempt_to_intern("Someone").is_none());
    }

    #[test]
    fn common_interner_hit_is_constant() {
        let interner = CommonStringInterner::new(&rcs(&["Anonymous"]));
        let first = interner.attempt_to_intern("Anonymous").unwrap();
        let second = interner.attempt_to_intern("Anonymous").unwrap();
        assert_eq!(first, second);
        assert_eq!(first.get().as_deref(), Some("Anonymous"));
    }

    #[test]
    fn mutable_interner_returns_slot_indexes() {
        let interner = MutableCommonStringInterner::new(&rcs(&["red", "green", "blue"]));
        let slot = interner.attempt_to_intern("green").unwrap();
        assert_eq!(interner.value(slot), "green");
        assert!(interner.attempt_to_intern("mauve").is_none());
    }

    #[test]
    fn last_one_rememberer_keeps_only_the_latest() {
        let rememberer = Rememberer::last_one();
        let first = Braid::interned(Rc::from("first"));
        let second = Braid::interned(Rc::from("second"));

        rememberer.maybe_remember("first", &first);
        assert!(rememberer.maybe_recall("first").is_some());

        rememberer.maybe_remember("second", &second);
        assert!(rememberer.maybe_recall("first").is_none());
        assert_eq!(
            rememberer.maybe_recall("second").unwrap().get().as_deref(),
            Some("second")
        );
    }

    #[test]
    fn none_rememberer_never_recalls() {
        let rememberer = Rememberer::None;
        let braid = Braid::interned(Rc::from("value"));
        rememberer.maybe_remember("value", &braid);
        assert!(rememberer.maybe_recall("value").is_none());
    }
}
