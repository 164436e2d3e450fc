use std::rc::Rc;

use braid_codec::{
    GrowableBuffer, Lz78Engine, DEFAULT_BUFFER_CAPACITY, DEFAULT_DICTIONARY_CAPACITY,
    DEFAULT_DICTIONARY_LOAD_FACTOR, DEFAULT_GROWTH_FACTOR,
};

use crate::error::KnotResult;
use crate::intern::{CommonStringInterner, MutableCommonStringInterner, Rememberer};
use crate::knot::{Knot, KnotShared};

/// Configuration for a [`Knot`].
///
/// `build` consumes the builder, so one builder produces exactly one knot;
/// accidental reuse of shared mutable configuration is a compile error
/// rather than a runtime state check.
pub struct KnotBuilder {
    common: Vec<String>,
    remember_last: usize,
    buffer_capacity: usize,
    growth_factor: f64,
    dictionary_capacity: usize,
    dictionary_load_factor: f32,
    direct: bool,
}

impl Default for KnotBuilder {
    fn default() -> Self {
        Self {
            common: Vec::new(),
            remember_last: 0,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            growth_factor: DEFAULT_GROWTH_FACTOR,
            dictionary_capacity: DEFAULT_DICTIONARY_CAPACITY,
            dictionary_load_factor: DEFAULT_DICTIONARY_LOAD_FACTOR,
            direct: false,
        }
    }
}

impl KnotBuilder {
    /// Register strings to pre-intern as shared constants.
    ///
    /// Braids for these strings are built once up front and handed out
    /// without compressing anything. Duplicates are ignored.
    pub fn common<I, S>(mut self, strings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for string in strings {
            let string = string.into();
            if !self.common.contains(&string) {
                self.common.push(string);
            }
        }
        self
    }

    /// Enable last-value memoization. Only `count == 1` is supported; other
    /// values leave memoization off.
    pub fn remember_last(mut self, count: usize) -> Self {
        self.remember_last = count;
        self
    }

    /// Initial engine buffer capacity in bytes.
    pub fn lz78(mut self, initial_buffer_size: usize) -> Self {
        self.buffer_capacity = initial_buffer_size;
        self
    }

    /// Initial engine buffer capacity and segment growth factor.
    pub fn lz78_with_growth(mut self, initial_buffer_size: usize, growth_factor: f64) -> Self {
        self.buffer_capacity = initial_buffer_size;
        self.growth_factor = growth_factor;
        self
    }

    /// Dictionary slot count and load factor.
    pub fn lz78_dictionary(mut self, capacity: usize, load_factor: f32) -> Self {
        self.dictionary_capacity = capacity;
        self.dictionary_load_factor = load_factor;
        self
    }

    /// Back the engine buffer with anonymous memory maps instead of heap
    /// allocations. Addressing semantics are unchanged.
    pub fn direct(mut self) -> Self {
        self.direct = true;
        self
    }

    /// Assemble the knot.
    pub fn build(self) -> KnotResult<Knot> {
        let buffer = GrowableBuffer::new(self.buffer_capacity, self.growth_factor, self.direct)?;
        let engine = Lz78Engine::new(
            buffer,
            self.dictionary_capacity,
            self.dictionary_load_factor,
        );

        let common: Vec<Rc<str>> = self.common.iter().map(|s| Rc::from(s.as_str())).collect();
        let mut interners = Vec::new();
        let mut mutable_interners = Vec::new();
        if !common.is_empty() {
            interners.push(CommonStringInterner::new(&common));
            mutable_interners.push(MutableCommonStringInterner::new(&common));
        }
        let rememberer = if self.remember_last == 1 {
            Rememberer::last_one()
        } else {
            Rememberer::None
        };

        Ok(Knot::from_shared(Rc::new(KnotShared::new(
            engine,
            interners,
            rememberer,
            mutable_interners,
        ))))
    }
}
