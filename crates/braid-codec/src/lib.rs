//! LZ78 compression engine for the braid string pool.
//!
//! This crate is the storage core beneath the `braid` flyweight API. Strings
//! arrive as UTF-8 byte sequences and leave as integer offsets into an
//! append-only buffer; the offsets are permanent handles that decode back to
//! the original bytes on demand.
//!
//! # Components
//!
//! - [`GrowableBuffer`] -- append-only byte store over geometrically growing
//!   segments, addressed by one logical offset space, with the varint codec
//!   embedded
//! - [`HashOnlyDictionary`] -- open-addressed table of prefix hashes to
//!   buffer offsets; returns unverified candidates by design
//! - [`Lz78Engine`] -- `store`/`lookup` over both, encoding strings as
//!   chains of (literal byte, back-pointer) tokens
//!
//! # Design Rules
//!
//! 1. The buffer is append-only: offsets never move and are never reused.
//! 2. The dictionary stores hashes only; every candidate it returns must be
//!    confirmed against the buffer before use. Collapsing that confirmation
//!    into the dictionary would turn expected hash collisions into silent
//!    corruption.
//! 3. One engine, one owner: nothing here is synchronized.

pub mod buffer;
pub mod dictionary;
pub mod engine;
pub mod error;

// Re-export primary types at crate root for ergonomic imports.
pub use buffer::{GrowableBuffer, VarInt};
pub use dictionary::HashOnlyDictionary;
pub use engine::{
    Lz78Engine, DEFAULT_BUFFER_CAPACITY, DEFAULT_DICTIONARY_CAPACITY,
    DEFAULT_DICTIONARY_LOAD_FACTOR, DEFAULT_GROWTH_FACTOR,
};
pub use error::{CodecError, CodecResult};
