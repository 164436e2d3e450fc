//! Transparent in-memory compression of repetitive strings.
//!
//! Applications holding many semantically similar strings -- object graphs
//! with repeated field values, record batches, denormalized caches -- spend
//! most of their memory on raw string storage. This crate replaces those
//! `String` fields with flyweight handles that compress into a shared pool
//! and decompress on demand.
//!
//! # Model
//!
//! - [`Knot`] -- owner of one LZ78 engine plus interning policy; the unit of
//!   shared compressed storage
//! - [`Braid`] -- immutable flyweight handle to one compressed string
//! - [`MutableBraid`] -- a handle whose value may be reassigned
//!
//! ```
//! use braid::Knot;
//!
//! let authors = Knot::builder().common(["Anonymous"]).build()?;
//!
//! // Store a Braid where a String field used to live.
//! let author = authors.braid(Some("Mary Wollstonecraft Shelley"));
//!
//! // Decompress on demand.
//! assert_eq!(author.get().as_deref(), Some("Mary Wollstonecraft Shelley"));
//! # Ok::<(), braid::KnotError>(())
//! ```
//!
//! # Design Rules
//!
//! 1. A knot and every handle it backs belong to one thread; nothing here is
//!    synchronized, and the types are deliberately not `Send`.
//! 2. Handle equality is content-based across knots and handle types.
//! 3. Compressed records are permanent: [`Knot::flush`] bounds dictionary
//!    memory but never invalidates a handle.

mod builder;
mod error;
mod handle;
mod intern;
mod knot;
mod mutable;

pub use builder::KnotBuilder;
pub use error::{KnotError, KnotResult};
pub use handle::Braid;
pub use knot::Knot;
pub use mutable::MutableBraid;
