use tracing::{debug, trace};

use crate::buffer::GrowableBuffer;
use crate::dictionary::HashOnlyDictionary;
use crate::error::CodecResult;

/// Default initial buffer segment capacity in bytes.
pub const DEFAULT_BUFFER_CAPACITY: usize = 128;
/// Default buffer segment growth factor.
pub const DEFAULT_GROWTH_FACTOR: f64 = 1.5;
/// Default dictionary slot count.
pub const DEFAULT_DICTIONARY_CAPACITY: usize = 64;
/// Default dictionary load factor.
pub const DEFAULT_DICTIONARY_LOAD_FACTOR: f32 = 0.75;

/// LZ78 compression engine over one buffer and one approximate dictionary.
///
/// Each stored byte sequence becomes a *record*: a varint byte length
/// followed by tokens of one literal byte plus a varint back-pointer (0 for
/// none, else the buffer offset of the token for the preceding byte of the
/// phrase). Records share suffix tokens across strings through those
/// pointers, which is where the compression comes from.
///
/// Back-pointer 0 doubles as the chain terminator. That sacrifices offset 0
/// as a token position, which is safe: offset 0 always holds the first
/// record's length varint.
#[derive(Debug)]
pub struct Lz78Engine {
    buffer: GrowableBuffer,
    dictionary: HashOnlyDictionary,
    dictionary_capacity: usize,
    dictionary_load_factor: f32,
}

impl Lz78Engine {
    pub fn new(
        buffer: GrowableBuffer,
        dictionary_capacity: usize,
        dictionary_load_factor: f32,
    ) -> Self {
        Self {
            buffer,
            dictionary: HashOnlyDictionary::new(dictionary_capacity, dictionary_load_factor),
            dictionary_capacity,
            dictionary_load_factor,
        }
    }

    /// Compress `bytes` into the buffer and return the record's offset.
    ///
    /// The dictionary only proposes prefix lengths by hash, so every
    /// candidate is confirmed against actual buffer contents and the claimed
    /// length backs off one byte at a time until a confirmed match (possibly
    /// none) is found.
    pub fn store(&mut self, bytes: &[u8]) -> CodecResult<u32> {
        let start = self.buffer.next_write_position();
        let total = bytes.len();
        self.buffer.put_varint(total as u32)?;

        let mut consumed = 0;
        while consumed < total {
            let token_pos = self.buffer.next_write_position();
            let remaining = total - consumed;
            // The record's final byte is always spent as a literal, so the
            // prefix search may claim at most remaining - 1 bytes.
            let mut length = self
                .dictionary
                .index_of_longest_possible_prefix(bytes, consumed, remaining - 1)
                .map_or(0, |index| index + 1);
            let mut confirmed = None;
            while length > 0 {
                let candidates = self.dictionary.get(bytes, consumed, length);
                confirmed = self.confirm(&candidates, bytes, consumed, length)?;
                if confirmed.is_some() {
                    break;
                }
                length -= 1;
            }
            self.buffer.put_byte(bytes[consumed + length])?;
            self.buffer.put_varint(confirmed.unwrap_or(0))?;
            if consumed + length + 1 != total {
                self.dictionary.put(bytes, consumed, length + 1, token_pos);
            }
            consumed += length + 1;
        }
        trace!(offset = start, bytes = total, "record stored");
        Ok(start)
    }

    /// Walk each candidate's back-pointer chain, comparing reconstructed
    /// bytes (which arrive last-first) against `bytes[offset..offset + length]`.
    ///
    /// A candidate fails on a byte mismatch or on a chain longer or shorter
    /// than the queried length; hash collisions make all three routine.
    fn confirm(
        &self,
        candidates: &[u32],
        bytes: &[u8],
        offset: usize,
        length: usize,
    ) -> CodecResult<Option<u32>> {
        'candidates: for &candidate in candidates {
            let mut pointer = candidate;
            let mut matched = 0;
            while pointer > 0 {
                if matched >= length {
                    continue 'candidates;
                }
                let literal = self.buffer.get_byte(pointer)?;
                if bytes[offset + length - 1 - matched] != literal {
                    continue 'candidates;
                }
                matched += 1;
                pointer = self.buffer.get_varint(pointer + 1)?.value;
            }
            if matched == length {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }

    /// Decompress the record at `offset`.
    ///
    /// Pure function of the buffer contents: the dictionary is never
    /// consulted, so records survive any number of [`flush`](Self::flush)es.
    pub fn lookup(&self, offset: u32) -> CodecResult<Vec<u8>> {
        let header = self.buffer.get_varint(offset)?;
        let total = header.value as usize;
        let mut result = Vec::with_capacity(total);
        let mut phrase = Vec::new();
        let mut cursor = offset + header.width as u32;
        while result.len() < total {
            phrase.clear();
            let mut pointer = cursor;
            while pointer > 0 {
                let literal = self.buffer.get_byte(pointer)?;
                let back = self.buffer.get_varint(pointer + 1)?;
                if pointer == cursor {
                    // First hop only: step the cursor past this token.
                    cursor += 1 + back.width as u32;
                }
                pointer = back.value;
                phrase.push(literal);
            }
            result.extend(phrase.iter().rev());
        }
        Ok(result)
    }

    /// Discard the dictionary, keeping the buffer.
    ///
    /// Every previously returned offset stays decodable; future stores lose
    /// match opportunities against pre-flush records. This bounds dictionary
    /// memory at the cost of compression ratio.
    pub fn flush(&mut self) {
        debug!(discarded = self.dictionary.len(), "dictionary flushed");
        self.dictionary =
            HashOnlyDictionary::new(self.dictionary_capacity, self.dictionary_load_factor);
    }

    /// Bytes held by the buffer and the dictionary combined.
    pub fn space_used(&self) -> u64 {
        self.buffer.size() + self.dictionary.space_used()
    }
}
