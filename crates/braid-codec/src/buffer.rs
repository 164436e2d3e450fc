use memmap2::MmapMut;
use tracing::debug;

use crate::error::{CodecError, CodecResult};

/// Widest possible varint encoding of a `u32`.
pub const MAX_VARINT_WIDTH: usize = 5;

/// Smallest permitted segment capacity. A segment must be able to hold the
/// widest primitive written in a single call (a five-byte varint).
const MIN_SEGMENT_CAPACITY: usize = MAX_VARINT_WIDTH;

/// Growth factors below 1.0 would shrink segments until growth stalls.
const MIN_GROWTH_FACTOR: f64 = 1.0;

/// A decoded varint together with the number of bytes it occupied.
///
/// The buffer has no separators, so callers advance their cursor by `width`
/// to reach whatever follows the varint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VarInt {
    pub value: u32,
    pub width: usize,
}

/// Encode `value` as a little-endian base-128 varint into `out`.
///
/// Each byte carries seven value bits; the high bit is set on every byte
/// except the last. Returns the number of bytes written (1..=5).
pub(crate) fn encode_varint(mut value: u32, out: &mut [u8; MAX_VARINT_WIDTH]) -> usize {
    let mut width = 0;
    while value & !0x7F != 0 {
        out[width] = (value & 0x7F) as u8 | 0x80;
        width += 1;
        value >>= 7;
    }
    out[width] = value as u8;
    width + 1
}

/// Decode a varint from the start of `data`.
///
/// `offset` is used only to position error reports. A fifth byte with any of
/// its top four bits set cannot belong to a `u32` encoding and means the read
/// is misaligned or the buffer is corrupt.
pub(crate) fn decode_varint(data: &[u8], offset: u32) -> CodecResult<VarInt> {
    let mut value: u32 = 0;
    for (i, &byte) in data.iter().enumerate().take(MAX_VARINT_WIDTH) {
        if i == MAX_VARINT_WIDTH - 1 {
            if byte & 0xF0 != 0 {
                return Err(CodecError::InvalidVarInt { offset });
            }
            value |= u32::from(byte) << 28;
            return Ok(VarInt {
                value,
                width: MAX_VARINT_WIDTH,
            });
        }
        value |= u32::from(byte & 0x7F) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(VarInt {
                value,
                width: i + 1,
            });
        }
    }
    Err(CodecError::TruncatedVarInt { offset })
}

/// Backing storage for one segment.
///
/// Heap segments live in the allocator; direct segments are anonymous memory
/// maps. Addressing semantics are identical either way.
enum SegmentStore {
    Heap(Box<[u8]>),
    Direct(MmapMut),
}

struct Segment {
    store: SegmentStore,
    /// Bytes written so far. Only this prefix participates in the logical
    /// offset space; capacity beyond it in a retired segment is dead.
    len: usize,
}

impl Segment {
    fn allocate(capacity: usize, direct: bool) -> CodecResult<Self> {
        let store = if direct {
            SegmentStore::Direct(MmapMut::map_anon(capacity)?)
        } else {
            SegmentStore::Heap(vec![0u8; capacity].into_boxed_slice())
        };
        Ok(Self { store, len: 0 })
    }

    fn capacity(&self) -> usize {
        match &self.store {
            SegmentStore::Heap(bytes) => bytes.len(),
            SegmentStore::Direct(map) => map.len(),
        }
    }

    fn bytes(&self) -> &[u8] {
        match &self.store {
            SegmentStore::Heap(bytes) => bytes,
            SegmentStore::Direct(map) => map,
        }
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        match &mut self.store {
            SegmentStore::Heap(bytes) => bytes,
            SegmentStore::Direct(map) => map,
        }
    }
}

/// Append-only byte store over a list of geometrically growing segments.
///
/// A single logical offset addresses any written byte as though the segments
/// were concatenated. Offsets are permanent: segments are never rewritten,
/// compacted, or released. Writes only ever happen at the tail.
pub struct GrowableBuffer {
    /// Ordered segments; the last one is the active write target.
    segments: Vec<Segment>,
    growth_factor: f64,
    direct: bool,
    /// Combined written length of every retired segment.
    retired_len: usize,
}

impl GrowableBuffer {
    /// Allocate a buffer with the given initial segment capacity.
    ///
    /// The capacity is clamped up to the smallest usable segment and the
    /// growth factor up to 1.0.
    pub fn new(initial_capacity: usize, growth_factor: f64, direct: bool) -> CodecResult<Self> {
        let capacity = initial_capacity.max(MIN_SEGMENT_CAPACITY);
        let growth_factor = growth_factor.max(MIN_GROWTH_FACTOR);
        Ok(Self {
            segments: vec![Segment::allocate(capacity, direct)?],
            growth_factor,
            direct,
            retired_len: 0,
        })
    }

    /// Total allocated capacity across all segments, in bytes.
    pub fn size(&self) -> u64 {
        self.segments.iter().map(|s| s.capacity() as u64).sum()
    }

    /// Logical offset at which the next write will land.
    pub fn next_write_position(&self) -> u32 {
        (self.retired_len + self.active().len) as u32
    }

    /// Append a single byte.
    pub fn put_byte(&mut self, byte: u8) -> CodecResult<()> {
        self.reserve(1)?;
        let active = self.active_mut();
        let at = active.len;
        active.bytes_mut()[at] = byte;
        active.len += 1;
        Ok(())
    }

    /// Append `value` as a varint.
    ///
    /// The worst-case width is reserved up front, so a varint never spans a
    /// segment boundary.
    pub fn put_varint(&mut self, value: u32) -> CodecResult<()> {
        self.reserve(MAX_VARINT_WIDTH)?;
        let mut scratch = [0u8; MAX_VARINT_WIDTH];
        let width = encode_varint(value, &mut scratch);
        let active = self.active_mut();
        let at = active.len;
        active.bytes_mut()[at..at + width].copy_from_slice(&scratch[..width]);
        active.len += width;
        Ok(())
    }

    /// Read the byte at a logical offset.
    pub fn get_byte(&self, offset: u32) -> CodecResult<u8> {
        let (segment, local) = self.locate(offset)?;
        Ok(segment.bytes()[local])
    }

    /// Decode the varint starting at a logical offset.
    pub fn get_varint(&self, offset: u32) -> CodecResult<VarInt> {
        let (segment, local) = self.locate(offset)?;
        decode_varint(&segment.bytes()[local..segment.len], offset)
    }

    /// Translate a logical offset into a segment and a local index.
    ///
    /// Walks the segment list summing written lengths; O(number of
    /// segments), independent of buffer size.
    fn locate(&self, offset: u32) -> CodecResult<(&Segment, usize)> {
        let mut local = offset as usize;
        for segment in &self.segments {
            if local < segment.len {
                return Ok((segment, local));
            }
            local -= segment.len;
        }
        Err(CodecError::OffsetOutOfBounds {
            offset,
            written: self.next_write_position(),
        })
    }

    /// Make room for `needed` bytes in the active segment, retiring it and
    /// allocating the next one when it cannot fit the write.
    fn reserve(&mut self, needed: usize) -> CodecResult<()> {
        let (len, capacity) = {
            let active = self.active();
            (active.len, active.capacity())
        };
        if len + needed <= capacity {
            return Ok(());
        }
        let grown = (capacity as f64 * self.growth_factor).ceil() as usize;
        self.retired_len += len;
        self.segments.push(Segment::allocate(grown, self.direct)?);
        debug!(
            capacity = grown,
            segments = self.segments.len(),
            "buffer segment grown"
        );
        Ok(())
    }

    fn active(&self) -> &Segment {
        self.segments.last().expect("buffer always has a segment")
    }

    fn active_mut(&mut self) -> &mut Segment {
        self.segments
            .last_mut()
            .expect("buffer always has a segment")
    }
}

impl std::fmt::Debug for GrowableBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrowableBuffer")
            .field("segments", &self.segments.len())
            .field("written", &self.next_write_position())
            .field("capacity", &self.size())
            .finish()
    }
}
