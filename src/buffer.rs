//! The reusable I/O buffer and its on-disk layout.
//!
//! ```text
//! [0, 4)        sequence marker, u32, native byte order
//! [4, len)      FILLER repeated word by word
//! ```
//!
//! Trace-correlation tooling reads records back with exactly this layout, so
//! the marker field is only ever touched through the accessors below.

use std::alloc::{self, Layout};

use aligned_vec::{AVec, RuntimeAlign};

use crate::error::{Result, TraceIoError};

/// Width of the sequence marker and of every filler slot.
pub const WORD_SIZE: usize = std::mem::size_of::<u32>();
/// Buffers must be strictly larger than this.
pub const SEQUENCE_SIZE: usize = 2 * WORD_SIZE;
pub const INITIAL_MARKER: u32 = 0x1111_1111;
/// Keeps a record distinguishable from a zeroed page.
pub const FILLER: u32 = 0xDEAD_BEEF;
/// Page alignment, which also satisfies O_DIRECT on common block devices.
pub const BUFFER_ALIGNMENT: usize = 4096;

pub struct SequenceBuffer {
    data: AVec<u8, RuntimeAlign>,
}

impl SequenceBuffer {
    /// Allocate `len` bytes, stamp `marker` into the first word and fill every
    /// remaining whole word with [`FILLER`]. A trailing partial word stays
    /// zeroed.
    pub fn new(len: usize, marker: u32) -> Result<Self> {
        if len < WORD_SIZE {
            return Err(TraceIoError::Alloc { bytes: len });
        }
        let layout = Layout::from_size_align(len, BUFFER_ALIGNMENT).map_err(|_| TraceIoError::Alloc { bytes: len })?;
        // AVec::with_capacity aborts on OOM; allocate ourselves so a huge
        // num_bytes is reported instead.
        let ptr = unsafe { alloc::alloc_zeroed(layout) };
        if ptr.is_null() {
            return Err(TraceIoError::Alloc { bytes: len });
        }
        // Same size and alignment AVec frees with.
        let data = unsafe { AVec::<u8, RuntimeAlign>::from_raw_parts(ptr, BUFFER_ALIGNMENT, len, len) };

        let mut buf = SequenceBuffer { data };
        buf.set_marker(marker);
        let filler = FILLER.to_ne_bytes();
        for word in buf.data.as_mut_slice()[WORD_SIZE..].chunks_exact_mut(WORD_SIZE) {
            word.copy_from_slice(&filler);
        }
        Ok(buf)
    }

    pub fn marker(&self) -> u32 {
        let mut word = [0u8; WORD_SIZE];
        word.copy_from_slice(&self.data.as_slice()[..WORD_SIZE]);
        u32::from_ne_bytes(word)
    }

    pub fn set_marker(&mut self, marker: u32) {
        self.data.as_mut_slice()[..WORD_SIZE].copy_from_slice(&marker.to_ne_bytes());
    }

    /// Bump the marker for the next write. Wraps at `u32::MAX`.
    pub fn advance_marker(&mut self) -> u32 {
        let next = self.marker().wrapping_add(1);
        self.set_marker(next);
        next
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.len() == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        self.data.as_slice()
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        self.data.as_mut_slice()
    }

    /// Space-separated hex rows of 16 bytes, for the `debug-dump` build.
    pub fn hex_dump(&self) -> String {
        self.data
            .as_slice()
            .chunks(16)
            .map(|chunk| chunk.iter().map(|byte| format!("{:02X}", byte)).collect::<Vec<String>>().join(" "))
            .collect::<Vec<String>>()
            .join("\n")
    }
}

/// Split a record back into its marker and the words that follow it.
#[cfg(test)]
pub(crate) fn decode_record(record: &[u8]) -> Option<(u32, Vec<u32>)> {
    if record.len() < WORD_SIZE {
        return None;
    }
    let mut words = record
        .chunks_exact(WORD_SIZE)
        .map(|w| u32::from_ne_bytes([w[0], w[1], w[2], w[3]]));
    let marker = words.next()?;
    Some((marker, words.collect()))
}
