// Run-length encoder.
//
// RunLengthEncoder accumulates one run at a time and emits a unit when the
// run ends, when it reaches MAX_RUN, or when the caller flushes. The two
// framing policies differ only in where the caller flushes:
//   - RowScoped:  after every row of the source grid
//   - FullBuffer: only at end of input

use crate::layout::grid::DecodedGrid;

use super::{MAX_RUN, RUN_MARKER};

// ---------------------------------------------------------------------------
// Framing
// ---------------------------------------------------------------------------

/// Where the run accumulator is forced closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Framing {
    /// Flush at every row boundary; rows decode independently.
    RowScoped,
    /// One accumulator over the whole grid in row-major order.
    FullBuffer,
}

impl Framing {
    pub const ALL: [Framing; 2] = [Framing::RowScoped, Framing::FullBuffer];

    /// Short name used in artifact file names.
    pub fn artifact_tag(self) -> &'static str {
        match self {
            Framing::RowScoped => "rle-row",
            Framing::FullBuffer => "rle-full",
        }
    }
}

// ---------------------------------------------------------------------------
// RunLengthEncoder
// ---------------------------------------------------------------------------

/// Stateful run accumulator writing into an owned buffer.
#[derive(Debug, Clone, Default)]
pub struct RunLengthEncoder {
    out: Vec<u8>,
    value: u8,
    count: usize,
}

impl RunLengthEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an encoder whose output buffer is pre-sized for `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            out: Vec::with_capacity(capacity),
            value: 0,
            count: 0,
        }
    }

    /// Feed one value.
    #[inline]
    pub fn push(&mut self, value: u8) {
        if self.count == 0 {
            self.value = value;
            self.count = 1;
        } else if value == self.value {
            self.count += 1;
            if self.count == MAX_RUN {
                self.emit();
            }
        } else {
            self.emit();
            self.value = value;
            self.count = 1;
        }
    }

    /// Feed a slice of values in order.
    pub fn push_slice(&mut self, values: &[u8]) {
        for &value in values {
            self.push(value);
        }
    }

    /// Close the pending run, if any.
    pub fn flush(&mut self) {
        if self.count != 0 {
            self.emit();
        }
    }

    /// Length of the run currently being accumulated.
    pub fn pending(&self) -> usize {
        self.count
    }

    /// Bytes emitted so far (excluding the pending run).
    pub fn len(&self) -> usize {
        self.out.len()
    }

    pub fn is_empty(&self) -> bool {
        self.out.is_empty() && self.count == 0
    }

    /// Flush and return the encoded bytes.
    pub fn finish(mut self) -> Vec<u8> {
        self.flush();
        self.out
    }

    fn emit(&mut self) {
        debug_assert!((1..=MAX_RUN).contains(&self.count));
        if self.count == 1 {
            self.out.push(self.value);
        } else {
            self.out.push(((self.count - 1) as u8) | RUN_MARKER);
            self.out.push(self.value);
        }
        self.count = 0;
    }
}

// ---------------------------------------------------------------------------
// Convenience functions
// ---------------------------------------------------------------------------

/// Encode a sequence of rows under the given framing policy.
pub fn encode_rows<'a, I>(rows: I, framing: Framing) -> Vec<u8>
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut encoder = RunLengthEncoder::new();
    for row in rows {
        encoder.push_slice(row);
        if framing == Framing::RowScoped {
            encoder.flush();
        }
    }
    encoder.finish()
}

/// Encode a decoded room in row-major order.
pub fn encode_grid(grid: &DecodedGrid, framing: Framing) -> Vec<u8> {
    let mut encoder = RunLengthEncoder::with_capacity(grid.len());
    for row in grid.rows() {
        encoder.push_slice(row);
        if framing == Framing::RowScoped {
            encoder.flush();
        }
    }
    encoder.finish()
}

/// Encode a flat slice as a single stream.
pub fn encode(values: &[u8]) -> Vec<u8> {
    let mut encoder = RunLengthEncoder::with_capacity(values.len());
    encoder.push_slice(values);
    encoder.finish()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
