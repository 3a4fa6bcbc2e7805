// Run-length decoder.
//
// Inverse of `encoder`. A byte with bit 7 clear is a literal; a byte with
// bit 7 set is a marker whose low seven bits hold the run length minus one,
// followed by the run value.
//
// The marker keeps only seven bits of the count, so runs longer than 128
// alias onto shorter ones. Room layouts never produce such runs under
// row-scoped framing, and tile references never set bit 7.

use super::RUN_MARKER;

/// Error produced while decoding a run-length stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RleError {
    /// A marker byte was the last byte of the input.
    #[error("run marker at offset {offset} has no value byte")]
    TruncatedRun { offset: usize },
}

/// Iterator over the `(value, length)` runs of an encoded stream.
#[derive(Debug, Clone)]
pub struct Runs<'a> {
    data: &'a [u8],
    pos: usize,
}

impl Iterator for Runs<'_> {
    type Item = Result<(u8, usize), RleError>;

    fn next(&mut self) -> Option<Self::Item> {
        let &byte = self.data.get(self.pos)?;
        let offset = self.pos;
        self.pos += 1;

        if byte & RUN_MARKER == 0 {
            return Some(Ok((byte, 1)));
        }

        match self.data.get(self.pos) {
            Some(&value) => {
                self.pos += 1;
                Some(Ok((value, usize::from(byte & !RUN_MARKER) + 1)))
            }
            None => {
                // Stop after reporting the error once.
                self.pos = self.data.len();
                Some(Err(RleError::TruncatedRun { offset }))
            }
        }
    }
}

/// Iterate the runs of `encoded` without materializing them.
pub fn decode_runs(encoded: &[u8]) -> Runs<'_> {
    Runs {
        data: encoded,
        pos: 0,
    }
}

/// Decode a run-length stream into its values.
pub fn decode(encoded: &[u8]) -> Result<Vec<u8>, RleError> {
    let mut out = Vec::with_capacity(encoded.len() * 2);
    for run in decode_runs(encoded) {
        let (value, len) = run?;
        out.resize(out.len() + len, value);
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
