// Run-length coding for decoded room layouts.
//
// - `encoder`  RunLengthEncoder, a stateful run accumulator with two framing policies
// - `decoder`  inverse transform, used to verify and inspect encoded rooms
//
// Wire format, one unit per run of N identical values:
//
//   N == 1   value
//   N >= 2   (N - 1) | 0x80, value        (N <= 256)

pub mod decoder;
pub mod encoder;

pub use decoder::{RleError, Runs, decode, decode_runs};
pub use encoder::{Framing, RunLengthEncoder, encode, encode_grid, encode_rows};

/// Bit marking a run-length unit (as opposed to a literal).
pub const RUN_MARKER: u8 = 0x80;

/// Longest run a single unit can describe.
pub const MAX_RUN: usize = 256;
