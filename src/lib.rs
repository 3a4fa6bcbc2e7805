//! Roomlayout: packed room layout decoding and run-length analysis.
//!
//! The crate provides:
//! - Column-table room decoding for overworld and underworld maps (`layout`)
//! - Run-length encoding with row-scoped and full-buffer framing (`rle`)
//! - A per-map analyzer comparing both framings (`analyze`)
//! - Cartridge image helpers and built-in map geometries (`image`)
//! - An optional CLI (`cli` feature)
//!
//! # Quick Start
//!
//! ```
//! use roomlayout::layout::{LayoutConfig, LayoutFormat, decode_room};
//! use roomlayout::rle::{self, Framing};
//!
//! // One 2x3 underworld room whose columns both come from table 0.
//! let config = LayoutConfig::new(
//!     LayoutFormat::Underworld,
//!     1,
//!     2,
//!     3,
//!     vec![0x00, 0x00],
//!     vec![0],
//!     vec![0xA5],
//! )
//! .unwrap();
//!
//! let grid = decode_room(&config, 0).unwrap();
//! assert_eq!(grid.as_bytes(), &[5; 6]);
//! assert_eq!(rle::encode_grid(&grid, Framing::FullBuffer), vec![0x85, 5]);
//! assert_eq!(rle::encode_grid(&grid, Framing::RowScoped), vec![0x81, 5, 0x81, 5, 0x81, 5]);
//! ```

pub mod analyze;
pub mod image;
pub mod layout;
pub mod rle;

#[cfg(feature = "cli")]
pub mod cli;
