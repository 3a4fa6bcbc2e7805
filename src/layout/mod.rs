// Packed room layouts.
//
// - `config`   LayoutConfig (descriptors, column tables, geometry, format)
// - `grid`     DecodedGrid, an owned row-major room buffer
// - `decoder`  column-table expansion into a DecodedGrid

pub mod config;
pub mod decoder;
pub mod grid;

pub use config::{ConfigError, LayoutConfig, LayoutFormat};
pub use decoder::{RoomError, TileByte, decode_room, decode_rooms};
pub use grid::DecodedGrid;
