// Room decoder.
//
// Each room is `columns` descriptor bytes. A descriptor's high nibble picks
// a column table, its low nibble picks a column inside that table. Columns
// inside a table are not addressed by pointer: the decoder scans the table
// counting boundary bytes (bit 7 set) until it reaches the wanted column,
// then expands bytes into tile references until the column's rows are full.

use bitflags::bitflags;

use super::config::{LayoutConfig, LayoutFormat};
use super::grid::DecodedGrid;

bitflags! {
    /// Flag bits of a column-table byte.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TileByte: u8 {
        /// First byte of a column's stream.
        const BOUNDARY = 0x80;
        /// Overworld only: the tile also fills the next row.
        const DOUBLED = 0x40;
    }
}

const OVERWORLD_TILE_MASK: u8 = 0x3F;
const UNDERWORLD_TILE_MASK: u8 = 0x07;
const UNDERWORLD_REPEAT_SHIFT: u8 = 4;
const UNDERWORLD_REPEAT_MASK: u8 = 0x07;

impl TileByte {
    /// Tile reference carried by this byte.
    #[inline]
    pub fn tile(self, format: LayoutFormat) -> u8 {
        match format {
            LayoutFormat::Overworld => self.bits() & OVERWORLD_TILE_MASK,
            LayoutFormat::Underworld => self.bits() & UNDERWORLD_TILE_MASK,
        }
    }

    /// Rows the tile fills after the first one (before clamping to the column).
    #[inline]
    pub fn repeat(self, format: LayoutFormat) -> usize {
        match format {
            LayoutFormat::Overworld => usize::from(self.contains(TileByte::DOUBLED)),
            LayoutFormat::Underworld => {
                usize::from((self.bits() >> UNDERWORLD_REPEAT_SHIFT) & UNDERWORLD_REPEAT_MASK)
            }
        }
    }

    #[inline]
    pub fn is_boundary(self) -> bool {
        self.contains(TileByte::BOUNDARY)
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Reason a single room could not be decoded.
///
/// Room failures are local: the caller skips the room and carries on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    #[error("room {room} out of range ({count} rooms)")]
    RoomOutOfRange { room: usize, count: usize },
    #[error("room {room} column {column}: table {table} out of range ({tables} tables)")]
    TableOutOfRange {
        room: usize,
        column: usize,
        table: usize,
        tables: usize,
    },
    #[error("room {room} column {column}: table {table} has no column {index}")]
    ColumnNotFound {
        room: usize,
        column: usize,
        table: usize,
        index: usize,
    },
    #[error("room {room} column {column}: table {table} ends after {filled} of {rows} rows")]
    TruncatedColumn {
        room: usize,
        column: usize,
        table: usize,
        filled: usize,
        rows: usize,
    },
}

impl RoomError {
    pub fn room(&self) -> usize {
        match *self {
            RoomError::RoomOutOfRange { room, .. }
            | RoomError::TableOutOfRange { room, .. }
            | RoomError::ColumnNotFound { room, .. }
            | RoomError::TruncatedColumn { room, .. } => room,
        }
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode one room into a fresh grid. All-or-nothing.
pub fn decode_room(config: &LayoutConfig, room: usize) -> Result<DecodedGrid, RoomError> {
    let descriptors = config
        .room_descriptors(room)
        .ok_or(RoomError::RoomOutOfRange {
            room,
            count: config.room_count(),
        })?;

    let mut grid = DecodedGrid::new(config.rows(), config.columns());

    for (column, &descriptor) in descriptors.iter().enumerate() {
        let table_index = usize::from(descriptor >> 4);
        let column_index = usize::from(descriptor & 0x0F);

        let table = config
            .table(table_index)
            .ok_or(RoomError::TableOutOfRange {
                room,
                column,
                table: table_index,
                tables: config.table_offsets().len(),
            })?;

        let start = locate_column(table, column_index, config.max_column_start()).ok_or(
            RoomError::ColumnNotFound {
                room,
                column,
                table: table_index,
                index: column_index,
            },
        )?;

        log::trace!(
            "room {room} column {column}: table {table_index} column {column_index} at +{start}"
        );

        fill_column(config.format(), &table[start..], &mut grid, column).map_err(|filled| {
            RoomError::TruncatedColumn {
                room,
                column,
                table: table_index,
                filled,
                rows: config.rows(),
            }
        })?;
    }

    Ok(grid)
}

/// Decode every room in index order.
pub fn decode_rooms(
    config: &LayoutConfig,
) -> impl Iterator<Item = (usize, Result<DecodedGrid, RoomError>)> + '_ {
    (0..config.room_count()).map(move |room| (room, decode_room(config, room)))
}

/// Find where column `index` starts inside `table`.
///
/// At most `bound` bytes are scanned, and never past the table. If the
/// bound is hit first, decoding starts at the bound; a single-column layout
/// has a bound of 0 and so always starts at the table's first byte.
fn locate_column(table: &[u8], index: usize, bound: usize) -> Option<usize> {
    let limit = bound.min(table.len());
    let mut seen = 0;

    for (pos, &byte) in table[..limit].iter().enumerate() {
        if TileByte::from_bits_retain(byte).is_boundary() {
            if seen == index {
                return Some(pos);
            }
            seen += 1;
        }
    }

    (limit == bound).then_some(bound)
}

/// Expand `stream` into `column` of `grid`. On running out of bytes returns
/// the number of rows filled.
fn fill_column(
    format: LayoutFormat,
    stream: &[u8],
    grid: &mut DecodedGrid,
    column: usize,
) -> Result<(), usize> {
    let rows = grid.row_count();
    let mut bytes = stream.iter();
    let mut row = 0;

    while row < rows {
        let Some(&byte) = bytes.next() else {
            return Err(row);
        };
        let byte = TileByte::from_bits_retain(byte);
        let tile = byte.tile(format);

        grid[(row, column)] = tile;
        row += 1;

        for _ in 0..byte.repeat(format) {
            if row >= rows {
                break;
            }
            grid[(row, column)] = tile;
            row += 1;
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn config(
        format: LayoutFormat,
        columns: usize,
        rows: usize,
        room_columns: Vec<u8>,
        offsets: Vec<u16>,
        data: Vec<u8>,
    ) -> LayoutConfig {
        let rooms = room_columns.len() / columns;
        LayoutConfig::new(format, rooms, columns, rows, room_columns, offsets, data).unwrap()
    }

    #[test]
    fn tile_byte_fields() {
        let b = TileByte::from_bits_retain(0xC5);
        assert!(b.is_boundary());
        assert_eq!(b.tile(LayoutFormat::Overworld), 5);
        assert_eq!(b.repeat(LayoutFormat::Overworld), 1);

        let b = TileByte::from_bits_retain(0x13);
        assert!(!b.is_boundary());
        assert_eq!(b.tile(LayoutFormat::Underworld), 3);
        assert_eq!(b.repeat(LayoutFormat::Underworld), 1);

        let b = TileByte::from_bits_retain(0xF7);
        assert_eq!(b.tile(LayoutFormat::Underworld), 7);
        assert_eq!(b.repeat(LayoutFormat::Underworld), 7);
    }

    #[test]
    fn locate_counts_boundaries() {
        let table = [0x81, 0x01, 0x82, 0x02, 0x83];
        assert_eq!(locate_column(&table, 0, 10), Some(0));
        assert_eq!(locate_column(&table, 1, 10), Some(2));
        assert_eq!(locate_column(&table, 2, 10), Some(4));
        assert_eq!(locate_column(&table, 3, 10), None);
    }

    #[test]
    fn locate_stops_at_bound() {
        let table = [0x81, 0x01, 0x82, 0x02, 0x83];
        assert_eq!(locate_column(&table, 2, 3), Some(3));
        assert_eq!(locate_column(&table, 0, 0), Some(0));
    }

    #[test]
    fn overworld_doubling() {
        // Column 0: 0x81 (tile 1), 0x42 (tile 2 doubled), 0x03.
        let cfg = config(
            LayoutFormat::Overworld,
            2,
            4,
            vec![0x00, 0x01],
            vec![0],
            vec![0x81, 0x42, 0x03, 0xC9, 0x49],
        );
        let grid = decode_room(&cfg, 0).unwrap();
        assert_eq!(grid.column(0).collect::<Vec<_>>(), vec![1, 2, 2, 3]);
        assert_eq!(grid.column(1).collect::<Vec<_>>(), vec![9, 9, 9, 9]);
    }

    #[test]
    fn overworld_double_is_clamped_to_last_row() {
        let cfg = config(
            LayoutFormat::Overworld,
            2,
            3,
            vec![0x00, 0x00],
            vec![0],
            vec![0xC4, 0x45],
        );
        let grid = decode_room(&cfg, 0).unwrap();
        assert_eq!(grid.column(0).collect::<Vec<_>>(), vec![4, 4, 5]);
    }

    #[test]
    fn underworld_repeat_count() {
        let cfg = config(
            LayoutFormat::Underworld,
            2,
            4,
            vec![0x00, 0x01],
            vec![0],
            vec![0x81, 0x13, 0x02, 0xB4],
        );
        let grid = decode_room(&cfg, 0).unwrap();
        assert_eq!(grid.column(0).collect::<Vec<_>>(), vec![1, 3, 3, 2]);
        assert_eq!(grid.column(1).collect::<Vec<_>>(), vec![4, 4, 4, 4]);
    }

    #[test]
    fn second_table_is_addressed_by_offset() {
        let cfg = config(
            LayoutFormat::Underworld,
            2,
            2,
            vec![0x10, 0x00],
            vec![0, 1],
            vec![0x91, 0x96],
        );
        let grid = decode_room(&cfg, 0).unwrap();
        assert_eq!(grid.as_bytes(), &[6, 1, 6, 1]);
    }

    #[test]
    fn bad_table_fails_room() {
        let cfg = config(
            LayoutFormat::Overworld,
            2,
            2,
            vec![0x00, 0x30],
            vec![0],
            vec![0xC1],
        );
        assert_eq!(
            decode_room(&cfg, 0),
            Err(RoomError::TableOutOfRange {
                room: 0,
                column: 1,
                table: 3,
                tables: 1
            })
        );
    }

    #[test]
    fn short_table_fails_instead_of_overreading() {
        let cfg = config(
            LayoutFormat::Overworld,
            2,
            4,
            vec![0x00, 0x00],
            vec![0],
            vec![0x81, 0x02],
        );
        let err = decode_room(&cfg, 0).unwrap_err();
        assert_eq!(
            err,
            RoomError::TruncatedColumn {
                room: 0,
                column: 0,
                table: 0,
                filled: 2,
                rows: 4
            }
        );
        assert_eq!(err.room(), 0);
    }

    #[test]
    fn missing_column_fails_room() {
        let cfg = config(
            LayoutFormat::Overworld,
            3,
            4,
            vec![0x00, 0x05, 0x00],
            vec![0],
            vec![0xC1, 0xC1],
        );
        assert_eq!(
            decode_room(&cfg, 0),
            Err(RoomError::ColumnNotFound {
                room: 0,
                column: 1,
                table: 0,
                index: 5
            })
        );
    }

    #[test]
    fn room_index_is_checked() {
        let cfg = config(
            LayoutFormat::Overworld,
            1,
            1,
            vec![0x00],
            vec![0],
            vec![0x81],
        );
        assert_eq!(
            decode_room(&cfg, 1),
            Err(RoomError::RoomOutOfRange { room: 1, count: 1 })
        );
    }

    #[test]
    fn huge_room_index_is_out_of_range() {
        let cfg = config(
            LayoutFormat::Overworld,
            16,
            11,
            vec![0x00; 16],
            vec![0],
            vec![0x85; 11],
        );
        for room in [usize::MAX / 16, usize::MAX] {
            assert_eq!(
                decode_room(&cfg, room),
                Err(RoomError::RoomOutOfRange { room, count: 1 })
            );
        }
    }

    #[test]
    fn decode_rooms_yields_every_room() {
        let cfg = config(
            LayoutFormat::Overworld,
            1,
            1,
            vec![0x00, 0x40, 0x00],
            vec![0],
            vec![0x87],
        );
        let results: Vec<_> = decode_rooms(&cfg).map(|(room, r)| (room, r.is_ok())).collect();
        assert_eq!(results, vec![(0, true), (1, false), (2, true)]);
    }
}
