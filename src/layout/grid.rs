// Decoded room grid.

use std::fmt;
use std::ops::{Index, IndexMut};
use std::slice::ChunksExact;

/// A fully materialized `rows × columns` room of tile references.
///
/// Cells are stored row-major and indexed by `(row, column)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedGrid {
    rows: usize,
    columns: usize,
    cells: Vec<u8>,
}

impl DecodedGrid {
    /// Create a zero-filled grid.
    pub fn new(rows: usize, columns: usize) -> Self {
        Self {
            rows,
            columns,
            cells: vec![0; rows * columns],
        }
    }

    /// Wrap row-major `cells`. Returns `None` if the length does not match.
    pub fn from_cells(rows: usize, columns: usize, cells: Vec<u8>) -> Option<Self> {
        (cells.len() == rows * columns).then_some(Self {
            rows,
            columns,
            cells,
        })
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn column_count(&self) -> usize {
        self.columns
    }

    /// Number of cells (`rows * columns`).
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, row: usize, column: usize) -> Option<u8> {
        if row < self.rows && column < self.columns {
            Some(self.cells[row * self.columns + column])
        } else {
            None
        }
    }

    /// One row as a slice.
    pub fn row(&self, row: usize) -> &[u8] {
        let start = row * self.columns;
        &self.cells[start..start + self.columns]
    }

    /// Rows in order, top to bottom.
    pub fn rows(&self) -> ChunksExact<'_, u8> {
        self.cells.chunks_exact(self.columns.max(1))
    }

    /// Cells of one column, top to bottom.
    pub fn column(&self, column: usize) -> impl Iterator<Item = u8> + '_ {
        self.rows().map(move |row| row[column])
    }

    /// Row-major cell bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.cells
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.cells
    }
}

impl Index<(usize, usize)> for DecodedGrid {
    type Output = u8;

    fn index(&self, (row, column): (usize, usize)) -> &u8 {
        assert!(column < self.columns, "column {column} out of range");
        &self.cells[row * self.columns + column]
    }
}

impl IndexMut<(usize, usize)> for DecodedGrid {
    fn index_mut(&mut self, (row, column): (usize, usize)) -> &mut u8 {
        assert!(column < self.columns, "column {column} out of range");
        &mut self.cells[row * self.columns + column]
    }
}

/// Hex dump, one line per row.
impl fmt::Display for DecodedGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.rows() {
            let mut first = true;
            for cell in row {
                if !first {
                    f.write_str(" ")?;
                }
                write!(f, "{cell:02X}")?;
                first = false;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
