// Layout configuration: the three byte ranges describing every room of one
// map type, plus its geometry.

/// Bitfield rules used to expand column-table bytes into tile references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayoutFormat {
    /// 6-bit tile reference, bit 6 doubles the tile into the next row.
    Overworld,
    /// 3-bit tile reference, bits 4..=6 repeat the tile up to 7 more rows.
    Underworld,
}

impl LayoutFormat {
    pub fn name(self) -> &'static str {
        match self {
            LayoutFormat::Overworld => "overworld",
            LayoutFormat::Underworld => "underworld",
        }
    }
}

/// Error produced when a layout configuration is inconsistent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("expected {expected} room column descriptors ({rooms} rooms x {columns} columns), got {actual}")]
    DescriptorCount {
        rooms: usize,
        columns: usize,
        expected: usize,
        actual: usize,
    },
    #[error("room geometry must be non-empty (got {columns} columns x {rows} rows)")]
    EmptyGeometry { columns: usize, rows: usize },
    #[error("room geometry of {columns} columns x {rows} rows is too large")]
    GeometryTooLarge { columns: usize, rows: usize },
    #[error("no column tables")]
    NoTables,
    #[error("column table {table} starts at {offset}, past the end of {len} table bytes")]
    TableOffsetOutOfRange {
        table: usize,
        offset: u16,
        len: usize,
    },
}

/// Immutable description of one map type's packed room layouts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutConfig {
    format: LayoutFormat,
    room_count: usize,
    columns: usize,
    rows: usize,
    room_columns: Vec<u8>,
    table_offsets: Vec<u16>,
    table_data: Vec<u8>,
}

impl LayoutConfig {
    /// Validate and build a configuration.
    ///
    /// `room_columns` holds one descriptor per (room, column), room-major.
    /// `table_offsets` are start offsets into `table_data`, already
    /// normalized so the first table starts at 0.
    ///
    /// A descriptor naming a table past `table_offsets` is accepted here;
    /// it makes only that room undecodable.
    pub fn new(
        format: LayoutFormat,
        room_count: usize,
        columns: usize,
        rows: usize,
        room_columns: Vec<u8>,
        table_offsets: Vec<u16>,
        table_data: Vec<u8>,
    ) -> Result<Self, ConfigError> {
        if columns == 0 || rows == 0 {
            return Err(ConfigError::EmptyGeometry { columns, rows });
        }
        if columns.checked_mul(rows).is_none() {
            return Err(ConfigError::GeometryTooLarge { columns, rows });
        }

        // An overflowing descriptor count can never match a real buffer.
        let expected = room_count.checked_mul(columns);
        if expected != Some(room_columns.len()) {
            return Err(ConfigError::DescriptorCount {
                rooms: room_count,
                columns,
                expected: expected.unwrap_or(usize::MAX),
                actual: room_columns.len(),
            });
        }

        if table_offsets.is_empty() {
            return Err(ConfigError::NoTables);
        }

        if let Some((table, &offset)) = table_offsets
            .iter()
            .enumerate()
            .find(|&(_, &offset)| usize::from(offset) > table_data.len())
        {
            return Err(ConfigError::TableOffsetOutOfRange {
                table,
                offset,
                len: table_data.len(),
            });
        }

        Ok(Self {
            format,
            room_count,
            columns,
            rows,
            room_columns,
            table_offsets,
            table_data,
        })
    }

    pub fn format(&self) -> LayoutFormat {
        self.format
    }

    pub fn room_count(&self) -> usize {
        self.room_count
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Uncompressed size of one room in bytes.
    pub fn room_size(&self) -> usize {
        self.rows * self.columns
    }

    /// Column descriptors of one room, or `None` past `room_count`.
    pub fn room_descriptors(&self, room: usize) -> Option<&[u8]> {
        let start = room.checked_mul(self.columns)?;
        let end = start.checked_add(self.columns)?;
        self.room_columns.get(start..end)
    }

    pub fn room_columns(&self) -> &[u8] {
        &self.room_columns
    }

    pub fn table_offsets(&self) -> &[u16] {
        &self.table_offsets
    }

    pub fn table_data(&self) -> &[u8] {
        &self.table_data
    }

    /// Bytes of table `index`, from its start to the end of the pool.
    ///
    /// Tables share one pool and carry no length, so a table runs until
    /// the pool ends.
    pub fn table(&self, index: usize) -> Option<&[u8]> {
        let offset = usize::from(*self.table_offsets.get(index)?);
        self.table_data.get(offset..)
    }

    /// Furthest offset at which a column's stream may start inside a table.
    pub fn max_column_start(&self) -> usize {
        (self.columns - 1) * self.rows
    }
}
