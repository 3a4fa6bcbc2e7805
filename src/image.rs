// Cartridge image access.
//
// Slices the three layout byte ranges (room column descriptors, column
// table pointer directory, column table pool) out of an image at fixed
// offsets and turns them into a LayoutConfig. Optionally computes a
// SHA-256 of the image (feature-gated behind `file-io`) so reports can say
// which dump they describe. The digest is informational only.

use std::io;
use std::path::Path;

#[cfg(feature = "file-io")]
use sha2::Digest;

use crate::layout::{ConfigError, LayoutConfig, LayoutFormat};

// ---------------------------------------------------------------------------
// Map geometry
// ---------------------------------------------------------------------------

/// Length of the cartridge file header that precedes program data.
pub const CARTRIDGE_HEADER_LEN: usize = 16;

/// Where and how one map type's layouts are stored in an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapGeometry {
    /// Short label used in reports and artifact names.
    pub label: &'static str,
    pub format: LayoutFormat,
    pub room_count: usize,
    pub columns: usize,
    pub rows: usize,
    /// File offset of the room column descriptors.
    pub room_columns_offset: usize,
    /// File offset of the column table pointer directory (u16 LE entries).
    pub directory_offset: usize,
    /// Number of directory entries.
    pub table_count: usize,
    /// File offset of the column table pool.
    pub tables_offset: usize,
    /// Length of the column table pool.
    pub tables_len: usize,
}

impl MapGeometry {
    /// Bytes of room column descriptors.
    pub fn room_columns_len(&self) -> usize {
        self.room_count * self.columns
    }

    /// Smallest image length holding every range of this map.
    pub fn min_image_len(&self) -> usize {
        [
            self.room_columns_offset + self.room_columns_len(),
            self.directory_offset + self.table_count * 2,
            self.tables_offset + self.tables_len,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }
}

pub const OVERWORLD: MapGeometry = MapGeometry {
    label: "OW",
    format: LayoutFormat::Overworld,
    room_count: 124,
    columns: 16,
    rows: 11,
    room_columns_offset: 0x15418 + CARTRIDGE_HEADER_LEN,
    directory_offset: 0x19D0F + CARTRIDGE_HEADER_LEN,
    table_count: 16,
    tables_offset: 0x15BD8 + CARTRIDGE_HEADER_LEN,
    // The last table holds only 10 columns.
    tables_len: 964,
};

pub const UNDERWORLD: MapGeometry = MapGeometry {
    label: "UW",
    format: LayoutFormat::Underworld,
    room_count: 64,
    columns: 12,
    rows: 7,
    room_columns_offset: 0x160DE + CARTRIDGE_HEADER_LEN,
    directory_offset: 0x16704 + CARTRIDGE_HEADER_LEN,
    table_count: 10,
    tables_offset: 0x162D6 + CARTRIDGE_HEADER_LEN,
    // The last table holds only 9 columns.
    tables_len: 222,
};

/// Built-in maps in report order.
pub const BUILTIN_MAPS: [MapGeometry; 2] = [OVERWORLD, UNDERWORLD];

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error type for image reading.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("{what} at {offset:#X}..{end:#X} lies past the end of the {len}-byte image")]
    Truncated {
        what: &'static str,
        offset: usize,
        end: usize,
        len: usize,
    },
    #[error("column table pointer {index} ({pointer:#06X}) precedes the first pointer ({base:#06X})")]
    PointerBeforeBase { index: usize, pointer: u16, base: u16 },
    #[error("invalid layout: {0}")]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Image
// ---------------------------------------------------------------------------

/// An image held in memory.
#[derive(Debug, Clone)]
pub struct Image {
    data: Vec<u8>,
    sha256: Option<[u8; 32]>,
}

impl Image {
    pub fn from_bytes(data: Vec<u8>) -> Self {
        #[cfg(feature = "file-io")]
        let sha256 = Some(sha2::Sha256::digest(&data).into());
        #[cfg(not(feature = "file-io"))]
        let sha256: Option<[u8; 32]> = None;

        Self { data, sha256 }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// SHA-256 of the image (if the `file-io` feature is enabled).
    pub fn sha256(&self) -> Option<[u8; 32]> {
        self.sha256
    }

    /// Lowercase hex form of [`Image::sha256`].
    pub fn sha256_hex(&self) -> Option<String> {
        self.sha256()
            .map(|digest| digest.iter().map(|b| format!("{b:02x}")).collect())
    }

    pub fn read_layout(&self, geometry: &MapGeometry) -> Result<LayoutConfig, ImageError> {
        read_layout(&self.data, geometry)
    }
}

/// Read an image file fully into memory.
pub fn load_image(path: &Path) -> Result<Image, ImageError> {
    let data = std::fs::read(path)?;
    log::debug!("loaded {} ({} bytes)", path.display(), data.len());
    Ok(Image::from_bytes(data))
}

// ---------------------------------------------------------------------------
// Layout extraction
// ---------------------------------------------------------------------------

/// Build the layout configuration of `geometry` from `image`.
pub fn read_layout(image: &[u8], geometry: &MapGeometry) -> Result<LayoutConfig, ImageError> {
    let room_columns = slice(
        image,
        "room column descriptors",
        geometry.room_columns_offset,
        geometry.room_columns_len(),
    )?;
    let directory = slice(
        image,
        "column table directory",
        geometry.directory_offset,
        geometry.table_count * 2,
    )?;
    let tables = slice(
        image,
        "column tables",
        geometry.tables_offset,
        geometry.tables_len,
    )?;

    let pointers: Vec<u16> = directory
        .chunks_exact(2)
        .map(|p| u16::from_le_bytes([p[0], p[1]]))
        .collect();
    let offsets = normalize_pointers(&pointers)?;

    log::debug!(
        "{}: {} rooms, {}x{} cells, {} tables, {} table bytes",
        geometry.label,
        geometry.room_count,
        geometry.columns,
        geometry.rows,
        offsets.len(),
        tables.len()
    );

    Ok(LayoutConfig::new(
        geometry.format,
        geometry.room_count,
        geometry.columns,
        geometry.rows,
        room_columns.to_vec(),
        offsets,
        tables.to_vec(),
    )?)
}

/// Rebase absolute table pointers so the first table starts at 0.
pub fn normalize_pointers(pointers: &[u16]) -> Result<Vec<u16>, ImageError> {
    let Some(&base) = pointers.first() else {
        return Ok(Vec::new());
    };
    pointers
        .iter()
        .enumerate()
        .map(|(index, &pointer)| {
            pointer
                .checked_sub(base)
                .ok_or(ImageError::PointerBeforeBase {
                    index,
                    pointer,
                    base,
                })
        })
        .collect()
}

fn slice<'a>(
    image: &'a [u8],
    what: &'static str,
    offset: usize,
    len: usize,
) -> Result<&'a [u8], ImageError> {
    let end = offset + len;
    image.get(offset..end).ok_or(ImageError::Truncated {
        what,
        offset,
        end,
        len: image.len(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
