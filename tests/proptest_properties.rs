use proptest::prelude::*;
use roomlayout::layout::{DecodedGrid, LayoutConfig, LayoutFormat, decode_room};
use roomlayout::rle::{self, Framing};

/// Grids small enough that no full-buffer run exceeds 128 cells, over a
/// small tile alphabet so runs actually occur.
fn small_grid() -> impl Strategy<Value = DecodedGrid> {
    (1usize..=8, 1usize..=16).prop_flat_map(|(rows, columns)| {
        proptest::collection::vec(0u8..4, rows * columns).prop_map(move |cells| {
            DecodedGrid::from_cells(rows, columns, cells).expect("sized by strategy")
        })
    })
}

fn expected_units(n: usize, v: u8) -> Vec<u8> {
    let mut out = Vec::new();
    let mut left = n;
    while left > 0 {
        let unit = left.min(256);
        if unit == 1 {
            out.push(v);
        } else {
            out.push(((unit - 1) as u8) | 0x80);
            out.push(v);
        }
        left -= unit;
    }
    out
}

proptest! {
    #[test]
    fn prop_full_buffer_roundtrip(grid in small_grid()) {
        let encoded = rle::encode_grid(&grid, Framing::FullBuffer);
        prop_assert_eq!(rle::decode(&encoded).unwrap(), grid.as_bytes());
    }

    #[test]
    fn prop_row_scoped_roundtrip(grid in small_grid()) {
        let encoded = rle::encode_grid(&grid, Framing::RowScoped);
        prop_assert_eq!(rle::decode(&encoded).unwrap(), grid.as_bytes());
    }

    #[test]
    fn prop_row_scoped_never_crosses_rows(grid in small_grid()) {
        let columns = grid.column_count();
        let encoded = rle::encode_grid(&grid, Framing::RowScoped);

        // Concatenating independently encoded rows gives the same stream.
        let per_row: Vec<u8> = grid.rows().flat_map(rle::encode).collect();
        prop_assert_eq!(&encoded, &per_row);

        // Every run starts and ends inside one row.
        let mut pos = 0usize;
        for run in rle::decode_runs(&encoded) {
            let (_, len) = run.unwrap();
            prop_assert_eq!(pos / columns, (pos + len - 1) / columns);
            pos += len;
        }
        prop_assert_eq!(pos, grid.len());
    }

    #[test]
    fn prop_full_buffer_never_longer_than_row_scoped(grid in small_grid()) {
        let row = rle::encode_grid(&grid, Framing::RowScoped).len();
        let full = rle::encode_grid(&grid, Framing::FullBuffer).len();
        prop_assert!(full <= row, "full={} row={}", full, row);
    }

    #[test]
    fn prop_single_value_runs(n in 1usize..=300, v in 0u8..0x80) {
        let encoded = rle::encode(&vec![v; n]);
        prop_assert_eq!(&encoded, &expected_units(n, v));

        let units: Vec<_> = rle::decode_runs(&encoded).collect::<Result<_, _>>().unwrap();
        prop_assert_eq!(units.len(), n.div_ceil(256));

        // Seven-bit run lengths decode exactly.
        if n <= 128 {
            prop_assert_eq!(rle::decode(&encoded).unwrap(), vec![v; n]);
        }
    }

    #[test]
    fn prop_decoder_never_panics(
        format in prop_oneof![Just(LayoutFormat::Overworld), Just(LayoutFormat::Underworld)],
        columns in 1usize..=16,
        rows in 1usize..=11,
        descriptors in proptest::collection::vec(any::<u8>(), 16),
        data in proptest::collection::vec(any::<u8>(), 0..256),
        table_count in 1usize..=16,
    ) {
        let offsets: Vec<u16> = (0..table_count)
            .map(|i| (i * data.len() / table_count) as u16)
            .collect();
        let config = LayoutConfig::new(
            format,
            1,
            columns,
            rows,
            descriptors[..columns].to_vec(),
            offsets,
            data,
        )
        .unwrap();

        if let Ok(grid) = decode_room(&config, 0) {
            let mask = match format {
                LayoutFormat::Overworld => 0x3F,
                LayoutFormat::Underworld => 0x07,
            };
            prop_assert_eq!(grid.len(), rows * columns);
            prop_assert!(grid.as_bytes().iter().all(|&t| t & !mask == 0));
        }
    }
}
