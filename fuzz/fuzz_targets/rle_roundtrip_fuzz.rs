#![no_main]
use libfuzzer_sys::fuzz_target;
use roomlayout::layout::DecodedGrid;
use roomlayout::rle::{self, Framing};

fuzz_target!(|data: &[u8]| {
    // The decoder must never panic on arbitrary input.
    let _ = rle::decode(data);

    if data.is_empty() {
        return;
    }

    // Seven-bit values in rows short enough that every run fits in a marker.
    let columns = 1 + (data[0] % 32) as usize;
    let cells: Vec<u8> = data[1..].iter().map(|b| b & 0x7F).collect();
    let rows = cells.len() / columns;
    let Some(grid) = DecodedGrid::from_cells(rows, columns, cells[..rows * columns].to_vec())
    else {
        return;
    };

    let row = rle::encode_grid(&grid, Framing::RowScoped);
    assert_eq!(rle::decode(&row).unwrap(), grid.as_bytes());

    if grid.len() <= 128 {
        let full = rle::encode_grid(&grid, Framing::FullBuffer);
        assert_eq!(rle::decode(&full).unwrap(), grid.as_bytes());
        assert!(full.len() <= row.len());
    }
});
