#![no_main]
use libfuzzer_sys::fuzz_target;
use roomlayout::layout::{LayoutConfig, LayoutFormat, decode_rooms};

fuzz_target!(|data: &[u8]| {
    // Header: format, columns, rows, table count. The rest is split into
    // descriptors for one or more rooms and the table pool.
    if data.len() < 4 {
        return;
    }
    let format = if data[0] & 1 == 0 {
        LayoutFormat::Overworld
    } else {
        LayoutFormat::Underworld
    };
    let columns = 1 + (data[1] % 16) as usize;
    let rows = 1 + (data[2] % 16) as usize;
    let tables = 1 + (data[3] % 16) as usize;
    let payload = &data[4..];

    let rooms = (payload.len() / 2 / columns).max(1);
    let descriptor_len = (rooms * columns).min(payload.len());
    if descriptor_len < rooms * columns {
        return;
    }
    let (descriptors, pool) = payload.split_at(descriptor_len);
    let offsets = (0..tables)
        .map(|i| (i * pool.len() / tables) as u16)
        .collect();

    let Ok(config) = LayoutConfig::new(
        format,
        rooms,
        columns,
        rows,
        descriptors.to_vec(),
        offsets,
        pool.to_vec(),
    ) else {
        return;
    };

    // Decoding must never panic, only fail per room.
    for (_, result) in decode_rooms(&config) {
        if let Ok(grid) = result {
            assert_eq!(grid.len(), rows * columns);
        }
    }
});
