// Layout analyzer.
//
// Decodes every room of a map, re-encodes each grid with both run-length
// framings and totals the sizes. Rooms that fail to decode are skipped and
// counted. Artifacts (raw grid plus both encodings) can be written through
// an ArtifactSink.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::layout::{DecodedGrid, LayoutConfig, RoomError, decode_room};
use crate::rle::{self, Framing, encode_grid};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

// ---------------------------------------------------------------------------
// Artifact sinks
// ---------------------------------------------------------------------------

/// Destination for per-room artifacts.
pub trait ArtifactSink {
    /// Store `data` under `name`, replacing anything already there.
    fn write_artifact(&mut self, name: &str, data: &[u8]) -> io::Result<()>;
}

impl<S: ArtifactSink + ?Sized> ArtifactSink for &mut S {
    fn write_artifact(&mut self, name: &str, data: &[u8]) -> io::Result<()> {
        (**self).write_artifact(name, data)
    }
}

/// Writes artifacts as files in a directory.
///
/// Each file is written to a hidden temporary sibling and renamed into
/// place, so a failed write never leaves a partial artifact behind.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    root: PathBuf,
}

impl DirectorySink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ArtifactSink for DirectorySink {
    fn write_artifact(&mut self, name: &str, data: &[u8]) -> io::Result<()> {
        let path = self.root.join(name);
        let tmp = self.root.join(format!(".{name}.tmp"));

        let written = File::create(&tmp).and_then(|mut file| {
            file.write_all(data)?;
            file.sync_all()
        });
        if let Err(e) = written.and_then(|()| fs::rename(&tmp, &path)) {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
        Ok(())
    }
}

/// Keeps artifacts in memory, ordered by name.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    artifacts: BTreeMap<String, Vec<u8>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.artifacts.get(name).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.artifacts.keys().map(String::as_str)
    }

    pub fn into_inner(self) -> BTreeMap<String, Vec<u8>> {
        self.artifacts
    }
}

impl ArtifactSink for MemorySink {
    fn write_artifact(&mut self, name: &str, data: &[u8]) -> io::Result<()> {
        self.artifacts.insert(name.to_string(), data.to_vec());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Artifact naming
// ---------------------------------------------------------------------------

/// What an artifact holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Uncompressed,
    Compressed(Framing),
}

/// File name of one room's artifact, e.g. `map.compressed-rle-row.OW.007.bin`.
pub fn artifact_name(kind: ArtifactKind, label: &str, room: usize) -> String {
    match kind {
        ArtifactKind::Uncompressed => format!("map.uncompressed.{label}.{room:03}.bin"),
        ArtifactKind::Compressed(framing) => {
            format!("map.compressed-{}.{label}.{room:03}.bin", framing.artifact_tag())
        }
    }
}

// ---------------------------------------------------------------------------
// Per-room analysis
// ---------------------------------------------------------------------------

/// Sizes measured for one room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomReport {
    pub room: usize,
    pub uncompressed: usize,
    pub row_scoped: usize,
    pub full_buffer: usize,
}

/// A decoded room with both of its encodings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomAnalysis {
    pub room: usize,
    pub grid: DecodedGrid,
    pub row_scoped: Vec<u8>,
    pub full_buffer: Vec<u8>,
}

impl RoomAnalysis {
    pub fn encoded(&self, framing: Framing) -> &[u8] {
        match framing {
            Framing::RowScoped => &self.row_scoped,
            Framing::FullBuffer => &self.full_buffer,
        }
    }

    /// Whether decoding the `framing` stream gives back the grid exactly.
    ///
    /// Runs longer than 128 cells do not survive the seven-bit marker, so a
    /// full-buffer stream of a large uniform room decodes short.
    pub fn decodes_exactly(&self, framing: Framing) -> bool {
        rle::decode(self.encoded(framing)).is_ok_and(|cells| cells == self.grid.as_bytes())
    }

    pub fn report(&self) -> RoomReport {
        RoomReport {
            room: self.room,
            uncompressed: self.grid.len(),
            row_scoped: self.row_scoped.len(),
            full_buffer: self.full_buffer.len(),
        }
    }

    fn write_artifacts(&self, sink: &mut dyn ArtifactSink, label: &str) -> Result<(), AnalyzeError> {
        let artifacts = [
            (ArtifactKind::Uncompressed, self.grid.as_bytes()),
            (
                ArtifactKind::Compressed(Framing::RowScoped),
                self.row_scoped.as_slice(),
            ),
            (
                ArtifactKind::Compressed(Framing::FullBuffer),
                self.full_buffer.as_slice(),
            ),
        ];

        for (kind, data) in artifacts {
            let name = artifact_name(kind, label, self.room);
            sink.write_artifact(&name, data)
                .map_err(|source| AnalyzeError::Artifact { name, source })?;
        }
        Ok(())
    }
}

/// Decode one room and encode it under both framings.
pub fn analyze_room(config: &LayoutConfig, room: usize) -> Result<RoomAnalysis, RoomError> {
    let grid = decode_room(config, room)?;
    let row_scoped = encode_grid(&grid, Framing::RowScoped);
    let full_buffer = encode_grid(&grid, Framing::FullBuffer);
    Ok(RoomAnalysis {
        room,
        grid,
        row_scoped,
        full_buffer,
    })
}

// ---------------------------------------------------------------------------
// Aggregate statistics
// ---------------------------------------------------------------------------

/// Totals over every decodable room of one map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayoutStats {
    /// Map label used in artifact names and reports (e.g. `OW`).
    pub label: String,
    pub rooms_decoded: usize,
    pub rooms_skipped: usize,
    /// Sum of `rows * columns` over decoded rooms.
    pub uncompressed: usize,
    /// Sum of row-scoped encoded sizes.
    pub row_scoped: usize,
    /// Sum of full-buffer encoded sizes.
    pub full_buffer: usize,
}

impl LayoutStats {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Default::default()
        }
    }

    fn record(&mut self, report: &RoomReport) {
        self.rooms_decoded += 1;
        self.uncompressed += report.uncompressed;
        self.row_scoped += report.row_scoped;
        self.full_buffer += report.full_buffer;
    }

    pub fn compressed(&self, framing: Framing) -> usize {
        match framing {
            Framing::RowScoped => self.row_scoped,
            Framing::FullBuffer => self.full_buffer,
        }
    }

    /// Compressed size as a percentage of the uncompressed size.
    /// Zero when no room was decoded.
    pub fn ratio(&self, framing: Framing) -> f64 {
        if self.uncompressed == 0 {
            return 0.0;
        }
        self.compressed(framing) as f64 / self.uncompressed as f64 * 100.0
    }

    pub fn row_ratio(&self) -> f64 {
        self.ratio(Framing::RowScoped)
    }

    pub fn full_ratio(&self) -> f64 {
        self.ratio(Framing::FullBuffer)
    }
}

impl fmt::Display for LayoutStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = &self.label;
        writeln!(f, "map: {label} uncompressed size:      {}", self.uncompressed)?;
        writeln!(
            f,
            "map: {label} compressed-by-row size: {} ({:.0}%)",
            self.row_scoped,
            self.row_ratio()
        )?;
        write!(
            f,
            "map: {label} compressed-full size:   {} ({:.0}%)",
            self.full_buffer,
            self.full_ratio()
        )
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Fatal analyzer error. Room decode failures are not errors.
#[derive(Debug, thiserror::Error)]
pub enum AnalyzeError {
    #[error("writing artifact {name}: {source}")]
    Artifact {
        name: String,
        #[source]
        source: io::Error,
    },
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// Analyze every room of `config`.
///
/// Undecodable rooms are logged and skipped. When `sink` is given, each
/// decoded room's raw grid and both encodings are written to it; the first
/// write failure aborts the run.
pub fn analyze(
    config: &LayoutConfig,
    label: &str,
    sink: Option<&mut dyn ArtifactSink>,
) -> Result<LayoutStats, AnalyzeError> {
    let rooms = (0..config.room_count()).map(|room| (room, analyze_room(config, room)));
    accumulate(label, rooms, sink)
}

/// Same as [`analyze`], with rooms decoded and encoded on the rayon pool.
///
/// Artifacts are written afterwards in room order, so totals and files
/// match the sequential run exactly.
#[cfg(feature = "parallel")]
pub fn analyze_parallel(
    config: &LayoutConfig,
    label: &str,
    sink: Option<&mut dyn ArtifactSink>,
) -> Result<LayoutStats, AnalyzeError> {
    let results: Vec<_> = (0..config.room_count())
        .into_par_iter()
        .map(|room| (room, analyze_room(config, room)))
        .collect();
    accumulate(label, results, sink)
}

fn accumulate<I>(
    label: &str,
    rooms: I,
    mut sink: Option<&mut dyn ArtifactSink>,
) -> Result<LayoutStats, AnalyzeError>
where
    I: IntoIterator<Item = (usize, Result<RoomAnalysis, RoomError>)>,
{
    let mut stats = LayoutStats::new(label);

    for (room, result) in rooms {
        match result {
            Ok(analysis) => {
                if let Some(sink) = sink.as_deref_mut() {
                    analysis.write_artifacts(sink, label)?;
                }
                let report = analysis.report();
                log::debug!(
                    "{label} room {room:03}: {} bytes, row {} bytes, full {} bytes",
                    report.uncompressed,
                    report.row_scoped,
                    report.full_buffer
                );
                stats.record(&report);
            }
            Err(e) => {
                log::warn!("{label}: skipping undecodable room: {e}");
                stats.rooms_skipped += 1;
            }
        }
    }

    log::info!(
        "{label}: {} rooms decoded, {} skipped",
        stats.rooms_decoded,
        stats.rooms_skipped
    );
    Ok(stats)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::LayoutFormat;

    struct FailingSink;

    impl ArtifactSink for FailingSink {
        fn write_artifact(&mut self, _name: &str, _data: &[u8]) -> io::Result<()> {
            Err(io::Error::other("disk full"))
        }
    }

    fn two_room_config() -> LayoutConfig {
        // 2 columns x 3 rows. Room 0: both columns tile 1; room 1: 1 then 2.
        LayoutConfig::new(
            LayoutFormat::Underworld,
            2,
            2,
            3,
            vec![0x00, 0x00, 0x00, 0x01],
            vec![0],
            vec![0xA1, 0xA2],
        )
        .unwrap()
    }

    #[test]
    fn artifact_names_are_zero_padded() {
        assert_eq!(
            artifact_name(ArtifactKind::Uncompressed, "OW", 7),
            "map.uncompressed.OW.007.bin"
        );
        assert_eq!(
            artifact_name(ArtifactKind::Compressed(Framing::RowScoped), "UW", 42),
            "map.compressed-rle-row.UW.042.bin"
        );
        assert_eq!(
            artifact_name(ArtifactKind::Compressed(Framing::FullBuffer), "UW", 123),
            "map.compressed-rle-full.UW.123.bin"
        );
    }

    #[test]
    fn totals_over_rooms() {
        let stats = analyze(&two_room_config(), "T", None).unwrap();
        assert_eq!(stats.rooms_decoded, 2);
        assert_eq!(stats.rooms_skipped, 0);
        assert_eq!(stats.uncompressed, 12);
        // Room 0 rows [1,1] x3: row 3*2 bytes, full 2 bytes.
        // Room 1 rows [1,2] x3: row 3*2 bytes, full 6 bytes.
        assert_eq!(stats.row_scoped, 12);
        assert_eq!(stats.full_buffer, 8);
        assert!((stats.row_ratio() - 100.0).abs() < 1e-9);
        assert!((stats.full_ratio() - 800.0 / 12.0).abs() < 1e-9);
    }

    #[test]
    fn artifacts_go_to_sink() {
        let mut sink = MemorySink::new();
        analyze(&two_room_config(), "T", Some(&mut sink)).unwrap();
        assert_eq!(sink.len(), 6);
        assert_eq!(sink.get("map.uncompressed.T.001.bin"), Some(&[1, 2, 1, 2, 1, 2][..]));
        assert_eq!(sink.get("map.compressed-rle-full.T.000.bin"), Some(&[0x85, 1][..]));
        assert_eq!(
            sink.get("map.compressed-rle-row.T.000.bin"),
            Some(&[0x81, 1, 0x81, 1, 0x81, 1][..])
        );
    }

    #[test]
    fn sink_failure_is_fatal() {
        let mut sink = FailingSink;
        let err = analyze(&two_room_config(), "T", Some(&mut sink)).unwrap_err();
        let AnalyzeError::Artifact { name, .. } = &err;
        assert_eq!(name, "map.uncompressed.T.000.bin");
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn empty_stats_report_zero_ratio() {
        let stats = LayoutStats::new("X");
        assert_eq!(stats.row_ratio(), 0.0);
        assert_eq!(stats.full_ratio(), 0.0);
    }

    #[test]
    fn report_lines() {
        let stats = LayoutStats {
            label: "OW".into(),
            rooms_decoded: 1,
            rooms_skipped: 0,
            uncompressed: 200,
            row_scoped: 100,
            full_buffer: 50,
        };
        let text = stats.to_string();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "map: OW uncompressed size:      200");
        assert_eq!(lines[1], "map: OW compressed-by-row size: 100 (50%)");
        assert_eq!(lines[2], "map: OW compressed-full size:   50 (25%)");
    }

    #[test]
    fn room_analysis_encodings() {
        let analysis = analyze_room(&two_room_config(), 1).unwrap();
        assert_eq!(analysis.encoded(Framing::RowScoped).len(), 6);
        assert_eq!(analysis.encoded(Framing::FullBuffer), &[1, 2, 1, 2, 1, 2]);
        assert_eq!(
            analysis.report(),
            RoomReport {
                room: 1,
                uncompressed: 6,
                row_scoped: 6,
                full_buffer: 6
            }
        );
    }

    #[test]
    fn exact_decode_depends_on_run_length() {
        let analysis = analyze_room(&two_room_config(), 0).unwrap();
        assert!(analysis.decodes_exactly(Framing::RowScoped));
        assert!(analysis.decodes_exactly(Framing::FullBuffer));

        // 12 x 11 cells of one tile: a 132-cell full-buffer run.
        let config = LayoutConfig::new(
            LayoutFormat::Overworld,
            1,
            12,
            11,
            vec![0x00; 12],
            vec![0],
            [0x81].into_iter().chain([0x01; 10]).collect(),
        )
        .unwrap();
        let analysis = analyze_room(&config, 0).unwrap();
        assert_eq!(analysis.full_buffer, vec![0x80 | 131, 1]);
        assert!(analysis.decodes_exactly(Framing::RowScoped));
        assert!(!analysis.decodes_exactly(Framing::FullBuffer));
    }

    #[test]
    fn directory_sink_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = DirectorySink::new(dir.path());
        assert_eq!(sink.root(), dir.path());
        sink.write_artifact("a.bin", &[1, 2, 3]).unwrap();
        sink.write_artifact("a.bin", &[4]).unwrap();
        assert_eq!(fs::read(dir.path().join("a.bin")).unwrap(), vec![4]);
        assert!(!dir.path().join(".a.bin.tmp").exists());
    }

    #[test]
    fn directory_sink_reports_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = DirectorySink::new(dir.path().join("missing"));
        assert!(sink.write_artifact("a.bin", &[1]).is_err());
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn parallel_matches_sequential() {
        let config = two_room_config();
        let mut seq_sink = MemorySink::new();
        let mut par_sink = MemorySink::new();
        let seq = analyze(&config, "T", Some(&mut seq_sink)).unwrap();
        let par = analyze_parallel(&config, "T", Some(&mut par_sink)).unwrap();
        assert_eq!(seq, par);
        assert_eq!(seq_sink.into_inner(), par_sink.into_inner());
    }
}
