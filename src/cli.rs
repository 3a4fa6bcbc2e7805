// Command line front end for roomlayout.
//
// Subcommands:
//   analyze  decode every room of the selected maps and report RLE sizes
//   room     decode one room and print its grid
//   config   print the built-in map geometries

use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum, ValueHint};

use crate::analyze::{self, ArtifactSink, DirectorySink, LayoutStats};
use crate::image::{self, BUILTIN_MAPS, Image, MapGeometry, OVERWORLD, UNDERWORLD};
use crate::rle::Framing;

// ---------------------------------------------------------------------------
// Clap CLI definition
// ---------------------------------------------------------------------------

/// Room layout decoder and run-length compression analyzer.
#[derive(Parser, Debug)]
#[command(
    name = "roomlayout",
    version,
    about = "Decode packed room layouts and measure RLE trade-offs",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,

    /// Quiet mode (suppress non-error output).
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Verbose mode (use multiple times for more detail).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Print results as JSON on stdout.
    #[arg(long = "json", global = true)]
    json_output: bool,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Decode every room and report compressed sizes.
    Analyze(AnalyzeArgs),
    /// Decode a single room and print it.
    Room(RoomArgs),
    /// Print the built-in map geometries.
    Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum MapArg {
    #[value(alias = "overworld")]
    Ow,
    #[value(alias = "underworld")]
    Uw,
}

impl MapArg {
    fn geometry(self) -> MapGeometry {
        match self {
            MapArg::Ow => OVERWORLD,
            MapArg::Uw => UNDERWORLD,
        }
    }
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// Cartridge image.
    #[arg(value_hint = ValueHint::FilePath)]
    image: PathBuf,

    /// Map to analyze (default: all built-in maps).
    #[arg(long, short = 'm', value_enum)]
    map: Option<MapArg>,

    /// Directory for artifacts (default: current directory).
    #[arg(long, short = 'o', value_hint = ValueHint::DirPath)]
    out: Option<PathBuf>,

    /// Write raw and compressed room artifacts.
    #[arg(long = "write-artifacts")]
    write_artifacts: bool,
}

#[derive(Args, Debug)]
struct RoomArgs {
    /// Cartridge image.
    #[arg(value_hint = ValueHint::FilePath)]
    image: PathBuf,

    /// Map the room belongs to.
    #[arg(long, short = 'm', value_enum)]
    map: MapArg,

    /// Zero-based room index.
    #[arg(long, short = 'i')]
    index: usize,
}

// ---------------------------------------------------------------------------
// Resolved command + options (flattened from Cli)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Analyze,
    Room,
    Config,
}

#[derive(Debug)]
struct Options {
    command: Command,
    quiet: bool,
    verbose: u8,
    json_output: bool,
    image_file: Option<PathBuf>,
    maps: Vec<MapGeometry>,
    out_dir: PathBuf,
    write_artifacts: bool,
    room_index: usize,
}

fn resolve_options(cli: Cli) -> Options {
    let quiet = cli.quiet;
    let verbose = cli.verbose.min(2);
    let json_output = cli.json_output;

    match cli.command {
        Cmd::Analyze(args) => Options {
            command: Command::Analyze,
            quiet,
            verbose,
            json_output,
            image_file: Some(args.image),
            maps: match args.map {
                Some(map) => vec![map.geometry()],
                None => BUILTIN_MAPS.to_vec(),
            },
            out_dir: args.out.unwrap_or_else(|| PathBuf::from(".")),
            write_artifacts: args.write_artifacts,
            room_index: 0,
        },
        Cmd::Room(args) => Options {
            command: Command::Room,
            quiet,
            verbose,
            json_output,
            image_file: Some(args.image),
            maps: vec![args.map.geometry()],
            out_dir: PathBuf::from("."),
            write_artifacts: false,
            room_index: args.index,
        },
        Cmd::Config => Options {
            command: Command::Config,
            quiet,
            verbose,
            json_output,
            image_file: None,
            maps: BUILTIN_MAPS.to_vec(),
            out_dir: PathBuf::from("."),
            write_artifacts: false,
            room_index: 0,
        },
    }
}

#[cfg(any(test, feature = "fuzzing"))]
pub fn fuzz_try_parse_args(args: &[String]) {
    let argv: Vec<String> = std::iter::once("roomlayout".to_string())
        .chain(args.iter().cloned())
        .collect();
    if let Ok(cli) = Cli::try_parse_from(argv) {
        let _ = resolve_options(cli);
    }
}

fn open_image(opts: &Options) -> Option<Image> {
    let Some(path) = opts.image_file.as_deref() else {
        eprintln!("roomlayout: an image file is required");
        return None;
    };
    match image::load_image(path) {
        Ok(image) => Some(image),
        Err(e) => {
            eprintln!("roomlayout: image: {}: {e}", path.display());
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Config command
// ---------------------------------------------------------------------------

fn cmd_config(opts: &Options) -> i32 {
    if opts.json_output {
        let maps: Vec<_> = opts.maps.iter().map(geometry_json).collect();
        println!("{}", pretty(&serde_json::json!({ "maps": maps })));
        return 0;
    }

    let version = env!("CARGO_PKG_VERSION");
    println!("roomlayout version {version}");
    println!("FILE_IO={}", cfg!(feature = "file-io") as u8);
    println!("PARALLEL={}", cfg!(feature = "parallel") as u8);
    for map in &opts.maps {
        println!();
        println!("map {} ({})", map.label, map.format.name());
        println!("  rooms:            {}", map.room_count);
        println!("  room size:        {} columns x {} rows", map.columns, map.rows);
        println!("  room columns:     {:#07X}", map.room_columns_offset);
        println!(
            "  table directory:  {:#07X} ({} tables)",
            map.directory_offset, map.table_count
        );
        println!(
            "  column tables:    {:#07X} ({} bytes)",
            map.tables_offset, map.tables_len
        );
    }

    0
}

fn geometry_json(map: &MapGeometry) -> serde_json::Value {
    serde_json::json!({
        "label": map.label,
        "format": map.format.name(),
        "rooms": map.room_count,
        "columns": map.columns,
        "rows": map.rows,
        "room_columns_offset": map.room_columns_offset,
        "directory_offset": map.directory_offset,
        "table_count": map.table_count,
        "tables_offset": map.tables_offset,
        "tables_len": map.tables_len,
    })
}

// ---------------------------------------------------------------------------
// Analyze command
// ---------------------------------------------------------------------------

fn cmd_analyze(opts: &Options) -> i32 {
    let Some(image) = open_image(opts) else {
        return 1;
    };

    let mut sink = if opts.write_artifacts {
        if let Err(e) = std::fs::create_dir_all(&opts.out_dir) {
            eprintln!("roomlayout: output directory: {}: {e}", opts.out_dir.display());
            return 1;
        }
        let sink = DirectorySink::new(&opts.out_dir);
        log::info!("writing artifacts to {}", sink.root().display());
        Some(sink)
    } else {
        None
    };

    let mut all_stats = Vec::with_capacity(opts.maps.len());

    for map in &opts.maps {
        let config = match image.read_layout(map) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("roomlayout: {}: {e}", map.label);
                return 1;
            }
        };

        let sink_ref = sink.as_mut().map(|s| s as &mut dyn ArtifactSink);
        let result = run_analysis(&config, map.label, sink_ref);
        let stats = match result {
            Ok(stats) => stats,
            Err(e) => {
                eprintln!("roomlayout: {}: {e}", map.label);
                return 1;
            }
        };

        if !opts.json_output && !opts.quiet {
            println!("{stats}");
        }
        if opts.verbose > 0 && !opts.quiet && stats.rooms_skipped > 0 {
            eprintln!(
                "roomlayout: {}: {} of {} rooms could not be decoded",
                map.label, stats.rooms_skipped, map.room_count
            );
        }
        all_stats.push(stats);
    }

    if opts.json_output {
        let maps: Vec<_> = all_stats.iter().map(stats_json).collect();
        let json = serde_json::json!({
            "command": "analyze",
            "image": opts.image_file.as_deref().map(Path::display).map(|d| d.to_string()),
            "image_size": image.len(),
            "sha256": image.sha256_hex(),
            "maps": maps,
        });
        println!("{}", pretty(&json));
    }

    0
}

#[cfg(feature = "parallel")]
fn run_analysis(
    config: &crate::layout::LayoutConfig,
    label: &str,
    sink: Option<&mut dyn ArtifactSink>,
) -> Result<LayoutStats, analyze::AnalyzeError> {
    analyze::analyze_parallel(config, label, sink)
}

#[cfg(not(feature = "parallel"))]
fn run_analysis(
    config: &crate::layout::LayoutConfig,
    label: &str,
    sink: Option<&mut dyn ArtifactSink>,
) -> Result<LayoutStats, analyze::AnalyzeError> {
    analyze::analyze(config, label, sink)
}

fn stats_json(stats: &LayoutStats) -> serde_json::Value {
    serde_json::json!({
        "label": stats.label,
        "rooms_decoded": stats.rooms_decoded,
        "rooms_skipped": stats.rooms_skipped,
        "uncompressed": stats.uncompressed,
        "row_scoped": stats.row_scoped,
        "full_buffer": stats.full_buffer,
        "row_ratio": stats.row_ratio(),
        "full_ratio": stats.full_ratio(),
    })
}

// ---------------------------------------------------------------------------
// Room command
// ---------------------------------------------------------------------------

fn cmd_room(opts: &Options) -> i32 {
    let Some(image) = open_image(opts) else {
        return 1;
    };
    let Some(map) = opts.maps.first() else {
        eprintln!("roomlayout: room: no map selected");
        return 1;
    };

    let config = match image.read_layout(map) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("roomlayout: {}: {e}", map.label);
            return 1;
        }
    };

    let analysis = match analyze::analyze_room(&config, opts.room_index) {
        Ok(analysis) => analysis,
        Err(e) => {
            eprintln!("roomlayout: {}: {e}", map.label);
            return 1;
        }
    };
    let report = analysis.report();
    let row_exact = analysis.decodes_exactly(Framing::RowScoped);
    let full_exact = analysis.decodes_exactly(Framing::FullBuffer);

    if opts.json_output {
        let rows: Vec<Vec<u8>> = analysis.grid.rows().map(<[u8]>::to_vec).collect();
        let json = serde_json::json!({
            "command": "room",
            "map": map.label,
            "room": report.room,
            "grid": rows,
            "uncompressed": report.uncompressed,
            "row_scoped": report.row_scoped,
            "full_buffer": report.full_buffer,
            "row_scoped_exact": row_exact,
            "full_buffer_exact": full_exact,
        });
        println!("{}", pretty(&json));
    } else if !opts.quiet {
        println!("{} room {:03}", map.label, report.room);
        print!("{}", analysis.grid);
        println!("uncompressed: {}", report.uncompressed);
        println!("row-scoped:   {}", report.row_scoped);
        println!("full-buffer:  {}", report.full_buffer);
        println!(
            "exact decode: row-scoped {}, full-buffer {}",
            yes_no(row_exact),
            yes_no(full_exact)
        );
    }

    0
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

fn pretty(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Main CLI entry point. Parses arguments via clap, dispatches commands.
pub fn run() -> ! {
    let cli = Cli::parse();
    let opts = resolve_options(cli);

    let default_filter = match (opts.quiet, opts.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let exit_code = match opts.command {
        Command::Analyze => cmd_analyze(&opts),
        Command::Room => cmd_room(&opts),
        Command::Config => cmd_config(&opts),
    };

    process::exit(exit_code);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
