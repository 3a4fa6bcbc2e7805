fn main() {
    #[cfg(feature = "cli")]
    roomlayout::cli::run();

    #[cfg(not(feature = "cli"))]
    {
        eprintln!("roomlayout: CLI not enabled. Rebuild with `--features cli`.");
        std::process::exit(1);
    }
}
