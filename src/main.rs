fn main() {
    #[cfg(feature = "cli")]
    uuwire::cli::run();

    #[cfg(not(feature = "cli"))]
    {
        eprintln!("uuwire: CLI not enabled. Rebuild with `--features cli`.");
        std::process::exit(1);
    }
}
