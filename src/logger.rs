use log::LevelFilter;

/// Info by default, debug with `-v`, trace with `-vv`, errors only with `-q`.
pub fn level_for(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::Error;
    }
    match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Logs go to stderr so stdout stays clean for reports. `RUST_LOG`, when set,
/// overrides the flag-derived level.
pub fn init_logger(verbose: u8, quiet: bool) {
    let mut builder = pretty_env_logger::formatted_builder();
    builder.filter_level(level_for(verbose, quiet));
    if let Ok(spec) = std::env::var("RUST_LOG") {
        builder.parse_filters(&spec);
    }
    let _ = builder.try_init();
}
