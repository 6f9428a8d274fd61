use log::LevelFilter;
use log4rs::{
    Config, append::console::ConsoleAppender, append::file::FileAppender,
    config::Appender, config::Logger, config::Root, encode::pattern::PatternEncoder, init_config,
};

/// The pattern to use when logging
const LOGGING_PATTERN: &str = "[{d} {h({l})} {M}] {m}{n}";

/// Log file name
pub const LOG_FILE_NAME: &str = "data/ingest.log";

/// Sets up `log4rs` with a console and a file appender at `logging_level`
/// for the crate's own modules, leaving dependency crates at `Info`.
pub fn setup(logging_level: LevelFilter) {
    if logging_level == LevelFilter::Off {
        return;
    }

    let pattern = Box::new(PatternEncoder::new(LOGGING_PATTERN));
    let console = Box::new(ConsoleAppender::builder().encoder(pattern.clone()).build());
    let file = Box::new(
        FileAppender::builder()
            .encoder(pattern)
            .build(LOG_FILE_NAME)
            .expect("Unable to create logging file appender"),
    );

    const APPENDERS: [&str; 2] = ["stdout", "file"];

    let config = Config::builder()
        .appender(Appender::builder().build("stdout", console))
        .appender(Appender::builder().build("file", file))
        .logger(
            Logger::builder()
                .appenders(APPENDERS)
                .additive(false)
                .build("cijene_ingest", logging_level),
        )
        .build(Root::builder().appenders(APPENDERS).build(LevelFilter::Info))
        .expect("Failed to create logging config");

    init_config(config).expect("Unable to initialize logger");
}
