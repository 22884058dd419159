use std::path::Path;

use anyhow::Context;
use log::LevelFilter;
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;

const PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} {h({l:<5})} {t} - {m}{n}";

/// Builds the log4rs configuration: always stderr, plus `log_file` when given.
pub fn app_config(log_file: Option<&Path>, level: LevelFilter) -> anyhow::Result<Config> {
    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(PATTERN)))
        .build();

    let mut builder = Config::builder().appender(Appender::builder().build("stderr", Box::new(stderr)));
    let mut root = Root::builder().appender("stderr");

    if let Some(path) = log_file {
        let file = FileAppender::builder()
            .encoder(Box::new(PatternEncoder::new(PATTERN)))
            .build(path)
            .with_context(|| format!("unable to open log file {}", path.display()))?;
        builder = builder.appender(Appender::builder().build("file", Box::new(file)));
        root = root.appender("file");
    }

    builder
        .build(root.build(level))
        .context("invalid logging configuration")
}
