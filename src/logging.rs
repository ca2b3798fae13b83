//! Logger setup.
//!
//! The TUI owns the terminal, so in that mode records go to a file through
//! log4rs. Plain mode logs to stderr with env_logger.

use std::path::Path;

use anyhow::{Context, Result};
use log::LevelFilter;
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;

/// Picked up instead of the built-in file logger when present.
pub const LOG4RS_CONFIG_FILE: &str = "log4rs.yaml";
pub const DEFAULT_LOG_FILE: &str = "mcp-chat.log";

const LOG_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} {l:<5} {t} - {m}{n}";

pub fn level(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

/// Routes log records to `log_file`, or follows `log4rs.yaml` when the
/// working directory has one.
pub fn init_file_logging(log_file: &Path, verbose: bool) -> Result<()> {
    if Path::new(LOG4RS_CONFIG_FILE).exists() {
        log4rs::init_file(LOG4RS_CONFIG_FILE, Default::default())
            .with_context(|| format!("failed to load {}", LOG4RS_CONFIG_FILE))?;
        return Ok(());
    }
    let appender = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
        .build(log_file)
        .with_context(|| format!("failed to open log file {}", log_file.display()))?;
    let config = Config::builder()
        .appender(Appender::builder().build("file", Box::new(appender)))
        .build(Root::builder().appender("file").build(level(verbose)))
        .context("invalid logging configuration")?;
    log4rs::init_config(config).context("logger already initialized")?;
    Ok(())
}

/// Stderr logging for plain mode. `RUST_LOG` overrides the default filter.
pub fn init_stderr_logging(verbose: bool) {
    let default = if verbose { LevelFilter::Debug } else { LevelFilter::Warn };
    let _ = env_logger::builder()
        .filter_level(default)
        .format_timestamp_millis()
        .parse_default_env()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_raises_the_file_level() {
        assert_eq!(level(false), LevelFilter::Info);
        assert_eq!(level(true), LevelFilter::Debug);
    }
}
