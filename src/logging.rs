use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;
use crate::errors::ConfigError;

const CONSOLE_PATTERN: &str = "[{d(%Y-%m-%d %H:%M:%S %:z)} {h({l})} {M}] - {m}{n}";
const FILE_PATTERN: &str = "[{d(%Y-%m-%dT%H:%M:%S%.f):0<29}{d(%:z)} {l} {M}] - {m}{n}";

/// Sets up the logger
///
/// Logs always go to stdout, and also to file when a log path is configured.
/// Outbound HTTP crates are held at warn to keep request bodies out of the log.
///
/// # Arguments
///
/// * 'log_path' - optional path where to save logs
pub fn setup_logger(log_path: Option<&str>) -> Result<(), ConfigError> {
    let config = logger_config(log_path)?;
    let _ = log4rs::init_config(config)?;

    Ok(())
}

/// Builds the log4rs configuration
///
/// # Arguments
///
/// * 'log_path' - optional path where to save logs
fn logger_config(log_path: Option<&str>) -> Result<log4rs::Config, ConfigError> {
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(CONSOLE_PATTERN)))
        .build();

    let mut builder = log4rs::Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .logger(Logger::builder().build("reqwest", LevelFilter::Warn))
        .logger(Logger::builder().build("hyper", LevelFilter::Warn));
    let mut root = Root::builder().appender("stdout");

    if let Some(path) = log_path {
        let file = FileAppender::builder()
            .encoder(Box::new(PatternEncoder::new(FILE_PATTERN)))
            .build(path)?;
        builder = builder.appender(Appender::builder().build("file", Box::new(file)));
        root = root.appender("file");
    }

    builder
        .build(root.build(LevelFilter::Info))
        .map_err(|e| ConfigError(e.to_string()))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn console_only_config_builds() {
        let config = logger_config(None).unwrap();
        assert_eq!(config.appenders().len(), 1);
        assert_eq!(config.root().appenders(), ["stdout"]);
    }

    #[test]
    fn file_appender_added_when_path_given() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.log");
        let config = logger_config(path.to_str()).unwrap();
        assert_eq!(config.appenders().len(), 2);
        assert_eq!(config.root().appenders(), ["stdout", "file"]);
        assert_eq!(config.root().level(), LevelFilter::Info);
    }
}
