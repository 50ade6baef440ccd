//! Log filter selection and the rolling file sink.
//!
//! Subscriber assembly lives in the binary; this module only decides which
//! filter applies and whether `<data_dir>/logs` can take a log file.

use std::fs;
use std::path::PathBuf;

use tracing_appender::rolling::{RollingFileAppender, Rotation};

pub const DEFAULT_LOG_FILTER: &str = "info";
pub const DEFAULT_LOG_RETENTION_FILES: usize = 14;
pub const LOG_DIR_NAME: &str = "logs";
const LOG_FILE_PREFIX: &str = "frameblur";
const LOG_FILE_SUFFIX: &str = "log";

/// Inputs gathered from the command line and environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogSettings {
    pub data_dir: Option<PathBuf>,
    pub verbose: u8,
    pub cli_filter: Option<String>,
    pub env_filter: Option<String>,
    /// Daily files to keep. Zero means the default.
    pub retention_files: usize,
}

#[derive(Debug)]
pub enum FileSink {
    Rolling {
        log_dir: PathBuf,
        appender: RollingFileAppender,
    },
    ConsoleOnly {
        attempted_log_dir: Option<PathBuf>,
        reason: String,
    },
}

#[derive(Debug)]
pub struct LoggingSetup {
    pub filter: String,
    pub file_sink: FileSink,
}

impl LogSettings {
    pub fn prepare(&self) -> LoggingSetup {
        LoggingSetup {
            filter: self.filter(),
            file_sink: self.open_file_sink(),
        }
    }

    /// `--log-filter` wins, then `-v`/`-vv`, then `RUST_LOG`.
    pub fn filter(&self) -> String {
        let verbose_level = match self.verbose {
            0 => None,
            1 => Some("debug"),
            _ => Some("trace"),
        };

        self.cli_filter
            .clone()
            .or_else(|| verbose_level.map(str::to_string))
            .or_else(|| self.env_filter.clone())
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string())
    }

    pub fn open_file_sink(&self) -> FileSink {
        let Some(data_dir) = &self.data_dir else {
            return FileSink::ConsoleOnly {
                attempted_log_dir: None,
                reason: "no data directory configured".to_string(),
            };
        };

        let log_dir = data_dir.join(LOG_DIR_NAME);
        if let Err(e) = fs::create_dir_all(&log_dir) {
            return FileSink::ConsoleOnly {
                attempted_log_dir: Some(log_dir),
                reason: format!("cannot create log directory: {e}"),
            };
        }

        let retention = match self.retention_files {
            0 => DEFAULT_LOG_RETENTION_FILES,
            n => n,
        };

        match RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix(LOG_FILE_PREFIX)
            .filename_suffix(LOG_FILE_SUFFIX)
            .max_log_files(retention)
            .build(&log_dir)
        {
            Ok(appender) => FileSink::Rolling { log_dir, appender },
            Err(e) => FileSink::ConsoleOnly {
                attempted_log_dir: Some(log_dir),
                reason: format!("cannot open rolling log file: {e}"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(verbose: u8, cli: Option<&str>, env: Option<&str>) -> LogSettings {
        LogSettings {
            verbose,
            cli_filter: cli.map(str::to_string),
            env_filter: env.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn filter_precedence() {
        assert_eq!(
            settings(2, Some("frameblur_core=warn"), Some("debug")).filter(),
            "frameblur_core=warn"
        );
        assert_eq!(settings(1, None, Some("warn")).filter(), "debug");
        assert_eq!(settings(4, None, Some("warn")).filter(), "trace");
        assert_eq!(settings(0, None, Some("frameblur_core=trace")).filter(), "frameblur_core=trace");
        assert_eq!(settings(0, None, None).filter(), DEFAULT_LOG_FILTER);
    }

    #[test]
    fn no_data_dir_means_console_only() {
        let setup = LogSettings::default().prepare();
        assert_eq!(setup.filter, "info");
        assert!(matches!(
            setup.file_sink,
            FileSink::ConsoleOnly { attempted_log_dir: None, .. }
        ));
    }

    #[test]
    fn rolling_sink_lives_under_data_dir() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let settings = LogSettings {
            data_dir: Some(temp.path().to_path_buf()),
            ..Default::default()
        };

        match settings.open_file_sink() {
            FileSink::Rolling { log_dir, .. } => {
                assert_eq!(log_dir, temp.path().join(LOG_DIR_NAME));
                assert!(log_dir.is_dir());
            }
            other => panic!("expected rolling sink, got {other:?}"),
        }
    }

    #[test]
    fn unwritable_data_dir_falls_back_with_reason() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let blocker = temp.path().join("not-a-dir");
        fs::write(&blocker, b"file").expect("write blocker file");

        let settings = LogSettings {
            data_dir: Some(blocker.clone()),
            ..Default::default()
        };
        let FileSink::ConsoleOnly {
            attempted_log_dir,
            reason,
        } = settings.open_file_sink()
        else {
            panic!("a file in place of the data dir must not yield a rolling sink");
        };
        assert_eq!(attempted_log_dir, Some(blocker.join(LOG_DIR_NAME)));
        assert!(reason.starts_with("cannot create log directory"));
    }
}
