use std::path::PathBuf;
use std::sync::{Mutex, Once};

use serde::{Deserialize, Serialize};
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Layer};

static TRACING_INIT: Once = Once::new();

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// A simple level (`info`, `debug`, ...) or a full `EnvFilter` directive string.
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,

    /// Emit logs as JSON lines.
    #[serde(default)]
    pub json: bool,

    #[serde(default = "LoggingConfig::default_stderr")]
    pub stderr: bool,

    /// Append logs to this file as well. If it cannot be opened, file logging is skipped.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_owned()
    }

    fn default_stderr() -> bool {
        true
    }

    /// Bare level names are accepted in any case (`WARNING` → `warn`); anything else is passed
    /// through as `EnvFilter` directives.
    pub(crate) fn normalize_level_directives(input: &str) -> String {
        let level = input.trim();
        if level.is_empty() {
            return Self::default_level();
        }
        let lower = level.to_ascii_lowercase();
        match lower.as_str() {
            "warning" => "warn".to_owned(),
            "trace" | "debug" | "info" | "warn" | "error" => lower,
            _ => level.to_owned(),
        }
    }

    fn config_env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(Self::normalize_level_directives(&self.level))
            .unwrap_or_else(|_| EnvFilter::new(Self::default_level()))
    }

    /// The effective filter: the configured level, with `RUST_LOG` merged in when set.
    pub fn env_filter(&self) -> EnvFilter {
        let env_directives = std::env::var("RUST_LOG")
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty());

        match env_directives {
            Some(env_directives) => {
                let config_directives = Self::normalize_level_directives(&self.level);
                let combined = format!("{config_directives},{env_directives}");
                EnvFilter::try_new(combined)
                    .or_else(|_| EnvFilter::try_new(env_directives))
                    .unwrap_or_else(|_| self.config_env_filter())
            }
            None => self.config_env_filter(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            json: false,
            stderr: Self::default_stderr(),
            file: None,
        }
    }
}

/// Installs the global `tracing` subscriber.
///
/// Only the first call has an effect; later calls (and calls after another subscriber was
/// installed) are ignored.
pub fn init_tracing(logging: &LoggingConfig) {
    TRACING_INIT.call_once(|| {
        let filter = logging.env_filter();

        let file = logging.file.as_ref().map(|path| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|err| (path.clone(), err))
        });

        let mut make_writer = if logging.stderr {
            BoxMakeWriter::new(std::io::stderr)
        } else {
            BoxMakeWriter::new(std::io::sink)
        };
        let mut open_failure = None;
        match file {
            Some(Ok(file)) => {
                make_writer = BoxMakeWriter::new(make_writer.and(Mutex::new(file)));
            }
            Some(Err(failure)) => open_failure = Some(failure),
            None => {}
        }

        let layer: Box<dyn Layer<_> + Send + Sync> = if logging.json {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(make_writer)
                .with_ansi(false)
                .boxed()
        } else {
            tracing_subscriber::fmt::layer()
                .with_writer(make_writer)
                .with_ansi(false)
                .boxed()
        };

        let subscriber = tracing_subscriber::registry().with(filter).with(layer);
        if tracing::subscriber::set_global_default(subscriber).is_ok() {
            if let Some((path, err)) = open_failure {
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to open log file; file logging disabled"
                );
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    use tracing_subscriber::fmt::MakeWriter;

    use super::*;

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Capture {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Capture {
        type Writer = Capture;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn capture_with(logging: &LoggingConfig, emit: impl FnOnce()) -> String {
        let capture = Capture::default();
        let subscriber = tracing_subscriber::registry()
            .with(logging.config_env_filter())
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(capture.clone())
                    .with_ansi(false),
            );
        tracing::subscriber::with_default(subscriber, emit);
        capture.text()
    }

    #[test]
    fn level_names_are_forgiving() {
        assert_eq!(LoggingConfig::normalize_level_directives(" DEBUG "), "debug");
        assert_eq!(LoggingConfig::normalize_level_directives("Warning"), "warn");
        assert_eq!(LoggingConfig::normalize_level_directives(""), "info");
        assert_eq!(
            LoggingConfig::normalize_level_directives("warn,mapverify_checks=trace"),
            "warn,mapverify_checks=trace"
        );
    }

    #[test]
    fn simple_level_filters_events() {
        let logging = LoggingConfig {
            level: "DEBUG".to_owned(),
            ..Default::default()
        };
        let text = capture_with(&logging, || {
            tracing::trace!("hidden line");
            tracing::debug!("shown line");
        });
        assert!(!text.contains("hidden line"), "{text}");
        assert!(text.contains("shown line"), "{text}");
    }

    #[test]
    fn invalid_directives_fall_back_to_info() {
        let logging = LoggingConfig {
            level: "debug,mapverify=notalevel".to_owned(),
            ..Default::default()
        };
        let text = capture_with(&logging, || {
            tracing::debug!("hidden line");
            tracing::info!("shown line");
        });
        assert!(!text.contains("hidden line"), "{text}");
        assert!(text.contains("shown line"), "{text}");
    }
}
