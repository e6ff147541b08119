use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MappingError {
    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("could not detect mapping format")]
    UnknownFormat,
}

impl MappingError {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        MappingError::Parse {
            line,
            message: message.into(),
        }
    }
}
