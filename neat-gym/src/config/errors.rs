use super::literal::LiteralError;

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// An error in the layout of a configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IniError {
    #[error("line {line}: section [{section}] appears twice")]
    DuplicateSection { line: usize, section: String },
    #[error("line {line}: key {key} appears twice in [{section}]")]
    DuplicateKey {
        line: usize,
        section: String,
        key: String,
    },
    #[error("line {line}: entry before the first section header")]
    EntryOutsideSection { line: usize },
    #[error("line {line}: expected a [section] header or a key = value entry, found {content:?}")]
    Malformed { line: usize, content: String },
}

/// An error type indicating a configuration file
/// that cannot be loaded or fails validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Ini(#[from] IniError),
    #[error("missing section [{0}]")]
    MissingSection(String),
    #[error("missing key {key} in [{section}]")]
    MissingKey { section: String, key: String },
    #[error("invalid value {value:?} for {key} in [{section}]: expected {expected}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        expected: String,
    },
    #[error("unknown key {key} in [{section}]")]
    UnknownKey { section: String, key: String },
    /// A `[Names]` list does not label every substrate node.
    #[error("[Names] {kind} lists {names} names for {nodes} substrate {kind} nodes")]
    NameCountMismatch {
        kind: &'static str,
        names: usize,
        nodes: usize,
    },
    #[error("cannot evaluate {key} in [{section}]: {source}")]
    Literal {
        section: String,
        key: String,
        #[source]
        source: LiteralError,
    },
}
