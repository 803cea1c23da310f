use std::path::PathBuf;
use thiserror::Error;

/// Failures while turning a single field of the input file into a typed value.
///
/// `line` is the 1-based line number in the source file, header included, so
/// it can be matched against what an editor shows.
#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("line {line}: unparseable invoice date {value:?} (expected day-first, e.g. 05/01/2024)")]
    InvalidDate { line: u64, value: String },

    #[error("line {line}: column `{column}` has invalid value {value:?}")]
    InvalidNumber {
        line: u64,
        column: &'static str,
        value: String,
    },

    #[error("line {line}: column `{column}` is empty")]
    EmptyField { line: u64, column: &'static str },
}

/// Fatal errors raised while loading the base table.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot open dataset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed dataset: {0}")]
    Csv(#[from] csv::Error),

    #[error("dataset is missing required column `{column}`")]
    MissingColumn { column: &'static str },

    #[error("dataset contains no transactions")]
    Empty,

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Invalid process configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("environment variable {name} has invalid value {value:?}")]
    InvalidValue { name: &'static str, value: String },
}
