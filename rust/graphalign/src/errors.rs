use massgraph::GraphInputError;
use std::fmt::Display;
use std::path::PathBuf;

/// Errors raised while aligning.
///
/// "Alignment not found" is not an error; it is an ordinary
/// [`AlignmentOutcome`](crate::pipeline::AlignmentOutcome).
#[derive(Debug)]
pub enum AlignError {
    GraphInput(GraphInputError),
    DataProcessing(DataProcessingError),
    Config(ConfigError),
}

impl Display for AlignError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AlignError {}

#[derive(Debug, Clone, PartialEq)]
pub enum DataProcessingError {
    ExpectedSlicesSameLength {
        expected: usize,
        other: usize,
        context: &'static str,
    },
    ExpectedNonEmptyData {
        context: &'static str,
    },
    ExpectedSortedData {
        index: usize,
        context: &'static str,
    },
    ExpectedNonNegative {
        index: usize,
        value: i32,
        context: &'static str,
    },
    ExpectedSetField {
        field: &'static str,
        context: &'static str,
    },
}

#[derive(Debug)]
pub enum ConfigError {
    Invalid {
        field: &'static str,
        reason: String,
    },
    Parsing {
        source: serde_json::Error,
    },
    FileReading {
        source: std::io::Error,
        path: PathBuf,
    },
}

impl From<GraphInputError> for AlignError {
    fn from(e: GraphInputError) -> Self {
        AlignError::GraphInput(e)
    }
}

impl From<DataProcessingError> for AlignError {
    fn from(e: DataProcessingError) -> Self {
        AlignError::DataProcessing(e)
    }
}

impl From<ConfigError> for AlignError {
    fn from(e: ConfigError) -> Self {
        AlignError::Config(e)
    }
}

pub type Result<T> = std::result::Result<T, AlignError>;
