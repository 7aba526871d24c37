//! Error types for ingestion, chart configuration and the dashboard.

use thiserror::Error;

/// Errors raised while turning a source file into a dataset
#[derive(Error, Debug)]
pub enum IngestError {
    /// Only `.csv` files are accepted
    #[error("Unsupported file type '{name}': please select a CSV file")]
    UnsupportedFileType { name: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),
}

/// Errors raised by the chart configurator
#[derive(Error, Debug)]
pub enum ChartError {
    #[error("Data is still being parsed")]
    ParsingInProgress,

    #[error("No data loaded")]
    NoData,

    #[error("No rows match this filter")]
    NoRows,

    #[error("Column '{column}' not found. Available columns: {available}")]
    UnknownColumn { column: String, available: String },

    #[error("Both X and Y axes must be selected")]
    MissingAxis,

    /// Y-axis validation failed; carries the field-level message
    #[error("{0}")]
    InvalidYAxis(String),

    #[error("Generate a chart before adding it to the dashboard")]
    NotGenerated,

    #[error(transparent)]
    Dashboard(#[from] DashboardError),
}

/// Errors raised by the saved-chart collection
#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Maximum {capacity} charts. Remove one first.")]
    CapacityExceeded { capacity: usize },

    #[error("A chart with id {id} is already on the dashboard")]
    DuplicateId { id: i64 },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors raised by a persistence port
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to persist {path}: {source}")]
    Persist {
        path: String,
        source: std::io::Error,
    },
}

/// Errors raised while parsing a textual filter expression
#[derive(Error, Debug, PartialEq)]
pub enum ParseError {
    #[error("Invalid filter expression '{input}': expected <column> <operator> <value>")]
    Syntax { input: String },
}
