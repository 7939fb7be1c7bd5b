use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("index file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("failed to read index file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A row (or the header, line 1) is missing a required column or holds
    /// an unparsable value.
    #[error("malformed record at line {line}: {reason}")]
    MalformedRecord { line: u64, reason: String },

    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("division by zero: price at period {index} is zero")]
    DivisionByZero { index: usize },

    #[error("rate solver did not converge for multiple {multiple} over {periods} periods")]
    ConvergenceError { multiple: f64, periods: usize },

    #[error("invalid investment plan: {0}")]
    InvalidPlan(String),
}
