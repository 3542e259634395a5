use thiserror::Error;

/// Required columns were missing from a CSV header after normalization.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("missing columns in {source_name}: {}", .missing.join(", "))]
pub struct SchemaError {
    pub source_name: String,
    pub missing: Vec<String>,
}

/// Structural failures that abort a whole load.
///
/// Row-level data-quality problems never show up here; they are tallied in
/// [`crate::Diagnostics`] instead.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("cannot open {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read CSV data: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("cannot write CSV output: {0}")]
    Output(#[source] csv::Error),
}
