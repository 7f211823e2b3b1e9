// Error taxonomy shared by the resolvers and the upload path

use crate::chart::{Arity, ChartType};
use crate::data::ColumnKind;
use crate::relational::AggFunc;
use thiserror::Error;

/// A referenced column does not exist in the dataset
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Column '{0}' not found in dataset")]
pub struct SchemaError(pub String);

/// The aggregation function cannot be applied to the column's data kind
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Cannot apply '{func}' to column '{column}' ({kind} data)")]
pub struct AggregationError {
    pub func: AggFunc,
    pub column: String,
    pub kind: ColumnKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("{chart} requires numeric columns, but '{column}' is {kind}")]
    NonNumericColumn {
        chart: ChartType,
        column: String,
        kind: ColumnKind,
    },

    #[error("{chart} needs {required} columns, {selected} selected")]
    InsufficientSelection {
        chart: ChartType,
        required: Arity,
        selected: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelationalError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Aggregation(#[from] AggregationError),
}

/// Malformed upload; the session keeps no dataset
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Input is empty")]
    Empty,

    #[error("CSV must contain a header row and at least one data row")]
    NoRows,

    #[error("Malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Malformed JSON: {0}")]
    Json(String),

    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for UploadError {
    fn from(e: serde_json::Error) -> Self {
        UploadError::Json(e.to_string())
    }
}

/// A command ran before any dataset was uploaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("No dataset uploaded")]
pub struct NoDataset;
