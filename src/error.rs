//! Error types for waypoint conversion.

use std::path::PathBuf;
use thiserror::Error;

use crate::config::Field;

/// Errors raised while parsing or checking a column mapping.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MappingError {
    #[error("column mapping must have exactly 4 entries, found {found}")]
    EntryCount { found: usize },

    #[error("column mapping entry '{entry}' must look like field:value")]
    EntryArity { entry: String },

    #[error("unknown field in column mapping: {field}")]
    UnknownField { field: String },

    #[error("field '{field}' appears more than once in column mapping")]
    DuplicateField { field: Field },

    #[error("invalid column index '{value}' for field '{field}'")]
    InvalidIndex { field: Field, value: String },

    #[error("field '{field}' cannot be skipped")]
    SkipNotAllowed { field: Field },

    // Layout errors only apply when writing rows.
    #[error("column {index} for field '{field}' is outside a row of width {width}")]
    IndexOutOfRange {
        field: Field,
        index: usize,
        width: usize,
    },

    #[error("fields '{first}' and '{second}' both map to column {index}")]
    OverlappingIndex {
        first: Field,
        second: Field,
        index: usize,
    },
}

/// Errors raised when coordinates cannot form a waypoint.
#[derive(Debug, Error, PartialEq)]
pub enum WaypointError {
    #[error("invalid {field} '{value}'")]
    InvalidCoordinate { field: &'static str, value: String },
}

/// Document-level failures of a GPX read.
#[derive(Debug, Error)]
pub enum MarkupError {
    #[error(transparent)]
    Xml(#[from] quick_xml::Error),

    #[error("document has no root element")]
    NoRoot,

    #[error("document ended inside an open element")]
    Unclosed,

    #[error("document has more than one root element")]
    MultipleRoots,

    #[error("undefined entity '&{name};'")]
    UnknownEntity { name: String },

    #[error("waypoint {index} is missing the '{attribute}' attribute")]
    MissingAttribute {
        index: usize,
        attribute: &'static str,
    },

    #[error("waypoint {index}: {source}")]
    Waypoint {
        index: usize,
        #[source]
        source: WaypointError,
    },
}

/// File-level errors surfaced to callers of the readers and writers.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("could not find {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to process CSV {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to parse GPX {path}: {source}")]
    Markup {
        path: PathBuf,
        #[source]
        source: MarkupError,
    },

    #[error("failed to render GPX {path}: {source}")]
    Render {
        path: PathBuf,
        #[source]
        source: quick_xml::Error,
    },

    #[error(transparent)]
    Mapping(#[from] MappingError),
}

pub type Result<T> = std::result::Result<T, ConvertError>;
