//! Error types for cellprep

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Too few, duplicate, collinear or non-finite points.
    #[error("Malformed geometry: {0}")]
    MalformedGeometry(String),

    /// A cell lacks a required position, factor or gene.
    #[error("Cell '{cell}' is missing required attribute '{attribute}'")]
    MissingAttribute { cell: String, attribute: String },

    /// Dimensions of two related inputs disagree.
    #[error("Inconsistent shape: {0}")]
    InconsistentShape(String),

    #[error("Unknown file format: {0}")]
    UnknownFormat(String),

    /// Input document does not have the expected structure.
    #[error("Invalid input in '{source_name}': {message}")]
    InvalidInput { source_name: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    pub fn missing(cell: &str, attribute: &str) -> Self {
        Error::MissingAttribute {
            cell: cell.to_string(),
            attribute: attribute.to_string(),
        }
    }

    pub fn invalid_input(source_name: &str, message: impl Into<String>) -> Self {
        Error::InvalidInput {
            source_name: source_name.to_string(),
            message: message.into(),
        }
    }
}
