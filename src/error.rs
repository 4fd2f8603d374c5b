use thiserror::Error;

/// Failures surfaced by the loading / filtering / aggregation pipeline.
///
/// Per-cell parse failures are *not* errors: the cell becomes
/// [`CellValue::Null`](crate::data::model::CellValue::Null) and the row is kept.
#[derive(Debug, Error)]
pub enum DashboardError {
    /// The source file or feed could not be read or decoded.
    #[error("source unavailable ({source_name}): {reason}")]
    SourceUnavailable { source_name: String, reason: String },

    /// An operation referenced a column the table does not have.
    #[error("missing column '{0}'")]
    MissingColumn(String),

    /// The source has no usable header for the expected schema.
    #[error("schema error: {0}")]
    Schema(String),

    /// The configuration file exists but could not be read or parsed.
    #[error("config error: {0}")]
    Config(String),
}

impl DashboardError {
    pub fn source_unavailable(source_name: impl Into<String>, reason: impl ToString) -> Self {
        DashboardError::SourceUnavailable {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;
