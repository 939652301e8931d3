use uuid::Uuid;

/// Domain errors surfaced by the types, engine, and sources. Binaries and
/// storage glue wrap these in `anyhow` at the edges.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("{0} credentials are not configured")]
    MissingCredentials(&'static str),

    #[error("invalid date range: {start} is after {end}")]
    InvalidDateRange {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    #[error("{platform} source failed: {message}")]
    Source {
        platform: crate::types::Platform,
        message: String,
    },

    #[error("export parse error: {0}")]
    ExportParse(String),
}

impl Error {
    pub fn source(platform: crate::types::Platform, message: impl Into<String>) -> Self {
        Error::Source {
            platform,
            message: message.into(),
        }
    }
}
