use thiserror::Error;

/// Failure reported by the database driver, passed through unmodified
pub type EngineError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Multiple results: {0}")]
    MultipleResults(String),

    #[error("Database error: {0}")]
    Engine(#[source] EngineError),

    #[error("Row consumer failed: {0}")]
    StreamConsumer(String),

    #[error("Unknown field '{field}' on {entity}")]
    UnknownField { entity: String, field: String },

    #[error("Field '{field}' on {entity} is not a relation")]
    NotARelation { entity: String, field: String },

    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),

    #[error("Invalid operand for '{operator}': {reason}")]
    InvalidOperand { operator: String, reason: String },

    #[error("Cannot encode value for column '{column}': {reason}")]
    Codec { column: String, reason: String },

    #[error("Pending value failed: {0}")]
    Pending(String),

    #[error("Nothing to write: {0}")]
    EmptyMutation(String),
}

impl QueryError {
    pub fn engine(err: impl Into<EngineError>) -> Self {
        QueryError::Engine(err.into())
    }

    pub(crate) fn consumer(err: anyhow::Error) -> Self {
        QueryError::StreamConsumer(format!("{err:#}"))
    }

    pub(crate) fn unknown_field(entity: &str, field: &str) -> Self {
        QueryError::UnknownField {
            entity: entity.to_string(),
            field: field.to_string(),
        }
    }
}
