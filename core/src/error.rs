use thiserror::Error;

#[derive(Debug, Error)]
pub enum RowfoldError {
    /// The entity graph cannot be turned into a single-select query:
    /// missing identifier, cyclic reachability, nesting too deep.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Operation is deliberately not implemented by this strategy.
    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),

    /// A result row does not match the shape the generated query promises.
    #[error("Data integrity error: {0}")]
    DataIntegrity(String),

    /// Error mapping a reconstructed aggregate onto the target type
    #[error("Mapping error: {0}")]
    Mapping(String),

    /// Error executing a query
    #[error("Execution error: {0}")]
    Execution(String),

    /// Rusqlite specific errors
    #[cfg(feature = "rusqlite")]
    #[error("Rusqlite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
}

/// Result type for aggregate loading operations
pub type Result<T> = std::result::Result<T, RowfoldError>;
