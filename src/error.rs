/// Error types for sqlx-prepare
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The number of consumed placeholders does not match the supplied parameters
    #[error(
        "Invalid number of parameters ({supplied}) supplied to prepare(`{template}`): expecting {expected} for this pattern but received {supplied}"
    )]
    Arity {
        template: String,
        supplied: usize,
        expected: usize,
    },

    /// A value's category does not fit the placeholder or declared type
    #[error("Invalid data type `{found}` given at index {index} passed to prepare(`{template}`): {expected}")]
    Type {
        template: String,
        index: usize,
        found: &'static str,
        expected: String,
    },

    /// A string length or numeric value violated a declared range
    #[error("Invalid value for `{token}` given at index {index} in prepare(`{template}`): {reason}")]
    Range {
        template: String,
        token: String,
        index: usize,
        reason: String,
    },

    /// A named placeholder matched no key in the parameter mapping
    #[error("Invalid key `{key}` for prepare(`{template}`) pattern")]
    UnknownKey { template: String, key: String },

    /// NULL supplied to a placeholder that is not marked nullable
    #[error("NULL value detected for a non-nullable field at index {index} for command `{token}` in prepare(`{template}`)")]
    Nullability {
        template: String,
        token: String,
        index: usize,
    },

    /// An operation needed a collaborator that was never configured
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Error while compiling the placeholder patterns
    #[error("Failed to parse SQL template: {0}")]
    Parse(#[from] regex::Error),

    /// Error from a `:json_encode` / `:json_decode` modifier
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error from SQLx database operations
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Error {
    pub(crate) fn no_connection() -> Self {
        Self::Configuration(
            "no connection has been set; call EngineConfig::with_connection() before executing statements"
                .to_owned(),
        )
    }
}

/// Result type alias for sqlx-prepare operations
pub type Result<T> = std::result::Result<T, Error>;
