//! Error types for Pastecraft

/// Result type alias using Pastecraft's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for Pastecraft operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A rule's pattern failed to compile
    #[error("invalid pattern: {0}")]
    Pattern(String),

    /// A rule's transform code failed to compile
    #[error("script compile error: {0}")]
    ScriptCompile(String),

    /// A transform raised an error while running
    #[error("script execution error: {0}")]
    Script(String),

    /// Settings could not be loaded, migrated or stored
    #[error("settings error: {0}")]
    Settings(String),

    /// Filesystem errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new pattern error
    pub fn pattern(msg: impl Into<String>) -> Self {
        Self::Pattern(msg.into())
    }

    /// Create a new script compile error
    pub fn script_compile(msg: impl Into<String>) -> Self {
        Self::ScriptCompile(msg.into())
    }

    /// Create a new script execution error
    pub fn script(msg: impl Into<String>) -> Self {
        Self::Script(msg.into())
    }

    /// Create a new settings error
    pub fn settings(msg: impl Into<String>) -> Self {
        Self::Settings(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
