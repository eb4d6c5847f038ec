//! Error types for resguard

use thiserror::Error;

/// Result type for resguard operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for resguard
///
/// Collision and missing-directory errors mean a mapping invariant broke and
/// abort the run. Content mutation never surfaces [`Error::Mutation`] or
/// [`Error::Tool`] to the caller; those are folded into audit entries.
#[derive(Debug, Error)]
pub enum Error {
    /// Two raw directories bound to the same obfuscated directory
    #[error("Directory collision: {raw} -> {obfuscated} already bound to {existing}")]
    DirCollision {
        raw: String,
        obfuscated: String,
        existing: String,
    },

    /// Two raw resource names bound to the same obfuscated name
    #[error("Resource name collision: {raw} -> {obfuscated} already bound to {existing}")]
    NameCollision {
        raw: String,
        obfuscated: String,
        existing: String,
    },

    /// Two raw file paths bound to the same obfuscated path
    #[error("File path collision: {raw} -> {obfuscated} already bound to {existing}")]
    PathCollision {
        raw: String,
        obfuscated: String,
        existing: String,
    },

    /// A resource file was reached before its directory had a mapping
    #[error("No obfuscated directory for resource directory: {0}")]
    MissingDirectory(String),

    /// Malformed or inconsistent mapping report
    #[error("Invalid mapping at line {line}: {message}")]
    InvalidMapping { line: usize, message: String },

    /// Refusing to overwrite a previous report
    #[error("Mapping report already exists: {0}")]
    ReportExists(String),

    /// Whitelist rule could not be compiled
    #[error("Invalid whitelist rule '{rule}': {source}")]
    InvalidRule {
        rule: String,
        #[source]
        source: regex::Error,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// External tool failed to run or exited unsuccessfully
    #[error("Tool error in {command}: {message}")]
    Tool { command: String, message: String },

    /// A content mutation strategy could not be applied
    #[error("Mutation error in {strategy}: {message}")]
    Mutation { strategy: String, message: String },
}

impl Error {
    /// Create a tool error
    pub fn tool(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Tool {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Create a mutation error
    pub fn mutation(strategy: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Mutation {
            strategy: strategy.into(),
            message: message.into(),
        }
    }

    /// Create a mapping parse error
    pub fn invalid_mapping(line: usize, message: impl Into<String>) -> Self {
        Self::InvalidMapping {
            line,
            message: message.into(),
        }
    }

    /// Whether this error breaks a mapping invariant and must abort the run
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::DirCollision { .. }
                | Error::NameCollision { .. }
                | Error::PathCollision { .. }
                | Error::MissingDirectory(_)
                | Error::InvalidMapping { .. }
        )
    }

    /// Message without the variant prefix, used in audit records
    pub fn reason(&self) -> String {
        match self {
            Error::Mutation { message, .. } | Error::Tool { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}
