//! Error types for grammar compilation

use std::path::PathBuf;

use thiserror::Error;

/// Result type for compilation operations
pub type Result<T> = std::result::Result<T, GrammarError>;

/// Compilation errors.
///
/// Every variant except the I/O family aborts the whole compilation: a
/// partial grammar is never handed to a generation runtime.
#[derive(Error, Debug)]
pub enum GrammarError {
    #[error("Unsupported type descriptor: {descriptor}")]
    UnsupportedType { descriptor: String },

    #[error("Unknown schema referenced: {name}")]
    UnknownSchema { name: String },

    #[error("Duplicate definition: {kind} {name}")]
    DuplicateDefinition { kind: &'static str, name: String },

    #[error("Invalid numeric constraint on {field}: {reason}")]
    InvalidConstraint { field: String, reason: String },

    #[error("Rule conflict: {name} would be emitted with two different bodies")]
    RuleConflict { name: String },

    #[error("Identifier `{name}` yields no valid rule name")]
    InvalidName { name: String },

    #[error("Enum {name} declares no values")]
    EmptyEnum { name: String },

    #[error("No root schemas to compile")]
    NoRoots,

    #[error("Opaque class {class} exceeded the expansion depth limit of {limit}")]
    CyclicOpaqueClass { class: String, limit: usize },

    #[error("Schema {schema} exceeded the expansion depth limit of {limit}")]
    RecursionLimit { schema: String, limit: usize },

    #[error("Type expression error at offset {offset} in `{input}`: {message}")]
    Parse {
        input: String,
        offset: usize,
        message: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Failure writing one output artifact. Recovered locally by the save step.
#[derive(Error, Debug)]
#[error("Failed to write {artifact} to {}: {source}", path.display())]
pub struct SinkWriteError {
    pub artifact: &'static str,
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}
