//! Error taxonomy for the geometry ingestion pipeline.

use std::io;

use thiserror::Error;

/// Failures produced while parsing source text, generating tangents, or
/// reading/writing the binary bake artifact.
#[derive(Debug, Error)]
pub enum AssetError {
    /// Input text could not be understood: a bad token, a dangling index
    /// reference, an unsupported face arity, or a material property with
    /// no owning definition. `line` is 1-based.
    #[error("malformed geometry at line {line}: {message}")]
    MalformedGeometry { line: usize, message: String },

    #[error("tangent generation failed: {0}")]
    TangentGeneration(String),

    /// Binary artifact truncated or structurally inconsistent with its
    /// length fields. `offset` is the byte position of the bad field.
    #[error("corrupt bake artifact at byte {offset}: {message}")]
    CorruptBake { offset: u64, message: String },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl AssetError {
    /// Shorthand for a parse failure at a 1-based source line.
    pub fn malformed(line: usize, message: impl Into<String>) -> Self {
        Self::MalformedGeometry {
            line,
            message: message.into(),
        }
    }
}

pub type AssetResult<T> = Result<T, AssetError>;
