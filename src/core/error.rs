//! Error types surfaced by the bundling engine.

use std::path::PathBuf;
use thiserror::Error;

use crate::builders::directives::DirectiveKind;
use crate::core::mode::GenerationMode;

pub type BundleResult<T> = Result<T, BundleError>;

#[derive(Error, Debug)]
pub enum BundleError {
    /// The start file or an include target is missing, not a regular file, or unreadable.
    #[error("File did not exist or was not a valid, acceptable file: {path}")]
    FileResolution { path: PathBuf },

    /// A marker names a directive kind the group was not set up to expect.
    #[error("directive '{label}' at {file}:{line} is a {found} directive, but this group expects {expected}")]
    DirectiveMismatch {
        file: PathBuf,
        line: usize,
        label: String,
        found: DirectiveKind,
        expected: String,
    },

    /// A registered directive is used in a way its kind does not allow.
    #[error("malformed directive at {file}:{line}: {message}")]
    MalformedDirective {
        file: PathBuf,
        line: usize,
        message: String,
    },

    /// Two registered directives share a label, or a label shadows the end marker.
    #[error("directive label '{label}' conflicts with {conflict}")]
    LabelConflict { label: String, conflict: String },

    #[error("invalid directive marker syntax: {0}")]
    InvalidMarker(#[from] regex::Error),

    #[error("resource '{resource_id}' not found for the {builder} builder")]
    ResourceNotFound { builder: String, resource_id: String },

    #[error("unknown builder '{0}'")]
    UnknownBuilder(String),

    #[error("mode {0} was not parsed for this group")]
    ModeNotParsed(GenerationMode),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BundleError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BundleError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn is_directive_mismatch(&self) -> bool {
        matches!(self, BundleError::DirectiveMismatch { .. })
    }
}
