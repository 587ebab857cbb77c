//! Error types for the host-page and rendering backends.
//!
//! The lifecycle itself never fails: every controller transition is defined
//! for every state. Errors only surface when a backend (the page's node tree
//! or the rendering layer) refuses an operation.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MountError>;

/// Failure reported by a [`HostPage`](crate::page::HostPage) implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageError {
    #[error("page has no body element")]
    MissingBody,

    #[error("failed to create container element #{id}: {reason}")]
    CreateFailed { id: String, reason: String },

    #[error("failed to insert container into the page: {reason}")]
    InsertFailed { reason: String },

    #[error("failed to remove container from the page: {reason}")]
    RemoveFailed { reason: String },
}

/// Failure reported by a [`Renderer`](crate::render::Renderer).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("rendering root could not be created: {reason}")]
    RootCreation { reason: String },
}

/// Failure reported by a [`WidgetStorage`](crate::config::WidgetStorage).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("storage backend rejected {op} for key {key:?}: {reason}")]
    Backend {
        op: &'static str,
        key: String,
        reason: String,
    },

    #[error("stored value for key {key:?} is not valid JSON: {reason}")]
    Decode { key: String, reason: String },
}

impl StorageError {
    #[must_use]
    pub fn backend(op: &'static str, key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Backend {
            op,
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// Failure while decoding configuration values that crossed a text boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("unknown widget mode: {0:?}")]
    UnknownMode(String),

    #[error("missing required configuration field: {0}")]
    MissingField(&'static str),

    #[error("invalid value for configuration field {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// Failure of a mount operation, wrapping the backend that refused it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MountError {
    #[error(transparent)]
    Page(#[from] PageError),

    #[error(transparent)]
    Render(#[from] RenderError),
}
