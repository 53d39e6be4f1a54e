use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the analysis pipeline.
///
/// `Geometry`, `Input` and `Config` are the three failure kinds of the core
/// algorithms; `Io` and `Json` wrap store failures.
#[derive(Debug, Error)]
pub enum GapsError {
    /// Invalid or degenerate geometry, or a missing/incompatible CRS.
    #[error("geometry error in {feature}: {reason}")]
    Geometry { feature: String, reason: String },

    /// Missing table, null geometry, empty result set.
    #[error("input error: {0}")]
    Input(String),

    /// Out-of-range tolerance or threshold.
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error on {}: {source}", path.display())]
    Io { path: PathBuf, #[source] source: std::io::Error },

    #[error("malformed json in {}: {source}", path.display())]
    Json { path: PathBuf, #[source] source: serde_json::Error },
}

impl GapsError {
    pub(crate) fn geometry(feature: impl ToString, reason: impl Into<String>) -> Self {
        Self::Geometry { feature: feature.to_string(), reason: reason.into() }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json { path: path.into(), source }
    }
}

pub type Result<T> = std::result::Result<T, GapsError>;
