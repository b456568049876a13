//! CLI error types.

use std::path::PathBuf;

use refmark_config::ConfigError;
use refmark_core::ReferenceError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    References(#[from] ReferenceError),

    #[error("invalid include pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("{}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} document(s) have unresolved citations")]
    Unresolved(usize),
}
