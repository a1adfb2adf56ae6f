//! Configuration error types.

/// Errors from loading or persisting `config.ron`.
///
/// All of these are fatal at startup: the server refuses to run with a
/// config it could not read back, rather than guessing at defaults over a
/// broken file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// `config.ron` exists but could not be read.
    #[error("failed to read config.ron: {0}")]
    Read(#[source] std::io::Error),

    /// The config directory or `config.ron` could not be written.
    #[error("failed to write config.ron: {0}")]
    Write(#[source] std::io::Error),

    /// `config.ron` is not valid RON for the expected sections.
    #[error("failed to parse config.ron: {0}")]
    Parse(#[source] ron::error::SpannedError),

    /// The in-memory config could not be rendered as RON.
    #[error("failed to serialize config: {0}")]
    Serialize(#[source] ron::Error),
}
