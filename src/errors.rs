use thiserror::Error;

/// Errors that can occur while resolving cross-module relationships.
#[derive(Error, Debug)]
pub enum OrmLinkError {
    #[error("config error: {message}")]
    Config { message: String },

    /// A labelled relationship target names an application label that does
    /// not resolve to any known module. Raised on the final pass only; before
    /// that the declaration is deferred instead.
    #[error("unable to locate application for label '{label}'")]
    UnknownAppLabel { label: String },

    /// The target module resolved but the named entity does not exist there.
    /// Raised on the final pass only.
    #[error("unable to find entity '{fullname}'")]
    DanglingReference { fullname: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias for results using `OrmLinkError`.
pub type Result<T> = std::result::Result<T, OrmLinkError>;
