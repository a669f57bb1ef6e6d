//! Error types shared by the rasterization and scrape pipelines.

use thiserror::Error;

/// Result type alias for crate operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while rasterizing or scraping.
#[derive(Error, Debug)]
pub enum Error {
    /// A required command-line argument was not supplied.
    #[error("{0}")]
    InvalidArgument(String),

    /// A surface was requested with a width or height it cannot have.
    #[error("invalid canvas size {width}x{height}")]
    InvalidDimension {
        /// The requested width.
        width: u32,
        /// The requested height.
        height: u32,
    },

    /// The surface was already destroyed.
    #[error("canvas is not specified")]
    MissingSurface,

    /// The PDF engine failed to load the document or render a page.
    #[error("engine failure: {0}")]
    EngineFailure(String),

    /// Reading input or writing output failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A surface could not be encoded as PNG.
    #[error("png encoding failed: {0}")]
    Encode(String),

    /// The headless browser reported an error.
    #[cfg(feature = "scrape")]
    #[error("browser error: {0}")]
    Browser(String),
}

#[cfg(feature = "scrape")]
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Browser(err.to_string())
    }
}
