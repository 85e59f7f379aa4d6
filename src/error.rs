use std::error::Error as StdError;

use thiserror::Error as ThisError;

/// Error type used by matrix constructors and extractors.
#[derive(Debug, ThisError)]
pub enum Error {
    /// The storage handed to a constructor does not describe a matrix of the
    /// requested dimensions. All shape errors are reported at construction;
    /// none are deferred to extraction time.
    #[error("invalid shape: {0}")]
    InvalidShape(String),
    /// A target index, selection block or selection index reaches beyond the
    /// matrix extent. These are programming errors on the caller's side.
    #[error("index {index} is out of range for a dimension extent of {extent}")]
    OutOfRange {
        /// The offending position.
        index: usize,
        /// Extent of the dimension the position was checked against.
        extent: usize,
    },
    /// An out-of-core backend failed to produce data. The in-memory backends
    /// of this crate never emit this; delayed wrappers forward it unchanged.
    #[error("matrix backend failed to produce data")]
    BackendFailure(#[source] Box<dyn StdError + Send + Sync>),
}

impl Error {
    pub(crate) fn invalid_shape(reason: impl Into<String>) -> Self {
        Error::InvalidShape(reason.into())
    }
}
