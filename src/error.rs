use thiserror::Error;

/// Errors that can occur when fetching bytes over the network
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// The URL string could not be parsed or uses an unsupported scheme
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Transport-level failure (connect, timeout, body read)
    #[error("Network error: {0}")]
    Network(String),

    /// The server answered with a non-success status
    #[error("Invalid response: HTTP {status}")]
    InvalidResponse { status: u16 },

    /// The request succeeded but produced nothing usable
    #[error("Unknown error: request returned no data")]
    Unknown,
}

/// Errors raised by the disk tier
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    /// Image could not be serialized for disk storage
    #[error("Failed to encode image: {message}")]
    Encode { message: String },

    /// Filesystem error while writing, deleting or listing entries
    #[error("Cache I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        CacheError::Io(err.to_string())
    }
}

/// Errors surfaced by the recipe pipeline
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecipeError {
    /// The feed could not be fetched
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// The feed was fetched but is not a valid recipe document
    #[error("Decoding error: {0}")]
    Decoding(String),
}

impl RecipeError {
    /// Message suitable for showing to an end user.
    pub fn user_message(&self) -> &'static str {
        match self {
            RecipeError::Fetch(FetchError::InvalidUrl(_)) => "Invalid URL provided.",
            RecipeError::Fetch(FetchError::Network(_))
            | RecipeError::Fetch(FetchError::InvalidResponse { .. }) => {
                "Network error occurred. Please check your connection."
            }
            RecipeError::Decoding(_) => "Failed to decode the response. Please try again later.",
            RecipeError::Fetch(FetchError::Unknown) => "An unexpected error occurred.",
        }
    }
}
