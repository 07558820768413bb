use thiserror::Error;

/// Errors raised while acquiring bars from a market-data provider
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("Transport failure: {reason}")]
    Transport { reason: String },

    #[error("Provider returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Malformed provider payload: {reason}")]
    Malformed { reason: String },

    #[error("Provider returned no bars for {what}")]
    Empty { what: String },

    #[error("Provider rejected credentials (HTTP {status})")]
    Unauthorized { status: u16 },

    #[error("Missing credentials for provider {provider}")]
    MissingCredentials { provider: String },
}

impl FetchError {
    /// Maps a non-success HTTP status to the matching error variant.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        match status {
            401 | 403 => FetchError::Unauthorized { status },
            _ => FetchError::Http {
                status,
                body: body.into(),
            },
        }
    }

    /// Authentication problems never go away by retrying.
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            FetchError::Unauthorized { .. } | FetchError::MissingCredentials { .. }
        )
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Transport { .. } | FetchError::Malformed { .. } | FetchError::Empty { .. } => {
                true
            }
            FetchError::Http { status, .. } => *status == 429 || *status >= 500,
            FetchError::Unauthorized { .. } | FetchError::MissingCredentials { .. } => false,
        }
    }
}

/// Errors raised when aggregating a series into a coarser timeframe
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResampleError {
    #[error("Cannot resample {from} into {to}: target is not a whole multiple of the source")]
    NotAMultiple { from: String, to: String },
}

/// Errors related to symbol universe edits and loading
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UniverseError {
    #[error("Unknown group: {name}")]
    UnknownGroup { name: String },

    #[error("Group already exists: {name}")]
    DuplicateGroup { name: String },

    #[error("Symbol is empty after normalization")]
    EmptySymbol,

    #[error("Invalid universe file: {reason}")]
    Parse { reason: String },
}

/// Cycle-level failures. Anything else degrades to placeholders.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Provider authentication failed: {0}")]
    Authentication(FetchError),

    #[error("Fetch failed: {0}")]
    Fetch(FetchError),
}

impl From<FetchError> for ScanError {
    fn from(err: FetchError) -> Self {
        if err.is_auth() {
            ScanError::Authentication(err)
        } else {
            ScanError::Fetch(err)
        }
    }
}
