use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Failed to send the HTTP request: {0}")]
    RequestBuild(#[from] reqwest::Error),

    /// The auth API refused the request (bad credentials, expired token, ...).
    #[error("{1}")]
    Rejected(u16, String),

    /// The auth API failed in a way that is not the caller's fault.
    #[error("The auth service returned {0}: {1}")]
    Upstream(u16, String),

    #[error("Failed to deserialize the API response: {0}")]
    Deserialization(String),

    #[error("Invalid client configuration: {0}")]
    InvalidConfig(String),
}

impl ApiError {
    /// True when the failure is tied to the caller's credentials or token.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Rejected(401 | 403, _))
    }
}
