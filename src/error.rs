//! Error types shared by the authentication and polling paths.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("random source unavailable: {0}")]
    RandomSourceUnavailable(String),

    #[error("hashing unavailable: {0}")]
    HashingUnavailable(String),

    #[error("token exchange failed with status {0}")]
    TokenExchangeFailed(u16),

    #[error("no authorization code found in callback")]
    MissingAuthorizationCode,

    #[error("no code verifier found in session store")]
    MissingCodeVerifier,

    #[error("authorization denied: {0}")]
    AuthorizationDenied(String),

    #[error("missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("invalid token response: {0}")]
    InvalidTokenResponse(String),

    #[error("not authenticated, run `queuecard login` first")]
    NotAuthenticated,

    /// Catch-all for failed player requests. `status` is `None` when the
    /// request never produced a response.
    #[error("network or API error: {message}")]
    NetworkOrApi {
        status: Option<u16>,
        message: String,
    },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::NetworkOrApi {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
