use reqwest::{Client, Url};
use serde::Deserialize;

use crate::{
    config, debug,
    error::{Error, Result},
    pkce::{self, CODE_CHALLENGE_METHOD, CodeChallenge, CodeVerifier},
    store::{self, SessionStore},
    types::TokenPair,
};

/// Everything needed to talk to the Spotify accounts service.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub client_id: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub auth_url: String,
    pub token_url: String,
}

impl AuthSettings {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            client_id: config::spotify_client_id()?,
            redirect_uri: config::spotify_redirect_uri(),
            scopes: config::spotify_scopes(),
            auth_url: config::spotify_auth_url(),
            token_url: config::spotify_token_url(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct AuthUrlParams<'a> {
    pub auth_url: &'a str,
    pub client_id: &'a str,
    pub redirect_uri: &'a str,
    pub code_challenge: &'a CodeChallenge,
    pub scopes: &'a [String],
}

#[derive(Debug, Clone)]
pub struct ExchangeParams<'a> {
    pub client_id: &'a str,
    pub code: &'a str,
    pub redirect_uri: &'a str,
    pub code_verifier: &'a CodeVerifier,
}

/// Query parameters Spotify appends to the redirect URI.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub error: Option<String>,
}

/// Builds the authorization URL the user is sent to.
///
/// Only the presence of the client id and redirect URI is checked; whether
/// they are valid is up to the authorization server. Scopes are joined with
/// spaces and must not be empty if the caller wants playback read access.
///
/// # Example
///
/// ```rust,ignore
/// let url = build_auth_url(&AuthUrlParams {
///     auth_url: "https://accounts.spotify.com/authorize",
///     client_id: "abc",
///     redirect_uri: "http://127.0.0.1:3000/callback",
///     code_challenge: &challenge,
///     scopes: &["user-read-playback-state".to_string()],
/// })?;
/// ```
pub fn build_auth_url(params: &AuthUrlParams<'_>) -> Result<Url> {
    if params.client_id.trim().is_empty() {
        return Err(Error::MissingParameter("client_id"));
    }
    if params.redirect_uri.trim().is_empty() {
        return Err(Error::MissingParameter("redirect_uri"));
    }

    let scope = params.scopes.join(" ");
    Url::parse_with_params(
        params.auth_url,
        &[
            ("client_id", params.client_id),
            ("response_type", "code"),
            ("redirect_uri", params.redirect_uri),
            ("code_challenge_method", CODE_CHALLENGE_METHOD),
            ("code_challenge", params.code_challenge.as_str()),
            ("scope", scope.as_str()),
        ],
    )
    .map_err(|e| Error::Config(format!("invalid authorization endpoint: {}", e)))
}

/// Exchanges an authorization code for a [`TokenPair`] using PKCE.
///
/// The verifier must be the one whose challenge was sent in the
/// authorization request. Persisting the result is left to the caller.
///
/// # Errors
///
/// - [`Error::TokenExchangeFailed`] when the endpoint answers with a
///   non-success status
/// - [`Error::InvalidTokenResponse`] when the body is not a token response
/// - [`Error::NetworkOrApi`] when the request fails outright
pub async fn exchange_code_pkce(
    client: &Client,
    token_url: &str,
    params: &ExchangeParams<'_>,
) -> Result<TokenPair> {
    let res = client
        .post(token_url)
        .form(&[
            ("client_id", params.client_id),
            ("grant_type", "authorization_code"),
            ("code", params.code),
            ("redirect_uri", params.redirect_uri),
            ("code_verifier", params.code_verifier.as_str()),
        ])
        .send()
        .await?;

    let status = res.status();
    if !status.is_success() {
        debug!("Token endpoint answered {}", status);
        return Err(Error::TokenExchangeFailed(status.as_u16()));
    }

    let body = res.text().await?;
    let tokens: TokenPair =
        serde_json::from_str(&body).map_err(|e| Error::InvalidTokenResponse(e.to_string()))?;
    if tokens.access_token.is_empty() {
        return Err(Error::InvalidTokenResponse(
            "empty access_token".to_string(),
        ));
    }

    Ok(tokens)
}

/// Trades a refresh token for a new access token.
///
/// Nothing calls this automatically: an expired token shows up as stale
/// data in the poller until the user logs in again or runs
/// `queuecard refresh`. Spotify may omit the refresh token in the answer, in
/// which case the old one is kept.
pub async fn refresh_access_token(
    client: &Client,
    token_url: &str,
    client_id: &str,
    refresh_token: &str,
) -> Result<TokenPair> {
    let res = client
        .post(token_url)
        .form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", client_id),
        ])
        .send()
        .await?;

    let status = res.status();
    if !status.is_success() {
        return Err(Error::TokenExchangeFailed(status.as_u16()));
    }

    let body = res.text().await?;
    let mut tokens: TokenPair =
        serde_json::from_str(&body).map_err(|e| Error::InvalidTokenResponse(e.to_string()))?;
    if tokens.refresh_token.is_empty() {
        tokens.refresh_token = refresh_token.to_string();
    }

    Ok(tokens)
}

/// Starts a login attempt.
///
/// Generates a fresh verifier, stores it so it survives the redirect, and
/// returns the URL the user has to open. Any verifier left over from an
/// earlier attempt is overwritten.
pub async fn start_login(store: &dyn SessionStore, settings: &AuthSettings) -> Result<Url> {
    let verifier = pkce::generate_code_verifier(pkce::DEFAULT_VERIFIER_LENGTH)?;
    let challenge = pkce::derive_code_challenge(&verifier).await?;

    store::save_code_verifier(store, &verifier)?;

    build_auth_url(&AuthUrlParams {
        auth_url: &settings.auth_url,
        client_id: &settings.client_id,
        redirect_uri: &settings.redirect_uri,
        code_challenge: &challenge,
        scopes: &settings.scopes,
    })
}

/// Finishes a login attempt from the redirect callback.
///
/// Reads the code, takes the stored verifier, exchanges both for tokens and
/// writes them to the store. The verifier is dropped after a successful
/// exchange. On failure nothing is written and the attempt is over.
pub async fn complete_login(
    client: &Client,
    store: &dyn SessionStore,
    settings: &AuthSettings,
    params: &CallbackParams,
) -> Result<TokenPair> {
    if let Some(error) = params.error.as_deref() {
        return Err(Error::AuthorizationDenied(error.to_string()));
    }

    let code = params
        .code
        .as_deref()
        .filter(|c| !c.is_empty())
        .ok_or(Error::MissingAuthorizationCode)?;

    let verifier = store::load_code_verifier(store)?.ok_or(Error::MissingCodeVerifier)?;

    let tokens = exchange_code_pkce(
        client,
        &settings.token_url,
        &ExchangeParams {
            client_id: &settings.client_id,
            code,
            redirect_uri: &settings.redirect_uri,
            code_verifier: &verifier,
        },
    )
    .await?;

    store::save_tokens(store, &tokens)?;
    store::consume_code_verifier(store)?;

    Ok(tokens)
}
