//! Session implementation
//!
//! Owns the credentials and the current [`SessionState`]. The state sits
//! behind an async mutex that is held across a whole token exchange, so
//! concurrent callers queue behind one login instead of racing it.

use super::config::SessionConfig;
use crate::auth::{
    sign_claims, Credentials, HmacSigner, LoginResponse, RefreshClaims, SessionState,
    TokenSigner,
};
use crate::cache::ConfigSource;
use crate::error::{Error, Result};
use crate::http::{body_if_ok, json_if_ok, HttpClient, RequestConfig};
use crate::settings::{REFLEX_APIKEY, REFLEX_URL};
use crate::types::{JsonValue, OptionStringExt, SecretEncoding};
use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

/// Header carrying the signed refresh token
pub const HEADER_APIKEY: &str = "X-Apikey";

/// Header carrying the signed access token
pub const HEADER_API_TOKEN: &str = "X-ApiToken";

/// Non-secret view of the session, safe to print
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionInfo {
    /// Session id
    pub session_id: String,
    /// Token id issued by the provider
    pub token_id: String,
    /// Session expiry, epoch seconds
    pub expires_at: i64,
    /// Access token expiry, epoch milliseconds
    pub access_token_expires_at_ms: i64,
}

/// One authenticated session against the config provider
pub struct Session {
    base_url: Url,
    credentials: Credentials,
    api_key_secret: Vec<u8>,
    secret_encoding: SecretEncoding,
    signer: Arc<dyn TokenSigner>,
    http: HttpClient,
    state: Mutex<SessionState>,
}

impl Session {
    /// Create a session using the HMAC signer from the config
    pub fn new(config: SessionConfig) -> Result<Self> {
        let signer = Arc::new(HmacSigner::new(config.algorithm));
        Self::with_signer(config, signer)
    }

    /// Create a session with a custom token signer
    pub fn with_signer(config: SessionConfig, signer: Arc<dyn TokenSigner>) -> Result<Self> {
        let api_key = config
            .api_key
            .none_if_empty()
            .ok_or_else(|| Error::config(format!("Missing {REFLEX_APIKEY}")))?;
        let base_url = config
            .base_url
            .none_if_empty()
            .ok_or_else(|| Error::config(format!("Missing {REFLEX_URL}")))?;

        let base_url = parse_base_url(&base_url)?;
        let credentials = Credentials::parse(&api_key)?;
        let api_key_secret = config
            .secret_encoding
            .key_bytes(credentials.secret())
            .map_err(|e| Error::config(format!("{REFLEX_APIKEY}: {e}")))?;

        let http = HttpClient::with_config(config.http)?;

        debug!(
            "Session configured for {} with key id {}",
            base_url,
            credentials.id()
        );

        Ok(Self {
            base_url,
            credentials,
            api_key_secret,
            secret_encoding: config.secret_encoding,
            signer,
            http,
            state: Mutex::new(SessionState::new()),
        })
    }

    /// Provider base URL
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Parsed API key credentials
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Exchange the API key for a session unless the current one is still valid
    pub async fn login(&self, force: bool) -> Result<()> {
        self.login_with_cancel(force, None).await
    }

    /// [`Session::login`] with a cancellation hook on the retry loop
    pub async fn login_with_cancel(
        &self,
        force: bool,
        cancel: Option<&CancellationToken>,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        self.login_locked(&mut state, force, cancel).await
    }

    /// Current access token, deriving it if missing or expired
    pub async fn get_access_token(&self) -> Result<String> {
        let mut state = self.state.lock().await;
        self.ensure_access_token(&mut state, Utc::now().timestamp_millis())
    }

    /// Fetch the named config object
    pub async fn get_config(&self, name: &str) -> Result<JsonValue> {
        self.get_config_with_cancel(name, None).await
    }

    /// [`Session::get_config`] with a cancellation hook on the retry loops
    pub async fn get_config_with_cancel(
        &self,
        name: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<JsonValue> {
        if name.is_empty() {
            return Err(Error::config("config name must not be empty"));
        }

        let (token, session_id) = {
            let mut state = self.state.lock().await;
            self.login_locked(&mut state, false, cancel).await?;
            let token = self.ensure_access_token(&mut state, Utc::now().timestamp_millis())?;
            (token, state.session_id().to_string())
        };

        let url = self.endpoint(&["config", name])?;
        let request = RequestConfig::new()
            .header(HEADER_API_TOKEN, token)
            .header("Cookie", format!("sid={session_id}"));

        debug!("Fetching config `{}`", name);
        self.http
            .fetch_with_cancel(url.as_str(), &request, body_if_ok, cancel)
            .await
            .map_err(|e| {
                if e.is_interrupted() {
                    e
                } else {
                    Error::fetch(name, e)
                }
            })
    }

    /// Access token, only while it is still valid
    pub async fn access_token(&self) -> Option<String> {
        let state = self.state.lock().await;
        state
            .valid_access_token(Utc::now().timestamp_millis())
            .map(str::to_string)
    }

    /// Current session expiry, epoch seconds (0 before the first login)
    pub async fn expires_at(&self) -> i64 {
        self.state.lock().await.expires_at()
    }

    /// Current session id, if logged in
    pub async fn session_id(&self) -> Option<String> {
        let state = self.state.lock().await;
        state.session_id().to_string().none_if_empty()
    }

    /// Snapshot of the non-secret session fields, if logged in
    pub async fn info(&self) -> Option<SessionInfo> {
        let state = self.state.lock().await;
        state.has_session().then(|| SessionInfo {
            session_id: state.session_id().to_string(),
            token_id: state.token_id().to_string(),
            expires_at: state.expires_at(),
            access_token_expires_at_ms: state.access_token_expires_at_ms(),
        })
    }

    async fn login_locked(
        &self,
        state: &mut SessionState,
        force: bool,
        cancel: Option<&CancellationToken>,
    ) -> Result<()> {
        if !force && !state.is_expired(Utc::now().timestamp_millis()) {
            return Ok(());
        }

        let claims = RefreshClaims::new(self.credentials.id(), Utc::now().timestamp());
        let refresh_token = sign_claims(self.signer.as_ref(), &claims, &self.api_key_secret)?;

        let url = self.endpoint(&["token"])?;
        let request = RequestConfig::new()
            .header(HEADER_APIKEY, refresh_token)
            .header("Content-Type", "application/json");

        info!("Logging in to {}", self.base_url);
        let response: LoginResponse = self
            .http
            .fetch_with_cancel(url.as_str(), &request, json_if_ok::<LoginResponse>, cancel)
            .await
            .map_err(|e| {
                if e.is_interrupted() {
                    e
                } else {
                    Error::authentication(self.base_url.as_str(), e)
                }
            })?;

        let mut next = SessionState::from_login(response);
        self.derive_access_token(&mut next)?;
        *state = next;

        info!(
            "Logged in, session {} expires at {}",
            state.session_id(),
            state.expires_at()
        );
        Ok(())
    }

    fn ensure_access_token(&self, state: &mut SessionState, now_ms: i64) -> Result<String> {
        if let Some(token) = state.valid_access_token(now_ms) {
            return Ok(token.to_string());
        }
        if !state.has_session() {
            return Err(Error::signing("no session to derive an access token from"));
        }
        self.derive_access_token(state)
    }

    fn derive_access_token(&self, state: &mut SessionState) -> Result<String> {
        let key = self.secret_encoding.key_bytes(state.session_secret())?;
        let token = sign_claims(self.signer.as_ref(), &state.access_claims(), &key)?;
        state.set_access_token(token.clone());
        debug!("Derived access token for session {}", state.session_id());
        Ok(token)
    }

    /// `<base_url>/<segments...>`, each segment percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::config(format!("{REFLEX_URL} cannot be a base URL")))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[async_trait]
impl ConfigSource for Session {
    async fn fetch_config(&self, name: &str) -> Result<JsonValue> {
        self.get_config(name).await
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.base_url.as_str())
            .field("credentials", &self.credentials)
            .field("signer", &self.signer)
            .finish_non_exhaustive()
    }
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| Error::config(format!("{REFLEX_URL} is not a valid URL: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::config(format!(
            "{REFLEX_URL} must be an http(s) URL, got `{raw}`"
        )));
    }
    if url.cannot_be_a_base() {
        return Err(Error::config(format!("{REFLEX_URL} cannot be a base URL")));
    }
    Ok(url)
}
