//! Google OAuth2 token management
//!
//! [`OAuthFlow`] implements the authorization-code flow for an installed app,
//! receiving the redirect on a loopback listener. [`TokenManager`] caches the
//! resulting bearer token, refreshes it silently in the background before it
//! expires, and replays a request once when the API answers 401.
//! Uses synchronous HTTP (ureq) to be executor-agnostic.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::Deserialize;
use serde_json::Value;
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::net::TcpListener;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::transport::{ApiRequest, Transport};
use crate::error::ApiError;

/// Lifetime assumed when the token endpoint omits `expires_in`
const DEFAULT_LIFETIME_SECS: u64 = 3600;
/// Cached tokens closer than this to expiry are not handed out
const REUSE_MARGIN_SECS: i64 = 60;
/// Background refresh fires this long before expiry
const REFRESH_LEAD_SECS: u64 = 300;
/// Background refresh never fires sooner than this
const MIN_REFRESH_DELAY_SECS: u64 = 15;

/// A freshly issued access token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub access_token: String,
    pub expires_in: Option<u64>,
}

/// Source of access tokens
///
/// `interactive == false` asks for a silent refresh; providers that would
/// need user consent must fail instead of prompting.
pub trait TokenProvider: Send + Sync {
    fn request_token(&self, interactive: bool) -> Result<TokenGrant>;
}

/// Delay before the background refresh for a token living `lifetime_secs`
pub fn refresh_delay(lifetime_secs: u64) -> Duration {
    Duration::from_secs(
        lifetime_secs
            .saturating_sub(REFRESH_LEAD_SECS)
            .max(MIN_REFRESH_DELAY_SECS),
    )
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

/// State shared with the refresh thread
struct Shared {
    provider: Arc<dyn TokenProvider>,
    cached: Mutex<Option<CachedToken>>,
}

impl Shared {
    fn fresh_token(&self) -> Option<String> {
        let cached = lock(&self.cached);
        let token = cached.as_ref()?;
        let reuse_until = token.expires_at - chrono::Duration::seconds(REUSE_MARGIN_SECS);
        (Utc::now() < reuse_until).then(|| token.access_token.clone())
    }

    /// Cache a grant, returning its lifetime in seconds
    fn store(&self, grant: &TokenGrant) -> u64 {
        let lifetime = grant.expires_in.unwrap_or(DEFAULT_LIFETIME_SECS);
        *lock(&self.cached) = Some(CachedToken {
            access_token: grant.access_token.clone(),
            expires_at: Utc::now() + chrono::Duration::seconds(lifetime as i64),
        });
        lifetime
    }
}

struct RefreshTimer {
    stop: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

/// Caches and refreshes the bearer token used for Sheets requests
///
/// Lifecycle: [`TokenManager::new`], then any number of [`get_token`] /
/// [`authenticated_fetch`] calls, then [`dispose`] (also run on drop) to stop
/// the background refresh timer.
///
/// [`get_token`]: TokenManager::get_token
/// [`authenticated_fetch`]: TokenManager::authenticated_fetch
/// [`dispose`]: TokenManager::dispose
pub struct TokenManager {
    shared: Arc<Shared>,
    refresher: Mutex<Option<RefreshTimer>>,
    fixed_delay: Option<Duration>,
}

impl TokenManager {
    pub fn new(provider: Arc<dyn TokenProvider>) -> Self {
        Self {
            shared: Arc::new(Shared {
                provider,
                cached: Mutex::new(None),
            }),
            refresher: Mutex::new(None),
            fixed_delay: None,
        }
    }

    /// Refresh on a fixed interval instead of ahead of each token's expiry
    pub fn with_refresh_delay(mut self, delay: Duration) -> Self {
        self.fixed_delay = Some(delay);
        self
    }

    /// Get a bearer token, reusing the cached one while it has more than a
    /// minute left
    pub fn get_token(&self) -> Result<String, ApiError> {
        if let Some(token) = self.shared.fresh_token() {
            return Ok(token);
        }

        let grant = self
            .shared
            .provider
            .request_token(true)
            .map_err(|e| ApiError::Auth(format!("{:#}", e)))?;
        let lifetime = self.shared.store(&grant);
        debug!("Obtained access token valid for {}s", lifetime);
        self.schedule_refresh(lifetime);
        Ok(grant.access_token)
    }

    /// Forget the cached token so the next request obtains a new one
    pub fn invalidate(&self) {
        *lock(&self.shared.cached) = None;
    }

    /// Whether a token is cached and still usable
    pub fn has_token(&self) -> bool {
        self.shared.fresh_token().is_some()
    }

    /// Send a request with the bearer token attached
    ///
    /// On HTTP 401 the cached token is dropped and the request is sent once
    /// more with a new token. Every other failure, including a second 401,
    /// goes straight back to the caller.
    pub fn authenticated_fetch(
        &self,
        transport: &dyn Transport,
        request: &ApiRequest,
    ) -> Result<Value, ApiError> {
        let token = self.get_token()?;
        match transport.send(request, &token) {
            Err(e) if e.is_unauthorized() => {
                debug!("Unauthorized response from {}, retrying once", request.url);
                self.invalidate();
                let token = self.get_token()?;
                transport.send(request, &token)
            }
            other => other,
        }
    }

    /// Stop the background refresh timer
    pub fn dispose(&self) {
        let timer = lock(&self.refresher).take();
        if let Some(timer) = timer {
            drop(timer.stop);
            if timer.handle.join().is_err() {
                warn!("Token refresh thread panicked");
            }
        }
    }

    fn schedule_refresh(&self, lifetime: u64) {
        let mut slot = lock(&self.refresher);
        // Dropping the old sender wakes and ends the previous timer
        slot.take();

        let (stop, wake) = mpsc::channel();
        let shared = Arc::clone(&self.shared);
        let fixed_delay = self.fixed_delay;
        match thread::Builder::new()
            .name("token-refresh".to_string())
            .spawn(move || refresh_loop(shared, wake, lifetime, fixed_delay))
        {
            Ok(handle) => *slot = Some(RefreshTimer { stop, handle }),
            Err(e) => warn!("Could not start token refresh timer: {}", e),
        }
    }
}

impl Drop for TokenManager {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn refresh_loop(
    shared: Arc<Shared>,
    wake: mpsc::Receiver<()>,
    mut lifetime: u64,
    fixed_delay: Option<Duration>,
) {
    loop {
        let delay = fixed_delay.unwrap_or_else(|| refresh_delay(lifetime));
        match wake.recv_timeout(delay) {
            Err(RecvTimeoutError::Timeout) => {}
            _ => return,
        }

        match shared.provider.request_token(false) {
            Ok(grant) => {
                lifetime = shared.store(&grant);
                debug!("Silently refreshed access token ({}s)", lifetime);
            }
            Err(e) => {
                warn!("Silent token refresh failed: {:#}", e);
                return;
            }
        }
    }
}

/// Token response from Google
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<u64>,
}

/// What the browser sent back to the loopback listener
#[derive(Debug, PartialEq, Eq)]
pub enum Callback {
    Code(String),
    Denied(String),
    Missing,
}

/// OAuth2 authorization-code flow for Google Sheets access
///
/// The refresh token is held in memory only; a new process asks for consent
/// again (biased to `login_hint` when one is configured).
pub struct OAuthFlow {
    client_id: String,
    client_secret: String,
    login_hint: Option<String>,
    callback_timeout: Duration,
    refresh_token: Mutex<Option<String>>,
}

impl OAuthFlow {
    const AUTH_URL: &'static str = "https://accounts.google.com/o/oauth2/v2/auth";
    const TOKEN_URL: &'static str = "https://oauth2.googleapis.com/token";

    /// Read/write access to spreadsheets
    const SHEETS_SCOPE: &'static str = "https://www.googleapis.com/auth/spreadsheets";

    /// Port range to try for local OAuth callback server
    const PORT_RANGE_START: u16 = 8080;
    const PORT_RANGE_END: u16 = 8090;

    /// How often the listener is polled while waiting for the browser
    const POLL_INTERVAL: Duration = Duration::from_millis(50);

    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            client_id,
            client_secret,
            login_hint: None,
            callback_timeout: Duration::from_secs(300),
            refresh_token: Mutex::new(None),
        }
    }

    /// Bias the consent screen to a specific account
    pub fn with_login_hint(mut self, hint: Option<String>) -> Self {
        self.login_hint = hint.filter(|h| !h.trim().is_empty());
        self
    }

    /// Give up on the browser callback after this long
    pub fn with_callback_timeout(mut self, timeout: Duration) -> Self {
        self.callback_timeout = timeout;
        self
    }

    /// Build the consent URL for a given redirect URI
    pub fn authorization_url(&self, redirect_uri: &str, state: &str) -> Result<String> {
        let mut params = vec![
            ("client_id", self.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("response_type", "code"),
            ("scope", Self::SHEETS_SCOPE),
            ("access_type", "offline"),
            ("prompt", "consent"),
            ("state", state),
        ];
        if let Some(hint) = &self.login_hint {
            params.push(("login_hint", hint.as_str()));
        }
        let url = url::Url::parse_with_params(Self::AUTH_URL, &params)
            .context("Failed to build authorization URL")?;
        Ok(url.into())
    }

    fn authorization_code_auth(&self) -> Result<TokenResponse> {
        let (listener, port) = self.start_local_server()?;
        let redirect_uri = format!("http://localhost:{}", port);
        let state = random_state();
        let auth_url = self.authorization_url(&redirect_uri, &state)?;

        println!("\n=== Google Sheets Authentication Required ===");
        println!("Opening browser for authentication...");
        println!("If the browser doesn't open, visit: {}", auth_url);

        if let Err(e) = open::that(&auth_url) {
            warn!("Failed to open browser: {}. Please open the URL manually.", e);
        }

        let code = match self.wait_for_callback(listener, &state)? {
            Callback::Code(code) => code,
            Callback::Denied(reason) => anyhow::bail!("OAuth error: {}", reason),
            Callback::Missing => anyhow::bail!("No authorization code received"),
        };

        info!("Exchanging authorization code for tokens");
        let mut response = ureq::post(Self::TOKEN_URL)
            .send_form([
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code.as_str()),
                ("grant_type", "authorization_code"),
                ("redirect_uri", redirect_uri.as_str()),
            ])
            .context("Failed to exchange authorization code")?;

        let token: TokenResponse = response
            .body_mut()
            .read_json()
            .context("Failed to parse token response")?;

        println!("Authentication successful!\n");
        Ok(token)
    }

    fn start_local_server(&self) -> Result<(TcpListener, u16)> {
        for port in Self::PORT_RANGE_START..=Self::PORT_RANGE_END {
            if let Ok(listener) = TcpListener::bind(format!("127.0.0.1:{}", port)) {
                return Ok((listener, port));
            }
        }
        anyhow::bail!(
            "Could not bind to any port in range {}-{}",
            Self::PORT_RANGE_START,
            Self::PORT_RANGE_END
        )
    }

    fn wait_for_callback(&self, listener: TcpListener, state: &str) -> Result<Callback> {
        listener
            .set_nonblocking(true)
            .context("Failed to configure callback listener")?;
        let started = Instant::now();

        let mut stream = loop {
            match listener.accept() {
                Ok((stream, _)) => break stream,
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    if started.elapsed() > self.callback_timeout {
                        anyhow::bail!(
                            "Timed out after {}s waiting for the browser",
                            self.callback_timeout.as_secs()
                        );
                    }
                    thread::sleep(Self::POLL_INTERVAL);
                }
                Err(e) => return Err(e).context("Failed to accept connection"),
            }
        };
        stream
            .set_nonblocking(false)
            .context("Failed to configure callback stream")?;

        let mut request_line = String::new();
        BufReader::new(&stream)
            .read_line(&mut request_line)
            .context("Failed to read request")?;

        let callback = parse_callback(&request_line, state);
        let (status, body) = match callback {
            Callback::Code(_) => ("200 OK", "Authentication successful! You can close this window."),
            _ => ("400 Bad Request", "Authentication failed. Please try again."),
        };
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n<html><body><h1>{}</h1></body></html>",
            status, body
        );
        stream.write_all(response.as_bytes()).ok();

        Ok(callback)
    }

    fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenResponse> {
        let response = ureq::post(Self::TOKEN_URL)
            .send_form([
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .context("Failed to refresh access token")?;

        response
            .into_body()
            .read_json()
            .context("Failed to parse refresh token response")
    }

    fn accept(&self, token: TokenResponse) -> TokenGrant {
        if let Some(refresh) = token.refresh_token {
            *lock(&self.refresh_token) = Some(refresh);
        }
        TokenGrant {
            access_token: token.access_token,
            expires_in: token.expires_in,
        }
    }
}

impl TokenProvider for OAuthFlow {
    fn request_token(&self, interactive: bool) -> Result<TokenGrant> {
        let refresh_token = lock(&self.refresh_token).clone();
        if let Some(refresh_token) = refresh_token {
            match self.refresh_access_token(&refresh_token) {
                Ok(token) => return Ok(self.accept(token)),
                Err(e) if !interactive => return Err(e),
                Err(e) => warn!("Refresh failed, asking for consent again: {:#}", e),
            }
        }

        if !interactive {
            anyhow::bail!("No refresh token available for a silent token request");
        }

        let token = self.authorization_code_auth()?;
        Ok(self.accept(token))
    }
}

/// Extract the authorization code from the callback request line
///
/// Format: `GET /?code=AUTH_CODE&state=...&scope=... HTTP/1.1`
pub fn parse_callback(request_line: &str, expected_state: &str) -> Callback {
    let Some(path) = request_line.split_whitespace().nth(1) else {
        return Callback::Missing;
    };
    let Ok(url) = url::Url::parse(&format!("http://localhost{}", path)) else {
        return Callback::Missing;
    };

    let mut code = None;
    let mut error = None;
    let mut state = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            _ => {}
        }
    }

    if let Some(error) = error {
        return Callback::Denied(error);
    }
    if state.as_deref() != Some(expected_state) {
        return Callback::Denied("state mismatch".to_string());
    }
    code.map_or(Callback::Missing, Callback::Code)
}

/// Random value for the OAuth `state` parameter: 128 bits as hex
fn random_state() -> String {
    format!("{:016x}{:016x}", rand::random::<u64>(), rand::random::<u64>())
}
