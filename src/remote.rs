/*
 *  remote.rs
 *
 *  ArtMatrix - the cover, in pixels
 *  (c) 2020-26 Stuart Hunter
 *
 *  Spotify, quantizer and time service client
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */
use chrono::{Local, Timelike};
use log::{debug, info, warn};
use reqwest::{Client, RequestBuilder, header};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::api::{CurrentlyPlaying, DevicesResponse, TokenResponse};
use crate::artwork::QuantizedArtwork;
use crate::config::{self, Config};
use crate::memory::Checkpoints;
use crate::retry::with_retries;

pub const MINUTES_PER_DAY: i64 = 1440;

/// Error type for remote service calls.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Transport failure (connect, TLS, timeout, non-2xx from the quantizer).
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
    /// Response body was not the JSON we expected.
    #[error("JSON deserialization error: {0}")]
    Decode(#[from] serde_json::Error),
    /// Response parsed but lacked what we need.
    #[error("unexpected response: {0}")]
    Malformed(String),
    /// The service answered with an explicit error payload.
    #[error("API error: {0}")]
    Api(String),
    /// Retry budget spent without a usable answer.
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u8, last: String },
    #[error("no refresh token configured")]
    MissingRefreshToken,
    #[error("client configuration: {0}")]
    Config(String),
}

impl ServiceError {
    /// Transport and decode failures are worth another attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, ServiceError::Http(_) | ServiceError::Decode(_) | ServiceError::Malformed(_))
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, ServiceError::Exhausted { .. })
    }
}

/// Short lived bearer token. Replaced wholesale on refresh.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccessToken(..{} chars)", self.0.len())
    }
}

/// Tri-state answer of the device query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Active,
    Idle,
    /// The API rejected the request; refresh the token and poll again.
    Error,
}

/// Geometry, palette depth and tone adjustment passed to the quantizer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArtworkRequest {
    pub width: u32,
    pub height: u32,
    pub red_levels: u16,
    pub green_levels: u16,
    pub blue_levels: u16,
    pub brightness: f32,
    pub contrast: f32,
}

impl ArtworkRequest {
    /// Query pairs in the quantizer's expected order.
    pub fn query(&self, artwork_url: &str) -> Vec<(&'static str, String)> {
        vec![
            ("h", self.height.to_string()),
            ("w", self.width.to_string()),
            ("r", self.red_levels.to_string()),
            ("g", self.green_levels.to_string()),
            ("b", self.blue_levels.to_string()),
            ("bright", format!("{:.2}", self.brightness)),
            ("contr", format!("{:.2}", self.contrast)),
            ("imgurl", artwork_url.to_string()),
        ]
    }
}

/// The remote operations the control loop depends on.
#[allow(async_fn_in_trait)]
pub trait PlaybackService {
    /// Exchange the stored refresh token for a fresh bearer token.
    async fn refresh_access_token(&self) -> Result<AccessToken, ServiceError>;

    /// Is any device on the account playing? Not retried.
    async fn query_active_device(&self, token: &AccessToken) -> Result<PlaybackState, ServiceError>;

    /// URL of the smallest cover image of the current track.
    async fn now_playing_artwork_url(&self, token: &AccessToken) -> Result<String, ServiceError>;

    /// Cover image already quantized to palette indices by the renderer.
    async fn fetch_quantized_artwork(
        &self,
        artwork_url: &str,
        request: &ArtworkRequest,
    ) -> Result<QuantizedArtwork, ServiceError>;

    /// Minutes since local midnight, `0..1440`.
    async fn current_minute_of_day(&self) -> Result<u16, ServiceError>;
}

#[derive(Debug, Clone)]
pub struct Endpoints {
    pub token_url: String,
    pub api_base: String,
    pub quantizer_url: String,
    pub time_url: Option<String>,
}

impl Endpoints {
    pub fn from_config(cfg: &Config) -> Self {
        let ep = cfg.endpoints.clone().unwrap_or_default();
        Self {
            token_url: ep.token_url.unwrap_or_else(|| config::SPOTIFY_TOKEN_URL.to_string()),
            api_base: ep.api_base.unwrap_or_else(|| config::SPOTIFY_API_BASE.to_string()),
            quantizer_url: ep.quantizer_url.unwrap_or_else(|| config::QUANTIZER_URL.to_string()),
            time_url: ep.time_url,
        }
    }
}

#[derive(Clone, Default)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub refresh_token: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("redirect_uri", &self.redirect_uri)
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| ".."))
            .finish()
    }
}

impl Credentials {
    pub fn from_config(cfg: &Config) -> Self {
        let sp = cfg.spotify.clone().unwrap_or_default();
        Self {
            client_id: sp.client_id.unwrap_or_default(),
            client_secret: sp.client_secret.unwrap_or_default(),
            redirect_uri: sp.redirect_uri.unwrap_or_default(),
            refresh_token: cfg.refresh_token().map(str::to_string),
        }
    }
}

/// HTTP client for the accounts service, the Web API, the quantizer and the
/// time service.
#[derive(Debug)]
pub struct RemoteClient {
    client: Client,
    endpoints: Endpoints,
    credentials: Credentials,
    checkpoints: Checkpoints,
    utc_offset_minutes: i32,
}

impl RemoteClient {
    pub fn new(
        endpoints: Endpoints,
        credentials: Credentials,
        checkpoints: Checkpoints,
        utc_offset_minutes: i32,
    ) -> Result<Self, ServiceError> {
        const VERSION: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

        let mut headers = header::HeaderMap::new();
        headers.insert("User-Agent", header::HeaderValue::from_static(VERSION));
        headers.insert("Accept", header::HeaderValue::from_static("application/json"));
        headers.insert("Connection", header::HeaderValue::from_static("close"));

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .default_headers(headers)
            .timeout(Duration::from_secs(15))
            .build()?;

        Ok(Self { client, endpoints, credentials, checkpoints, utc_offset_minutes })
    }

    pub fn from_config(cfg: &Config, checkpoints: Checkpoints) -> Result<Self, ServiceError> {
        let offset = cfg.day_night.as_ref().and_then(|d| d.utc_offset_minutes).unwrap_or(0);
        Self::new(Endpoints::from_config(cfg), Credentials::from_config(cfg), checkpoints, offset)
    }

    /// Swap an authorization code from the consent redirect for a refresh token.
    pub async fn exchange_authorization_code(&self, code: &str) -> Result<String, ServiceError> {
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.credentials.redirect_uri.as_str()),
        ];
        let token: TokenResponse = self.post_token(&form).await?;
        granted_refresh_token(token)
    }

    async fn post_token<T: DeserializeOwned>(&self, form: &[(&str, &str)]) -> Result<T, ServiceError> {
        if self.credentials.client_id.is_empty() || self.credentials.client_secret.is_empty() {
            return Err(ServiceError::Config("spotify client_id/client_secret are required".into()));
        }
        self.checkpoints.reclaim("token:before");
        let request = self
            .client
            .post(&self.endpoints.token_url)
            .basic_auth(&self.credentials.client_id, Some(&self.credentials.client_secret))
            .form(form);
        let parsed = read_body(request, false).await.map(|body| serde_json::from_str(&body));
        self.checkpoints.reclaim("token:after");
        Ok(parsed??)
    }

    /// GET a Web API path with the bearer token; API errors arrive as JSON
    /// bodies on 4xx so the status is left for the payload to explain.
    async fn get_api<T: DeserializeOwned>(&self, path: &str, token: &AccessToken) -> Result<T, ServiceError> {
        let url = format!("{}{}", self.endpoints.api_base, path);
        self.checkpoints.reclaim("api:before");
        let request = self.client.get(&url).bearer_auth(token.as_str());
        let parsed = read_body(request, false).await.map(|body| serde_json::from_str(&body));
        self.checkpoints.reclaim("api:after");
        Ok(parsed??)
    }

    async fn now_playing_once(&self, token: &AccessToken) -> Result<String, ServiceError> {
        debug!("Getting artwork URL...");
        let playing: CurrentlyPlaying = self.get_api("/me/player/currently-playing", token).await?;
        let url = artwork_url(playing)?;
        info!("Got artwork URL: {}", url);
        Ok(url)
    }

    async fn artwork_once(&self, artwork_url: &str, request: &ArtworkRequest) -> Result<QuantizedArtwork, ServiceError> {
        debug!("Getting artwork...");
        self.checkpoints.reclaim("artwork:before");
        let get = self.client.get(&self.endpoints.quantizer_url).query(&request.query(artwork_url));
        let parsed = read_body(get, true)
            .await
            .map(|body| serde_json::from_str::<Vec<Vec<Value>>>(&body));
        self.checkpoints.reclaim("artwork:after");
        Ok(QuantizedArtwork::new(parsed??))
    }

    async fn minute_of_day_once(&self, time_url: &str) -> Result<u16, ServiceError> {
        self.checkpoints.reclaim("time:before");
        let body = read_body(self.client.get(time_url).header("Accept", "text/plain"), true).await;
        self.checkpoints.reclaim("time:after");
        let body = body?;
        let minutes: i64 = body
            .trim()
            .parse()
            .map_err(|_| ServiceError::Malformed(format!("time service sent {:?}", body.trim())))?;
        Ok(minute_of_day(minutes, self.utc_offset_minutes))
    }
}

/// Send `request` and read the whole body. `checked` turns a non-2xx status
/// into an error; the Spotify endpoints explain themselves in the payload.
async fn read_body(request: RequestBuilder, checked: bool) -> Result<String, reqwest::Error> {
    let response = request.send().await?;
    let response = if checked { response.error_for_status()? } else { response };
    response.text().await
}

/// Any device marked active means playback; an error payload asks for a
/// fresh token.
pub fn device_state(response: &DevicesResponse) -> PlaybackState {
    if let Some(error) = &response.error {
        warn!("Device query error: {}", error);
        return PlaybackState::Error;
    }
    match response.devices.iter().find(|d| d.is_active) {
        Some(device) => {
            debug!("Device {} is active", device.name);
            PlaybackState::Active
        }
        None => PlaybackState::Idle,
    }
}

pub fn artwork_url(playing: CurrentlyPlaying) -> Result<String, ServiceError> {
    if let Some(error) = playing.error {
        warn!("Now playing error: {}", error);
        return Err(ServiceError::Api(error.to_string()));
    }
    playing
        .smallest_artwork_url()
        .map(str::to_string)
        .ok_or_else(|| ServiceError::Malformed("current item has no album artwork".into()))
}

pub fn granted_access_token(token: TokenResponse) -> Result<AccessToken, ServiceError> {
    if let Some(message) = token.error_message() {
        return Err(ServiceError::Api(message));
    }
    token
        .access_token
        .map(AccessToken::new)
        .ok_or_else(|| ServiceError::Malformed("token response without access_token".into()))
}

pub fn granted_refresh_token(token: TokenResponse) -> Result<String, ServiceError> {
    if let Some(message) = token.error_message() {
        return Err(ServiceError::Api(message));
    }
    token
        .refresh_token
        .ok_or_else(|| ServiceError::Malformed("token response without refresh_token".into()))
}

/// Reduce minutes since the epoch to minutes since midnight.
pub fn minute_of_day(epoch_minutes: i64, utc_offset_minutes: i32) -> u16 {
    (epoch_minutes + utc_offset_minutes as i64).rem_euclid(MINUTES_PER_DAY) as u16
}

impl PlaybackService for RemoteClient {
    async fn refresh_access_token(&self) -> Result<AccessToken, ServiceError> {
        let refresh_token = self
            .credentials
            .refresh_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(ServiceError::MissingRefreshToken)?;
        info!("Refreshing Spotify access token");
        let form = [("grant_type", "refresh_token"), ("refresh_token", refresh_token)];
        let form = &form;
        let token: TokenResponse = with_retries("refresh_token", &self.checkpoints, move || self.post_token(form)).await?;
        granted_access_token(token)
    }

    async fn query_active_device(&self, token: &AccessToken) -> Result<PlaybackState, ServiceError> {
        debug!("Checking if any device is active...");
        let response: DevicesResponse = self.get_api("/me/player/devices", token).await?;
        Ok(device_state(&response))
    }

    async fn now_playing_artwork_url(&self, token: &AccessToken) -> Result<String, ServiceError> {
        with_retries("now_playing", &self.checkpoints, move || self.now_playing_once(token)).await
    }

    async fn fetch_quantized_artwork(
        &self,
        artwork_url: &str,
        request: &ArtworkRequest,
    ) -> Result<QuantizedArtwork, ServiceError> {
        with_retries("artwork", &self.checkpoints, move || self.artwork_once(artwork_url, request)).await
    }

    async fn current_minute_of_day(&self) -> Result<u16, ServiceError> {
        match self.endpoints.time_url.as_deref() {
            Some(url) => with_retries("time", &self.checkpoints, move || self.minute_of_day_once(url)).await,
            None => {
                // no time service configured, trust the host clock
                let now = Local::now();
                Ok((now.hour() * 60 + now.minute()) as u16)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minute_of_day_reduction() {
        // 2024-01-01T00:00Z is 28_401_120 minutes after the epoch
        assert_eq!(minute_of_day(28_401_120, 0), 0);
        assert_eq!(minute_of_day(28_401_120 + 754, 0), 754);
        assert_eq!(minute_of_day(28_401_120, -300), 1140);
        assert_eq!(minute_of_day(28_401_120 + 1439, 60), 59);
    }

    #[test]
    fn test_quantizer_query_order_and_format() {
        let request = ArtworkRequest {
            width: 64,
            height: 32,
            red_levels: 6,
            green_levels: 6,
            blue_levels: 6,
            brightness: -0.3,
            contrast: 0.3,
        };
        let query = request.query("https://i.scdn.co/image/ab67");
        let keys: Vec<&str> = query.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, ["h", "w", "r", "g", "b", "bright", "contr", "imgurl"]);
        assert_eq!(query[0].1, "32");
        assert_eq!(query[1].1, "64");
        assert_eq!(query[5].1, "-0.30");
        assert_eq!(query[6].1, "0.30");
    }

    #[test]
    fn test_error_classes() {
        assert!(ServiceError::Malformed("x".into()).is_transient());
        assert!(!ServiceError::Api("x".into()).is_transient());
        assert!(!ServiceError::MissingRefreshToken.is_transient());
        let exhausted = ServiceError::Exhausted { attempts: 4, last: "x".into() };
        assert!(exhausted.is_exhausted());
        assert!(!exhausted.is_transient());
    }

    #[test]
    fn test_token_debug_is_redacted() {
        let token = AccessToken::new("BQDsecret");
        assert_eq!(format!("{:?}", token), "AccessToken(..9 chars)");
    }

    #[tokio::test]
    async fn test_missing_refresh_token_is_not_retried() {
        let checkpoints = Checkpoints::new();
        let client = RemoteClient::new(
            Endpoints::from_config(&Config::default()),
            Credentials::default(),
            checkpoints.clone(),
            0,
        )
        .unwrap();
        let result = client.refresh_access_token().await;
        assert!(matches!(result, Err(ServiceError::MissingRefreshToken)));
        assert_eq!(checkpoints.count(), 0);
    }

    fn parse<T: DeserializeOwned>(body: &str) -> T {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn test_device_state_classification() {
        let rejected: DevicesResponse = parse(r#"{"error":{"status":401,"message":"The access token expired"}}"#);
        assert_eq!(device_state(&rejected), PlaybackState::Error);

        let idle: DevicesResponse = parse(r#"{"devices":[{"name":"Kitchen","is_active":false}]}"#);
        assert_eq!(device_state(&idle), PlaybackState::Idle);
        let none: DevicesResponse = parse(r#"{"devices":[]}"#);
        assert_eq!(device_state(&none), PlaybackState::Idle);

        let active: DevicesResponse =
            parse(r#"{"devices":[{"name":"Kitchen","is_active":false},{"name":"Den","is_active":true}]}"#);
        assert_eq!(device_state(&active), PlaybackState::Active);
    }

    #[test]
    fn test_artwork_url_classification() {
        let playing: CurrentlyPlaying = parse(
            r#"{"item":{"album":{"images":[
                {"url":"https://i.scdn.co/image/640","width":640,"height":640},
                {"url":"https://i.scdn.co/image/64","width":64,"height":64}]}}}"#,
        );
        assert_eq!(artwork_url(playing).unwrap(), "https://i.scdn.co/image/64");

        let rejected: CurrentlyPlaying = parse(r#"{"error":{"status":403,"message":"Insufficient client scope"}}"#);
        match artwork_url(rejected) {
            Err(ServiceError::Api(msg)) => assert!(msg.contains("Insufficient client scope")),
            other => panic!("expected api error, got {:?}", other),
        }

        let bare: CurrentlyPlaying = parse(r#"{"item":{"album":{"images":[]}}}"#);
        assert!(matches!(artwork_url(bare), Err(ServiceError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_now_playing_rejection_is_not_retried() {
        let checkpoints = Checkpoints::new();
        let mut attempts = 0;
        let result = with_retries("now_playing", &checkpoints, || {
            attempts += 1;
            let playing: CurrentlyPlaying = parse(r#"{"error":{"status":429,"message":"API rate limit exceeded"}}"#);
            async move { artwork_url(playing) }
        })
        .await;
        assert!(matches!(result, Err(ServiceError::Api(_))));
        assert_eq!(attempts, 1);
        assert_eq!(checkpoints.count(), 0);
    }

    #[tokio::test]
    async fn test_missing_artwork_is_retried_then_exhausted() {
        let checkpoints = Checkpoints::new();
        let mut attempts = 0;
        let result = with_retries("now_playing", &checkpoints, || {
            attempts += 1;
            let playing: CurrentlyPlaying = parse(r#"{"item":null}"#);
            async move { artwork_url(playing) }
        })
        .await;
        assert!(matches!(result, Err(ServiceError::Exhausted { attempts: 4, .. })));
        assert_eq!(attempts, 4);
    }

    #[test]
    fn test_token_grant_classification() {
        let granted: TokenResponse = parse(r#"{"access_token":"BQD","token_type":"Bearer","expires_in":3600}"#);
        assert_eq!(granted_access_token(granted).unwrap().as_str(), "BQD");

        let revoked: TokenResponse =
            parse(r#"{"error":"invalid_grant","error_description":"Refresh token revoked"}"#);
        match granted_access_token(revoked) {
            Err(ServiceError::Api(msg)) => assert_eq!(msg, "invalid_grant: Refresh token revoked"),
            other => panic!("expected api error, got {:?}", other),
        }

        let empty: TokenResponse = parse(r#"{"token_type":"Bearer"}"#);
        assert!(matches!(granted_access_token(empty), Err(ServiceError::Malformed(_))));
    }

    #[test]
    fn test_refresh_token_grant_classification() {
        let granted: TokenResponse = parse(r#"{"access_token":"BQD","refresh_token":"AQC"}"#);
        assert_eq!(granted_refresh_token(granted).unwrap(), "AQC");

        let denied: TokenResponse = parse(r#"{"error":"invalid_grant","error_description":"Invalid authorization code"}"#);
        assert!(matches!(granted_refresh_token(denied), Err(ServiceError::Api(_))));
    }
}
