/*
 *  setup.rs
 *
 *  ArtMatrix - the cover, in pixels
 *  (c) 2020-26 Stuart Hunter
 *
 *  Guided authorization: trade a browser callback for a refresh token
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

use log::info;
use reqwest::Url;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::config::{self, Config};
use crate::display::{DisplayError, Screen, Surface};
use crate::remote::{RemoteClient, ServiceError};

/// Scopes needed to see what is playing and on which device
pub const SCOPES: &str = "user-read-currently-playing%20user-read-playback-state";

pub const SETUP_TEXT: &str = "Spotify account guided setup. Open a terminal";

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("spotify client_id and redirect_uri must be configured")]
    MissingCredentials,
    #[error("bad URL {url}: {reason}")]
    Url { url: String, reason: String },
    #[error("authorization denied: {0}")]
    Denied(String),
    #[error("callback URL carries no authorization code")]
    MissingCode,
    #[error("no callback URL entered")]
    NoInput,
    #[error("reading callback URL: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error(transparent)]
    Display(#[from] DisplayError),
}

/// Where the user grants access.
pub fn authorize_url(endpoint: &str, client_id: &str, redirect_uri: &str) -> Result<Url, SetupError> {
    let mut url = parse_url(endpoint)?;
    url.query_pairs_mut()
        .append_pair("client_id", client_id)
        .append_pair("response_type", "code")
        .append_pair("redirect_uri", redirect_uri);
    // scopes are space separated and must stay %20 encoded
    let query = format!("{}&scope={}", url.query().unwrap_or_default(), SCOPES);
    url.set_query(Some(&query));
    Ok(url)
}

fn parse_url(raw: &str) -> Result<Url, SetupError> {
    Url::parse(raw).map_err(|e| SetupError::Url { url: raw.to_string(), reason: e.to_string() })
}

/// Pull the authorization code out of the URL the browser landed on.
pub fn code_from_callback(callback: &str) -> Result<String, SetupError> {
    let url = parse_url(callback.trim())?;
    let mut code = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "error" => return Err(SetupError::Denied(value.into_owned())),
            "code" if !value.is_empty() => code = Some(value.into_owned()),
            _ => {}
        }
    }
    code.ok_or(SetupError::MissingCode)
}

/// Walk the user through authorization and return the new refresh token.
///
/// The panel asks for a terminal; the conversation itself happens on stdout
/// and `input`.
pub async fn run<D, R>(cfg: &Config, client: &RemoteClient, screen: &mut D, input: R) -> Result<String, SetupError>
where
    D: Screen,
    R: AsyncBufRead + Unpin,
{
    let spotify = cfg.spotify.clone().unwrap_or_default();
    let client_id = spotify.client_id.filter(|s| !s.is_empty()).ok_or(SetupError::MissingCredentials)?;
    let redirect_uri = spotify.redirect_uri.filter(|s| !s.is_empty()).ok_or(SetupError::MissingCredentials)?;
    let endpoint = cfg
        .endpoints
        .as_ref()
        .and_then(|e| e.authorize_url.clone())
        .unwrap_or_else(|| config::SPOTIFY_AUTHORIZE_URL.to_string());

    screen.show(Surface::Status(SETUP_TEXT))?;
    let url = authorize_url(&endpoint, &client_id, &redirect_uri)?;
    info!("Starting guided setup");
    println!("[Spotify Setup] Please go to {}", url);
    println!("[Spotify Setup] Enter the URL from your browser's address bar after authorizing:");

    let mut lines = input.lines();
    let callback = loop {
        match lines.next_line().await? {
            Some(line) if line.trim().is_empty() => continue,
            Some(line) => break line,
            None => return Err(SetupError::NoInput),
        }
    };

    let code = code_from_callback(&callback)?;
    let refresh_token = client.exchange_authorization_code(&code).await?;
    println!("[Spotify Setup] Add this to the spotify section of your config:");
    println!("  refresh_token: {}", refresh_token);
    screen.show(Surface::Status("Setup complete. Restart to play"))?;
    Ok(refresh_token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorize_url() {
        let url = authorize_url(config::SPOTIFY_AUTHORIZE_URL, "abc", "http://localhost:8888/callback").unwrap();
        let s = url.as_str();
        assert!(s.starts_with("https://accounts.spotify.com/authorize?client_id=abc&response_type=code"));
        assert!(s.contains("redirect_uri=http%3A%2F%2Flocalhost%3A8888%2Fcallback"));
        assert!(s.ends_with("&scope=user-read-currently-playing%20user-read-playback-state"));
    }

    #[test]
    fn test_code_from_callback() {
        let code = code_from_callback(" http://localhost:8888/callback?code=AQD-x_9&state=1\n").unwrap();
        assert_eq!(code, "AQD-x_9");
    }

    #[test]
    fn test_callback_errors() {
        assert!(matches!(
            code_from_callback("http://localhost/callback?error=access_denied"),
            Err(SetupError::Denied(reason)) if reason == "access_denied"
        ));
        assert!(matches!(code_from_callback("http://localhost/callback"), Err(SetupError::MissingCode)));
        assert!(matches!(code_from_callback("not a url"), Err(SetupError::Url { .. })));
    }
}
