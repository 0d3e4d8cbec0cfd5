/*
 *  api.rs
 *
 *  ArtMatrix - the cover, in pixels
 *  (c) 2020-26 Stuart Hunter
 *
 *  Wire payloads for the Spotify accounts and Web API endpoints
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
use serde::Deserialize;
use std::fmt::{self, Display, Formatter};

/// Error object as returned by either API family.
///
/// The Web API nests `{status, message}`, the accounts service returns a bare
/// code string alongside `error_description`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ErrorPayload {
    Detailed {
        #[serde(default)]
        status: Option<u16>,
        message: String,
    },
    Code(String),
}

impl Display for ErrorPayload {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ErrorPayload::Detailed { status: Some(status), message } => write!(f, "{} ({})", message, status),
            ErrorPayload::Detailed { status: None, message } => write!(f, "{}", message),
            ErrorPayload::Code(code) => write!(f, "{}", code),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    #[allow(dead_code)]
    pub expires_in: Option<u64>,
    pub error: Option<ErrorPayload>,
    pub error_description: Option<String>,
}

impl TokenResponse {
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(|e| match &self.error_description {
            Some(desc) => format!("{}: {}", e, desc),
            None => e.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct DevicesResponse {
    #[serde(default)]
    pub devices: Vec<Device>,
    pub error: Option<ErrorPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Device {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_active: bool,
}

#[derive(Debug, Deserialize)]
pub struct CurrentlyPlaying {
    pub item: Option<PlayingItem>,
    pub error: Option<ErrorPayload>,
}

#[derive(Debug, Deserialize)]
pub struct PlayingItem {
    pub album: Option<Album>,
}

#[derive(Debug, Deserialize)]
pub struct Album {
    #[serde(default)]
    pub images: Vec<Image>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Image {
    pub url: String,
    #[allow(dead_code)]
    pub width: Option<u32>,
    #[allow(dead_code)]
    pub height: Option<u32>,
}

impl CurrentlyPlaying {
    /// The smallest cover, last in the provider's size-ordered list.
    pub fn smallest_artwork_url(&self) -> Option<&str> {
        self.item
            .as_ref()
            .and_then(|item| item.album.as_ref())
            .and_then(|album| album.images.last())
            .map(|image| image.url.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_web_api_error_shape() {
        let body = r#"{"error":{"status":401,"message":"The access token expired"}}"#;
        let devices: DevicesResponse = serde_json::from_str(body).unwrap();
        assert!(devices.devices.is_empty());
        assert_eq!(devices.error.unwrap().to_string(), "The access token expired (401)");
    }

    #[test]
    fn test_accounts_error_shape() {
        let body = r#"{"error":"invalid_grant","error_description":"Invalid refresh token"}"#;
        let token: TokenResponse = serde_json::from_str(body).unwrap();
        assert_eq!(token.access_token, None);
        assert_eq!(token.error_message().as_deref(), Some("invalid_grant: Invalid refresh token"));
    }

    #[test]
    fn test_smallest_artwork_is_last() {
        let body = r#"{
            "is_playing": true,
            "item": {"album": {"images": [
                {"url": "https://i.scdn.co/image/640", "width": 640, "height": 640},
                {"url": "https://i.scdn.co/image/300", "width": 300, "height": 300},
                {"url": "https://i.scdn.co/image/64", "width": 64, "height": 64}
            ]}}
        }"#;
        let playing: CurrentlyPlaying = serde_json::from_str(body).unwrap();
        assert_eq!(playing.smallest_artwork_url(), Some("https://i.scdn.co/image/64"));
    }

    #[test]
    fn test_episode_without_album_has_no_artwork() {
        let playing: CurrentlyPlaying = serde_json::from_str(r#"{"item": {}}"#).unwrap();
        assert_eq!(playing.smallest_artwork_url(), None);
    }
}
