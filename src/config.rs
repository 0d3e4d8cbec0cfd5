/*
 *  config.rs
 *
 *  ArtMatrix - the cover, in pixels
 *  (c) 2020-26 Stuart Hunter
 *
 *  YAML configuration layered under command line overrides
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

use clap::{ArgAction, Parser, ValueHint};
use dirs_next::home_dir;
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}};
use thiserror::Error;

pub const SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub const SPOTIFY_AUTHORIZE_URL: &str = "https://accounts.spotify.com/authorize";
pub const SPOTIFY_API_BASE: &str = "https://api.spotify.com/v1";
pub const QUANTIZER_URL: &str = "http://fishy-confirmed-saturday.glitch.me/";

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Top-level app configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub log_level: Option<String>,     // e.g., "info" | "debug"
    pub spotify: Option<SpotifyConfig>,
    pub endpoints: Option<EndpointConfig>,
    pub artwork: Option<ArtworkConfig>,
    pub display: Option<DisplayConfig>,
    pub idle: Option<IdleConfig>,
    pub day_night: Option<DayNightConfig>,
    pub auth: Option<AuthConfig>,
}

/// OAuth client credentials and the long lived refresh token.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SpotifyConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EndpointConfig {
    pub token_url: Option<String>,
    pub authorize_url: Option<String>,
    pub api_base: Option<String>,
    pub quantizer_url: Option<String>,
    /// Plain-text minutes since the epoch
    pub time_url: Option<String>,
}

/// Palette depth and the adjustments handed to the quantizer.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ArtworkConfig {
    pub red_levels: Option<u16>,
    pub green_levels: Option<u16>,
    pub blue_levels: Option<u16>,
    pub brightness: Option<f32>,
    pub contrast: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DisplayConfig {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub panel: Option<PanelKind>,
    /// name of the frame file under /dev/shm (shm panel only)
    pub shm_name: Option<String>,
    pub status_color: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IdleConfig {
    /// Life animation when nothing plays, otherwise a status message
    pub animation: Option<bool>,
    pub generations: Option<u32>,
    pub frame_ms: Option<u64>,
    pub message_pause_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DayNightConfig {
    pub enabled: Option<bool>,
    pub night_brightness: Option<f32>,
    pub start_night: Option<u16>,
    pub end_night: Option<u16>,
    pub utc_offset_minutes: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    pub max_consecutive: Option<u32>,
    pub backoff_secs: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PanelKind {
    Mock,
    Shm,
}

/// CLI overrides. All fields are Options so we can layer them over YAML.
#[derive(Debug, Parser, Clone, Default)]
#[command(name = "artmatrix", about = "ArtMatrix - now playing album art on an LED matrix", version)]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(long, short = 'c', value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    /// Enable debug log level
    #[arg(long, short = 'v', alias = "verbose", action = ArgAction::SetTrue)]
    pub debug: bool,
    #[arg(long)]
    pub log_level: Option<String>,
    #[arg(long)]
    pub display_width: Option<u32>,
    #[arg(long)]
    pub display_height: Option<u32>,
    #[arg(long, value_enum)]
    pub panel: Option<PanelArg>,
    #[arg(long, action = ArgAction::Set)]
    pub idle_animation: Option<bool>,
    #[arg(long, action = ArgAction::Set)]
    pub day_night: Option<bool>,
    /// run the one-time Spotify authorization wizard and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub setup: bool,
    /// dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum PanelArg {
    Mock,
    Shm,
}

impl From<PanelArg> for PanelKind {
    fn from(arg: PanelArg) -> Self {
        match arg {
            PanelArg::Mock => PanelKind::Mock,
            PanelArg::Shm => PanelKind::Shm,
        }
    }
}

/// Public entry point: read YAML, merge CLI, validate.
pub fn load(cli: &Cli) -> Result<Config, ConfigError> {
    // 1) defaults (from `Default` impl)
    let mut cfg = Config::default();

    // 2) YAML file (explicit path or search)
    if let Some(p) = cli.config.as_ref() {
        if p.exists() {
            let y = read_yaml(p)?;
            merge(&mut cfg, y);
        } else {
            return Err(ConfigError::Validation(format!(
                "Config file not found: {}",
                p.display()
            )));
        }
    } else if let Some(p) = find_config_file() {
        let y = read_yaml(&p)?;
        merge(&mut cfg, y);
    }

    // 3) CLI overrides (highest precedence)
    apply_cli_overrides(&mut cfg, cli);

    // 4) Validate
    validate(&cfg)?;

    Ok(cfg)
}

/// Pretty YAML of effective config (nice for debugging)
pub fn dump(cfg: &Config) -> Result<String, ConfigError> {
    Ok(serde_yaml::to_string(cfg)?)
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    // XDG-style: ~/.config/artmatrix/config.yaml
    if let Some(home) = home_dir() {
        let p = home.join(".config/artmatrix/config.yaml");
        if p.exists() { return Some(p) }
        let p = home.join(".config/artmatrix.yaml");
        if p.exists() { return Some(p) }
    }
    // project local
    for candidate in &["artmatrix.yaml", "config.yaml", "config/artmatrix.yaml"] {
        let p = PathBuf::from(candidate);
        if p.exists() { return Some(p) }
    }
    None
}

pub fn read_yaml(path: &Path) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&s)?;
    Ok(cfg)
}

/// Shallow merge `src` into `dst`, group-by-group.
pub fn merge(dst: &mut Config, src: Config) {
    if src.log_level.is_some() { dst.log_level = src.log_level; }
    if src.spotify.is_some()   { dst.spotify = src.spotify; }
    if src.endpoints.is_some() { dst.endpoints = src.endpoints; }
    if src.artwork.is_some()   { dst.artwork = src.artwork; }
    if src.idle.is_some()      { dst.idle = src.idle; }
    if src.day_night.is_some() { dst.day_night = src.day_night; }
    if src.auth.is_some()      { dst.auth = src.auth; }
    match (&mut dst.display, src.display) {
        (None, Some(c)) => dst.display = Some(c),
        (Some(d), Some(s)) => merge_display(d, s),
        _ => {}
    }
}

fn merge_display(dst: &mut DisplayConfig, src: DisplayConfig) {
    if src.width.is_some()        { dst.width = src.width; }
    if src.height.is_some()       { dst.height = src.height; }
    if src.panel.is_some()        { dst.panel = src.panel; }
    if src.shm_name.is_some()     { dst.shm_name = src.shm_name; }
    if src.status_color.is_some() { dst.status_color = src.status_color; }
}

fn apply_cli_overrides(cfg: &mut Config, cli: &Cli) {
    if cli.log_level.is_some() { cfg.log_level = cli.log_level.clone(); }
    if cli.debug { cfg.log_level = Some("debug".to_string()); }

    let any_display = cli.display_width.is_some()
        || cli.display_height.is_some()
        || cli.panel.is_some();
    if any_display && cfg.display.is_none() {
        cfg.display = Some(DisplayConfig::default());
    }
    if let Some(display) = cfg.display.as_mut() {
        if cli.display_width.is_some()  { display.width = cli.display_width; }
        if cli.display_height.is_some() { display.height = cli.display_height; }
        if let Some(panel) = cli.panel  { display.panel = Some(panel.into()); }
    }

    if let Some(animation) = cli.idle_animation {
        cfg.idle.get_or_insert_with(IdleConfig::default).animation = Some(animation);
    }
    if let Some(enabled) = cli.day_night {
        cfg.day_night.get_or_insert_with(DayNightConfig::default).enabled = Some(enabled);
    }
}

/// Put any invariants here (required fields, ranges, etc.)
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if let Some(display) = cfg.display.as_ref() {
        if display.width == Some(0) || display.height == Some(0) {
            return Err(ConfigError::Validation("display width/height must be > 0".into()));
        }
    }
    if let Some(art) = cfg.artwork.as_ref() {
        for (name, level) in [("red", art.red_levels), ("green", art.green_levels), ("blue", art.blue_levels)] {
            if level == Some(0) {
                return Err(ConfigError::Validation(format!("artwork {name}_levels must be >= 1")));
            }
        }
        let palette_len = art.red_levels.unwrap_or(DEFAULT_LEVELS) as u32
            * art.green_levels.unwrap_or(DEFAULT_LEVELS) as u32
            * art.blue_levels.unwrap_or(DEFAULT_LEVELS) as u32;
        if palette_len > u16::MAX as u32 {
            return Err(ConfigError::Validation(format!(
                "artwork palette of {palette_len} colors exceeds the 16-bit index width"
            )));
        }
    }
    if let Some(dn) = cfg.day_night.as_ref() {
        for (name, minute) in [("start_night", dn.start_night), ("end_night", dn.end_night)] {
            if minute.is_some_and(|m| m >= 1440) {
                return Err(ConfigError::Validation(format!("day_night {name} must be a minute of day (0..1440)")));
            }
        }
    }
    if cfg.idle.as_ref().and_then(|i| i.generations) == Some(0) {
        return Err(ConfigError::Validation("idle generations must be > 0".into()));
    }
    Ok(())
}

pub const DEFAULT_LEVELS: u16 = 6;

impl Config {
    /// The stored refresh token, if one is present and not blank.
    pub fn refresh_token(&self) -> Option<&str> {
        self.spotify
            .as_ref()
            .and_then(|s| s.refresh_token.as_deref())
            .filter(|t| !t.trim().is_empty())
    }

    pub fn palette_levels(&self) -> (u16, u16, u16) {
        let art = self.artwork.clone().unwrap_or_default();
        (
            art.red_levels.unwrap_or(DEFAULT_LEVELS),
            art.green_levels.unwrap_or(DEFAULT_LEVELS),
            art.blue_levels.unwrap_or(DEFAULT_LEVELS),
        )
    }

    pub fn brightness(&self) -> f32 {
        self.artwork.as_ref().and_then(|a| a.brightness).unwrap_or(-0.3)
    }

    pub fn contrast(&self) -> f32 {
        self.artwork.as_ref().and_then(|a| a.contrast).unwrap_or(0.3)
    }

    pub fn display_size(&self) -> (u32, u32) {
        let display = self.display.clone().unwrap_or_default();
        (display.width.unwrap_or(64), display.height.unwrap_or(64))
    }
}
