/*
 *  session.rs
 *
 *  ArtMatrix - the cover, in pixels
 *  (c) 2020-26 Stuart Hunter
 *
 *  The control loop: poll playback, draw the cover or idle
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

use std::convert::Infallible;
use std::time::Duration;

use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use thiserror::Error;
use tokio::time::sleep;

use crate::artwork::{draw_artwork, ArtworkBitmap};
use crate::config::Config;
use crate::daynight::DayNight;
use crate::display::{DisplayError, Screen, Surface};
use crate::life::Life;
use crate::memory::Checkpoints;
use crate::palette::Palette;
use crate::remote::{AccessToken, ArtworkRequest, PlaybackService, PlaybackState, ServiceError};

pub const NO_DEVICE_TEXT: &str = "No active device";

/// Generation pairs shown per idle poll
pub const DEFAULT_GENERATIONS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Booting,
    Authenticating,
    Polling,
    ShowingArtwork,
    IdleAnimation,
    FatalError,
}

/// Anything that ends the session. The supervisor rebuilds it from scratch.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("service: {0}")]
    Service(#[from] ServiceError),
    #[error("display: {0}")]
    Display(#[from] DisplayError),
    #[error("token rejected after {0} consecutive re-authentications")]
    AuthLimit(u32),
}

/// Loop tunables, resolved once from config.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Life when nothing plays, the status message otherwise
    pub idle_animation: bool,
    pub generations: u32,
    pub frame_pause: Duration,
    pub message_pause: Duration,
    pub levels: (u16, u16, u16),
    pub brightness: f32,
    pub contrast: f32,
    pub day_night: Option<DayNight>,
    pub auth_limit: u32,
    pub auth_backoff: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl SessionSettings {
    pub fn from_config(cfg: &Config) -> Self {
        let idle = cfg.idle.clone().unwrap_or_default();
        let auth = cfg.auth.clone().unwrap_or_default();
        Self {
            idle_animation: idle.animation.unwrap_or(true),
            generations: idle.generations.unwrap_or(DEFAULT_GENERATIONS),
            frame_pause: Duration::from_millis(idle.frame_ms.unwrap_or(1000)),
            message_pause: Duration::from_secs(idle.message_pause_secs.unwrap_or(20)),
            levels: cfg.palette_levels(),
            brightness: cfg.brightness(),
            contrast: cfg.contrast(),
            day_night: DayNight::from_config(cfg),
            auth_limit: auth.max_consecutive.unwrap_or(5),
            auth_backoff: Duration::from_secs(auth.backoff_secs.unwrap_or(2)),
        }
    }
}

/// Counters kept for logs and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub polls: u64,
    pub token_refreshes: u64,
    pub idle_inits: u64,
    pub idle_releases: u64,
    pub idle_bursts: u64,
    pub artworks_fetched: u64,
    pub artworks_drawn: u64,
}

/// Everything the loop owns. Nothing here is shared; a restart drops it all.
pub struct Session<S, D> {
    service: S,
    screen: D,
    settings: SessionSettings,
    checkpoints: Checkpoints,
    rng: StdRng,

    state: LoopState,
    token: Option<AccessToken>,
    previous_url: Option<String>,
    brightness: f32,
    reauth_streak: u32,

    palette: Palette,
    bitmap: ArtworkBitmap,
    life: Option<Life>,
    stats: SessionStats,
}

impl<S: PlaybackService, D: Screen> Session<S, D> {
    pub fn new(service: S, screen: D, settings: SessionSettings, checkpoints: Checkpoints, rng: StdRng) -> Self {
        let (width, height) = screen.dimensions();
        let (r, g, b) = settings.levels;
        let palette = Palette::build(r, g, b);
        debug!("Palette of {} colors for {}x{}", palette.len(), width, height);
        Self {
            service,
            screen,
            brightness: settings.brightness,
            settings,
            checkpoints,
            rng,
            state: LoopState::Booting,
            token: None,
            previous_url: None,
            reauth_streak: 0,
            palette,
            bitmap: ArtworkBitmap::new(width, height),
            life: None,
            stats: SessionStats::default(),
        }
    }

    pub fn state(&self) -> LoopState { self.state }
    pub fn stats(&self) -> SessionStats { self.stats }
    pub fn previous_url(&self) -> Option<&str> { self.previous_url.as_deref() }
    pub fn idle_active(&self) -> bool { self.life.is_some() }
    pub fn brightness(&self) -> f32 { self.brightness }
    pub fn screen(&self) -> &D { &self.screen }
    pub fn service(&self) -> &S { &self.service }

    /// Poll forever. Only returns on a fatal error.
    pub async fn run(&mut self) -> Result<Infallible, SessionError> {
        info!("Session started");
        loop {
            if let Err(e) = self.poll_once().await {
                self.state = LoopState::FatalError;
                error!("Session failed in poll {}: {}", self.stats.polls, e);
                return Err(e);
            }
        }
    }

    /// One pass of the loop: query playback, then draw or idle.
    pub async fn poll_once(&mut self) -> Result<(), SessionError> {
        self.stats.polls += 1;
        if self.token.is_none() {
            self.authenticate().await?;
        }
        let Some(token) = self.token.clone() else {
            return Ok(());
        };

        self.state = LoopState::Polling;
        match self.service.query_active_device(&token).await? {
            // the streak only clears once now playing answers too
            PlaybackState::Active => self.on_active(&token).await,
            PlaybackState::Idle => {
                self.reauth_streak = 0;
                self.on_idle().await
            }
            PlaybackState::Error => {
                info!("Device query rejected, refreshing token");
                self.reauthenticate().await
            }
        }
    }

    async fn authenticate(&mut self) -> Result<(), SessionError> {
        self.state = LoopState::Authenticating;
        let token = self.service.refresh_access_token().await?;
        self.token = Some(token);
        self.stats.token_refreshes += 1;
        debug!("Access token refreshed ({} so far)", self.stats.token_refreshes);
        Ok(())
    }

    /// Refresh after a rejection, backing off linearly and giving up past the cap.
    async fn reauthenticate(&mut self) -> Result<(), SessionError> {
        if self.reauth_streak >= self.settings.auth_limit {
            return Err(SessionError::AuthLimit(self.reauth_streak));
        }
        let delay = self.settings.auth_backoff * self.reauth_streak;
        self.reauth_streak += 1;
        if !delay.is_zero() {
            warn!("Re-authentication {} in a row, waiting {:?}", self.reauth_streak, delay);
            sleep(delay).await;
        }
        self.authenticate().await
    }

    async fn on_active(&mut self, token: &AccessToken) -> Result<(), SessionError> {
        if self.life.take().is_some() {
            self.stats.idle_releases += 1;
            info!("Playback resumed, idle animation released");
        }

        let url = match self.service.now_playing_artwork_url(token).await {
            Ok(url) => {
                self.reauth_streak = 0;
                url
            }
            Err(ServiceError::Api(msg)) => {
                info!("Now playing rejected ({}), refreshing token", msg);
                return self.reauthenticate().await;
            }
            Err(e) if e.is_exhausted() => {
                warn!("Skipping this cycle: {}", e);
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        if self.previous_url.as_deref() == Some(url.as_str()) {
            self.state = LoopState::ShowingArtwork;
            return Ok(());
        }

        let request = self.artwork_request();
        let artwork = match self.service.fetch_quantized_artwork(&url, &request).await {
            Ok(artwork) => artwork,
            Err(e @ (ServiceError::Exhausted { .. } | ServiceError::Api(_))) => {
                warn!("Artwork unavailable, will retry next cycle: {}", e);
                self.previous_url = None;
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        self.stats.artworks_fetched += 1;

        let report = draw_artwork(&mut self.bitmap, &artwork, &self.palette, &self.checkpoints);
        drop(artwork);
        self.screen.show(Surface::Artwork { bitmap: &self.bitmap, palette: &self.palette })?;
        self.stats.artworks_drawn += 1;
        self.state = LoopState::ShowingArtwork;
        info!("Showing {} ({} cells)", url, report.drawn);
        self.previous_url = Some(url);

        self.apply_day_night().await;
        Ok(())
    }

    /// Pick day or night brightness. A change forces a redraw next cycle.
    async fn apply_day_night(&mut self) {
        let Some(day_night) = self.settings.day_night else {
            return;
        };
        match self.service.current_minute_of_day().await {
            Ok(minute) => {
                let brightness = day_night.brightness_at(minute);
                if brightness != self.brightness {
                    info!("Minute {} switches brightness {:.2} -> {:.2}", minute, self.brightness, brightness);
                    self.brightness = brightness;
                    self.previous_url = None;
                }
            }
            Err(e) => warn!("Time of day unavailable, brightness unchanged: {}", e),
        }
    }

    async fn on_idle(&mut self) -> Result<(), SessionError> {
        self.state = LoopState::IdleAnimation;
        if !self.settings.idle_animation {
            self.previous_url = None;
            self.screen.show(Surface::Status(NO_DEVICE_TEXT))?;
            sleep(self.settings.message_pause).await;
            return Ok(());
        }

        if self.life.is_none() {
            let (width, height) = self.screen.dimensions();
            let life = Life::new(width, height, &mut self.rng);
            info!("Nothing playing, idle animation seeded with {} cells", life.a.live_count());
            self.life = Some(life);
            self.previous_url = None;
            self.stats.idle_inits += 1;
        }

        let frame_pause = self.settings.frame_pause;
        for _ in 0..self.settings.generations {
            let Some(life) = self.life.as_mut() else {
                break;
            };
            self.screen.show(Surface::Life { grid: &life.a, color: life.color() })?;
            life.step_a_to_b();
            sleep(frame_pause).await;
            self.screen.show(Surface::Life { grid: &life.b, color: life.color() })?;
            life.step_b_to_a();
            sleep(frame_pause).await;
        }
        self.stats.idle_bursts += 1;
        Ok(())
    }

    fn artwork_request(&self) -> ArtworkRequest {
        // the quantizer must index the same palette we draw with
        let (red_levels, green_levels, blue_levels) = self.palette.levels();
        ArtworkRequest {
            width: self.bitmap.width(),
            height: self.bitmap.height(),
            red_levels,
            green_levels,
            blue_levels,
            brightness: self.brightness,
            contrast: self.settings.contrast,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AuthConfig, IdleConfig};

    #[test]
    fn test_settings_defaults() {
        let s = SessionSettings::default();
        assert!(s.idle_animation);
        assert_eq!(s.generations, 5);
        assert_eq!(s.frame_pause, Duration::from_secs(1));
        assert_eq!(s.message_pause, Duration::from_secs(20));
        assert_eq!(s.levels, (6, 6, 6));
        assert_eq!(s.auth_limit, 5);
        assert!(s.day_night.is_none());
    }

    #[test]
    fn test_settings_from_config() {
        let cfg = Config {
            idle: Some(IdleConfig { animation: Some(false), frame_ms: Some(40), ..Default::default() }),
            auth: Some(AuthConfig { max_consecutive: Some(2), backoff_secs: Some(0) }),
            ..Default::default()
        };
        let s = SessionSettings::from_config(&cfg);
        assert!(!s.idle_animation);
        assert_eq!(s.frame_pause, Duration::from_millis(40));
        assert_eq!(s.auth_limit, 2);
        assert!(s.auth_backoff.is_zero());
    }
}
