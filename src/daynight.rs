/*
 *  daynight.rs
 *
 *  ArtMatrix - the cover, in pixels
 *  (c) 2020-26 Stuart Hunter
 *
 *  Night window and the artwork brightness it selects
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
use crate::config::Config;

/// Minutes of day bounding the night, both exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NightWindow {
    pub start: u16,
    pub end: u16,
}

impl Default for NightWindow {
    fn default() -> Self {
        // 20:00 until 06:00
        Self { start: 1200, end: 360 }
    }
}

impl NightWindow {
    pub fn new(start: u16, end: u16) -> Self {
        Self { start, end }
    }

    /// A window with `start > end` runs past midnight.
    pub fn is_night(&self, minute: u16) -> bool {
        if self.start > self.end {
            minute > self.start || minute < self.end
        } else {
            minute > self.start && minute < self.end
        }
    }
}

/// Day and night brightness handed to the quantizer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DayNight {
    pub window: NightWindow,
    pub day_brightness: f32,
    pub night_brightness: f32,
}

impl DayNight {
    /// None unless day/night switching is enabled.
    pub fn from_config(cfg: &Config) -> Option<Self> {
        let dn = cfg.day_night.as_ref()?;
        if !dn.enabled.unwrap_or(false) {
            return None;
        }
        let defaults = NightWindow::default();
        Some(Self {
            window: NightWindow::new(
                dn.start_night.unwrap_or(defaults.start),
                dn.end_night.unwrap_or(defaults.end),
            ),
            day_brightness: cfg.brightness(),
            night_brightness: dn.night_brightness.unwrap_or(-0.7),
        })
    }

    pub fn brightness_at(&self, minute: u16) -> f32 {
        if self.window.is_night(minute) {
            self.night_brightness
        } else {
            self.day_brightness
        }
    }
}
