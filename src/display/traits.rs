/*
 *  display/traits.rs
 *
 *  ArtMatrix - the cover, in pixels
 *  (c) 2020-26 Stuart Hunter
 *
 *  Panel driver and screen abstractions
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

use embedded_graphics::pixelcolor::Rgb888;

use crate::artwork::ArtworkBitmap;
use crate::display::error::DisplayError;
use crate::life::LifeGrid;
use crate::palette::Palette;

/// Panel geometry and metadata
#[derive(Debug, Clone)]
pub struct PanelCapabilities {
    /// Panel width in pixels
    pub width: u32,

    /// Panel height in pixels
    pub height: u32,

    /// Human readable panel name for logs
    pub name: &'static str,
}

/// Minimal hardware abstraction for an RGB matrix panel.
///
/// Refresh timing, pin mapping and PWM depth belong to whatever sits behind
/// the driver; a driver only accepts whole frames.
pub trait PanelDriver: Send {
    /// Returns the capabilities of this panel
    fn capabilities(&self) -> &PanelCapabilities;

    /// Returns the panel dimensions as (width, height)
    fn dimensions(&self) -> (u32, u32) {
        let caps = self.capabilities();
        (caps.width, caps.height)
    }

    /// Prepare the panel for frames
    fn init(&mut self) -> Result<(), DisplayError>;

    /// Push a full row-major frame, exactly width*height pixels
    fn write_frame(&mut self, frame: &[Rgb888]) -> Result<(), DisplayError>;

    /// Blank the panel
    fn clear(&mut self) -> Result<(), DisplayError>;
}

/// One of the three things the controller ever puts on the panel.
#[derive(Debug, Clone, Copy)]
pub enum Surface<'a> {
    /// Status text, e.g. "No active device"
    Status(&'a str),
    /// Cover art through its palette
    Artwork { bitmap: &'a ArtworkBitmap, palette: &'a Palette },
    /// A Life generation in one color on black
    Life { grid: &'a LifeGrid, color: Rgb888 },
}

/// What the control loop draws through.
pub trait Screen {
    fn dimensions(&self) -> (u32, u32);

    fn show(&mut self, surface: Surface<'_>) -> Result<(), DisplayError>;
}
