/*
 *  display/matrix.rs
 *
 *  ArtMatrix - the cover, in pixels
 *  (c) 2020-26 Stuart Hunter
 *
 *  Renders status text, artwork and Life onto an RGB panel
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

use embedded_graphics::mono_font::{ascii::FONT_5X8, MonoTextStyle};
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics::text::{Baseline, Text};
use log::{debug, info, warn};

use crate::artwork::ArtworkBitmap;
use crate::display::error::DisplayError;
use crate::display::factory::BoxedPanel;
use crate::display::traits::{Screen, Surface};
use crate::life::LifeGrid;
use crate::palette::{self, Palette};
use crate::vframebuf::VarFrameBuf;

/// Default status text color, a muted blue
pub const STATUS_COLOR: u32 = 0x0065A9;

const GLYPH_W: u32 = 5;
const LINE_H: i32 = 9;
const TEXT_TOP: i32 = 4;

/// The matrix as the control loop sees it.
pub struct MatrixDisplay {
    panel: BoxedPanel,
    frame: VarFrameBuf<Rgb888>,
    status_color: Rgb888,
}

impl MatrixDisplay {
    /// Initializes the panel and sizes the frame to it.
    pub fn new(mut panel: BoxedPanel, status_color: u32) -> Result<Self, DisplayError> {
        panel.init()?;
        let (width, height) = panel.dimensions();
        info!("Matrix {} {}x{} ready", panel.capabilities().name, width, height);
        Ok(Self {
            panel,
            frame: VarFrameBuf::new(width, height, Rgb888::BLACK),
            status_color: palette::unpack(status_color),
        })
    }

    /// Last rendered frame
    pub fn frame(&self) -> &VarFrameBuf<Rgb888> {
        &self.frame
    }

    fn draw_status(&mut self, text: &str) {
        self.frame.fill(Rgb888::BLACK);
        let style = MonoTextStyle::new(&FONT_5X8, self.status_color);
        let columns = (self.frame.width() as u32 / GLYPH_W).max(1) as usize;
        for (row, line) in wrap(text, columns).iter().enumerate() {
            let origin = Point::new(0, TEXT_TOP + row as i32 * LINE_H);
            // drawing into the framebuffer is infallible
            let _ = Text::with_baseline(line, origin, style, Baseline::Top).draw(&mut self.frame);
        }
    }

    fn draw_artwork(&mut self, bitmap: &ArtworkBitmap, palette: &Palette) {
        self.frame.fill(Rgb888::BLACK);
        let pixels = (0..bitmap.height()).flat_map(|y| (0..bitmap.width()).map(move |x| (x, y)));
        let drawn = pixels.filter_map(|(x, y)| {
            let color = bitmap.get(x, y).and_then(|i| palette.rgb(i))?;
            Some(Pixel(Point::new(x as i32, y as i32), color))
        });
        let _ = self.frame.draw_iter(drawn);
    }

    fn draw_life(&mut self, grid: &LifeGrid, color: Rgb888) {
        let cells = (0..grid.height()).flat_map(|y| (0..grid.width()).map(move |x| (x, y)));
        let pixels = cells.map(|(x, y)| {
            let c = if grid.get(x, y) { color } else { Rgb888::BLACK };
            Pixel(Point::new(x as i32, y as i32), c)
        });
        let _ = self.frame.draw_iter(pixels);
    }
}

impl Drop for MatrixDisplay {
    fn drop(&mut self) {
        // leave a dark panel behind on shutdown or session restart
        match self.panel.clear() {
            Ok(()) => info!("Matrix display dropped, panel cleared"),
            Err(e) => warn!("Matrix display dropped, clearing the panel failed: {}", e),
        }
    }
}

impl Screen for MatrixDisplay {
    fn dimensions(&self) -> (u32, u32) {
        self.panel.dimensions()
    }

    fn show(&mut self, surface: Surface<'_>) -> Result<(), DisplayError> {
        match surface {
            Surface::Status(text) => {
                debug!("Status: {}", text);
                self.draw_status(text);
            }
            Surface::Artwork { bitmap, palette } => self.draw_artwork(bitmap, palette),
            Surface::Life { grid, color } => self.draw_life(grid, color),
        }
        self.panel.write_frame(self.frame.as_slice())
    }
}

/// Greedy word wrap into lines of at most `columns` characters.
/// Words longer than a line are split.
fn wrap(text: &str, columns: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > columns {
            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            let rest = word.split_off(columns);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        let needed = if line.is_empty() { word.len() } else { line.chars().count() + 1 + word.len() };
        if needed > columns && !line.is_empty() {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.extend(word);
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::drivers::mock::MockPanel;

    fn matrix(width: u32, height: u32) -> (MatrixDisplay, MockPanel) {
        let panel = MockPanel::new(width, height);
        let display = MatrixDisplay::new(Box::new(panel.clone()), STATUS_COLOR).unwrap();
        (display, panel)
    }

    #[test]
    fn test_wrap() {
        assert_eq!(wrap("No active device", 12), vec!["No active", "device"]);
        assert_eq!(wrap("abcdefgh", 3), vec!["abc", "def", "gh"]);
        assert!(wrap("   ", 4).is_empty());
    }

    #[test]
    fn test_status_uses_status_color() {
        let (mut display, panel) = matrix(64, 64);
        display.show(Surface::Status("No active device")).unwrap();
        let state = panel.state();
        let s = state.lock().unwrap();
        assert_eq!(s.frames_written, 1);
        let lit: Vec<_> = s.last_frame.iter().filter(|&&c| c != Rgb888::BLACK).collect();
        assert!(!lit.is_empty());
        assert!(lit.iter().all(|&&c| c == Rgb888::new(0x00, 0x65, 0xA9)));
    }

    #[test]
    fn test_artwork_maps_through_palette() {
        let (mut display, panel) = matrix(2, 2);
        let palette = Palette::build(2, 2, 2);
        let mut bitmap = ArtworkBitmap::new(2, 2);
        let artwork = crate::artwork::QuantizedArtwork::from_indices(vec![vec![7, 0], vec![1, 7]]);
        crate::artwork::draw_artwork(&mut bitmap, &artwork, &palette, &crate::memory::Checkpoints::new());

        display.show(Surface::Artwork { bitmap: &bitmap, palette: &palette }).unwrap();
        let frame = panel.state().lock().unwrap().last_frame.clone();
        // columns[x][y]: (0,0)=7 (1,0)=1 (0,1)=0 (1,1)=7
        assert_eq!(frame[0], palette.rgb(7).unwrap());
        assert_eq!(frame[1], palette.rgb(1).unwrap());
        assert_eq!(frame[2], palette.rgb(0).unwrap());
        assert_eq!(frame[3], palette.rgb(7).unwrap());
    }

    #[test]
    fn test_life_draws_live_cells_in_color() {
        let (mut display, panel) = matrix(3, 1);
        let mut grid = LifeGrid::new(3, 1);
        grid.set(1, 0, true);
        display.show(Surface::Life { grid: &grid, color: Rgb888::MAGENTA }).unwrap();
        let frame = panel.state().lock().unwrap().last_frame.clone();
        assert_eq!(frame, vec![Rgb888::BLACK, Rgb888::MAGENTA, Rgb888::BLACK]);
    }
}
