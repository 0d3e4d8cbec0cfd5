/*
 *  artwork.rs
 *
 *  ArtMatrix - the cover, in pixels
 *  (c) 2020-26 Stuart Hunter
 *
 *  Quantized cover art and the persistent on-device bitmap
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
use log::{info, warn};
use serde_json::Value;
use thiserror::Error;

use crate::func_timer::FunctionTimer;
use crate::memory::Checkpoints;
use crate::palette::{Palette, PaletteIndex};

/// A cell of the served grid that cannot be copied.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CellError {
    #[error("cell ({x},{y}) missing")]
    Missing { x: u32, y: u32 },
    #[error("cell ({x},{y}) is not a palette index: {value}")]
    NotAnIndex { x: u32, y: u32, value: String },
    #[error("cell ({x},{y}) index {index} outside palette of {palette_len}")]
    OutOfRange { x: u32, y: u32, index: u64, palette_len: usize },
}

/// Artwork as served by the quantizer: `columns[x][y]` palette indices.
///
/// Cells stay as raw JSON until drawn so one bad value costs one pixel, not
/// the whole cover.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuantizedArtwork {
    columns: Vec<Vec<Value>>,
}

impl QuantizedArtwork {
    pub fn new(columns: Vec<Vec<Value>>) -> Self {
        Self { columns }
    }

    /// Build from plain indices, column-major.
    pub fn from_indices(columns: Vec<Vec<PaletteIndex>>) -> Self {
        Self {
            columns: columns
                .into_iter()
                .map(|col| col.into_iter().map(Value::from).collect())
                .collect(),
        }
    }

    pub fn width(&self) -> usize { self.columns.len() }

    /// Palette index at `(x, y)`, checked against the palette length.
    pub fn cell(&self, x: u32, y: u32, palette_len: usize) -> Result<PaletteIndex, CellError> {
        let value = self
            .columns
            .get(x as usize)
            .and_then(|col| col.get(y as usize))
            .ok_or(CellError::Missing { x, y })?;
        let index = value
            .as_u64()
            .ok_or_else(|| CellError::NotAnIndex { x, y, value: value.to_string() })?;
        if index as usize >= palette_len {
            return Err(CellError::OutOfRange { x, y, index, palette_len });
        }
        Ok(index as PaletteIndex)
    }
}

/// width x height palette indices, allocated once and overwritten in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtworkBitmap {
    width: u32,
    height: u32,
    pixels: Vec<PaletteIndex>,
}

impl ArtworkBitmap {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height, pixels: vec![0; width as usize * height as usize] }
    }

    pub fn width(&self) -> u32 { self.width }
    pub fn height(&self) -> u32 { self.height }

    pub fn get(&self, x: u32, y: u32) -> Option<PaletteIndex> {
        if x < self.width && y < self.height {
            Some(self.pixels[(y * self.width + x) as usize])
        } else {
            None
        }
    }

    fn set(&mut self, x: u32, y: u32, index: PaletteIndex) {
        if x < self.width && y < self.height {
            self.pixels[(y * self.width + x) as usize] = index;
        }
    }

    /// Row-major indices
    pub fn as_slice(&self) -> &[PaletteIndex] { &self.pixels }
}

/// Outcome of one draw pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawReport {
    pub drawn: usize,
    pub skipped: usize,
}

/// Copy every cell of `artwork` into `bitmap`.
///
/// Bad cells are logged with their coordinates and value and left as they
/// were; the rest of the cover still lands.
pub fn draw_artwork(
    bitmap: &mut ArtworkBitmap,
    artwork: &QuantizedArtwork,
    palette: &Palette,
    checkpoints: &Checkpoints,
) -> DrawReport {
    let _timer = FunctionTimer::new("draw_artwork");
    checkpoints.reclaim("draw:before");

    let mut report = DrawReport::default();
    for x in 0..bitmap.width() {
        for y in 0..bitmap.height() {
            match artwork.cell(x, y, palette.len()) {
                Ok(index) => {
                    bitmap.set(x, y, index);
                    report.drawn += 1;
                }
                Err(e) => {
                    warn!("Skipping artwork {}", e);
                    report.skipped += 1;
                }
            }
        }
    }

    checkpoints.reclaim("draw:after");
    if report.skipped > 0 {
        info!("Artwork drawn with {} of {} cells skipped", report.skipped, report.drawn + report.skipped);
    }
    report
}
