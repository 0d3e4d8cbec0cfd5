/*
 *  display/drivers/shm.rs
 *
 *  ArtMatrix - the cover, in pixels
 *  (c) 2020-26 Stuart Hunter
 *
 *  Shared-memory frame export for an external matrix refresh daemon
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

//! Frame file layout, little endian:
//!
//! | offset | size  | field                           |
//! |--------|-------|---------------------------------|
//! | 0      | 4     | magic `AMX1`                    |
//! | 4      | 2     | width                           |
//! | 6      | 2     | height                          |
//! | 8      | 4     | frame sequence, bumped last     |
//! | 12     | w*h*3 | RGB triplets, row-major         |
//!
//! A reader polls the sequence and copies the pixels when it moves.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::RgbColor;
use log::{debug, info};
use memmap2::{MmapMut, MmapOptions};

use crate::display::error::DisplayError;
use crate::display::traits::{PanelCapabilities, PanelDriver};
use crate::vframebuf::pack_rgb;

pub const FRAME_MAGIC: &[u8; 4] = b"AMX1";
pub const HEADER_LEN: usize = 12;

pub struct ShmPanel {
    capabilities: PanelCapabilities,
    path: PathBuf,
    mmap: Option<MmapMut>,
    sequence: u32,
}

impl ShmPanel {
    pub fn new(path: impl AsRef<Path>, width: u32, height: u32) -> Result<Self, DisplayError> {
        if width > u16::MAX as u32 || height > u16::MAX as u32 {
            return Err(DisplayError::InvalidConfiguration(format!(
                "frame export cannot describe a {}x{} panel", width, height
            )));
        }
        Ok(Self {
            capabilities: PanelCapabilities { width, height, name: "shm" },
            path: path.as_ref().to_path_buf(),
            mmap: None,
            sequence: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn frame_len(&self) -> usize {
        (self.capabilities.width * self.capabilities.height) as usize * 3
    }

    fn mapped(&mut self) -> Result<&mut MmapMut, DisplayError> {
        self.mmap
            .as_mut()
            .ok_or_else(|| DisplayError::Other("shm panel used before init".into()))
    }

    fn publish(&mut self, frame: &[Rgb888]) -> Result<(), DisplayError> {
        self.sequence = self.sequence.wrapping_add(1);
        let sequence = self.sequence;
        let mmap = self.mapped()?;
        pack_rgb(frame, &mut mmap[HEADER_LEN..]);
        mmap[8..12].copy_from_slice(&sequence.to_le_bytes());
        Ok(())
    }
}

impl PanelDriver for ShmPanel {
    fn capabilities(&self) -> &PanelCapabilities {
        &self.capabilities
    }

    fn init(&mut self) -> Result<(), DisplayError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)?;
        let len = HEADER_LEN + self.frame_len();
        file.set_len(len as u64)?;

        // Safety: the file is sized above and only this process writes it.
        let mut mmap = unsafe { MmapOptions::new().len(len).map_mut(&file)? };
        mmap[0..4].copy_from_slice(FRAME_MAGIC);
        mmap[4..6].copy_from_slice(&(self.capabilities.width as u16).to_le_bytes());
        mmap[6..8].copy_from_slice(&(self.capabilities.height as u16).to_le_bytes());
        self.sequence = u32::from_le_bytes([mmap[8], mmap[9], mmap[10], mmap[11]]);
        self.mmap = Some(mmap);

        info!("Frame export at {} ({} bytes)", self.path.display(), len);
        Ok(())
    }

    fn write_frame(&mut self, frame: &[Rgb888]) -> Result<(), DisplayError> {
        let expected = (self.capabilities.width * self.capabilities.height) as usize;
        if frame.len() != expected {
            return Err(DisplayError::BufferSizeMismatch { expected, actual: frame.len() });
        }
        self.publish(frame)
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        let blank = vec![Rgb888::BLACK; (self.capabilities.width * self.capabilities.height) as usize];
        self.publish(&blank)?;
        debug!("Frame export cleared");
        Ok(())
    }
}
