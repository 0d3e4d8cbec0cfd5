/*
 *  shm_path.rs
 *
 *  ArtMatrix - the cover, in pixels
 *  (c) 2020-26 Stuart Hunter
 *
 *  Where the exported frame file lives
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

use std::path::{Path, PathBuf};

pub const DEFAULT_FRAME_NAME: &str = "artmatrix-frame";

/// Frame file path: /dev/shm when the tmpfs is mounted, the temp dir otherwise.
/// Names carrying a path separator are taken as full paths.
pub fn frame_path(name: Option<&str>) -> PathBuf {
    let name = name.filter(|n| !n.trim().is_empty()).unwrap_or(DEFAULT_FRAME_NAME);
    if name.contains('/') {
        return PathBuf::from(name);
    }
    frame_dir().join(name)
}

fn frame_dir() -> PathBuf {
    let shm = Path::new("/dev/shm");
    if shm.is_dir() {
        shm.to_path_buf()
    } else {
        std::env::temp_dir()
    }
}
