/*
 *  lib.rs
 *
 *  ArtMatrix - the cover, in pixels
 *  (c) 2020-26 Stuart Hunter
 *
 *  Library root, shared by the binary and the integration tests
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

pub mod config;

// wire formats and the remote side
pub mod api;
pub mod remote;
pub mod retry;

// pixels
pub mod palette;
pub mod artwork;
pub mod life;
pub mod display;
pub mod vframebuf;
pub mod shm_path;

pub mod daynight;
pub mod memory;
pub mod func_timer;

// the loop and its one-time setup
pub mod session;
pub mod setup;
