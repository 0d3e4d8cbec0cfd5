/*
 *  display/mod.rs
 *
 *  ArtMatrix - the cover, in pixels
 *  (c) 2020-26 Stuart Hunter
 *
 *  Display subsystem
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

// Core trait definitions
pub mod traits;
pub mod error;
pub mod factory;

// Panel drivers
pub mod drivers;

// Surface rendering
pub mod matrix;

// Re-exports for convenience
pub use traits::{PanelCapabilities, PanelDriver, Screen, Surface};
pub use error::{DisplayError, DisplayFactoryError};
pub use factory::{BoxedPanel, PanelFactory};
pub use matrix::{MatrixDisplay, STATUS_COLOR};
pub use drivers::mock::{MockPanel, MockPanelState};
