/*
 *  display/factory.rs
 *
 *  ArtMatrix - the cover, in pixels
 *  (c) 2020-26 Stuart Hunter
 *
 *  Builds the panel driver named in the configuration
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

use crate::config::{DisplayConfig, PanelKind};
use crate::display::drivers::mock::MockPanel;
use crate::display::error::DisplayFactoryError;
use crate::display::traits::PanelDriver;
use log::{debug, info};

#[cfg(feature = "panel-shm")]
use crate::display::drivers::shm::ShmPanel;

/// Type alias for boxed panel trait objects
pub type BoxedPanel = Box<dyn PanelDriver>;

/// Largest edge we accept; HUB75 chains rarely exceed this
pub const MAX_EDGE: u32 = 512;

/// Factory for creating panel drivers from configuration
pub struct PanelFactory;

impl PanelFactory {
    /// Create a panel from configuration. The panel is not initialized.
    ///
    /// Without an explicit panel the shm export is used when compiled in, the
    /// mock otherwise.
    pub fn create_from_config(config: &DisplayConfig) -> Result<BoxedPanel, DisplayFactoryError> {
        Self::validate_config(config)?;
        let width = config.width.unwrap_or(64);
        let height = config.height.unwrap_or(64);
        let kind = config.panel.unwrap_or_else(Self::default_kind);
        debug!("Creating {:?} panel {}x{}", kind, width, height);

        match kind {
            PanelKind::Mock => {
                info!("Using mock panel, frames are not shown anywhere");
                Ok(Box::new(MockPanel::new(width, height)))
            }
            PanelKind::Shm => Self::create_shm(config, width, height),
        }
    }

    #[cfg(feature = "panel-shm")]
    fn create_shm(config: &DisplayConfig, width: u32, height: u32) -> Result<BoxedPanel, DisplayFactoryError> {
        let path = crate::shm_path::frame_path(config.shm_name.as_deref());
        Ok(Box::new(ShmPanel::new(path, width, height)?))
    }

    #[cfg(not(feature = "panel-shm"))]
    fn create_shm(_config: &DisplayConfig, _width: u32, _height: u32) -> Result<BoxedPanel, DisplayFactoryError> {
        Err(DisplayFactoryError::UnsupportedPanel("shm".into()))
    }

    fn default_kind() -> PanelKind {
        if cfg!(feature = "panel-shm") { PanelKind::Shm } else { PanelKind::Mock }
    }

    /// Validate display configuration
    pub fn validate_config(config: &DisplayConfig) -> Result<(), DisplayFactoryError> {
        for (name, edge) in [("width", config.width), ("height", config.height)] {
            if let Some(edge) = edge {
                if edge == 0 || edge > MAX_EDGE {
                    return Err(DisplayFactoryError::ConfigError(format!(
                        "display {} must be within 1..={}, got {}", name, MAX_EDGE, edge
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_from_config() {
        let cfg = DisplayConfig { width: Some(32), height: Some(16), panel: Some(PanelKind::Mock), ..Default::default() };
        let panel = PanelFactory::create_from_config(&cfg).unwrap();
        assert_eq!(panel.dimensions(), (32, 16));
        assert_eq!(panel.capabilities().name, "mock");
    }

    #[test]
    fn test_rejects_oversized_panel() {
        let cfg = DisplayConfig { width: Some(4096), panel: Some(PanelKind::Mock), ..Default::default() };
        assert!(matches!(
            PanelFactory::create_from_config(&cfg),
            Err(DisplayFactoryError::ConfigError(_))
        ));
    }

    #[test]
    fn test_defaults_to_64_square() {
        let cfg = DisplayConfig { panel: Some(PanelKind::Mock), ..Default::default() };
        assert_eq!(PanelFactory::create_from_config(&cfg).unwrap().dimensions(), (64, 64));
    }
}
