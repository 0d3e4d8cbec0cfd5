/*
 *  display/drivers/mock.rs
 *
 *  ArtMatrix - the cover, in pixels
 *  (c) 2020-26 Stuart Hunter
 *
 *  Mock panel for testing and dry runs without a matrix attached
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
use embedded_graphics::prelude::RgbColor;
use log::debug;

use crate::display::error::DisplayError;
use crate::display::traits::{PanelCapabilities, PanelDriver};

use std::sync::{Arc, Mutex};

/// Mock panel
///
/// Records every frame it is handed. The shared state stays reachable after the
/// panel is boxed into a display so tests can inspect what was shown.
#[derive(Debug, Clone)]
pub struct MockPanel {
    capabilities: PanelCapabilities,
    state: Arc<Mutex<MockPanelState>>,
}

/// Internal state for the mock panel (shared for inspection in tests)
#[derive(Debug, Default)]
pub struct MockPanelState {
    /// Number of times init() was called
    pub init_count: usize,

    /// Number of frames accepted
    pub frames_written: usize,

    /// Number of times clear() was called
    pub clear_count: usize,

    /// Whether the panel is initialized
    pub is_initialized: bool,

    /// Most recent frame, row-major
    pub last_frame: Vec<Rgb888>,

    /// Simulate failures (for error testing)
    pub simulate_write_failure: bool,
    pub simulate_init_failure: bool,
}

impl MockPanel {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            capabilities: PanelCapabilities { width, height, name: "mock" },
            state: Arc::new(Mutex::new(MockPanelState {
                last_frame: vec![Rgb888::BLACK; width as usize * height as usize],
                ..Default::default()
            })),
        }
    }

    /// Get reference to state for inspection in tests
    pub fn state(&self) -> Arc<Mutex<MockPanelState>> {
        Arc::clone(&self.state)
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut MockPanelState) -> T) -> Result<T, DisplayError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| DisplayError::Other("mock panel state poisoned".into()))?;
        Ok(f(&mut state))
    }
}

impl PanelDriver for MockPanel {
    fn capabilities(&self) -> &PanelCapabilities {
        &self.capabilities
    }

    fn init(&mut self) -> Result<(), DisplayError> {
        let failed = self.with_state(|s| {
            s.init_count += 1;
            if s.simulate_init_failure {
                return true;
            }
            s.is_initialized = true;
            false
        })?;
        if failed {
            return Err(DisplayError::InitializationFailed("simulated init failure".into()));
        }
        debug!("Mock panel {}x{} initialized", self.capabilities.width, self.capabilities.height);
        Ok(())
    }

    fn write_frame(&mut self, frame: &[Rgb888]) -> Result<(), DisplayError> {
        let expected = (self.capabilities.width * self.capabilities.height) as usize;
        if frame.len() != expected {
            return Err(DisplayError::BufferSizeMismatch { expected, actual: frame.len() });
        }
        self.with_state(|s| {
            if s.simulate_write_failure {
                return Err(DisplayError::WriteFailed("simulated write failure".into()));
            }
            s.last_frame.clear();
            s.last_frame.extend_from_slice(frame);
            s.frames_written += 1;
            Ok(())
        })?
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        self.with_state(|s| {
            s.last_frame.fill(Rgb888::BLACK);
            s.clear_count += 1;
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_records_frames() {
        let mut panel = MockPanel::new(2, 2);
        let state = panel.state();
        panel.init().unwrap();
        panel.write_frame(&[Rgb888::RED; 4]).unwrap();

        let s = state.lock().unwrap();
        assert!(s.is_initialized);
        assert_eq!(s.frames_written, 1);
        assert_eq!(s.last_frame, vec![Rgb888::RED; 4]);
    }

    #[test]
    fn test_mock_rejects_wrong_size() {
        let mut panel = MockPanel::new(4, 4);
        let result = panel.write_frame(&[Rgb888::RED; 3]);
        assert!(matches!(result, Err(DisplayError::BufferSizeMismatch { expected: 16, actual: 3 })));
    }

    #[test]
    fn test_mock_simulated_failures() {
        let mut panel = MockPanel::new(1, 1);
        panel.state().lock().unwrap().simulate_init_failure = true;
        assert!(panel.init().is_err());
        panel.state().lock().unwrap().simulate_write_failure = true;
        assert!(panel.write_frame(&[Rgb888::BLACK]).is_err());
        assert_eq!(panel.state().lock().unwrap().frames_written, 0);
    }

    #[test]
    fn test_mock_clear() {
        let mut panel = MockPanel::new(1, 2);
        panel.write_frame(&[Rgb888::GREEN; 2]).unwrap();
        panel.clear().unwrap();
        let state = panel.state();
        let s = state.lock().unwrap();
        assert_eq!(s.clear_count, 1);
        assert_eq!(s.last_frame, vec![Rgb888::BLACK; 2]);
    }
}
