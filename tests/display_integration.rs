/*
 *  tests/display_integration.rs
 *
 *  Integration tests for the display system
 *
 *  ArtMatrix - the cover, in pixels
 *  (c) 2020-26 Stuart Hunter
 */

use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::RgbColor;

use artmatrix::artwork::{draw_artwork, ArtworkBitmap, QuantizedArtwork};
use artmatrix::config::{DisplayConfig, PanelKind};
use artmatrix::display::{MatrixDisplay, MockPanel, PanelFactory, Screen, Surface, STATUS_COLOR};
use artmatrix::life::{Life, LifeGrid};
use artmatrix::memory::Checkpoints;
use artmatrix::palette::Palette;
use rand::SeedableRng;
use rand::rngs::StdRng;

fn mock_display(width: u32, height: u32) -> (MatrixDisplay, MockPanel) {
    let panel = MockPanel::new(width, height);
    let display = MatrixDisplay::new(Box::new(panel.clone()), STATUS_COLOR).unwrap();
    (display, panel)
}

#[test]
fn test_display_initializes_panel_once() {
    let (display, panel) = mock_display(64, 32);
    assert_eq!(display.dimensions(), (64, 32));
    let state = panel.state();
    let s = state.lock().unwrap();
    assert!(s.is_initialized);
    assert_eq!(s.init_count, 1);
    assert_eq!(s.frames_written, 0);
}

#[test]
fn test_status_then_artwork_replaces_frame() {
    let (mut display, panel) = mock_display(16, 16);
    display.show(Surface::Status("No active device")).unwrap();

    let palette = Palette::build(6, 6, 6);
    let last = (palette.len() - 1) as u16;
    let mut bitmap = ArtworkBitmap::new(16, 16);
    let art = QuantizedArtwork::from_indices(vec![vec![last; 16]; 16]);
    let report = draw_artwork(&mut bitmap, &art, &palette, &Checkpoints::new());
    assert_eq!(report.skipped, 0);
    display.show(Surface::Artwork { bitmap: &bitmap, palette: &palette }).unwrap();

    let state = panel.state();
    let s = state.lock().unwrap();
    assert_eq!(s.frames_written, 2);
    // six levels step by 43, so the top color is 215 grey
    assert!(s.last_frame.iter().all(|&c| c == Rgb888::new(215, 215, 215)));
}

#[test]
fn test_life_generations_render() {
    let (mut display, panel) = mock_display(32, 32);
    let mut rng = StdRng::seed_from_u64(11);
    let mut life = Life::new(32, 32, &mut rng);
    let color = life.color();

    display.show(Surface::Life { grid: &life.a, color }).unwrap();
    let lit = panel.state().lock().unwrap().last_frame.iter().filter(|&&c| c == color).count();
    assert_eq!(lit, life.a.live_count());

    life.step_a_to_b();
    display.show(Surface::Life { grid: &life.b, color }).unwrap();
    let lit = panel.state().lock().unwrap().last_frame.iter().filter(|&&c| c == color).count();
    assert_eq!(lit, life.b.live_count());
}

#[test]
fn test_dead_grid_is_black() {
    let (mut display, panel) = mock_display(8, 4);
    display.show(Surface::Life { grid: &LifeGrid::new(8, 4), color: Rgb888::CYAN }).unwrap();
    assert!(panel.state().lock().unwrap().last_frame.iter().all(|&c| c == Rgb888::BLACK));
}

#[test]
fn test_failed_write_surfaces_as_error() {
    let (mut display, panel) = mock_display(8, 8);
    panel.state().lock().unwrap().simulate_write_failure = true;
    assert!(display.show(Surface::Status("x")).is_err());
}

#[test]
fn test_factory_builds_working_mock() {
    let cfg = DisplayConfig {
        width: Some(20),
        height: Some(10),
        panel: Some(PanelKind::Mock),
        ..Default::default()
    };
    let panel = PanelFactory::create_from_config(&cfg).unwrap();
    let mut display = MatrixDisplay::new(panel, 0xFF0000).unwrap();
    display.show(Surface::Status("Hi")).unwrap();
    assert!(display.frame().as_slice().iter().any(|&c| c == Rgb888::RED));
}

#[cfg(feature = "panel-shm")]
#[test]
fn test_shm_panel_exports_frames() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("frame");
    let cfg = DisplayConfig {
        width: Some(4),
        height: Some(2),
        panel: Some(PanelKind::Shm),
        shm_name: Some(path.to_string_lossy().into_owned()),
        ..Default::default()
    };
    let panel = PanelFactory::create_from_config(&cfg).unwrap();
    let mut display = MatrixDisplay::new(panel, STATUS_COLOR).unwrap();
    let mut grid = LifeGrid::new(4, 2);
    grid.set(3, 1, true);
    display.show(Surface::Life { grid: &grid, color: Rgb888::GREEN }).unwrap();

    let bytes = std::fs::read(&path).unwrap();
    let pixels = &bytes[12..];
    assert_eq!(pixels.len(), 4 * 2 * 3);
    assert_eq!(&pixels[21..24], &[0, 255, 0]);
    assert!(pixels[..21].iter().all(|&b| b == 0));
}

#[test]
fn test_dropping_display_blanks_panel() {
    let (mut display, panel) = mock_display(4, 4);
    display.show(Surface::Life { grid: &LifeGrid::new(4, 4), color: Rgb888::RED }).unwrap();
    display.show(Surface::Status("On")).unwrap();
    assert_eq!(panel.state().lock().unwrap().clear_count, 0);

    drop(display);
    let state = panel.state();
    let s = state.lock().unwrap();
    assert_eq!(s.clear_count, 1);
    assert!(s.last_frame.iter().all(|&c| c == Rgb888::BLACK));
}
