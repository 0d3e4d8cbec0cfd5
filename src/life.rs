/*
 *  life.rs
 *
 *  ArtMatrix - the cover, in pixels
 *  (c) 2020-26 Stuart Hunter
 *
 *  Conway's Life on a torus, the idle screen
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
use rand::Rng;

/// Chance a seeded cell starts live
pub const SEED_DENSITY: f64 = 1.0 / 7.0;
/// Chance each color channel is lit
pub const CHANNEL_CHANCE: f64 = 2.0 / 3.0;

/// One generation of cells, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifeGrid {
    width: u32,
    height: u32,
    cells: Vec<bool>,
}

impl LifeGrid {
    /// All dead
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height, cells: vec![false; width as usize * height as usize] }
    }

    pub fn width(&self) -> u32 { self.width }
    pub fn height(&self) -> u32 { self.height }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> bool {
        self.cells[(y * self.width + x) as usize]
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, live: bool) {
        self.cells[(y * self.width + x) as usize] = live;
    }

    pub fn live_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }

    /// Independent Bernoulli seed per cell
    pub fn seed<R: Rng + ?Sized>(&mut self, rng: &mut R, density: f64) {
        for cell in self.cells.iter_mut() {
            *cell = rng.random_bool(density);
        }
    }
}

/// Compute the next generation of `old` into `new`.
///
/// Edges wrap both ways. Wrapped neighbor coordinates are worked out per cell;
/// at matrix sizes a lookup table buys nothing. Every cell of `new` is written.
pub fn step(old: &LifeGrid, new: &mut LifeGrid) {
    debug_assert_eq!((old.width, old.height), (new.width, new.height));
    let (w, h) = (old.width, old.height);
    for y in 0..h {
        let up = (y + h - 1) % h;
        let down = (y + 1) % h;
        for x in 0..w {
            let left = (x + w - 1) % w;
            let right = (x + 1) % w;
            let neighbors = old.get(left, up) as u8
                + old.get(x, up) as u8
                + old.get(right, up) as u8
                + old.get(left, y) as u8
                + old.get(right, y) as u8
                + old.get(left, down) as u8
                + old.get(x, down) as u8
                + old.get(right, down) as u8;
            let live = neighbors == 3 || (neighbors == 2 && old.get(x, y));
            new.set(x, y, live);
        }
    }
}

/// Idle animation state: two grids trading source and destination roles and
/// the color they are drawn in.
#[derive(Debug, Clone)]
pub struct Life {
    pub a: LifeGrid,
    pub b: LifeGrid,
    color: Rgb888,
}

impl Life {
    /// Fresh random color and a sparse random seed in grid A; B starts dead.
    pub fn new<R: Rng + ?Sized>(width: u32, height: u32, rng: &mut R) -> Self {
        let color = random_color(rng);
        let mut a = LifeGrid::new(width, height);
        a.seed(rng, SEED_DENSITY);
        Self { a, b: LifeGrid::new(width, height), color }
    }

    pub fn color(&self) -> Rgb888 { self.color }

    pub fn step_a_to_b(&mut self) {
        step(&self.a, &mut self.b);
    }

    pub fn step_b_to_a(&mut self) {
        step(&self.b, &mut self.a);
    }
}

/// Each channel full on with probability 2/3; white if all three miss.
pub fn random_color<R: Rng + ?Sized>(rng: &mut R) -> Rgb888 {
    let mut channel = || if rng.random_bool(CHANNEL_CHANCE) { 255 } else { 0 };
    let (r, g, b) = (channel(), channel(), channel());
    if r == 0 && g == 0 && b == 0 {
        Rgb888::WHITE
    } else {
        Rgb888::new(r, g, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn grid_with(width: u32, height: u32, live: &[(u32, u32)]) -> LifeGrid {
        let mut grid = LifeGrid::new(width, height);
        for &(x, y) in live {
            grid.set(x, y, true);
        }
        grid
    }

    #[test]
    fn test_dead_grid_stays_dead() {
        let old = LifeGrid::new(16, 16);
        let mut new = grid_with(16, 16, &[(3, 3)]);
        step(&old, &mut new);
        assert_eq!(new.live_count(), 0);
    }

    #[test]
    fn test_lonely_cell_dies() {
        let old = grid_with(8, 8, &[(4, 4)]);
        let mut new = LifeGrid::new(8, 8);
        step(&old, &mut new);
        assert_eq!(new.live_count(), 0);
    }

    #[test]
    fn test_block_is_still_life() {
        for size in [4u32, 5, 9, 64] {
            let block = grid_with(size, size, &[(1, 1), (2, 1), (1, 2), (2, 2)]);
            let mut next = LifeGrid::new(size, size);
            step(&block, &mut next);
            assert_eq!(next, block, "block changed on {}x{}", size, size);
        }
    }

    #[test]
    fn test_block_across_the_corner_wraps() {
        let (w, h) = (6, 5);
        let block = grid_with(w, h, &[(0, 0), (w - 1, 0), (0, h - 1), (w - 1, h - 1)]);
        let mut next = LifeGrid::new(w, h);
        step(&block, &mut next);
        assert_eq!(next, block);
    }

    #[test]
    fn test_corner_counts_opposite_corner() {
        // (0,0) sees (w-1,h-1), (w-1,0) and (0,h-1) through the wrap: a birth
        let (w, h) = (8, 6);
        let old = grid_with(w, h, &[(w - 1, h - 1), (w - 1, 0), (0, h - 1)]);
        let mut new = LifeGrid::new(w, h);
        step(&old, &mut new);
        assert!(new.get(0, 0));
    }

    #[test]
    fn test_blinker_oscillates() {
        let horizontal = grid_with(5, 5, &[(1, 2), (2, 2), (3, 2)]);
        let vertical = grid_with(5, 5, &[(2, 1), (2, 2), (2, 3)]);
        let mut next = LifeGrid::new(5, 5);
        step(&horizontal, &mut next);
        assert_eq!(next, vertical);
        let mut back = LifeGrid::new(5, 5);
        step(&next, &mut back);
        assert_eq!(back, horizontal);
    }

    #[test]
    fn test_new_life_seeds_sparse_a_and_dead_b() {
        let mut rng = StdRng::seed_from_u64(7);
        let life = Life::new(64, 64, &mut rng);
        let live = life.a.live_count();
        // 4096 cells at 1/7 is ~585
        assert!((400..800).contains(&live), "live = {}", live);
        assert_eq!(life.b.live_count(), 0);
        assert_ne!(life.color(), Rgb888::BLACK);
    }

    #[test]
    fn test_random_color_is_never_black() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..500 {
            let c = random_color(&mut rng);
            assert_ne!(c, Rgb888::BLACK);
            for channel in [c.r(), c.g(), c.b()] {
                assert!(channel == 0 || channel == 255);
            }
        }
    }

    #[test]
    fn test_steps_alternate_buffers() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut life = Life::new(4, 4, &mut rng);
        life.a = grid_with(4, 4, &[(1, 1), (2, 1), (1, 2), (2, 2)]);
        life.step_a_to_b();
        assert_eq!(life.b, life.a);
        life.a = LifeGrid::new(4, 4);
        life.step_b_to_a();
        assert_eq!(life.a, life.b);
    }
}
