/*
 *  palette.rs
 *
 *  ArtMatrix - the cover, in pixels
 *  (c) 2020-26 Stuart Hunter
 *
 *  Fixed RGB palette enumerated from per-channel levels
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

/// Index into the artwork palette as served by the quantizer.
pub type PaletteIndex = u16;

/// Quantized color table shared by the artwork bitmap and the quantizer.
///
/// Entry `i` is fixed by nested enumeration: red outermost, green, then blue
/// innermost, so `i = (r * green_levels + g) * blue_levels + b`. The
/// quantizer is told the same levels and returns indices in this order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    levels: (u16, u16, u16),
    colors: Vec<u32>,
}

impl Palette {
    /// Build the palette once at startup.
    ///
    /// Levels must be >= 1 (config validation guarantees it); a zero level is
    /// treated as one.
    pub fn build(red_levels: u16, green_levels: u16, blue_levels: u16) -> Self {
        let (rl, gl, bl) = (red_levels.max(1), green_levels.max(1), blue_levels.max(1));
        let reds = channel_values(rl);
        let greens = channel_values(gl);
        let blues = channel_values(bl);

        let mut colors = Vec::with_capacity(rl as usize * gl as usize * bl as usize);
        for &red in &reds {
            for &green in &greens {
                for &blue in &blues {
                    colors.push(pack(red, green, blue));
                }
            }
        }

        Self { levels: (rl, gl, bl), colors }
    }

    pub fn levels(&self) -> (u16, u16, u16) { self.levels }

    pub fn len(&self) -> usize { self.colors.len() }

    pub fn is_empty(&self) -> bool { self.colors.is_empty() }

    /// Packed `0xRRGGBB` color for an index
    pub fn get(&self, index: PaletteIndex) -> Option<u32> {
        self.colors.get(index as usize).copied()
    }

    pub fn rgb(&self, index: PaletteIndex) -> Option<Rgb888> {
        self.get(index).map(unpack)
    }

    pub fn as_slice(&self) -> &[u32] { &self.colors }
}

/// Channel intensities for `levels` steps of `ceil(255 / levels)`, saturated.
fn channel_values(levels: u16) -> Vec<u8> {
    let step = 255u32.div_ceil(levels as u32);
    (0..levels as u32)
        .map(|i| (i * step).min(255) as u8)
        .collect()
}

#[inline]
pub fn pack(red: u8, green: u8, blue: u8) -> u32 {
    (red as u32) << 16 | (green as u32) << 8 | blue as u32
}

#[inline]
pub fn unpack(color: u32) -> Rgb888 {
    Rgb888::new((color >> 16) as u8, (color >> 8) as u8, color as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::prelude::RgbColor;
    use proptest::prelude::*;

    #[test]
    fn test_six_level_channels() {
        assert_eq!(channel_values(6), vec![0, 43, 86, 129, 172, 215]);
        assert_eq!(channel_values(1), vec![0]);
        assert_eq!(channel_values(2), vec![0, 128]);
    }

    #[test]
    fn test_enumeration_order() {
        let palette = Palette::build(6, 6, 6);
        assert_eq!(palette.len(), 216);
        assert_eq!(palette.get(0), Some(0x000000));
        // blue innermost
        assert_eq!(palette.get(1), Some(0x00002B));
        // green next
        assert_eq!(palette.get(6), Some(0x002B00));
        // red outermost
        assert_eq!(palette.get(36), Some(0x2B0000));
        assert_eq!(palette.get(215), Some(0xD7D7D7));
        assert_eq!(palette.get(216), None);
    }

    #[test]
    fn test_rgb_unpacks() {
        let palette = Palette::build(6, 6, 6);
        let c = palette.rgb(36 + 6 + 1).unwrap();
        assert_eq!((c.r(), c.g(), c.b()), (43, 43, 43));
    }

    #[test]
    fn test_saturates_large_levels() {
        // 100 levels step by 3: the tail clamps to 255 instead of overflowing
        let values = channel_values(100);
        assert_eq!(values.len(), 100);
        assert_eq!(values[84], 252);
        assert!(values[85..].iter().all(|&v| v == 255));
    }

    proptest! {
        #[test]
        fn prop_length_and_range(r in 1u16..=12, g in 1u16..=12, b in 1u16..=12) {
            let palette = Palette::build(r, g, b);
            prop_assert_eq!(palette.len(), r as usize * g as usize * b as usize);
            for &color in palette.as_slice() {
                prop_assert!(color <= 0xFF_FF_FF);
            }
        }

        #[test]
        fn prop_index_maps_to_nested_levels(r in 1u16..=8, g in 1u16..=8, b in 1u16..=8) {
            let palette = Palette::build(r, g, b);
            let (reds, greens, blues) = (channel_values(r), channel_values(g), channel_values(b));
            for ri in 0..r as usize {
                for gi in 0..g as usize {
                    for bi in 0..b as usize {
                        let index = (ri * g as usize + gi) * b as usize + bi;
                        prop_assert_eq!(
                            palette.get(index as PaletteIndex),
                            Some(pack(reds[ri], greens[gi], blues[bi]))
                        );
                    }
                }
            }
        }
    }
}
