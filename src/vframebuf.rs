/*
 *  vframebuf.rs
 *
 *  ArtMatrix - the cover, in pixels
 *  (c) 2020-26 Stuart Hunter
 *
 *  Runtime-sized framebuffer for embedded-graphics
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

use core::convert::Infallible;
use embedded_graphics::geometry::{OriginDimensions, Size};
use embedded_graphics::pixelcolor::{PixelColor, Rgb888};
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PointsIter, Rectangle};

/// Framebuffer sized at runtime from the panel geometry, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct VarFrameBuf<C: PixelColor> {
    buf: Vec<C>,
    width: usize,
    height: usize,
}

impl<C: PixelColor> VarFrameBuf<C> {
    pub fn new(width: u32, height: u32, fill: C) -> Self {
        let (width, height) = (width as usize, height as usize);
        Self { buf: vec![fill; width * height], width, height }
    }

    pub fn width(&self) -> usize { self.width }
    pub fn height(&self) -> usize { self.height }

    pub fn as_slice(&self) -> &[C] { &self.buf }

    pub fn fill(&mut self, color: C) {
        self.buf.fill(color);
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<C> {
        self.index_of(Point::new(x as i32, y as i32)).map(|i| self.buf[i])
    }

    /// Linear index of an on-screen point
    #[inline]
    fn index_of(&self, p: Point) -> Option<usize> {
        let (x, y) = (usize::try_from(p.x).ok()?, usize::try_from(p.y).ok()?);
        (x < self.width && y < self.height).then(|| y * self.width + x)
    }
}

/// Pack pixels as RGB triplets, the layout matrix refresh daemons read.
/// Stops at whichever of `pixels` or `out` runs short.
pub fn pack_rgb(pixels: &[Rgb888], out: &mut [u8]) {
    for (dst, px) in out.chunks_exact_mut(3).zip(pixels) {
        dst[0] = px.r();
        dst[1] = px.g();
        dst[2] = px.b();
    }
}

impl<C: PixelColor> OriginDimensions for VarFrameBuf<C> {
    fn size(&self) -> Size {
        Size::new(self.width as u32, self.height as u32)
    }
}

impl<C: PixelColor> DrawTarget for VarFrameBuf<C> {
    type Color = C;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(p, c) in pixels {
            if let Some(i) = self.index_of(p) {
                self.buf[i] = c;
            }
        }
        Ok(())
    }

    fn fill_contiguous<I>(&mut self, area: &Rectangle, colors: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Self::Color>,
    {
        // colors run over the whole area; clip per pixel
        let pixels = area.points().zip(colors).map(|(p, c)| Pixel(p, c));
        self.draw_iter(pixels)
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.fill(color);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::primitives::PrimitiveStyle;

    #[test]
    fn test_clipped_fill() {
        let mut fb = VarFrameBuf::new(4, 4, Rgb888::BLACK);
        Rectangle::new(Point::new(2, 2), Size::new(4, 4))
            .into_styled(PrimitiveStyle::with_fill(Rgb888::RED))
            .draw(&mut fb)
            .unwrap();
        assert_eq!(fb.pixel(3, 3), Some(Rgb888::RED));
        assert_eq!(fb.pixel(1, 1), Some(Rgb888::BLACK));
        assert_eq!(fb.pixel(4, 0), None);
    }

    #[test]
    fn test_rgb_bytes() {
        let mut fb = VarFrameBuf::new(2, 1, Rgb888::BLACK);
        fb.draw_iter([Pixel(Point::new(1, 0), Rgb888::new(1, 2, 3))]).unwrap();
        let mut out = [0xAAu8; 6];
        pack_rgb(fb.as_slice(), &mut out);
        assert_eq!(out, [0, 0, 0, 1, 2, 3]);

        let mut short = [0xAAu8; 4];
        pack_rgb(fb.as_slice(), &mut short);
        assert_eq!(short, [0, 0, 0, 0xAA]);
    }
}
