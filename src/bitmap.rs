//! Four-channel 8-bit pixel grid shared by every pipeline stage.

use std::fmt;
use std::path::Path;

use image::{ImageBuffer, Rgba, RgbaImage};
use rayon::prelude::*;

use crate::error::{Result, TerrainError};

/// One of the four 8-bit channels of a pixel.
///
/// The pipeline gives them fixed roles: R carries the shape, G flags
/// background reached by a fill, B marks template terrain and A is visibility.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    R,
    G,
    B,
    A,
}

impl Channel {
    /// Byte offset of this channel inside a pixel.
    pub const fn index(self) -> usize {
        match self {
            Channel::R => 0,
            Channel::G => 1,
            Channel::B => 2,
            Channel::A => 3,
        }
    }
}

/// A rectangular RGBA buffer. Dimensions are fixed at creation.
#[derive(Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl Bitmap {
    /// Transparent black bitmap.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0; width * height * 4],
        }
    }

    /// Bitmap filled with one colour.
    pub fn new_with(width: usize, height: usize, rgba: [u8; 4]) -> Self {
        let mut data = Vec::with_capacity(width * height * 4);
        for _ in 0..width * height {
            data.extend_from_slice(&rgba);
        }
        Self { width, height, data }
    }

    /// Wrap a raw row-major RGBA buffer.
    pub fn from_rgba(width: usize, height: usize, data: Vec<u8>) -> Result<Self> {
        let expected = width * height * 4;
        if data.len() != expected {
            return Err(TerrainError::BufferSize {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { width, height, data })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Byte offset of the first channel of pixel (x, y).
    #[inline]
    fn offset(&self, x: usize, y: usize) -> usize {
        debug_assert!(x < self.width && y < self.height, "pixel ({x}, {y}) out of bounds");
        (y * self.width + x) * 4
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 4] {
        let i = self.offset(x, y);
        [self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]]
    }

    #[inline]
    pub fn set_pixel(&mut self, x: usize, y: usize, rgba: [u8; 4]) {
        let i = self.offset(x, y);
        self.data[i..i + 4].copy_from_slice(&rgba);
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize, channel: Channel) -> u8 {
        self.data[self.offset(x, y) + channel.index()]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, channel: Channel, value: u8) {
        let i = self.offset(x, y) + channel.index();
        self.data[i] = value;
    }

    /// Pixel at (x, y) with coordinates clamped to the nearest edge.
    #[inline]
    pub fn clamped_pixel(&self, x: isize, y: isize) -> [u8; 4] {
        let cx = x.clamp(0, self.width as isize - 1) as usize;
        let cy = y.clamp(0, self.height as isize - 1) as usize;
        self.pixel(cx, cy)
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    /// Iterate mutably over every pixel as a 4-byte slice.
    pub fn pixels_mut(&mut self) -> impl Iterator<Item = &mut [u8]> {
        self.data.chunks_exact_mut(4)
    }

    /// Parallel iterator over rows as `(y, row_bytes)`.
    pub fn par_rows_mut(&mut self) -> impl IndexedParallelIterator<Item = (usize, &mut [u8])> {
        let stride = self.width * 4;
        self.data.par_chunks_mut(stride.max(1)).enumerate()
    }

    /// Iterate over all pixels with their coordinates.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, [u8; 4])> + '_ {
        let width = self.width;
        self.data.chunks_exact(4).enumerate().map(move |(idx, px)| {
            (idx % width, idx / width, [px[0], px[1], px[2], px[3]])
        })
    }

    /// Number of pixels whose `channel` value satisfies `predicate`.
    pub fn count_where(&self, channel: Channel, predicate: impl Fn(u8) -> bool) -> usize {
        self.data
            .chunks_exact(4)
            .filter(|px| predicate(px[channel.index()]))
            .count()
    }

    /// Bitmap holding `channel` of this one in R, zero in G and B, opaque alpha.
    pub fn extract_channel(&self, channel: Channel) -> Bitmap {
        let mut out = Bitmap::new(self.width, self.height);
        for (dst, src) in out.data.chunks_exact_mut(4).zip(self.data.chunks_exact(4)) {
            dst[0] = src[channel.index()];
            dst[3] = 255;
        }
        out
    }

    pub fn to_image(&self) -> RgbaImage {
        ImageBuffer::from_fn(self.width as u32, self.height as u32, |x, y| {
            Rgba(self.pixel(x as usize, y as usize))
        })
    }

    pub fn from_image(img: &RgbaImage) -> Self {
        Self {
            width: img.width() as usize,
            height: img.height() as usize,
            data: img.as_raw().clone(),
        }
    }

    /// Write this bitmap as a PNG file.
    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<()> {
        self.to_image().save(path)?;
        Ok(())
    }
}

impl fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bitmap")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rgba_checks_length() {
        assert!(Bitmap::from_rgba(2, 2, vec![0; 16]).is_ok());
        let err = Bitmap::from_rgba(2, 2, vec![0; 15]).unwrap_err();
        assert!(matches!(err, TerrainError::BufferSize { expected: 16, actual: 15 }));
    }

    #[test]
    fn test_pixel_access() {
        let mut bmp = Bitmap::new(4, 3);
        bmp.set_pixel(3, 2, [1, 2, 3, 4]);
        bmp.set(0, 1, Channel::G, 200);
        assert_eq!(bmp.pixel(3, 2), [1, 2, 3, 4]);
        assert_eq!(bmp.get(0, 1, Channel::G), 200);
        assert_eq!(bmp.get(3, 2, Channel::A), 4);
        assert_eq!(bmp.count_where(Channel::R, |v| v > 0), 1);
    }

    #[test]
    fn test_clamped_pixel_replicates_edges() {
        let mut bmp = Bitmap::new(2, 2);
        bmp.set_pixel(0, 0, [9, 9, 9, 9]);
        assert_eq!(bmp.clamped_pixel(-5, -1), [9, 9, 9, 9]);
        assert_eq!(bmp.clamped_pixel(7, 0), bmp.pixel(1, 0));
    }

    #[test]
    fn test_extract_channel() {
        let mut bmp = Bitmap::new(2, 1);
        bmp.set_pixel(1, 0, [255, 0, 0, 128]);
        let alpha = bmp.extract_channel(Channel::A);
        assert_eq!(alpha.pixel(1, 0), [128, 0, 0, 255]);
        assert_eq!(alpha.pixel(0, 0), [0, 0, 0, 255]);
    }

    #[test]
    fn test_image_round_trip_keeps_pixels() {
        let mut bmp = Bitmap::new(3, 2);
        bmp.set_pixel(2, 1, [10, 20, 30, 40]);
        let back = Bitmap::from_image(&bmp.to_image());
        assert_eq!(back, bmp);
    }
}
