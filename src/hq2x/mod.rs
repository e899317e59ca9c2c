//! hq2x edge-directed 2x upscaler
//!
//! Each source pixel becomes a 2x2 block. The eight neighbours are compared to
//! the centre in YUV space; the resulting 8-bit pattern selects a rule per
//! sub-pixel from the table in [`rules`].

pub mod blend;
pub mod rules;

use rayon::prelude::*;

pub use blend::Blend;
pub use rules::{rule_table, Rule};

use crate::bitmap::Bitmap;
use crate::error::Result;

const THRESHOLD_Y: i32 = 48;
const THRESHOLD_U: i32 = 7;
const THRESHOLD_V: i32 = 6;

/// Luma and chroma of a packed colour, truncated to integers.
///
/// Byte 2 of the packed value takes the red weights and byte 0 the blue ones.
pub fn yuv(c: u32) -> (i32, i32, i32) {
    let c2 = f64::from((c >> 16) & 0xFF);
    let c1 = f64::from((c >> 8) & 0xFF);
    let c0 = f64::from(c & 0xFF);
    let y = 0.299 * c2 + 0.587 * c1 + 0.114 * c0;
    let u = -0.169 * c2 - 0.331 * c1 + 0.5 * c0 + 128.0;
    let v = 0.5 * c2 - 0.419 * c1 - 0.081 * c0 + 128.0;
    (y as i32, u as i32, v as i32)
}

/// Whether two colours are perceptually distinct.
pub fn diff(a: u32, b: u32) -> bool {
    let (y1, u1, v1) = yuv(a);
    let (y2, u2, v2) = yuv(b);
    (y1 - y2).abs() > THRESHOLD_Y || (u1 - u2).abs() > THRESHOLD_U || (v1 - v2).abs() > THRESHOLD_V
}

impl Rule {
    /// Colour this rule produces for neighbourhood `w`.
    pub fn resolve(&self, w: &[u32; 9]) -> u32 {
        match *self {
            Rule::Always(blend) => blend.apply(w),
            Rule::OnEdge { a, b, edge, smooth } => {
                if diff(w[a as usize], w[b as usize]) {
                    edge.apply(w)
                } else {
                    smooth.apply(w)
                }
            }
        }
    }
}

/// Neighbour pattern: bit k set when neighbour k (skipping the centre) differs.
fn pattern(w: &[u32; 9]) -> usize {
    let center = w[4];
    let (yc, uc, vc) = yuv(center);
    let mut pattern = 0;
    let neighbours = w.iter().enumerate().filter(|(i, _)| *i != 4).map(|(_, &c)| c);
    for (bit, c) in neighbours.enumerate() {
        if c == center {
            continue;
        }
        let (y, u, v) = yuv(c);
        if (yc - y).abs() > THRESHOLD_Y || (uc - u).abs() > THRESHOLD_U || (vc - v).abs() > THRESHOLD_V {
            pattern |= 1 << bit;
        }
    }
    pattern
}

/// Double both dimensions of `bitmap` with hq2x.
pub fn upscale(bitmap: &Bitmap) -> Result<Bitmap> {
    let (width, height) = bitmap.dimensions();
    let src: Vec<u32> = bitmap
        .as_raw()
        .chunks_exact(4)
        .map(|px| u32::from_le_bytes([px[0], px[1], px[2], px[3]]))
        .collect();
    let table = rule_table();

    let out_width = width * 2;
    let mut dest = vec![0u32; out_width * height * 2];
    if width > 0 {
        dest.par_chunks_mut(out_width * 2).enumerate().for_each(|(y, rows)| {
            let up = y.saturating_sub(1);
            let down = (y + 1).min(height - 1);
            let (top, bottom) = rows.split_at_mut(out_width);
            for x in 0..width {
                let left = x.saturating_sub(1);
                let right = (x + 1).min(width - 1);
                let w = [
                    src[up * width + left],
                    src[up * width + x],
                    src[up * width + right],
                    src[y * width + left],
                    src[y * width + x],
                    src[y * width + right],
                    src[down * width + left],
                    src[down * width + x],
                    src[down * width + right],
                ];
                let rules = &table[pattern(&w)];
                top[2 * x] = rules[0].resolve(&w);
                top[2 * x + 1] = rules[1].resolve(&w);
                bottom[2 * x] = rules[2].resolve(&w);
                bottom[2 * x + 1] = rules[3].resolve(&w);
            }
        });
    }

    let bytes = dest.iter().flat_map(|c| c.to_le_bytes()).collect();
    Bitmap::from_rgba(out_width, height * 2, bytes)
}

/// Move red into alpha and paint every pixel pure red.
pub fn black_to_alpha(bitmap: &mut Bitmap) {
    for px in bitmap.pixels_mut() {
        px[3] = px[0];
        px[0] = 255;
        px[1] = 0;
        px[2] = 0;
    }
}
