//! Scanline flood fill over the red plane of a bitmap.

use crate::bitmap::{Bitmap, Channel};

/// Fill every region reachable from `seeds` whose red value is below `threshold`.
///
/// Filled pixels get R = 255 and `channel` = 255, so a second fill over the same
/// area finds nothing to do. Seeds outside the bitmap or already at or above
/// the threshold are skipped. Returns the number of pixels filled.
pub fn flood_fill(bitmap: &mut Bitmap, seeds: &[(usize, usize)], channel: Channel, threshold: u8) -> usize {
    let (w, h) = bitmap.dimensions();
    let open = |bmp: &Bitmap, x: usize, y: usize| bmp.get(x, y, Channel::R) < threshold;

    let mut stack: Vec<(usize, usize)> = seeds
        .iter()
        .copied()
        .filter(|&(x, y)| x < w && y < h)
        .collect();
    let mut filled = 0;

    while let Some((x, y)) = stack.pop() {
        if !open(bitmap, x, y) {
            continue;
        }

        let mut x1 = x;
        while x1 > 0 && open(bitmap, x1 - 1, y) {
            x1 -= 1;
        }

        let mut span_above = false;
        let mut span_below = false;
        while x1 < w && open(bitmap, x1, y) {
            bitmap.set(x1, y, Channel::R, 255);
            bitmap.set(x1, y, channel, 255);
            filled += 1;

            if y > 0 {
                let above = open(bitmap, x1, y - 1);
                if !span_above && above {
                    stack.push((x1, y - 1));
                    span_above = true;
                } else if span_above && !above {
                    span_above = false;
                }
            }
            if y + 1 < h {
                let below = open(bitmap, x1, y + 1);
                if !span_below && below {
                    stack.push((x1, y + 1));
                    span_below = true;
                } else if span_below && !below {
                    span_below = false;
                }
            }
            x1 += 1;
        }
    }

    filled
}
