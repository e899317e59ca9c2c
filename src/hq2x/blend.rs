//! Fixed-point colour blends used by the hq2x rules.
//!
//! Colours are packed `0xAABBGGRR`. The middle byte and the outer pair of
//! bytes are blended in separate masked lanes so a single integer multiply
//! handles two channels at once. Alpha always comes from the centre colour.

const MASK_2: u32 = 0x0000_FF00;
const MASK_13: u32 = 0x00FF_00FF;
const MASK_ALPHA: u32 = 0xFF00_0000;

/// Index of the centre pixel in a 3x3 neighbourhood.
pub const CENTER: u8 = 4;

/// How one output sub-pixel is derived from the 3x3 neighbourhood.
///
/// Neighbour indices are row-major 0..9 with the centre at 4. Every blend
/// weights the centre first; the name lists the weights in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Blend {
    /// The centre colour unchanged.
    Center,
    /// 3:1 with one neighbour.
    Mix31(u8),
    /// 2:1:1 with two neighbours.
    Mix211(u8, u8),
    /// 7:1 with one neighbour.
    Mix71(u8),
    /// 2:7:7 with two neighbours.
    Mix277(u8, u8),
    /// 1:1 with one neighbour.
    Mix11(u8),
    /// 5:2:1 with two neighbours.
    Mix521(u8, u8),
    /// 6:1:1 with two neighbours.
    Mix611(u8, u8),
    /// 5:3 with one neighbour.
    Mix53(u8),
    /// 2:3:3 with two neighbours.
    Mix233(u8, u8),
    /// 14:1:1 with two neighbours.
    Mix1411(u8, u8),
}

impl Blend {
    /// Compute the blended colour for neighbourhood `w`.
    pub fn apply(self, w: &[u32; 9]) -> u32 {
        let c = w[CENTER as usize];
        let n = |i: u8| w[i as usize];
        match self {
            Blend::Center => c,
            Blend::Mix31(a) => mix2(c, n(a), 3, 1, 2),
            Blend::Mix211(a, b) => mix3(c, n(a), n(b), 2, 1, 1, 2),
            Blend::Mix71(a) => mix2(c, n(a), 7, 1, 3),
            Blend::Mix277(a, b) => mix3(c, n(a), n(b), 2, 7, 7, 4),
            Blend::Mix11(a) => mix2(c, n(a), 1, 1, 1),
            Blend::Mix521(a, b) => mix3(c, n(a), n(b), 5, 2, 1, 3),
            Blend::Mix611(a, b) => mix3(c, n(a), n(b), 6, 1, 1, 3),
            Blend::Mix53(a) => mix2(c, n(a), 5, 3, 3),
            Blend::Mix233(a, b) => mix3(c, n(a), n(b), 2, 3, 3, 3),
            Blend::Mix1411(a, b) => mix3(c, n(a), n(b), 14, 1, 1, 4),
        }
    }

    /// Same blend with every neighbour index passed through `map`.
    pub fn remap(self, map: &[u8; 9]) -> Self {
        let m = |i: u8| map[i as usize];
        match self {
            Blend::Center => Blend::Center,
            Blend::Mix31(a) => Blend::Mix31(m(a)),
            Blend::Mix211(a, b) => Blend::Mix211(m(a), m(b)),
            Blend::Mix71(a) => Blend::Mix71(m(a)),
            Blend::Mix277(a, b) => Blend::Mix277(m(a), m(b)),
            Blend::Mix11(a) => Blend::Mix11(m(a)),
            Blend::Mix521(a, b) => Blend::Mix521(m(a), m(b)),
            Blend::Mix611(a, b) => Blend::Mix611(m(a), m(b)),
            Blend::Mix53(a) => Blend::Mix53(m(a)),
            Blend::Mix233(a, b) => Blend::Mix233(m(a), m(b)),
            Blend::Mix1411(a, b) => Blend::Mix1411(m(a), m(b)),
        }
    }
}

#[inline]
fn lanes(sum2: u32, sum13: u32, shift: u32, c1: u32) -> u32 {
    (((sum2 >> shift) & MASK_2) + ((sum13 >> shift) & MASK_13)) | (c1 & MASK_ALPHA)
}

/// `(c1 * w1 + c2 * w2) >> shift`, or `c1` when both colours are equal.
#[inline]
fn mix2(c1: u32, c2: u32, w1: u32, w2: u32, shift: u32) -> u32 {
    if c1 == c2 {
        return c1;
    }
    lanes(
        (c1 & MASK_2) * w1 + (c2 & MASK_2) * w2,
        (c1 & MASK_13) * w1 + (c2 & MASK_13) * w2,
        shift,
        c1,
    )
}

#[inline]
fn mix3(c1: u32, c2: u32, c3: u32, w1: u32, w2: u32, w3: u32, shift: u32) -> u32 {
    lanes(
        (c1 & MASK_2) * w1 + (c2 & MASK_2) * w2 + (c3 & MASK_2) * w3,
        (c1 & MASK_13) * w1 + (c2 & MASK_13) * w2 + (c3 & MASK_13) * w3,
        shift,
        c1,
    )
}
