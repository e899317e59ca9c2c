//! The hq2x rule set.
//!
//! Each of the 256 neighbourhood patterns picks one rule per output sub-pixel.
//! Rules are written once for the top-left sub-pixel; the other three
//! sub-pixels use the same rules mirrored horizontally, vertically or both.

use std::sync::OnceLock;

use super::blend::Blend::{self, Center, Mix211, Mix233, Mix31, Mix521, Mix611};

/// Output choice for one sub-pixel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rule {
    /// Unconditional blend.
    Always(Blend),
    /// `edge` when neighbours `a` and `b` differ, `smooth` otherwise.
    OnEdge { a: u8, b: u8, edge: Blend, smooth: Blend },
}

impl Rule {
    fn remap(self, map: &[u8; 9]) -> Self {
        match self {
            Rule::Always(blend) => Rule::Always(blend.remap(map)),
            Rule::OnEdge { a, b, edge, smooth } => Rule::OnEdge {
                a: map[a as usize],
                b: map[b as usize],
                edge: edge.remap(map),
                smooth: smooth.remap(map),
            },
        }
    }
}

const fn on_edge(a: u8, b: u8, edge: Blend, smooth: Blend) -> Rule {
    Rule::OnEdge { a, b, edge, smooth }
}

/// Top-left rules. Neighbours: 0 1 2 / 3 4 5 / 6 7 8.
const ALPHABET: [Rule; 18] = [
    Rule::Always(Mix211(1, 3)),
    Rule::Always(Mix211(0, 3)),
    Rule::Always(Mix31(3)),
    Rule::Always(Mix211(0, 1)),
    Rule::Always(Mix31(1)),
    on_edge(1, 3, Mix31(3), Mix211(1, 3)),
    on_edge(1, 3, Center, Mix211(1, 3)),
    on_edge(1, 3, Mix31(3), Mix233(1, 3)),
    on_edge(1, 5, Mix31(3), Mix521(1, 3)),
    on_edge(1, 3, Center, Mix233(1, 3)),
    on_edge(1, 3, Mix31(0), Mix211(1, 3)),
    on_edge(1, 3, Mix31(0), Mix233(1, 3)),
    Rule::Always(Mix31(0)),
    on_edge(3, 7, Mix31(1), Mix521(3, 1)),
    on_edge(1, 3, Mix31(3), Mix611(1, 3)),
    on_edge(1, 3, Center, Mix31(3)),
    on_edge(1, 3, Mix31(0), Mix611(1, 3)),
    on_edge(1, 3, Center, Mix31(0)),
];

/// Neighbour permutations taking the top-left frame to each sub-pixel, in
/// order top-left, top-right, bottom-left, bottom-right.
const FRAMES: [[u8; 9]; 4] = [
    [0, 1, 2, 3, 4, 5, 6, 7, 8],
    [2, 1, 0, 5, 4, 3, 8, 7, 6],
    [6, 7, 8, 3, 4, 5, 0, 1, 2],
    [8, 7, 6, 5, 4, 3, 2, 1, 0],
];

/// Alphabet index per pattern and sub-pixel.
#[rustfmt::skip]
const CODES: [[u8; 4]; 256] = [
    [0, 0, 0, 0], [0, 0, 0, 0], [1, 1, 0, 0], [2, 1, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0], [1, 2, 0, 0], [2, 2, 0, 0],
    [3, 0, 3, 0], [4, 0, 3, 0], [5, 1, 3, 0], [6, 1, 3, 0], [3, 0, 3, 0], [4, 0, 3, 0], [7, 8, 3, 0], [9, 8, 3, 0],
    [0, 3, 0, 3], [0, 3, 0, 3], [1, 10, 0, 3], [8, 11, 0, 3], [0, 4, 0, 3], [0, 4, 0, 3], [1, 6, 0, 3], [8, 9, 0, 3],
    [3, 3, 3, 3], [4, 3, 3, 3], [6, 6, 3, 3], [6, 12, 3, 3], [3, 4, 3, 3], [4, 4, 3, 3], [2, 6, 3, 3], [6, 6, 3, 3],
    [0, 0, 0, 0], [0, 0, 0, 0], [1, 1, 0, 0], [2, 1, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0], [1, 2, 0, 0], [2, 2, 0, 0],
    [3, 0, 4, 0], [4, 0, 4, 0], [7, 1, 13, 0], [9, 1, 13, 0], [3, 0, 4, 0], [4, 0, 4, 0], [14, 2, 4, 0], [15, 2, 4, 0],
    [0, 3, 0, 3], [0, 3, 0, 3], [1, 10, 0, 3], [8, 11, 0, 3], [0, 4, 0, 3], [0, 4, 0, 3], [1, 6, 0, 3], [8, 9, 0, 3],
    [3, 3, 4, 3], [4, 3, 4, 3], [14, 16, 4, 3], [6, 16, 4, 3], [3, 4, 4, 3], [4, 4, 4, 3], [2, 6, 4, 3], [15, 6, 4, 3],
    [0, 0, 1, 1], [0, 0, 1, 1], [1, 1, 1, 1], [2, 1, 1, 1], [0, 0, 1, 1], [0, 0, 1, 1], [1, 2, 1, 1], [2, 2, 1, 1],
    [3, 0, 10, 1], [13, 0, 11, 1], [6, 1, 6, 1], [6, 1, 12, 1], [3, 0, 10, 1], [13, 0, 11, 1], [14, 2, 16, 1], [6, 2, 16, 1],
    [0, 3, 1, 10], [0, 3, 1, 10], [1, 6, 1, 6], [2, 16, 1, 16], [0, 13, 1, 11], [0, 13, 1, 11], [1, 6, 1, 12], [2, 6, 1, 16],
    [3, 3, 6, 6], [4, 3, 16, 16], [14, 16, 16, 16], [6, 16, 16, 16], [3, 4, 16, 16], [4, 4, 16, 16], [14, 6, 16, 16], [6, 6, 12, 12],
    [0, 0, 2, 1], [0, 0, 2, 1], [1, 1, 2, 1], [2, 1, 2, 1], [0, 0, 2, 1], [0, 0, 2, 1], [1, 2, 2, 1], [2, 2, 2, 1],
    [3, 0, 6, 1], [13, 0, 9, 1], [2, 1, 6, 1], [6, 1, 6, 1], [3, 0, 6, 1], [13, 0, 9, 1], [2, 2, 6, 1], [15, 2, 6, 1],
    [0, 3, 8, 11], [0, 3, 8, 11], [1, 16, 2, 16], [2, 16, 2, 16], [0, 4, 2, 16], [0, 4, 2, 16], [1, 6, 2, 12], [8, 9, 2, 12],
    [3, 3, 6, 12], [4, 3, 6, 16], [14, 16, 6, 16], [6, 12, 6, 12], [3, 4, 6, 12], [13, 4, 9, 12], [2, 6, 6, 12], [15, 6, 6, 12],
    [0, 0, 0, 0], [0, 0, 0, 0], [1, 1, 0, 0], [2, 1, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0], [1, 2, 0, 0], [2, 2, 0, 0],
    [3, 0, 3, 0], [4, 0, 3, 0], [5, 1, 3, 0], [6, 1, 3, 0], [3, 0, 3, 0], [4, 0, 3, 0], [7, 8, 3, 0], [9, 8, 3, 0],
    [0, 3, 0, 4], [0, 3, 0, 4], [1, 11, 0, 13], [2, 16, 0, 4], [0, 4, 0, 4], [0, 4, 0, 4], [1, 9, 0, 13], [2, 17, 0, 4],
    [3, 3, 3, 4], [4, 3, 3, 4], [14, 16, 3, 4], [6, 12, 3, 4], [3, 4, 3, 4], [4, 4, 3, 4], [14, 6, 3, 4], [6, 17, 3, 4],
    [0, 0, 0, 0], [0, 0, 0, 0], [1, 1, 0, 0], [2, 1, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0], [1, 2, 0, 0], [2, 2, 0, 0],
    [3, 0, 4, 0], [4, 0, 4, 0], [7, 1, 13, 0], [9, 1, 13, 0], [3, 0, 4, 0], [4, 0, 4, 0], [14, 2, 4, 0], [15, 2, 4, 0],
    [0, 3, 0, 4], [0, 3, 0, 4], [1, 11, 0, 13], [2, 16, 0, 4], [0, 4, 0, 4], [0, 4, 0, 4], [1, 9, 0, 13], [2, 17, 0, 4],
    [3, 3, 4, 4], [4, 3, 4, 4], [14, 16, 4, 4], [9, 12, 13, 4], [3, 4, 4, 4], [4, 4, 4, 4], [2, 9, 4, 13], [15, 17, 4, 4],
    [0, 0, 1, 2], [0, 0, 1, 2], [1, 1, 1, 2], [2, 1, 1, 2], [0, 0, 1, 2], [0, 0, 1, 2], [1, 2, 1, 2], [2, 2, 1, 2],
    [3, 0, 11, 8], [4, 0, 16, 2], [14, 1, 16, 2], [6, 1, 12, 2], [3, 0, 11, 8], [4, 0, 16, 2], [14, 2, 16, 2], [9, 8, 12, 2],
    [0, 3, 1, 6], [0, 3, 1, 6], [1, 12, 1, 6], [2, 12, 1, 6], [0, 13, 1, 9], [0, 13, 1, 9], [1, 6, 1, 6], [2, 17, 1, 6],
    [3, 3, 12, 6], [4, 3, 12, 6], [14, 16, 16, 6], [6, 12, 12, 6], [3, 4, 16, 6], [4, 13, 12, 9], [2, 6, 12, 6], [6, 17, 12, 6],
    [0, 0, 2, 2], [0, 0, 2, 2], [1, 1, 2, 2], [2, 1, 2, 2], [0, 0, 2, 2], [0, 0, 2, 2], [1, 2, 2, 2], [2, 2, 2, 2],
    [3, 0, 9, 8], [4, 0, 17, 2], [14, 1, 6, 2], [6, 1, 17, 2], [3, 0, 9, 8], [4, 0, 17, 2], [2, 2, 9, 8], [15, 2, 17, 2],
    [0, 3, 8, 9], [0, 3, 8, 9], [1, 16, 2, 6], [2, 12, 8, 9], [0, 4, 2, 17], [0, 4, 2, 17], [1, 6, 2, 17], [2, 17, 2, 17],
    [3, 3, 6, 6], [4, 3, 17, 6], [2, 12, 6, 6], [6, 12, 17, 6], [3, 4, 6, 17], [4, 4, 17, 17], [2, 6, 6, 17], [15, 17, 17, 17],
];

/// Rules for every pattern, expanded on first use.
pub fn rule_table() -> &'static [[Rule; 4]; 256] {
    static TABLE: OnceLock<[[Rule; 4]; 256]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = [[Rule::Always(Center); 4]; 256];
        for (pattern, codes) in CODES.iter().enumerate() {
            for (sub, &code) in codes.iter().enumerate() {
                table[pattern][sub] = ALPHABET[code as usize].remap(&FRAMES[sub]);
            }
        }
        table
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_in_alphabet() {
        assert!(CODES.iter().flatten().all(|&c| (c as usize) < ALPHABET.len()));
    }

    #[test]
    fn test_flat_pattern_blends_toward_edges() {
        let table = rule_table();
        assert_eq!(table[0][0], Rule::Always(Mix211(1, 3)));
        assert_eq!(table[0][1], Rule::Always(Mix211(1, 5)));
        assert_eq!(table[0][2], Rule::Always(Mix211(7, 3)));
        assert_eq!(table[0][3], Rule::Always(Mix211(7, 5)));
    }

    #[test]
    fn test_full_pattern_checks_every_corner() {
        let table = rule_table();
        assert_eq!(table[255][0], on_edge(1, 3, Center, Mix31(3)));
        assert_eq!(table[255][1], on_edge(1, 5, Center, Mix31(2)));
        assert_eq!(table[255][2], on_edge(7, 3, Center, Mix31(6)));
        assert_eq!(table[255][3], on_edge(7, 5, Center, Mix31(8)));
    }

    #[test]
    fn test_frames_are_involutions() {
        for frame in FRAMES {
            for i in 0..9 {
                assert_eq!(frame[frame[i] as usize] as usize, i);
            }
            assert_eq!(frame[4], 4);
        }
    }
}
