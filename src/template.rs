//! Terrain-type templates: the low-resolution bitmap a terrain grows from.
//!
//! Red marks the solid core of the terrain, blue marks zones where background
//! must not be seeded, and black is open space that noise may turn into
//! terrain.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::imageops::{self, FilterType};
use parking_lot::RwLock;

use crate::bitmap::{Bitmap, Channel};
use crate::error::Result;

/// Red/blue cut between "set" and "clear" template pixels.
const POINT_THRESHOLD: u8 = 100;

/// A template bitmap and the fill seeds derived from it.
#[derive(Debug, Clone)]
pub struct TerrainTemplate {
    bitmap: Bitmap,
    foreground: Vec<(usize, usize)>,
    background: Vec<(usize, usize)>,
}

impl TerrainTemplate {
    pub fn from_bitmap(bitmap: Bitmap) -> Self {
        let (foreground, background) = template_points(&bitmap);
        Self {
            bitmap,
            foreground,
            background,
        }
    }

    /// Load an image file and scale it to `width` x `height` with nearest-neighbour sampling.
    pub fn load(path: impl AsRef<Path>, width: usize, height: usize) -> Result<Self> {
        let path = path.as_ref();
        let mut image = image::open(path)?.to_rgba8();
        if image.dimensions() != (width as u32, height as u32) {
            image = imageops::resize(&image, width as u32, height as u32, FilterType::Nearest);
        }
        tracing::debug!(target: "terrain_shaper::template", path = %path.display(), width, height, "template loaded");
        Ok(Self::from_bitmap(Bitmap::from_image(&image)))
    }

    pub fn bitmap(&self) -> &Bitmap {
        &self.bitmap
    }

    pub fn dimensions(&self) -> (usize, usize) {
        self.bitmap.dimensions()
    }

    /// Open pixels touching the template core.
    pub fn foreground_points(&self) -> &[(usize, usize)] {
        &self.foreground
    }

    /// Open, unmarked pixels on the image border.
    pub fn background_points(&self) -> &[(usize, usize)] {
        &self.background
    }
}

/// Scan column by column. A pixel with red below the threshold is a foreground
/// point when a 4-neighbour's red is above it, otherwise a background point
/// when its blue is also below and it lies on the border.
fn template_points(bitmap: &Bitmap) -> (Vec<(usize, usize)>, Vec<(usize, usize)>) {
    let (w, h) = bitmap.dimensions();
    let red = |x: usize, y: usize| bitmap.get(x, y, Channel::R);
    let mut foreground = Vec::new();
    let mut background = Vec::new();

    for x in 0..w {
        for y in 0..h {
            if red(x, y) >= POINT_THRESHOLD {
                continue;
            }
            let touches_core = (x > 0 && red(x - 1, y) > POINT_THRESHOLD)
                || (x + 1 < w && red(x + 1, y) > POINT_THRESHOLD)
                || (y + 1 < h && red(x, y + 1) > POINT_THRESHOLD)
                || (y > 0 && red(x, y - 1) > POINT_THRESHOLD);
            if touches_core {
                foreground.push((x, y));
            } else if bitmap.get(x, y, Channel::B) < POINT_THRESHOLD
                && (x == 0 || y == 0 || x == w - 1 || y == h - 1)
            {
                background.push((x, y));
            }
        }
    }
    (foreground, background)
}

type TemplateKey = (PathBuf, usize, usize);

/// Process-wide cache of loaded templates, keyed by path and size.
#[derive(Default)]
pub struct TemplateCache {
    entries: RwLock<HashMap<TemplateKey, Arc<TerrainTemplate>>>,
}

impl TemplateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached template for `path` at `width` x `height`, loading it on a miss.
    pub fn get_or_load(&self, path: impl AsRef<Path>, width: usize, height: usize) -> Result<Arc<TerrainTemplate>> {
        let key = (path.as_ref().to_path_buf(), width, height);
        if let Some(found) = self.entries.read().get(&key) {
            return Ok(Arc::clone(found));
        }
        let loaded = Arc::new(TerrainTemplate::load(&key.0, width, height)?);
        let mut entries = self.entries.write();
        // another thread may have loaded it meanwhile; keep the first copy
        let entry = entries.entry(key).or_insert(loaded);
        Ok(Arc::clone(entry))
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CORE: [u8; 4] = [255, 255, 255, 255];
    const OPEN: [u8; 4] = [0, 0, 0, 255];
    const WATER: [u8; 4] = [0, 0, 255, 255];

    #[test]
    fn test_points_around_core() {
        let mut bmp = Bitmap::new_with(5, 4, OPEN);
        bmp.set_pixel(2, 1, CORE);
        let t = TerrainTemplate::from_bitmap(bmp);
        assert_eq!(t.foreground_points(), &[(1, 1), (2, 0), (2, 2), (3, 1)]);
        // every open border pixel except (2, 0), which is foreground
        assert_eq!(t.background_points().len(), 14 - 1);
        assert_eq!(t.background_points()[0], (0, 0));
        assert!(!t.background_points().contains(&(2, 0)));
    }

    #[test]
    fn test_blue_border_not_background() {
        let mut bmp = Bitmap::new_with(4, 4, OPEN);
        for x in 0..4 {
            bmp.set_pixel(x, 3, WATER);
        }
        let t = TerrainTemplate::from_bitmap(bmp);
        assert!(t.foreground_points().is_empty());
        assert!(t.background_points().iter().all(|&(_, y)| y != 3));
        assert_eq!(t.background_points().len(), 12 - 4);
    }

    #[test]
    fn test_load_scales_nearest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("template.png");
        let mut bmp = Bitmap::new_with(4, 2, OPEN);
        bmp.set_pixel(3, 1, CORE);
        bmp.save_png(&path).unwrap();

        let t = TerrainTemplate::load(&path, 8, 4).unwrap();
        assert_eq!(t.dimensions(), (8, 4));
        assert_eq!(t.bitmap().pixel(7, 3), CORE);
        assert_eq!(t.bitmap().pixel(6, 2), CORE);
        assert_eq!(t.bitmap().pixel(5, 3), OPEN);
        assert_eq!(t.bitmap().count_where(Channel::R, |v| v == 255), 4);
    }

    #[test]
    fn test_cache_shares_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.png");
        Bitmap::new_with(4, 4, OPEN).save_png(&path).unwrap();

        let cache = TemplateCache::new();
        let a = cache.get_or_load(&path, 4, 4).unwrap();
        let b = cache.get_or_load(&path, 4, 4).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        let c = cache.get_or_load(&path, 8, 8).unwrap();
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(cache.len(), 2);

        assert!(cache.get_or_load(dir.path().join("missing.png"), 4, 4).is_err());
        assert_eq!(cache.len(), 2);
    }
}
