use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use image::{Rgba, RgbaImage};

/// Textures the rasterizer samples, cached by name.
pub struct TextureStore {
    textures: HashMap<String, RgbaImage>,
}

impl TextureStore {
    /// Create a new store with no cached textures.
    pub fn new() -> Self {
        Self {
            textures: HashMap::new(),
        }
    }

    /// Load a texture from a file path under `name`.
    ///
    /// If `name` is already loaded the cached image is kept and the file is
    /// not read.
    pub fn load<P: AsRef<Path>>(&mut self, name: &str, path: P) -> Result<()> {
        if self.textures.contains_key(name) {
            return Ok(());
        }

        let path = path.as_ref();
        let img = image::open(path)
            .with_context(|| format!("Failed to load texture {name:?} from {path:?}"))?
            .to_rgba8();

        log::debug!("Loaded texture {name:?} ({}x{})", img.width(), img.height());
        self.textures.insert(name.to_string(), img);
        Ok(())
    }

    /// Decode a texture from encoded bytes (useful for embedded assets).
    pub fn load_from_bytes(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        let img = image::load_from_memory(bytes)
            .with_context(|| format!("Failed to decode texture {name:?}"))?
            .to_rgba8();
        self.textures.insert(name.to_string(), img);
        Ok(())
    }

    /// Store an image directly, replacing any texture of the same name.
    pub fn insert(&mut self, name: impl Into<String>, img: RgbaImage) {
        self.textures.insert(name.into(), img);
    }

    pub fn get(&self, name: &str) -> Option<&RgbaImage> {
        self.textures.get(name)
    }

    pub fn has_texture(&self, name: &str) -> bool {
        self.textures.contains_key(name)
    }

    pub fn unload(&mut self, name: &str) {
        self.textures.remove(name);
    }

    pub fn clear(&mut self) {
        self.textures.clear();
    }

    /// Colour at normalised coordinates `(u, v)`, wrapping outside [0, 1).
    ///
    /// Unknown textures come back as a flat colour derived from the name.
    pub fn sample(&self, name: &str, u: f64, v: f64) -> Rgba<u8> {
        let Some(img) = self.textures.get(name) else {
            return placeholder_colour(name);
        };
        if img.width() == 0 || img.height() == 0 {
            return placeholder_colour(name);
        }

        let x = (u.rem_euclid(1.0) * img.width() as f64) as u32;
        let y = (v.rem_euclid(1.0) * img.height() as f64) as u32;
        *img.get_pixel(x.min(img.width() - 1), y.min(img.height() - 1))
    }
}

impl Default for TextureStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Opaque colour picked from an FNV-1a hash of `name`.
pub fn placeholder_colour(name: &str) -> Rgba<u8> {
    let mut h: u32 = 0x811c_9dc5;
    for b in name.bytes() {
        h ^= b as u32;
        h = h.wrapping_mul(0x0100_0193);
    }
    let [r, g, b, _] = h.to_le_bytes();
    Rgba([r | 0x40, g | 0x40, b | 0x40, 255])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sampling_wraps_and_falls_back() {
        let mut store = TextureStore::new();
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        img.put_pixel(1, 0, Rgba([0, 0, 255, 255]));
        store.insert("stripes", img);

        assert_eq!(store.sample("stripes", 0.25, 0.5), Rgba([255, 0, 0, 255]));
        assert_eq!(store.sample("stripes", 0.75, 0.5), Rgba([0, 0, 255, 255]));
        assert_eq!(store.sample("stripes", -0.25, 0.5), Rgba([0, 0, 255, 255]));
        assert_eq!(store.sample("stripes", 1.25, 0.5), Rgba([255, 0, 0, 255]));

        let missing = store.sample("nothing", 0.5, 0.5);
        assert_eq!(missing, placeholder_colour("nothing"));
        assert_eq!(missing[3], 255);
    }

    #[test]
    fn missing_files_report_the_texture_name() {
        let mut store = TextureStore::new();
        let err = store.load("brick", "/definitely/not/here.png").unwrap_err();
        assert!(format!("{err:#}").contains("brick"));
        assert!(!store.has_texture("brick"));
    }
}
