//! Frame decoding
//!
//! `ResourceLoader` turns a frame path into a displayable resource. The
//! engine is generic over it so hosts can plug in GPU textures, test doubles,
//! or anything else cheap to clone.

use log::debug;
use std::path::Path;
use std::sync::Arc;

use super::error::LoadError;

/// Decodes one frame file. Called on loader threads.
pub trait ResourceLoader: Send + Sync + 'static {
    type Resource: Clone + Send + 'static;

    fn load(&self, path: &Path) -> Result<Self::Resource, LoadError>;
}

impl<L: ResourceLoader> ResourceLoader for Arc<L> {
    type Resource = L::Resource;

    fn load(&self, path: &Path) -> Result<Self::Resource, LoadError> {
        (**self).load(path)
    }
}

/// Decoded RGBA8 frame. Clones share the pixel buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    pub width: u32,
    pub height: u32,
    pixels: Arc<Vec<u8>>,
}

impl Texture {
    /// Wrap an RGBA8 buffer of `width * height * 4` bytes
    pub fn from_rgba8(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(pixels.len(), width as usize * height as usize * 4);
        Self {
            width,
            height,
            pixels: Arc::new(pixels),
        }
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Width / height, 1.0 for degenerate sizes
    pub fn aspect(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }

    /// Memory size in bytes
    pub fn mem(&self) -> usize {
        self.pixels.len()
    }
}

/// Extensions handled by the `image` crate build used here
const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "tif", "tiff", "tga", "bmp"];

/// Decodes still frames with the `image` crate into RGBA8 textures.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageLoader;

impl ResourceLoader for ImageLoader {
    type Resource = Texture;

    fn load(&self, path: &Path) -> Result<Texture, LoadError> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_lowercase())
            .unwrap_or_default();

        if !SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
            return Err(LoadError::UnsupportedFormat(ext));
        }
        if !path.exists() {
            return Err(LoadError::NotFound(path.to_path_buf()));
        }

        debug!("Decoding frame: {}", path.display());
        let img = image::open(path).map_err(|e| LoadError::Decode(e.to_string()))?;
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();

        Ok(Texture::from_rgba8(width, height, rgba.into_raw()))
    }
}
