//! Texture content backed by decoded image data
//!
//! A [`Texture`] stands in for a GPU texture: it owns an opaque native id
//! that other objects (materials, render state) hold on to. Reloading must
//! keep that id stable, so the type swaps itself: a fresh texture is decoded
//! and only its pixels are adopted.

use std::cell::Cell;
use std::fmt;
use std::io::Read;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::content::error::ContentError;
use crate::content::key::{Capabilities, Content};
use crate::content::provider::ContentProvider;
use crate::content::reader::ContentReader;

/// Loaded image data ready for GPU upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    /// Raw RGBA pixel data
    pub data: Vec<u8>,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Number of color channels (always 4 for RGBA)
    pub channels: u8,
}

impl ImageData {
    /// Decode an encoded image held in memory
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ContentError> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| ContentError::invalid_data(format!("Failed to decode image: {}", e)))?;

        let rgba_img = img.to_rgba8();
        let (width, height) = rgba_img.dimensions();

        log::debug!("Decoded image {}x{}", width, height);

        Ok(Self {
            data: rgba_img.into_raw(),
            width,
            height,
            channels: 4,
        })
    }

    /// Create a solid color image
    pub fn solid_color(width: u32, height: u32, color: [u8; 4]) -> Self {
        let data = color.repeat(Self::pixel_count(width, height));

        Self {
            data,
            width,
            height,
            channels: 4,
        }
    }

    fn pixel_count(width: u32, height: u32) -> usize {
        width as usize * height as usize
    }

    /// Size of the pixel data in bytes
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }

    /// Whether both dimensions are powers of two
    pub fn is_power_of_two(&self) -> bool {
        self.width.is_power_of_two() && self.height.is_power_of_two()
    }
}

thread_local! {
    static LIVE_TEXTURES: Cell<usize> = const { Cell::new(0) };
}

/// Native texture handles allocated on this thread and not yet released
pub fn live_textures() -> usize {
    LIVE_TEXTURES.with(Cell::get)
}

/// Opaque native texture handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(u64);

impl TextureId {
    fn next() -> Self {
        static NEXT_TEXTURE_ID: AtomicU64 = AtomicU64::new(1);
        Self(NEXT_TEXTURE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw handle value
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TextureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Texture with a stable native id
#[derive(Debug)]
pub struct Texture {
    id: TextureId,
    image: ImageData,
    released: bool,
}

impl Texture {
    /// Allocate a texture for `image`
    pub fn new(image: ImageData) -> Self {
        LIVE_TEXTURES.with(|live| live.set(live.get() + 1));
        Self {
            id: TextureId::next(),
            image,
            released: false,
        }
    }

    /// Native id; unchanged by hot swaps
    pub fn id(&self) -> TextureId {
        self.id
    }

    /// Current pixels
    pub fn image(&self) -> &ImageData {
        &self.image
    }

    /// Whether the native handle has been released
    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl Content for Texture {
    fn capabilities() -> Capabilities {
        Capabilities::HOT_SWAP | Capabilities::DISPOSE
    }

    fn hot_swap(&mut self, mut replacement: Self) {
        log::debug!(
            "Texture {} adopts {}x{} pixels from {}",
            self.id,
            replacement.image.width,
            replacement.image.height,
            replacement.id
        );
        self.image = std::mem::replace(&mut replacement.image, ImageData::solid_color(0, 0, [0; 4]));
        replacement.dispose();
    }

    fn dispose(&mut self) {
        if self.released {
            return;
        }
        log::debug!("Releasing texture {}", self.id);
        self.image.data = Vec::new();
        self.released = true;
        LIVE_TEXTURES.with(|live| live.set(live.get().saturating_sub(1)));
    }
}

/// Decodes PNG streams into [`Texture`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct TextureReader;

impl ContentReader<Texture> for TextureReader {
    fn read(&self, stream: &mut dyn Read, _provider: &mut dyn ContentProvider) -> Result<Texture, ContentError> {
        let mut bytes = Vec::new();
        stream.read_to_end(&mut bytes)?;
        Ok(Texture::new(ImageData::from_bytes(&bytes)?))
    }
}

#[cfg(test)]
pub(crate) fn encode_png(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba(color));
    let mut bytes = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut bytes, image::ImageFormat::Png)
        .unwrap();
    bytes.into_inner()
}
