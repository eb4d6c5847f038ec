//! Raster pixel tweak
//!
//! Nudges one pixel away from the border by +1/-1/+1 on red/green/blue (+1 on
//! gray) in the source bit depth and re-encodes in the source format. Float
//! images are not touched. Requires the `images` feature.

#[cfg(feature = "images")]
use image::{DynamicImage, GenericImageView, ImageFormat};
use rand::Rng;

use crate::error::{Error, Result};

/// Images with a side at or below this are left alone
pub const MIN_SIDE: u32 = 5;

/// Minimum distance of the tweaked pixel from every edge
pub const EDGE_MARGIN: u32 = 2;

/// File-name suffix of stretchable images
pub const STRETCHABLE_SUFFIX: &str = ".9.png";

/// Where and how a pixel was changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelTweak {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Color channels after the tweak, in source depth; alpha excluded
    pub channels: Vec<u32>,
}

impl PixelTweak {
    pub fn describe(&self) -> String {
        let channels: Vec<String> = self.channels.iter().map(u32::to_string).collect();
        format!(
            "({},{}) of (w:{},h:{}) px:({})",
            self.x,
            self.y,
            self.width,
            self.height,
            channels.join(",")
        )
    }
}

/// Result of a pixel tweak attempt
#[derive(Debug, Clone)]
pub enum ImageOutcome {
    Tweaked { bytes: Vec<u8>, tweak: PixelTweak },
    /// Too small or stretchable; bytes pass through
    Skipped(&'static str),
}

pub fn is_stretchable(path: &str) -> bool {
    path.to_ascii_lowercase().ends_with(STRETCHABLE_SUFFIX)
}

/// Integer sample type that can move by one unit
#[cfg_attr(not(feature = "images"), allow(dead_code))]
trait Channel: Copy + Into<u32> {
    fn up(self) -> Self;
    fn down(self) -> Self;
}

impl Channel for u8 {
    fn up(self) -> Self {
        self.saturating_add(1)
    }
    fn down(self) -> Self {
        self.saturating_sub(1)
    }
}

impl Channel for u16 {
    fn up(self) -> Self {
        self.saturating_add(1)
    }
    fn down(self) -> Self {
        self.saturating_sub(1)
    }
}

/// +1/-1/+1 on red/green/blue, +1 on gray; alpha untouched
///
/// Returns the color channels after the change.
#[cfg_attr(not(feature = "images"), allow(dead_code))]
fn nudge<T: Channel>(channels: &mut [T]) -> Vec<u32> {
    let color = if channels.len() >= 3 { 3 } else { 1 };
    channels[0] = channels[0].up();
    if color == 3 {
        channels[1] = channels[1].down();
        channels[2] = channels[2].up();
    }
    channels[..color].iter().map(|&c| c.into()).collect()
}

/// Tweak one pseudo-random pixel of an encoded image
#[cfg(feature = "images")]
pub fn tweak_pixel<R: Rng>(path: &str, bytes: &[u8], rng: &mut R) -> Result<ImageOutcome> {
    if is_stretchable(path) {
        return Ok(ImageOutcome::Skipped("stretchable image"));
    }

    let format = image::guess_format(bytes).map_err(|e| Error::mutation("image", e.to_string()))?;
    let decoded = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| Error::mutation("image", e.to_string()))?;

    let (width, height) = decoded.dimensions();
    if width <= MIN_SIDE || height <= MIN_SIDE {
        return Ok(ImageOutcome::Skipped("image too small"));
    }

    let x = rng.random_range(EDGE_MARGIN..=width - 1 - EDGE_MARGIN);
    let y = rng.random_range(EDGE_MARGIN..=height - 1 - EDGE_MARGIN);

    let mut working = decoded;
    let channels = match working {
        DynamicImage::ImageLuma8(ref mut buf) => nudge(&mut buf.get_pixel_mut(x, y).0),
        DynamicImage::ImageLumaA8(ref mut buf) => nudge(&mut buf.get_pixel_mut(x, y).0),
        DynamicImage::ImageRgb8(ref mut buf) => nudge(&mut buf.get_pixel_mut(x, y).0),
        DynamicImage::ImageRgba8(ref mut buf) => nudge(&mut buf.get_pixel_mut(x, y).0),
        DynamicImage::ImageLuma16(ref mut buf) => nudge(&mut buf.get_pixel_mut(x, y).0),
        DynamicImage::ImageLumaA16(ref mut buf) => nudge(&mut buf.get_pixel_mut(x, y).0),
        DynamicImage::ImageRgb16(ref mut buf) => nudge(&mut buf.get_pixel_mut(x, y).0),
        DynamicImage::ImageRgba16(ref mut buf) => nudge(&mut buf.get_pixel_mut(x, y).0),
        ref other => {
            return Err(Error::mutation(
                "image",
                format!("unsupported pixel layout {:?}", other.color()),
            ))
        }
    };

    let mut out = std::io::Cursor::new(Vec::with_capacity(bytes.len()));
    working
        .write_to(&mut out, format)
        .map_err(|e| Error::mutation("image", format!("encode {:?}: {}", format, e)))?;

    Ok(ImageOutcome::Tweaked {
        bytes: out.into_inner(),
        tweak: PixelTweak {
            x,
            y,
            width,
            height,
            channels,
        },
    })
}

/// Stub for when the `images` feature is not enabled
#[cfg(not(feature = "images"))]
pub fn tweak_pixel<R: Rng>(
    path: &str,
    _bytes: &[u8],
    _rng: &mut R,
) -> Result<ImageOutcome> {
    if is_stretchable(path) {
        return Ok(ImageOutcome::Skipped("stretchable image"));
    }
    Err(Error::mutation(
        "image",
        "images feature not enabled - add `images` feature to Cargo.toml",
    ))
}
