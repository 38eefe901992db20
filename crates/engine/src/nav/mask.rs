use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat, ImageReader};
use thiserror::Error;

use crate::geometry::Vec2;

/// Spacing of the samples taken along a movement segment. Half a pixel keeps
/// a one-pixel column from falling between two samples.
pub const SEGMENT_SAMPLE_SPACING_PX: f32 = 0.5;

#[derive(Debug, Error)]
pub enum MaskError {
    #[error("failed to open walkability mask {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode walkability mask {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("walkability mask has zero area ({width}x{height})")]
    Empty { width: u32, height: u32 },
    #[error("alpha buffer length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}

/// Per-pixel terrain mask. A pixel with alpha == 0 is walkable; any other
/// alpha blocks. This inverted convention is how the masks are painted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkabilityMask {
    width: u32,
    height: u32,
    alpha: Vec<u8>,
}

impl WalkabilityMask {
    pub fn from_alpha(width: u32, height: u32, alpha: Vec<u8>) -> Result<Self, MaskError> {
        if width == 0 || height == 0 {
            return Err(MaskError::Empty { width, height });
        }
        let expected = width as usize * height as usize;
        if alpha.len() != expected {
            return Err(MaskError::LengthMismatch {
                expected,
                actual: alpha.len(),
            });
        }
        Ok(Self {
            width,
            height,
            alpha,
        })
    }

    pub fn open(path: &Path) -> Result<Self, MaskError> {
        let reader = ImageReader::open(path).map_err(|source| MaskError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let reader = reader
            .with_guessed_format()
            .map_err(|source| MaskError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        let image = reader.decode().map_err(|source| MaskError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_image(&image)
    }

    pub fn from_png_bytes(bytes: &[u8]) -> Result<Self, MaskError> {
        let image = image::load_from_memory_with_format(bytes, ImageFormat::Png).map_err(
            |source| MaskError::Decode {
                path: PathBuf::from("<memory>"),
                source,
            },
        )?;
        Self::from_image(&image)
    }

    fn from_image(image: &DynamicImage) -> Result<Self, MaskError> {
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        let alpha = rgba.pixels().map(|pixel| pixel.0[3]).collect();
        Self::from_alpha(width, height, alpha)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn alpha_values(&self) -> &[u8] {
        &self.alpha
    }

    pub fn alpha_at(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.alpha
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    pub fn is_walkable_pixel(&self, x: u32, y: u32) -> bool {
        self.alpha_at(x, y) == Some(0)
    }

    /// Outside the mask counts as blocked.
    pub fn is_walkable_at(&self, point: Vec2) -> bool {
        if !point.is_finite() || point.x < 0.0 || point.y < 0.0 {
            return false;
        }
        self.is_walkable_pixel(point.x.floor() as u32, point.y.floor() as u32)
    }

    /// Whether every sample on the segment after `from` up to and including
    /// `to` lies on a walkable pixel.
    pub fn is_segment_walkable(&self, from: Vec2, to: Vec2) -> bool {
        let distance = from.distance_to(to);
        if !distance.is_finite() {
            return false;
        }
        let samples = (distance / SEGMENT_SAMPLE_SPACING_PX).ceil().max(1.0) as u32;
        (1..=samples).all(|sample| {
            let t = sample as f32 / samples as f32;
            self.is_walkable_at(Vec2::new(
                from.x + (to.x - from.x) * t,
                from.y + (to.y - from.y) * t,
            ))
        })
    }
}
