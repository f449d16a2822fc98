/// Template matching data types
use super::error::{ImageRole, VisionError, VisionResult};
use image::{DynamicImage, GrayImage};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Pixel dimensions of an image
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn of(image: &GrayImage) -> Self {
        Self::new(image.width(), image.height())
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Whether an image of these dimensions fits inside `outer`
    pub fn fits_within(&self, outer: Dimensions) -> bool {
        self.width <= outer.width && self.height <= outer.height
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Best location of a template inside a screenshot
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatchResult {
    /// Top-left X coordinate in screenshot space
    pub x: u32,
    /// Top-left Y coordinate in screenshot space
    pub y: u32,
    /// Width of the resized template that matched
    pub width: u32,
    /// Height of the resized template that matched
    pub height: u32,
    /// Normalized correlation (-1.0..=1.0)
    pub confidence: f32,
    /// Zoom factor applied to the template
    pub scale: f64,
}

impl MatchResult {
    /// Centre of the matched region in screenshot space
    pub fn center(&self) -> (f64, f64) {
        (
            self.x as f64 + self.width as f64 / 2.0,
            self.y as f64 + self.height as f64 / 2.0,
        )
    }

    pub fn size(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }
}

impl fmt::Display for MatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({},{}) {}x{} conf={:.3} scale={:.2}",
            self.x, self.y, self.width, self.height, self.confidence, self.scale
        )
    }
}

fn validated(role: ImageRole, luma: GrayImage) -> VisionResult<Arc<GrayImage>> {
    if luma.width() == 0 || luma.height() == 0 {
        return Err(VisionError::EmptyImage {
            role,
            width: luma.width(),
            height: luma.height(),
        });
    }
    Ok(Arc::new(luma))
}

fn open_luma(role: ImageRole, path: &Path) -> VisionResult<GrayImage> {
    let image = image::open(path).map_err(|source| VisionError::Load {
        role,
        path: path.to_path_buf(),
        source,
    })?;
    Ok(image.to_luma8())
}

/// A captured screen, held as single-channel luminance.
///
/// Cloning is cheap; the pixels are shared.
#[derive(Clone, Debug)]
pub struct Screenshot {
    luma: Arc<GrayImage>,
}

impl Screenshot {
    pub fn from_luma(luma: GrayImage) -> VisionResult<Self> {
        Ok(Self {
            luma: validated(ImageRole::Screenshot, luma)?,
        })
    }

    pub fn from_image(image: &DynamicImage) -> VisionResult<Self> {
        Self::from_luma(image.to_luma8())
    }

    pub fn from_bytes(bytes: &[u8]) -> VisionResult<Self> {
        let image = image::load_from_memory(bytes).map_err(|source| VisionError::Decode {
            role: ImageRole::Screenshot,
            source,
        })?;
        Self::from_image(&image)
    }

    pub fn open(path: impl AsRef<Path>) -> VisionResult<Self> {
        Self::from_luma(open_luma(ImageRole::Screenshot, path.as_ref())?)
    }

    pub fn luma(&self) -> &GrayImage {
        &self.luma
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::of(&self.luma)
    }
}

/// A reference pattern searched for in screenshots
#[derive(Clone, Debug)]
pub struct Template {
    name: String,
    luma: Arc<GrayImage>,
}

impl Template {
    pub fn from_luma(name: impl Into<String>, luma: GrayImage) -> VisionResult<Self> {
        Ok(Self {
            name: name.into(),
            luma: validated(ImageRole::Template, luma)?,
        })
    }

    pub fn from_image(name: impl Into<String>, image: &DynamicImage) -> VisionResult<Self> {
        Self::from_luma(name, image.to_luma8())
    }

    /// Load a template from disk, naming it after the file stem
    pub fn open(path: impl AsRef<Path>) -> VisionResult<Self> {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown")
            .to_string();
        Self::from_luma(name, open_luma(ImageRole::Template, path)?)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn luma(&self) -> &GrayImage {
        &self.luma
    }

    /// Intrinsic size at authoring scale
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::of(&self.luma)
    }
}
