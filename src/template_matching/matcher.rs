/// Multi-scale template matching
///
/// Searches the screenshot for the template at every factor of the scale
/// space and keeps the single strongest correlation peak above threshold.
use super::correlation::{SearchSpace, peak};
use super::error::{VisionError, VisionResult};
use super::scale_space::{
    DEFAULT_MAX_SCALE_FACTOR, DEFAULT_MIN_SCALE_FACTOR, DEFAULT_SCALE_STEPS, ScaleSpace,
};
use super::types::{Dimensions, MatchResult, Screenshot, Template};
use image::GrayImage;
use image::imageops::{self, FilterType};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

pub const DEFAULT_THRESHOLD: f32 = 0.70;

/// Matching parameters, deserialized from the `[matching]` config section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Minimum correlation for a candidate (-1.0 to 1.0)
    pub threshold: f32,
    /// Number of zoom factors tried per search
    pub scale_steps: usize,
    pub min_scale_factor: f64,
    pub max_scale_factor: f64,
    /// Always try the template at its authoring size
    pub anchor_native_scale: bool,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            scale_steps: DEFAULT_SCALE_STEPS,
            min_scale_factor: DEFAULT_MIN_SCALE_FACTOR,
            max_scale_factor: DEFAULT_MAX_SCALE_FACTOR,
            anchor_native_scale: true,
        }
    }
}

impl MatchConfig {
    pub fn scale_space(&self) -> ScaleSpace {
        ScaleSpace {
            steps: self.scale_steps,
            min_factor: self.min_scale_factor,
            max_factor: self.max_scale_factor,
            anchor_native_scale: self.anchor_native_scale,
        }
    }

    pub fn validate(&self) -> VisionResult<()> {
        let invalid = |reason: String| Err(VisionError::InvalidConfig { reason });
        if !(-1.0..=1.0).contains(&self.threshold) {
            return invalid(format!("threshold {} outside -1.0..=1.0", self.threshold));
        }
        if self.scale_steps == 0 {
            return invalid("scale_steps must be at least 1".to_string());
        }
        if !(self.min_scale_factor > 0.0 && self.max_scale_factor > 0.0) {
            return invalid("scale factors must be positive".to_string());
        }
        if self.min_scale_factor > self.max_scale_factor {
            return invalid(format!(
                "min_scale_factor {} exceeds max_scale_factor {}",
                self.min_scale_factor, self.max_scale_factor
            ));
        }
        Ok(())
    }
}

/// Finds templates in screenshots. Stateless between calls.
#[derive(Debug, Clone, Default)]
pub struct MatchEngine {
    config: MatchConfig,
}

impl MatchEngine {
    pub fn new(config: MatchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Best match of `template` anywhere in `screenshot` across the scale space.
    ///
    /// Returns `Ok(None)` when no scale produces a correlation at or above the
    /// threshold, including when the template never fits.
    pub fn find_best_match(
        &self,
        screenshot: &Screenshot,
        template: &Template,
    ) -> VisionResult<Option<MatchResult>> {
        let screen = screenshot.luma();
        let screen_dims = screenshot.dimensions();
        let template_dims = template.dimensions();
        let scales = self
            .config
            .scale_space()
            .generate(screen_dims, template_dims)?;

        // Built on first use: nothing to precompute if no scale fits
        let mut search: Option<SearchSpace> = None;
        let mut best: Option<MatchResult> = None;

        for scale in scales {
            let size = scaled_size(template_dims, scale);
            if size.is_empty() || !size.fits_within(screen_dims) {
                log::trace!(
                    "'{}' skipping scale {scale:.2}: {size} vs screenshot {screen_dims}",
                    template.name()
                );
                continue;
            }

            let resized = resize_template(template.luma(), size);
            let space = search.get_or_insert_with(|| SearchSpace::new(screen));
            let Some(surface) = space.correlate(&resized) else {
                continue;
            };
            let Some((x, y, value)) = peak(&surface) else {
                continue;
            };
            if value < self.config.threshold {
                continue;
            }

            log::debug!(
                "'{}' match found at scale {scale:.2} with value {value:.2}",
                template.name()
            );
            if best.is_none_or(|b| value > b.confidence) {
                best = Some(MatchResult {
                    x,
                    y,
                    width: size.width,
                    height: size.height,
                    confidence: value,
                    scale,
                });
            }
        }

        Ok(best)
    }

    /// Run [`find_best_match`](Self::find_best_match) on the blocking pool
    pub async fn locate(
        &self,
        screenshot: &Screenshot,
        template: &Template,
    ) -> VisionResult<Option<MatchResult>> {
        let engine = self.clone();
        let screenshot = screenshot.clone();
        let template = template.clone();
        tokio::task::spawn_blocking(move || engine.find_best_match(&screenshot, &template)).await?
    }
}

fn scaled_size(template: Dimensions, scale: f64) -> Dimensions {
    Dimensions::new(
        (template.width as f64 * scale).round() as u32,
        (template.height as f64 * scale).round() as u32,
    )
}

/// Resize with a filter whose support widens with the downscale factor, so
/// shrinking averages over the covered source area.
fn resize_template(template: &GrayImage, size: Dimensions) -> Cow<'_, GrayImage> {
    if Dimensions::of(template) == size {
        Cow::Borrowed(template)
    } else {
        Cow::Owned(imageops::resize(
            template,
            size.width,
            size.height,
            FilterType::Triangle,
        ))
    }
}
