//! Candidate zoom factors for multi-scale matching
//!
//! The authoring resolution of a template is unknown relative to any given
//! screenshot, so the search brackets a wide multiplicative range derived from
//! the ratio between the two image sizes.

use super::error::{ImageRole, VisionError, VisionResult};
use super::types::Dimensions;

pub const DEFAULT_SCALE_STEPS: usize = 30;
pub const DEFAULT_MIN_SCALE_FACTOR: f64 = 0.5;
pub const DEFAULT_MAX_SCALE_FACTOR: f64 = 1.5;

/// Parameters of the scale-space grid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleSpace {
    /// Number of factors produced
    pub steps: usize,
    /// Multiplier applied to the smaller size ratio to get the lowest factor
    pub min_factor: f64,
    /// Multiplier applied to the larger size ratio to get the highest factor
    pub max_factor: f64,
    /// Guarantee that the native scale 1.0 is one of the tried factors
    pub anchor_native_scale: bool,
}

impl Default for ScaleSpace {
    fn default() -> Self {
        Self {
            steps: DEFAULT_SCALE_STEPS,
            min_factor: DEFAULT_MIN_SCALE_FACTOR,
            max_factor: DEFAULT_MAX_SCALE_FACTOR,
            anchor_native_scale: true,
        }
    }
}

impl ScaleSpace {
    /// Produce `steps` ascending factors for a template of `template` size
    /// searched inside a screenshot of `screenshot` size.
    pub fn generate(&self, screenshot: Dimensions, template: Dimensions) -> VisionResult<Vec<f64>> {
        if template.is_empty() {
            return Err(VisionError::EmptyImage {
                role: ImageRole::Template,
                width: template.width,
                height: template.height,
            });
        }
        if self.steps == 0 {
            return Err(VisionError::InvalidConfig {
                reason: "scale space needs at least one step".to_string(),
            });
        }

        let scale_x = screenshot.width as f64 / template.width as f64;
        let scale_y = screenshot.height as f64 / template.height as f64;
        let mut min_scale = scale_x.min(scale_y) * self.min_factor;
        let max_scale = scale_x.max(scale_y) * self.max_factor;

        if self.anchor_native_scale && min_scale > 1.0 {
            min_scale = 1.0;
        }

        let mut factors = linspace(min_scale, max_scale, self.steps);

        if self.anchor_native_scale && (min_scale..=max_scale).contains(&1.0) {
            snap_to_native(&mut factors);
        }

        Ok(factors)
    }
}

/// `n` evenly spaced values from `start` to `end`, both inclusive
fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    if n == 1 {
        return vec![start];
    }
    let step = (end - start) / (n - 1) as f64;
    let mut values: Vec<f64> = (0..n).map(|i| start + step * i as f64).collect();
    values[n - 1] = end;
    values
}

/// Replace the factor closest to 1.0 with exactly 1.0.
///
/// 1.0 lies between the neighbours of its nearest grid point, so the
/// sequence stays non-decreasing.
fn snap_to_native(factors: &mut [f64]) {
    let nearest = factors
        .iter()
        .enumerate()
        .fold(None::<(usize, f64)>, |best, (i, &f)| {
            let distance = (f - 1.0).abs();
            match best {
                Some((_, d)) if d <= distance => best,
                _ => Some((i, distance)),
            }
        });
    if let Some((i, _)) = nearest {
        factors[i] = 1.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare() -> ScaleSpace {
        ScaleSpace {
            anchor_native_scale: false,
            ..ScaleSpace::default()
        }
    }

    fn assert_non_decreasing(factors: &[f64]) {
        for pair in factors.windows(2) {
            assert!(pair[0] <= pair[1], "{} > {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_formula_bounds() {
        let factors = bare()
            .generate(Dimensions::new(1080, 2400), Dimensions::new(200, 80))
            .unwrap();
        assert_eq!(factors.len(), 30);
        // min(5.4, 30) * 0.5 and max(5.4, 30) * 1.5
        assert!((factors[0] - 2.7).abs() < 1e-9);
        assert!((factors[29] - 45.0).abs() < 1e-9);
        assert_non_decreasing(&factors);
    }

    #[test]
    fn test_exactly_n_non_decreasing_for_many_shapes() {
        let shapes = [
            (1080, 2400, 200, 80),
            (720, 1280, 720, 1280),
            (100, 100, 300, 20),
            (1, 1, 1, 1),
            (0, 50, 10, 10),
            (1920, 1080, 17, 333),
        ];
        for space in [bare(), ScaleSpace::default()] {
            for (sw, sh, tw, th) in shapes {
                let factors = space
                    .generate(Dimensions::new(sw, sh), Dimensions::new(tw, th))
                    .unwrap();
                assert_eq!(factors.len(), space.steps);
                assert!(factors[0] <= factors[factors.len() - 1]);
                assert_non_decreasing(&factors);
            }
        }
    }

    #[test]
    fn test_zero_template_is_rejected() {
        let err = ScaleSpace::default()
            .generate(Dimensions::new(100, 100), Dimensions::new(0, 10))
            .unwrap_err();
        assert!(matches!(err, VisionError::EmptyImage { .. }));
    }

    #[test]
    fn test_zero_steps_is_rejected() {
        let space = ScaleSpace {
            steps: 0,
            ..ScaleSpace::default()
        };
        assert!(
            space
                .generate(Dimensions::new(100, 100), Dimensions::new(10, 10))
                .is_err()
        );
    }

    #[test]
    fn test_single_step_yields_min_scale() {
        let space = ScaleSpace {
            steps: 1,
            ..bare()
        };
        let factors = space
            .generate(Dimensions::new(200, 100), Dimensions::new(100, 50))
            .unwrap();
        assert_eq!(factors, vec![1.0]);
    }

    #[test]
    fn test_anchor_lowers_min_to_native() {
        let factors = ScaleSpace::default()
            .generate(Dimensions::new(1080, 2400), Dimensions::new(200, 80))
            .unwrap();
        assert_eq!(factors[0], 1.0);
        assert!((factors[29] - 45.0).abs() < 1e-9);
    }

    #[test]
    fn test_anchor_snaps_nearest_factor() {
        // min = 0.75, max = 4.5: 1.0 falls between grid points
        let factors = ScaleSpace::default()
            .generate(Dimensions::new(300, 300), Dimensions::new(200, 100))
            .unwrap();
        assert_eq!(factors.len(), 30);
        assert!(factors.contains(&1.0));
        assert_non_decreasing(&factors);
    }

    #[test]
    fn test_anchor_ignored_when_native_out_of_range() {
        // template much larger than the screenshot: max < 1.0
        let factors = ScaleSpace::default()
            .generate(Dimensions::new(100, 100), Dimensions::new(1000, 1000))
            .unwrap();
        assert!(!factors.contains(&1.0));
        assert!((factors[29] - 0.15).abs() < 1e-9);
    }

    #[test]
    fn test_screenshot_twice_template_starts_at_native() {
        let factors = bare()
            .generate(Dimensions::new(240, 160), Dimensions::new(120, 80))
            .unwrap();
        assert_eq!(factors[0], 1.0);
        assert_eq!(factors[29], 3.0);
    }
}
