//! Zero-mean normalized cross-correlation over a whole screenshot
//!
//! The numerator for every offset comes from one FFT product over the
//! row-major flattened screenshot (fast normalized cross-correlation, J.P.
//! Lewis). With the template embedded at the screenshot's row stride, every
//! valid offset `y * width + x` reads exactly the pixels under the template
//! and never wraps, so no padding is needed. Window statistics come from
//! integral images.

use image::{GrayImage, ImageBuffer, Luma};
use imageproc::integral_image::{integral_image, integral_squared_image};
use rayon::prelude::*;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

/// Correlation value per template offset; `(x, y)` is the template's top-left
pub type CorrelationSurface = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Screenshot-side data reused for every template size tried in one search
pub struct SearchSpace {
    width: usize,
    height: usize,
    spectrum: Vec<Complex<f64>>,
    sums: Vec<u64>,
    squares: Vec<u64>,
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
}

impl SearchSpace {
    pub fn new(screen: &GrayImage) -> Self {
        let width = screen.width() as usize;
        let height = screen.height() as usize;
        let len = width * height;

        let mut planner = FftPlanner::<f64>::new();
        let forward = planner.plan_fft_forward(len);
        let inverse = planner.plan_fft_inverse(len);

        // Centring the screenshot keeps the FFT well conditioned; the
        // template is zero-mean so the correlation is unchanged.
        let mean = if len == 0 {
            0.0
        } else {
            screen.as_raw().iter().map(|&p| p as f64).sum::<f64>() / len as f64
        };
        let mut spectrum: Vec<Complex<f64>> = screen
            .as_raw()
            .iter()
            .map(|&p| Complex::new(p as f64 - mean, 0.0))
            .collect();
        forward.process(&mut spectrum);

        let sums: ImageBuffer<Luma<u64>, Vec<u64>> = integral_image::<_, u64>(screen);
        let squares: ImageBuffer<Luma<u64>, Vec<u64>> = integral_squared_image::<_, u64>(screen);

        Self {
            width,
            height,
            spectrum,
            sums: sums.into_raw(),
            squares: squares.into_raw(),
            forward,
            inverse,
        }
    }

    /// Correlate `template` against every offset where it fits entirely.
    ///
    /// Returns `None` when the template is empty or larger than the
    /// screenshot in either axis.
    pub fn correlate(&self, template: &GrayImage) -> Option<CorrelationSurface> {
        let tw = template.width() as usize;
        let th = template.height() as usize;
        if tw == 0 || th == 0 || tw > self.width || th > self.height {
            return None;
        }

        let count = (tw * th) as f64;
        let t_mean = template.as_raw().iter().map(|&p| p as f64).sum::<f64>() / count;
        let t_deviation: f64 = template
            .as_raw()
            .iter()
            .map(|&p| (p as f64 - t_mean).powi(2))
            .sum();

        let out_w = self.width - tw + 1;
        let out_h = self.height - th + 1;
        if t_deviation <= 0.0 {
            log::trace!("template {tw}x{th} has no contrast; surface is flat");
            return Some(ImageBuffer::new(out_w as u32, out_h as u32));
        }

        let len = self.width * self.height;
        let mut product = vec![Complex::new(0.0, 0.0); len];
        for (ty, row) in template.as_raw().chunks_exact(tw).enumerate() {
            let base = ty * self.width;
            for (tx, &p) in row.iter().enumerate() {
                product[base + tx] = Complex::new(p as f64 - t_mean, 0.0);
            }
        }
        self.forward.process(&mut product);
        for (value, image) in product.iter_mut().zip(&self.spectrum) {
            *value = *image * value.conj();
        }
        self.inverse.process(&mut product);

        let norm = 1.0 / len as f64;
        let stride = self.width + 1;
        let window_count = (tw * th) as u128;
        let mut values = vec![0.0f32; out_w * out_h];

        values
            .par_chunks_mut(out_w)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, out) in row.iter_mut().enumerate() {
                    let s1 = window_sum(&self.sums, stride, x, y, tw, th) as u128;
                    let s2 = window_sum(&self.squares, stride, x, y, tw, th) as u128;
                    // Exact integer form of count * sum((I - mean)^2)
                    let spread = window_count * s2 - s1 * s1;
                    if spread == 0 {
                        continue;
                    }
                    let deviation = spread as f64 / window_count as f64;
                    let numerator = product[y * self.width + x].re * norm;
                    let ncc = numerator / (t_deviation * deviation).sqrt();
                    *out = ncc.clamp(-1.0, 1.0) as f32;
                }
            });

        ImageBuffer::from_raw(out_w as u32, out_h as u32, values)
    }
}

/// Sum of the `w`x`h` window at `(x, y)` from a zero-padded integral image
fn window_sum(integral: &[u64], stride: usize, x: usize, y: usize, w: usize, h: usize) -> u64 {
    let top_left = integral[y * stride + x];
    let top_right = integral[y * stride + x + w];
    let bottom_left = integral[(y + h) * stride + x];
    let bottom_right = integral[(y + h) * stride + x + w];
    (bottom_right + top_left) - (top_right + bottom_left)
}

/// Highest value on the surface; ties resolve to the first in row-major order
pub fn peak(surface: &CorrelationSurface) -> Option<(u32, u32, f32)> {
    let mut best: Option<(u32, u32, f32)> = None;
    for (x, y, pixel) in surface.enumerate_pixels() {
        let value = pixel[0];
        if best.is_none_or(|(_, _, b)| value > b) {
            best = Some((x, y, value));
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn textured(w: u32, h: u32, seed: u32) -> GrayImage {
        GrayImage::from_fn(w, h, |x, y| {
            let v = (x.wrapping_mul(73) ^ y.wrapping_mul(151) ^ seed).wrapping_mul(2654435761);
            Luma([(v >> 24) as u8])
        })
    }

    /// Direct evaluation of the same formula for cross-checking
    fn naive_ncc(screen: &GrayImage, template: &GrayImage, x: u32, y: u32) -> f64 {
        let n = (template.width() * template.height()) as f64;
        let t_mean = template.pixels().map(|p| p[0] as f64).sum::<f64>() / n;
        let mut i_sum = 0.0;
        for ty in 0..template.height() {
            for tx in 0..template.width() {
                i_sum += screen.get_pixel(x + tx, y + ty)[0] as f64;
            }
        }
        let i_mean = i_sum / n;
        let (mut num, mut tt, mut ii) = (0.0, 0.0, 0.0);
        for ty in 0..template.height() {
            for tx in 0..template.width() {
                let t = template.get_pixel(tx, ty)[0] as f64 - t_mean;
                let i = screen.get_pixel(x + tx, y + ty)[0] as f64 - i_mean;
                num += t * i;
                tt += t * t;
                ii += i * i;
            }
        }
        if tt == 0.0 || ii == 0.0 {
            0.0
        } else {
            num / (tt * ii).sqrt()
        }
    }

    #[test]
    fn test_surface_shape() {
        let screen = textured(40, 30, 1);
        let template = textured(7, 5, 2);
        let surface = SearchSpace::new(&screen).correlate(&template).unwrap();
        assert_eq!(surface.dimensions(), (34, 26));
    }

    #[test]
    fn test_matches_direct_formula() {
        let screen = textured(37, 23, 9);
        let template = textured(6, 4, 4);
        let surface = SearchSpace::new(&screen).correlate(&template).unwrap();
        for (x, y) in [(0, 0), (5, 3), (31, 19), (17, 11)] {
            let expected = naive_ncc(&screen, &template, x, y);
            let actual = surface.get_pixel(x, y)[0] as f64;
            assert!(
                (expected - actual).abs() < 1e-4,
                "({x},{y}) expected {expected} got {actual}"
            );
        }
    }

    #[test]
    fn test_exact_copy_peaks_at_one() {
        let screen = textured(50, 40, 3);
        let template = image::imageops::crop_imm(&screen, 12, 9, 10, 8).to_image();
        let surface = SearchSpace::new(&screen).correlate(&template).unwrap();
        let (x, y, value) = peak(&surface).unwrap();
        assert_eq!((x, y), (12, 9));
        assert!(value > 0.999);
    }

    #[test]
    fn test_oversized_template_has_no_surface() {
        let space = SearchSpace::new(&textured(20, 20, 0));
        assert!(space.correlate(&textured(21, 5, 0)).is_none());
        assert!(space.correlate(&textured(5, 21, 0)).is_none());
        assert!(space.correlate(&GrayImage::new(0, 3)).is_none());
    }

    #[test]
    fn test_flat_regions_score_zero() {
        let screen = GrayImage::from_pixel(30, 30, Luma([90]));
        let surface = SearchSpace::new(&screen)
            .correlate(&textured(8, 8, 5))
            .unwrap();
        assert!(surface.pixels().all(|p| p[0] == 0.0));

        let flat_template = GrayImage::from_pixel(4, 4, Luma([10]));
        let surface = SearchSpace::new(&textured(30, 30, 5))
            .correlate(&flat_template)
            .unwrap();
        assert!(surface.pixels().all(|p| p[0] == 0.0));
    }

    #[test]
    fn test_peak_prefers_first_on_ties() {
        let surface = CorrelationSurface::from_raw(3, 2, vec![0.1, 0.8, 0.2, 0.8, 0.3, 0.0]).unwrap();
        assert_eq!(peak(&surface), Some((1, 0, 0.8)));
        assert_eq!(peak(&CorrelationSurface::new(0, 0)), None);
    }
}
