//! Screenshot space to device space mapping
//!
//! A screenshot may be captured at a different resolution than the display
//! reports, so tap points are rescaled per axis before being sent.

use super::error::{ImageRole, VisionError, VisionResult};
use super::types::{Dimensions, MatchResult};

/// Screenshot and physical display sizes for one device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceGeometry {
    screenshot: Dimensions,
    device: Dimensions,
}

impl DeviceGeometry {
    /// Fails when the screenshot has a zero dimension
    pub fn new(screenshot: Dimensions, device: Dimensions) -> VisionResult<Self> {
        if screenshot.is_empty() {
            return Err(VisionError::EmptyImage {
                role: ImageRole::Screenshot,
                width: screenshot.width,
                height: screenshot.height,
            });
        }
        Ok(Self { screenshot, device })
    }

    pub fn screenshot(&self) -> Dimensions {
        self.screenshot
    }

    pub fn device(&self) -> Dimensions {
        self.device
    }

    pub fn is_identity(&self) -> bool {
        self.screenshot == self.device
    }

    pub fn map_to_device(&self, point: (f64, f64)) -> (u32, u32) {
        let (x, y) = point;
        let sx = self.device.width as f64 / self.screenshot.width as f64;
        let sy = self.device.height as f64 / self.screenshot.height as f64;
        (to_pixel(x * sx), to_pixel(y * sy))
    }

    /// Device coordinates of the centre of a match, kept on the panel
    pub fn tap_point(&self, found: &MatchResult) -> (u32, u32) {
        let (x, y) = self.map_to_device(found.center());
        (
            x.min(self.device.width.saturating_sub(1)),
            y.min(self.device.height.saturating_sub(1)),
        )
    }
}

fn to_pixel(value: f64) -> u32 {
    value.round().max(0.0) as u32
}

/// Map one point, or `None` if the screenshot has a zero dimension
pub fn map_to_device(
    point: (f64, f64),
    screenshot: Dimensions,
    device: Dimensions,
) -> Option<(u32, u32)> {
    DeviceGeometry::new(screenshot, device)
        .ok()
        .map(|geometry| geometry.map_to_device(point))
}
