/// Template matching module for locating reference images in screenshots
///
/// This module provides:
/// - Scale-space generation for templates of unknown authoring resolution
/// - FFT-backed zero-mean normalized cross-correlation
/// - Multi-scale best-match search with a confidence threshold
/// - Mapping of match centres from screenshot space to device space
pub mod coords;
pub mod correlation;
pub mod error;
pub mod matcher;
pub mod scale_space;
pub mod types;


pub use coords::{DeviceGeometry, map_to_device};
pub use error::{ImageRole, VisionError, VisionResult};
pub use matcher::{MatchConfig, MatchEngine};
pub use scale_space::ScaleSpace;
pub use types::{Dimensions, MatchResult, Screenshot, Template};
