//! Screen sampling: a strip of pixels summarizing what is on screen.
//!
//! A capture is downsampled to `N x 1` pixels, one per zone, so each zone
//! mirrors the average color of its slice of the screen width.

use crate::{BoxError, Color};
use image::RgbaImage;
use image::imageops::{self, FilterType};

pub trait ScreenSampler {
    /// Current screen content as `pixel_count` colors, left to right.
    fn sample(&mut self, pixel_count: usize) -> Result<Vec<Color>, BoxError>;
}

impl<T: ScreenSampler + ?Sized> ScreenSampler for Box<T> {
    fn sample(&mut self, pixel_count: usize) -> Result<Vec<Color>, BoxError> {
        (**self).sample(pixel_count)
    }
}

/// Shrink a captured frame to a `pixel_count x 1` strip.
pub fn downsample_strip(frame: &RgbaImage, pixel_count: usize) -> Vec<Color> {
    if pixel_count == 0 || frame.width() == 0 || frame.height() == 0 {
        return Vec::new();
    }

    let strip = imageops::resize(frame, pixel_count as u32, 1, FilterType::Triangle);
    strip
        .pixels()
        .map(|p| Color::new(p[0], p[1], p[2]))
        .collect()
}

/// Placeholder sampler for builds without screen capture support.
/// Every sample fails, which the ambient loop treats as a dropped frame.
pub struct UnavailableSampler;

impl ScreenSampler for UnavailableSampler {
    fn sample(&mut self, _pixel_count: usize) -> Result<Vec<Color>, BoxError> {
        Err("screen capture support not built (enable the `capture` feature)".into())
    }
}

#[cfg(feature = "capture")]
pub use screen::XcapSampler;

#[cfg(feature = "capture")]
mod screen {
    use super::{ScreenSampler, downsample_strip};
    use crate::{BoxError, Color};
    use image::RgbaImage;

    /// Captures the first monitor through xcap.
    #[derive(Default)]
    pub struct XcapSampler;

    impl ScreenSampler for XcapSampler {
        fn sample(&mut self, pixel_count: usize) -> Result<Vec<Color>, BoxError> {
            let monitor = xcap::Monitor::all()?
                .into_iter()
                .next()
                .ok_or("no monitor to capture")?;
            let captured = monitor.capture_image()?;

            // Rebuild with our own `image` version in case xcap links another.
            let (width, height) = (captured.width(), captured.height());
            let frame = RgbaImage::from_raw(width, height, captured.into_raw())
                .ok_or("capture buffer size mismatch")?;

            Ok(downsample_strip(&frame, pixel_count))
        }
    }
}
