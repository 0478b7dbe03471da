//! Fit decoded images inside a maximum dimension.
//!
//! Downloaded images can be arbitrarily large; the display path wants both
//! dimensions inside a bound resolved from the configured maximum, the
//! device capability, and a hard cap. Oversized images are uniformly
//! downscaled. When a rescale attempt fails, the target is halved and
//! retried until an attempt succeeds or bottoms out at 1x1, at which point
//! the oversized original is returned as-is with a warning - a degraded
//! image beats no image.

use image::{imageops::FilterType, DynamicImage, GenericImageView};
use tracing::{debug, warn};

use super::TextureError;

// ============================================================================
// Constants
// ============================================================================

/// Upper bound on any dimension, applied no matter what the device reports.
pub const CONSERVATIVE_HARD_CAP: u32 = 8192;

/// Assumed capability when the device reports nothing usable.
pub const FALLBACK_MAX_DIMENSION: u32 = 4096;

/// Pixel budget for a single rescale surface (width * height). Surfaces
/// past this are rejected before any allocation is attempted.
const MAX_SURFACE_PIXELS: u64 = (CONSERVATIVE_HARD_CAP as u64) * (CONSERVATIVE_HARD_CAP as u64);

// ============================================================================
// Device capability
// ============================================================================

/// Reported rendering capability of the active device.
#[derive(Debug, Clone, Copy)]
pub struct DeviceCaps {
    max_dimension: u32,
}

impl DeviceCaps {
    /// Probe the device limit.
    ///
    /// A terminal surface has no queryable equivalent of a texture-size
    /// limit, so the probe reports nothing and the fallback applies; the
    /// type exists so a real limit can be injected where one is known.
    pub fn detect() -> Self {
        Self::with_reported(0)
    }

    /// Caps from an explicitly reported limit; `0` means unreported and
    /// falls back to [`FALLBACK_MAX_DIMENSION`]. The hard cap applies
    /// either way.
    pub fn with_reported(reported: u32) -> Self {
        let max = if reported == 0 {
            FALLBACK_MAX_DIMENSION
        } else {
            reported
        };
        Self {
            max_dimension: max.min(CONSERVATIVE_HARD_CAP),
        }
    }

    pub fn max_dimension(&self) -> u32 {
        self.max_dimension
    }
}

impl Default for DeviceCaps {
    fn default() -> Self {
        Self::detect()
    }
}

// ============================================================================
// Scaling seam
// ============================================================================

/// Seam over the actual pixel rescale. The fitter's retry loop only sees
/// success or failure, so failure handling can be exercised without a
/// device that actually runs out of surfaces.
pub trait Scaler {
    /// Produce a copy of `source` at exactly `width` x `height`, or fail
    /// if a surface cannot be produced at that size.
    fn scale(
        &self,
        source: &DynamicImage,
        width: u32,
        height: u32,
    ) -> Result<DynamicImage, TextureError>;
}

/// Default scaler: Lanczos3 resample, with the requested surface validated
/// against device capability before any allocation is attempted.
pub struct RasterScaler {
    caps: DeviceCaps,
}

impl RasterScaler {
    pub fn new(caps: DeviceCaps) -> Self {
        Self { caps }
    }
}

impl Scaler for RasterScaler {
    fn scale(
        &self,
        source: &DynamicImage,
        width: u32,
        height: u32,
    ) -> Result<DynamicImage, TextureError> {
        let device_max = self.caps.max_dimension();
        if width > device_max || height > device_max {
            return Err(TextureError::Allocation {
                width,
                height,
                reason: format!("exceeds device max {}", device_max),
            });
        }
        if u64::from(width) * u64::from(height) > MAX_SURFACE_PIXELS {
            return Err(TextureError::Allocation {
                width,
                height,
                reason: "exceeds surface pixel budget".to_string(),
            });
        }
        Ok(source.resize_exact(width, height, FilterType::Lanczos3))
    }
}

// ============================================================================
// Fitting
// ============================================================================

/// How the fitted image was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitOutcome {
    /// Already within bounds; the same image, untouched.
    Unchanged,
    /// Downscaled from the recorded source dimensions.
    Scaled { from: (u32, u32) },
    /// Every rescale attempt failed; the oversized original came back.
    GaveUp,
}

/// A decoded image together with how it came to fit (or not).
#[derive(Debug)]
pub struct Fitted {
    pub image: DynamicImage,
    pub outcome: FitOutcome,
}

impl Fitted {
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

pub struct TextureFitter {
    caps: DeviceCaps,
    configured_max: Option<u32>,
}

impl TextureFitter {
    pub fn new(caps: DeviceCaps, configured_max: Option<u32>) -> Self {
        Self {
            caps,
            configured_max,
        }
    }

    /// The bound actually enforced: the configured maximum clamped by the
    /// device limit, never above the hard cap. No configured value means
    /// the device limit stands alone.
    pub fn effective_max(&self) -> u32 {
        let device_max = self.caps.max_dimension();
        let max = match self.configured_max {
            Some(configured) if configured > 0 => configured.min(device_max),
            _ => device_max,
        };
        max.min(CONSERVATIVE_HARD_CAP)
    }

    /// Decode `bytes` and fit the result within [`Self::effective_max`].
    pub fn fit(&self, bytes: &[u8]) -> Result<Fitted, TextureError> {
        self.fit_with_scaler(bytes, &RasterScaler::new(self.caps))
    }

    /// As [`Self::fit`], with the rescale seam supplied by the caller.
    pub fn fit_with_scaler(
        &self,
        bytes: &[u8],
        scaler: &dyn Scaler,
    ) -> Result<Fitted, TextureError> {
        if bytes.is_empty() {
            return Err(TextureError::EmptyBuffer);
        }
        let source = image::load_from_memory(bytes)?;
        Ok(self.fit_image(source, scaler))
    }

    /// Fit an already-decoded image.
    ///
    /// Takes the source by value: a successful rescale consumes it, and an
    /// in-bounds source is returned untouched inside the [`Fitted`].
    pub fn fit_image(&self, source: DynamicImage, scaler: &dyn Scaler) -> Fitted {
        let max_dim = self.effective_max();
        let (width, height) = source.dimensions();
        debug!(
            width,
            height,
            max_dim,
            device_max = self.caps.max_dimension(),
            "fitting image"
        );

        if width <= max_dim && height <= max_dim {
            return Fitted {
                image: source,
                outcome: FitOutcome::Unchanged,
            };
        }

        let (target_w, target_h) = target_dimensions(width, height, max_dim);
        match scale_with_retry(&source, target_w, target_h, scaler) {
            Some(scaled) => Fitted {
                image: scaled,
                outcome: FitOutcome::Scaled {
                    from: (width, height),
                },
            },
            None => {
                warn!(
                    width,
                    height, "all rescale attempts failed; keeping oversized original"
                );
                Fitted {
                    image: source,
                    outcome: FitOutcome::GaveUp,
                }
            }
        }
    }
}

/// Uniform scale into `max_dim`, rounded, both dimensions at least 1px.
fn target_dimensions(width: u32, height: u32, max_dim: u32) -> (u32, u32) {
    let scale = f64::min(
        f64::from(max_dim) / f64::from(width),
        f64::from(max_dim) / f64::from(height),
    );
    let target_w = (f64::from(width) * scale).round() as u32;
    let target_h = (f64::from(height) * scale).round() as u32;
    (target_w.max(1), target_h.max(1))
}

/// Halving retry: walk the target down by powers of two until an attempt
/// succeeds. Returns `None` once a 1x1 attempt has failed.
fn scale_with_retry(
    source: &DynamicImage,
    start_w: u32,
    start_h: u32,
    scaler: &dyn Scaler,
) -> Option<DynamicImage> {
    let mut width = start_w.max(1);
    let mut height = start_h.max(1);
    loop {
        match scaler.scale(source, width, height) {
            Ok(scaled) => {
                debug!(width, height, "rescaled");
                return Some(scaled);
            }
            Err(e) => {
                warn!(width, height, error = %e, "rescale attempt failed");
            }
        }
        if width == 1 && height == 1 {
            return None;
        }
        width = (width / 2).max(1);
        height = (height / 2).max(1);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    /// Scaler that records every requested size and always fails.
    struct FailingScaler {
        attempts: RefCell<Vec<(u32, u32)>>,
    }

    impl FailingScaler {
        fn new() -> Self {
            Self {
                attempts: RefCell::new(Vec::new()),
            }
        }
    }

    impl Scaler for FailingScaler {
        fn scale(
            &self,
            _source: &DynamicImage,
            width: u32,
            height: u32,
        ) -> Result<DynamicImage, TextureError> {
            self.attempts.borrow_mut().push((width, height));
            Err(TextureError::Allocation {
                width,
                height,
                reason: "simulated".to_string(),
            })
        }
    }

    fn blank_image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::new_rgba8(width, height)
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        blank_image(width, height)
            .write_to(
                &mut std::io::Cursor::new(&mut bytes),
                image::ImageFormat::Png,
            )
            .unwrap();
        bytes
    }

    #[test]
    fn test_device_caps_fallback_and_hard_cap() {
        assert_eq!(DeviceCaps::with_reported(0).max_dimension(), 4096);
        assert_eq!(DeviceCaps::with_reported(2048).max_dimension(), 2048);
        assert_eq!(DeviceCaps::with_reported(100_000).max_dimension(), 8192);
        assert_eq!(DeviceCaps::detect().max_dimension(), 4096);
    }

    #[test]
    fn test_effective_max_resolution() {
        let caps = DeviceCaps::with_reported(4096);
        // configured wins when smaller than the device limit
        assert_eq!(TextureFitter::new(caps, Some(1024)).effective_max(), 1024);
        // device limit wins when configured is larger
        assert_eq!(TextureFitter::new(caps, Some(16384)).effective_max(), 4096);
        // unset defers to the device limit
        assert_eq!(TextureFitter::new(caps, None).effective_max(), 4096);
        assert_eq!(TextureFitter::new(caps, Some(0)).effective_max(), 4096);
    }

    #[test]
    fn test_target_dimensions_preserve_aspect() {
        // 10000x10000 at max 4096 lands square
        assert_eq!(target_dimensions(10000, 10000, 4096), (4096, 4096));

        // 2:1 aspect preserved within 1px of exact
        let (w, h) = target_dimensions(10000, 5000, 4096);
        assert_eq!(w, 4096);
        assert!((h as i64 - 2048).abs() <= 1);

        // extreme aspect never collapses below 1px
        let (w, h) = target_dimensions(100_000, 3, 4096);
        assert_eq!(w, 4096);
        assert!(h >= 1);
    }

    #[test]
    fn test_in_bounds_image_returned_unchanged() {
        let fitter = TextureFitter::new(DeviceCaps::with_reported(4096), Some(4096));
        let source = blank_image(512, 256);
        let source_ptr = source.as_bytes().as_ptr();

        let fitted = fitter.fit_image(source, &RasterScaler::new(DeviceCaps::with_reported(4096)));
        assert_eq!(fitted.outcome, FitOutcome::Unchanged);
        assert_eq!(fitted.dimensions(), (512, 256));
        // same allocation, not a copy
        assert_eq!(fitted.image.as_bytes().as_ptr(), source_ptr);
    }

    #[test]
    fn test_oversized_image_scaled_within_bounds() {
        let caps = DeviceCaps::with_reported(64);
        let fitter = TextureFitter::new(caps, Some(64));
        let fitted = fitter.fit_image(blank_image(200, 100), &RasterScaler::new(caps));

        assert_eq!(
            fitted.outcome,
            FitOutcome::Scaled { from: (200, 100) }
        );
        let (w, h) = fitted.dimensions();
        assert!(w <= 64 && h <= 64);
        assert_eq!((w, h), (64, 32));
    }

    #[test]
    fn test_decode_and_fit_from_bytes() {
        let caps = DeviceCaps::with_reported(64);
        let fitter = TextureFitter::new(caps, None);
        let fitted = fitter.fit(&png_bytes(128, 64)).unwrap();
        assert_eq!(fitted.dimensions(), (64, 32));
    }

    #[test]
    fn test_empty_buffer_rejected() {
        let fitter = TextureFitter::new(DeviceCaps::detect(), None);
        assert!(matches!(
            fitter.fit(&[]),
            Err(TextureError::EmptyBuffer)
        ));
    }

    #[test]
    fn test_undecodable_bytes_rejected() {
        let fitter = TextureFitter::new(DeviceCaps::detect(), None);
        assert!(matches!(
            fitter.fit(b"definitely not an image"),
            Err(TextureError::Decode(_))
        ));
    }

    #[test]
    fn test_halving_retry_gives_up_with_original() {
        let caps = DeviceCaps::with_reported(4096);
        let fitter = TextureFitter::new(caps, Some(4096));
        let scaler = FailingScaler::new();

        // 5000x2 keeps the source allocation small while the width walks
        // the full halving ladder
        let fitted = fitter.fit_image(blank_image(5000, 2), &scaler);

        assert_eq!(fitted.outcome, FitOutcome::GaveUp);
        assert_eq!(fitted.dimensions(), (5000, 2));

        let attempts = scaler.attempts.borrow();
        assert_eq!(attempts.first(), Some(&(4096, 2)));
        assert_eq!(attempts.last(), Some(&(1, 1)));
        // strictly decreasing by halves, no repeats after reaching 1x1
        for pair in attempts.windows(2) {
            assert_eq!(pair[1].0, (pair[0].0 / 2).max(1));
            assert_eq!(pair[1].1, (pair[0].1 / 2).max(1));
        }
    }

    #[test]
    fn test_raster_scaler_rejects_surface_beyond_device_max() {
        let scaler = RasterScaler::new(DeviceCaps::with_reported(64));
        let source = blank_image(16, 16);
        let result = scaler.scale(&source, 128, 10);
        assert!(matches!(
            result,
            Err(TextureError::Allocation { width: 128, .. })
        ));
    }

    #[test]
    fn test_oversize_first_attempt_recovers_by_halving() {
        // Device cap below the requested target: the first attempt is
        // rejected up front, the halved one succeeds.
        let caps = DeviceCaps::with_reported(48);
        let fitter = TextureFitter::new(caps, Some(64));
        let scaler = RasterScaler::new(DeviceCaps::with_reported(32));

        let fitted = fitter.fit_image(blank_image(96, 96), &scaler);
        assert_eq!(
            fitted.outcome,
            FitOutcome::Scaled { from: (96, 96) }
        );
        assert_eq!(fitted.dimensions(), (24, 24));
    }
}
