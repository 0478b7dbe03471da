//! Image decode and fit-to-bounds pipeline.

mod error;
mod fitter;

pub use error::TextureError;
pub use fitter::{DeviceCaps, FitOutcome, Fitted, RasterScaler, Scaler, TextureFitter};
