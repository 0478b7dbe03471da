use thiserror::Error;

#[derive(Error, Debug)]
pub enum TextureError {
    /// The download produced no bytes to decode.
    #[error("no image bytes provided")]
    EmptyBuffer,

    /// The bytes were not a decodable image.
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    /// A rescale surface was rejected or could not be produced at the
    /// requested size.
    #[error("cannot produce {width}x{height} surface: {reason}")]
    Allocation {
        width: u32,
        height: u32,
        reason: String,
    },
}
