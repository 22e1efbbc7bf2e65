/// An error type for the image and image processing crates.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ImageError {
    /// Error when the data length does not match the image size.
    #[error("Data length ({0}) does not match the image size ({1})")]
    InvalidChannelShape(usize, usize),

    /// Error when two images that must share a size do not.
    #[error("Image size ({0}x{1}) does not match the expected size ({2}x{3})")]
    InvalidImageSize(usize, usize, usize, usize),

    /// Error when the pixel index is out of bounds.
    #[error("Pixel index ({0}, {1}) is out of bounds ({2}, {3})")]
    PixelIndexOutOfBounds(usize, usize, usize, usize),

    /// Error when the channel index is out of bounds.
    #[error("Channel index ({0}) is out of bounds ({1})")]
    ChannelIndexOutOfBounds(usize, usize),

    /// Error when a value cannot be cast to the target pixel type.
    #[error("Failed to cast image data to {0}")]
    CastError(String),

    /// Error when the image has no pixels.
    #[error("Image is empty")]
    EmptyImage,

    /// Error when a kernel size is zero or even.
    #[error("Invalid kernel size {0}: must be odd and greater than zero")]
    InvalidKernelSize(usize),

    /// Error when an adaptive threshold block size is not odd or not greater than one.
    #[error("Invalid block size {0}: must be odd and greater than 1")]
    InvalidBlockSize(usize),

    /// Error when the number of histogram bins is invalid.
    #[error("Invalid number of histogram bins: {0}")]
    InvalidHistogramBins(usize),

    /// Error when the histogram lengths do not match.
    #[error("Histogram lengths do not match ({0} vs {1})")]
    HistogramLengthMismatch(usize, usize),

    /// Error when a crop window does not fit inside the source image.
    #[error("Crop region at ({0}, {1}) with size {2}x{3} exceeds the image bounds")]
    InvalidCropRegion(usize, usize, usize, usize),

    /// Error when a numeric parameter is outside its valid range.
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// The parameter name.
        name: &'static str,
        /// Why the value is rejected.
        reason: String,
    },

    /// Error when an enumerated option string is not recognized.
    #[error("Unknown {kind} '{value}', expected one of: {valid}")]
    UnknownOption {
        /// The option family, e.g. "color space".
        kind: &'static str,
        /// The rejected value.
        value: String,
        /// Comma-separated accepted values.
        valid: String,
    },
}

impl ImageError {
    /// Build an [`ImageError::InvalidParameter`].
    pub fn invalid_parameter(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    /// Build an [`ImageError::UnknownOption`] from the accepted values.
    pub fn unknown_option(kind: &'static str, value: &str, valid: &[&str]) -> Self {
        Self::UnknownOption {
            kind,
            value: value.to_string(),
            valid: valid.join(", "),
        }
    }
}
