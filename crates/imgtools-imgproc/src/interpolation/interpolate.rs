use std::str::FromStr;

use super::bilinear::bilinear_interpolation;
use super::nearest::nearest_neighbor_interpolation;
use imgtools_image::{Image, ImageDtype, ImageError};

/// Interpolation mode for the resize and warp operations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InterpolationMode {
    /// Bilinear interpolation
    #[default]
    Bilinear,
    /// Nearest neighbor interpolation
    Nearest,
    /// Box average over the covered source area when shrinking, bilinear otherwise
    Area,
}

impl FromStr for InterpolationMode {
    type Err = ImageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bilinear" | "linear" => Ok(InterpolationMode::Bilinear),
            "nearest" => Ok(InterpolationMode::Nearest),
            "area" => Ok(InterpolationMode::Area),
            _ => Err(ImageError::unknown_option(
                "interpolation mode",
                s,
                &["bilinear", "nearest", "area"],
            )),
        }
    }
}

/// Kernel for interpolating a pixel value
///
/// # Arguments
///
/// * `image` - The input image container with shape (height, width, C).
/// * `u` - The x coordinate of the pixel to interpolate.
/// * `v` - The y coordinate of the pixel to interpolate.
/// * `c` - The channel of the pixel to interpolate.
/// * `interpolation` - The interpolation mode to use.
///
/// Coordinates are clamped to the image, which must not be empty. A single
/// point covers no area, so [`InterpolationMode::Area`] samples bilinearly.
///
/// # Returns
///
/// The interpolated pixel value.
pub fn interpolate_pixel<T: ImageDtype, const C: usize>(
    image: &Image<T, C>,
    u: f32,
    v: f32,
    c: usize,
    interpolation: InterpolationMode,
) -> f32 {
    match interpolation {
        InterpolationMode::Bilinear | InterpolationMode::Area => {
            bilinear_interpolation(image, u, v, c)
        }
        InterpolationMode::Nearest => nearest_neighbor_interpolation(image, u, v, c),
    }
}
