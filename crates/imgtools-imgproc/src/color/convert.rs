use std::str::FromStr;

use imgtools_image::{Image, ImageError};

use super::{bgr_from_rgb, gray_from_rgb_u8, hsv_from_rgb_u8, lab_from_rgb_u8};

/// Target color space for [`convert_color`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ColorSpace {
    /// Single channel luminance.
    Gray,
    /// 8-bit hue, saturation, value.
    Hsv,
    /// 8-bit CIE L*a*b*.
    Lab,
    /// Red, green, blue (identity for RGB input).
    Rgb,
    /// Blue, green, red.
    Bgr,
}

impl ColorSpace {
    const NAMES: [&'static str; 5] = ["GRAY", "HSV", "LAB", "RGB", "BGR"];
}

impl FromStr for ColorSpace {
    type Err = ImageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GRAY" => Ok(ColorSpace::Gray),
            "HSV" => Ok(ColorSpace::Hsv),
            "LAB" => Ok(ColorSpace::Lab),
            "RGB" => Ok(ColorSpace::Rgb),
            "BGR" => Ok(ColorSpace::Bgr),
            _ => Err(ImageError::unknown_option("color space", s, &Self::NAMES)),
        }
    }
}

/// Result of a color conversion; the channel count depends on the target space.
#[derive(Debug, Clone, PartialEq)]
pub enum ConvertedImage {
    /// A single channel image.
    Gray(Image<u8, 1>),
    /// A three channel image.
    Color(Image<u8, 3>),
}

impl ConvertedImage {
    /// Number of channels of the converted image.
    pub fn num_channels(&self) -> usize {
        match self {
            ConvertedImage::Gray(_) => 1,
            ConvertedImage::Color(_) => 3,
        }
    }
}

/// Convert an RGB8 image to the requested color space.
///
/// # Example
///
/// ```
/// use imgtools_image::Image;
/// use imgtools_imgproc::color::{convert_color, ColorSpace, ConvertedImage};
///
/// let image = Image::<u8, 3>::new([2, 1].into(), vec![255, 255, 255, 0, 0, 0]).unwrap();
/// let space: ColorSpace = "gray".parse().unwrap();
///
/// match convert_color(&image, space).unwrap() {
///     ConvertedImage::Gray(gray) => assert_eq!(gray.as_slice(), &[255, 0]),
///     ConvertedImage::Color(_) => unreachable!(),
/// }
/// ```
pub fn convert_color(src: &Image<u8, 3>, space: ColorSpace) -> Result<ConvertedImage, ImageError> {
    match space {
        ColorSpace::Gray => {
            let mut dst = Image::<u8, 1>::from_size_val(src.size(), 0)?;
            gray_from_rgb_u8(src, &mut dst)?;
            Ok(ConvertedImage::Gray(dst))
        }
        ColorSpace::Rgb => Ok(ConvertedImage::Color(src.clone())),
        ColorSpace::Hsv | ColorSpace::Lab | ColorSpace::Bgr => {
            let mut dst = Image::<u8, 3>::from_size_val(src.size(), 0)?;
            match space {
                ColorSpace::Hsv => hsv_from_rgb_u8(src, &mut dst)?,
                ColorSpace::Lab => lab_from_rgb_u8(src, &mut dst)?,
                _ => bgr_from_rgb(src, &mut dst)?,
            }
            Ok(ConvertedImage::Color(dst))
        }
    }
}
