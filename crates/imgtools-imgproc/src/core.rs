// reference: https://www.strchr.com/standard_deviation_in_one_pass
use crate::{parallel, utils::check_same_size};
use imgtools_image::{Image, ImageDtype, ImageError, ImageSize};

/// Compute the mean and standard deviation of an image.
///
/// The mean and standard deviation are computed for each channel
/// of the image in one pass.
///
/// # Returns
///
/// A tuple `(std, mean)` with one entry per channel.
///
/// # Example
///
/// ```
/// use imgtools_image::{Image, ImageSize};
/// use imgtools_imgproc::core::std_mean;
///
/// let image = Image::<u8, 3>::new(
///    ImageSize {
///      width: 2,
///      height: 2,
///  },
/// vec![0, 1, 2, 253, 254, 255, 128, 129, 130, 64, 65, 66],
/// ).unwrap();
///
/// let (std, mean) = std_mean(&image);
///
/// assert_eq!(std, [93.5183805462862, 93.5183805462862, 93.5183805462862]);
/// assert_eq!(mean, [111.25, 112.25, 113.25]);
/// ```
pub fn std_mean<T: ImageDtype, const C: usize>(image: &Image<T, C>) -> ([f64; C], [f64; C]) {
    let (sum, sq_sum) = image.as_slice().chunks_exact(C).fold(
        ([0f64; C], [0f64; C]),
        |(mut sum, mut sq_sum), pixel| {
            for (c, val) in pixel.iter().enumerate() {
                let val = val.to_f32() as f64;
                sum[c] += val;
                sq_sum[c] += val * val;
            }
            (sum, sq_sum)
        },
    );

    let n = image.size().area().max(1) as f64;

    let mut mean = [0f64; C];
    let mut std = [0f64; C];
    for c in 0..C {
        mean[c] = sum[c] / n;
        std[c] = (sq_sum[c] / n - mean[c].powi(2)).max(0.0).sqrt();
    }

    (std, mean)
}

fn check_three<T1, T2, T3, const C: usize>(
    src1: &Image<T1, C>,
    src2: &Image<T2, C>,
    dst: &Image<T3, C>,
) -> Result<(), ImageError> {
    check_same_size(src1, src2)?;
    check_same_size(src1, dst)
}

/// Per-element saturating addition of two 8-bit images.
///
/// # Example
///
/// ```
/// use imgtools_image::Image;
/// use imgtools_imgproc::core::add;
///
/// let a = Image::<u8, 1>::new([2, 1].into(), vec![100, 200]).unwrap();
/// let b = Image::<u8, 1>::new([2, 1].into(), vec![100, 100]).unwrap();
/// let mut dst = Image::<u8, 1>::from_size_val(a.size(), 0).unwrap();
///
/// add(&a, &b, &mut dst).unwrap();
/// assert_eq!(dst.as_slice(), &[200, 255]);
/// ```
pub fn add<const C: usize>(
    src1: &Image<u8, C>,
    src2: &Image<u8, C>,
    dst: &mut Image<u8, C>,
) -> Result<(), ImageError> {
    check_three(src1, src2, dst)?;
    parallel::par_iter_rows_val_two(src1, src2, dst, |a, b, out| *out = a.saturating_add(*b));
    Ok(())
}

/// Per-element saturating subtraction `src1 - src2` of two 8-bit images.
pub fn subtract<const C: usize>(
    src1: &Image<u8, C>,
    src2: &Image<u8, C>,
    dst: &mut Image<u8, C>,
) -> Result<(), ImageError> {
    check_three(src1, src2, dst)?;
    parallel::par_iter_rows_val_two(src1, src2, dst, |a, b, out| *out = a.saturating_sub(*b));
    Ok(())
}

/// Per-element saturating multiplication of two 8-bit images.
pub fn multiply<const C: usize>(
    src1: &Image<u8, C>,
    src2: &Image<u8, C>,
    dst: &mut Image<u8, C>,
) -> Result<(), ImageError> {
    check_three(src1, src2, dst)?;
    parallel::par_iter_rows_val_two(src1, src2, dst, |a, b, out| *out = a.saturating_mul(*b));
    Ok(())
}

/// Perform a bitwise AND operation between two images using a mask.
///
/// The mask is a binary image where the value 0 is considered as False
/// and any other value is considered as True.
///
/// # Arguments
///
/// * `src1` - The first input image.
/// * `src2` - The second input image.
/// * `dst` - The output image.
/// * `mask` - The binary mask to apply to the image.
///
/// # Example
///
/// ```
/// use imgtools_image::{Image, ImageSize};
/// use imgtools_imgproc::core::bitwise_and;
///
/// let image = Image::<u8, 3>::new(
///    ImageSize {
///        width: 2,
///        height: 2,
///    },
///    vec![0, 1, 2, 253, 254, 255, 128, 129, 130, 64, 65, 66],
/// ).unwrap();
///
/// let mask = Image::<u8, 1>::new(
///    ImageSize {
///        width: 2,
///        height: 2,
///    },
///    vec![255, 0, 255, 0],
/// ).unwrap();
///
/// let mut output = Image::<u8, 3>::from_size_val(image.size(), 0).unwrap();
///
/// bitwise_and(&image, &image, &mut output, &mask).unwrap();
///
/// assert_eq!(output.as_slice(), &[0, 1, 2, 0, 0, 0, 128, 129, 130, 0, 0, 0]);
/// ```
pub fn bitwise_and<const C: usize>(
    src1: &Image<u8, C>,
    src2: &Image<u8, C>,
    dst: &mut Image<u8, C>,
    mask: &Image<u8, 1>,
) -> Result<(), ImageError> {
    check_three(src1, src2, dst)?;
    check_same_size(src1, mask)?;

    dst.as_slice_mut()
        .chunks_exact_mut(C)
        .zip(src1.as_slice().chunks_exact(C))
        .zip(src2.as_slice().chunks_exact(C))
        .zip(mask.as_slice())
        .for_each(|(((out, a), b), &m)| {
            for c in 0..C {
                out[c] = if m != 0 { a[c] & b[c] } else { 0 };
            }
        });

    Ok(())
}

/// Keep the pixels of `src` where the mask is non zero and zero the rest.
pub fn apply_mask<T, const C: usize>(
    src: &Image<T, C>,
    mask: &Image<u8, 1>,
    dst: &mut Image<T, C>,
) -> Result<(), ImageError>
where
    T: ImageDtype,
{
    check_same_size(src, mask)?;
    check_same_size(src, dst)?;

    dst.as_slice_mut()
        .chunks_exact_mut(C)
        .zip(src.as_slice().chunks_exact(C))
        .zip(mask.as_slice())
        .for_each(|((out, pixel), &m)| {
            if m != 0 {
                out.copy_from_slice(pixel);
            } else {
                out.fill(T::default());
            }
        });

    Ok(())
}

/// Summary of an image, mirroring what a quick inspection would print.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ImageInfo {
    /// Image size in pixels.
    pub size: ImageSize,
    /// Number of channels.
    pub channels: usize,
    /// Pixel data type name.
    pub dtype: &'static str,
    /// Smallest value over all channels.
    pub min: f32,
    /// Largest value over all channels.
    pub max: f32,
}

impl std::fmt::Display for ImageInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}x{}x{} {} [min: {}, max: {}]",
            self.size.height, self.size.width, self.channels, self.dtype, self.min, self.max
        )
    }
}

/// Collect the size, channel count, data type and value range of an image.
///
/// # Errors
///
/// Returns [`ImageError::EmptyImage`] when the image has no pixels.
pub fn image_info<T: ImageDtype, const C: usize>(
    image: &Image<T, C>,
) -> Result<ImageInfo, ImageError> {
    crate::utils::check_not_empty(image)?;

    let (min, max) = image
        .as_slice()
        .iter()
        .fold((f32::MAX, f32::MIN), |(lo, hi), v| {
            let v = v.to_f32();
            (lo.min(v), hi.max(v))
        });

    Ok(ImageInfo {
        size: image.size(),
        channels: C,
        dtype: T::dtype_name(),
        min,
        max,
    })
}

#[cfg(test)]
mod tests {
    use imgtools_image::{Image, ImageError, ImageSize};

    #[test]
    fn test_std_mean() -> Result<(), ImageError> {
        let image = Image::<u8, 3>::new(
            ImageSize {
                width: 2,
                height: 2,
            },
            vec![0, 1, 2, 253, 254, 255, 128, 129, 130, 64, 65, 66],
        )?;

        let (std, mean) = super::std_mean(&image);
        for s in std {
            approx::assert_relative_eq!(s, 93.5183805462862, epsilon = 1e-9);
        }
        assert_eq!(mean, [111.25, 112.25, 113.25]);
        Ok(())
    }

    #[test]
    fn test_bitwise_and() -> Result<(), ImageError> {
        let image = Image::<u8, 3>::new(
            ImageSize {
                width: 2,
                height: 2,
            },
            vec![0, 1, 2, 253, 254, 255, 128, 129, 130, 64, 65, 66],
        )?;

        let mask = Image::<u8, 1>::new(
            ImageSize {
                width: 2,
                height: 2,
            },
            vec![255, 0, 255, 0],
        )?;

        let mut output = Image::<u8, 3>::from_size_val(image.size(), 0)?;

        super::bitwise_and(&image, &image, &mut output, &mask)?;

        assert_eq!(
            output.as_slice(),
            &[0, 1, 2, 0, 0, 0, 128, 129, 130, 0, 0, 0]
        );
        Ok(())
    }

    #[test]
    fn test_saturating_arithmetic() -> Result<(), ImageError> {
        let a = Image::<u8, 1>::new([4, 1].into(), vec![0, 10, 200, 255])?;
        let b = Image::<u8, 1>::new([4, 1].into(), vec![5, 3, 100, 2])?;
        let mut dst = Image::<u8, 1>::from_size_val(a.size(), 0)?;

        super::add(&a, &b, &mut dst)?;
        assert_eq!(dst.as_slice(), &[5, 13, 255, 255]);

        super::subtract(&a, &b, &mut dst)?;
        assert_eq!(dst.as_slice(), &[0, 7, 100, 253]);

        super::multiply(&a, &b, &mut dst)?;
        assert_eq!(dst.as_slice(), &[0, 30, 255, 255]);

        let small = Image::<u8, 1>::from_size_val([2, 1].into(), 0)?;
        assert!(super::add(&a, &small, &mut dst).is_err());
        Ok(())
    }

    #[test]
    fn test_apply_mask() -> Result<(), ImageError> {
        let image = Image::<f32, 1>::new([3, 1].into(), vec![1.5, 2.5, 3.5])?;
        let mask = Image::<u8, 1>::new([3, 1].into(), vec![0, 1, 255])?;
        let mut dst = Image::<f32, 1>::from_size_val(image.size(), -1.0)?;
        super::apply_mask(&image, &mask, &mut dst)?;
        assert_eq!(dst.as_slice(), &[0.0, 2.5, 3.5]);
        Ok(())
    }

    #[test]
    fn test_image_info() -> Result<(), ImageError> {
        let image = Image::<u8, 3>::new([2, 1].into(), vec![3, 9, 1, 200, 7, 8])?;
        let info = super::image_info(&image)?;
        assert_eq!(info.channels, 3);
        assert_eq!(info.dtype, "u8");
        assert_eq!(info.min, 1.0);
        assert_eq!(info.max, 200.0);
        assert_eq!(info.to_string(), "1x2x3 u8 [min: 1, max: 200]");

        let empty = Image::<u8, 1>::new([0, 0].into(), vec![])?;
        assert_eq!(super::image_info(&empty), Err(ImageError::EmptyImage));
        Ok(())
    }
}
