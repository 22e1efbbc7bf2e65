use imgtools_image::{Image, ImageError};

use crate::{parallel, utils::check_same_size};

/// Performs weighted addition of two images `src1` and `src2` with weights `alpha`
/// and `beta`, and an optional scalar `gamma`. The formula used is:
///
/// dst(x,y,c) = (src1(x,y,c) * alpha + src2(x,y,c) * beta + gamma)
///
/// # Arguments
///
/// * `src1` - The first input image.
/// * `alpha` - Weight of the first image elements to be multiplied.
/// * `src2` - The second input image.
/// * `beta` - Weight of the second image elements to be multiplied.
/// * `gamma` - Scalar added to each sum.
/// * `dst` - The output image.
///
/// # Errors
///
/// Returns an error if the sizes of `src1`, `src2` and `dst` do not match.
pub fn add_weighted<T, const C: usize>(
    src1: &Image<T, C>,
    alpha: T,
    src2: &Image<T, C>,
    beta: T,
    gamma: T,
    dst: &mut Image<T, C>,
) -> Result<(), ImageError>
where
    T: num_traits::Float + Send + Sync,
{
    check_same_size(src1, src2)?;
    check_same_size(src1, dst)?;

    parallel::par_iter_rows_val_two(src1, src2, dst, |&src1_pixel, &src2_pixel, dst_pixel| {
        *dst_pixel = (src1_pixel * alpha) + (src2_pixel * beta) + gamma;
    });

    Ok(())
}

/// Scale, shift and take the absolute value of an 8-bit image:
///
/// dst(x,y,c) = saturate(|src(x,y,c) * alpha + beta|)
///
/// # Example
///
/// ```
/// use imgtools_image::Image;
/// use imgtools_imgproc::enhance::convert_scale_abs;
///
/// let image = Image::<u8, 1>::new([3, 1].into(), vec![10, 100, 200]).unwrap();
/// let mut dst = Image::<u8, 1>::from_size_val(image.size(), 0).unwrap();
///
/// convert_scale_abs(&image, &mut dst, 1.5, -20.0).unwrap();
/// assert_eq!(dst.as_slice(), &[5, 130, 255]);
/// ```
pub fn convert_scale_abs<const C: usize>(
    src: &Image<u8, C>,
    dst: &mut Image<u8, C>,
    alpha: f32,
    beta: f32,
) -> Result<(), ImageError> {
    check_same_size(src, dst)?;

    let mut lut = [0u8; 256];
    for (i, v) in lut.iter_mut().enumerate() {
        *v = (i as f32 * alpha + beta).abs().round().min(255.0) as u8;
    }

    parallel::par_iter_rows_val(src, dst, |&src_pixel, dst_pixel| {
        *dst_pixel = lut[src_pixel as usize];
    });

    Ok(())
}

/// Add `beta` to every pixel, saturating to [0, 255].
pub fn adjust_brightness<const C: usize>(
    src: &Image<u8, C>,
    dst: &mut Image<u8, C>,
    beta: f32,
) -> Result<(), ImageError> {
    convert_scale_abs(src, dst, 1.0, beta)
}

/// Multiply every pixel by `alpha`, saturating to [0, 255].
pub fn adjust_contrast<const C: usize>(
    src: &Image<u8, C>,
    dst: &mut Image<u8, C>,
    alpha: f32,
) -> Result<(), ImageError> {
    convert_scale_abs(src, dst, alpha, 0.0)
}

/// Apply contrast `alpha` and brightness `beta` in one pass.
pub fn adjust_brightness_contrast<const C: usize>(
    src: &Image<u8, C>,
    dst: &mut Image<u8, C>,
    alpha: f32,
    beta: f32,
) -> Result<(), ImageError> {
    convert_scale_abs(src, dst, alpha, beta)
}

/// Apply gamma correction through a lookup table:
///
/// dst = ((src / 255) ^ (1 / gamma)) * 255
///
/// A gamma above one brightens the image, below one darkens it.
///
/// # Errors
///
/// Returns [`ImageError::InvalidParameter`] when `gamma <= 0`.
pub fn gamma_correction<const C: usize>(
    src: &Image<u8, C>,
    dst: &mut Image<u8, C>,
    gamma: f32,
) -> Result<(), ImageError> {
    if !(gamma > 0.0) {
        return Err(ImageError::invalid_parameter(
            "gamma",
            format!("must be greater than 0, got {gamma}"),
        ));
    }
    check_same_size(src, dst)?;

    let inv_gamma = 1.0 / gamma as f64;
    let mut lut = [0u8; 256];
    for (i, v) in lut.iter_mut().enumerate() {
        *v = ((i as f64 / 255.0).powf(inv_gamma) * 255.0) as u8;
    }

    parallel::par_iter_rows_val(src, dst, |&src_pixel, dst_pixel| {
        *dst_pixel = lut[src_pixel as usize];
    });

    Ok(())
}
