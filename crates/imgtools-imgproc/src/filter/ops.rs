use imgtools_image::{Image, ImageDtype, ImageError};

use super::{filter2d, kernels, separable_filter, separable_filter_with_border};
use crate::{
    border::BorderMode,
    parallel,
    utils::{check_odd_kernel, check_same_size},
};

/// Blur an image using a box blur filter
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W, C).
/// * `dst` - The destination image with shape (H, W, C).
/// * `kernel_size` - The size of the kernel (kernel_x, kernel_y).
///
/// # Example
///
/// ```
/// use imgtools_image::Image;
/// use imgtools_imgproc::filter::box_blur;
///
/// let image = Image::<u8, 1>::new([3, 1].into(), vec![0, 30, 0]).unwrap();
/// let mut blurred = Image::<u8, 1>::from_size_val(image.size(), 0).unwrap();
///
/// box_blur(&image, &mut blurred, (3, 1)).unwrap();
/// assert_eq!(blurred.as_slice(), &[20, 10, 20]);
/// ```
pub fn box_blur<T: ImageDtype, const C: usize>(
    src: &Image<T, C>,
    dst: &mut Image<T, C>,
    kernel_size: (usize, usize),
) -> Result<(), ImageError> {
    let kernel_x = kernels::box_blur_kernel_1d(kernel_size.0);
    let kernel_y = kernels::box_blur_kernel_1d(kernel_size.1);
    separable_filter(src, dst, &kernel_x, &kernel_y)
}

/// Blur an image using a gaussian blur filter
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W, C).
/// * `dst` - The destination image with shape (H, W, C).
/// * `kernel_size` - The size of the kernel (kernel_x, kernel_y).
/// * `sigma` - The sigma of the gaussian kernel, xy-ordered. Non positive
///   values are derived from the kernel size.
pub fn gaussian_blur<T: ImageDtype, const C: usize>(
    src: &Image<T, C>,
    dst: &mut Image<T, C>,
    kernel_size: (usize, usize),
    sigma: (f32, f32),
) -> Result<(), ImageError> {
    let kernel_x = kernels::gaussian_kernel_1d(kernel_size.0, sigma.0);
    let kernel_y = kernels::gaussian_kernel_1d(kernel_size.1, sigma.1);
    separable_filter(src, dst, &kernel_x, &kernel_y)
}

/// Replace every value by the median of its `kernel_size x kernel_size` neighborhood.
///
/// Borders replicate the outermost pixels.
///
/// # Errors
///
/// The kernel size must be odd.
pub fn median_blur<const C: usize>(
    src: &Image<u8, C>,
    dst: &mut Image<u8, C>,
    kernel_size: usize,
) -> Result<(), ImageError> {
    check_odd_kernel(kernel_size)?;
    check_same_size(src, dst)?;

    let (rows, cols) = (src.rows(), src.cols());
    let half = (kernel_size / 2) as isize;
    let data = src.as_slice();
    let border = BorderMode::Replicate;

    parallel::par_iter_rows_indexed(dst, |y, dst_row| {
        let mut window = Vec::with_capacity(kernel_size * kernel_size);
        for (x, out) in dst_row.chunks_exact_mut(C).enumerate() {
            for (c, o) in out.iter_mut().enumerate() {
                window.clear();
                for dy in -half..=half {
                    let Some(sy) = border.map_index(y as isize + dy, rows) else {
                        continue;
                    };
                    for dx in -half..=half {
                        if let Some(sx) = border.map_index(x as isize + dx, cols) {
                            window.push(data[(sy * cols + sx) * C + c]);
                        }
                    }
                }
                let mid = window.len() / 2;
                *o = *window.select_nth_unstable(mid).1;
            }
        }
    });

    Ok(())
}

/// Edge preserving smoothing that weights neighbors by distance and color similarity.
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W, C).
/// * `dst` - The destination image with shape (H, W, C).
/// * `diameter` - Diameter of the pixel neighborhood. When zero it is derived
///   from `sigma_space`.
/// * `sigma_color` - Range of the color weight. Color distances are summed over channels.
/// * `sigma_space` - Range of the spatial weight.
///
/// # Errors
///
/// Both sigmas must be positive.
pub fn bilateral_filter<const C: usize>(
    src: &Image<u8, C>,
    dst: &mut Image<u8, C>,
    diameter: usize,
    sigma_color: f32,
    sigma_space: f32,
) -> Result<(), ImageError> {
    if sigma_color <= 0.0 {
        return Err(ImageError::invalid_parameter(
            "sigma_color",
            format!("must be positive, got {sigma_color}"),
        ));
    }
    if sigma_space <= 0.0 {
        return Err(ImageError::invalid_parameter(
            "sigma_space",
            format!("must be positive, got {sigma_space}"),
        ));
    }
    check_same_size(src, dst)?;

    let radius = if diameter > 0 {
        (diameter / 2) as isize
    } else {
        (sigma_space * 1.5).round() as isize
    };

    let color_coeff = -0.5 / (sigma_color * sigma_color);
    let space_coeff = -0.5 / (sigma_space * sigma_space);

    // weights for every summed color distance
    let color_lut = (0..=255 * C)
        .map(|d| ((d * d) as f32 * color_coeff).exp())
        .collect::<Vec<_>>();

    // circular window
    let offsets = (-radius..=radius)
        .flat_map(|dy| (-radius..=radius).map(move |dx| (dx, dy)))
        .filter(|(dx, dy)| dx * dx + dy * dy <= radius * radius)
        .map(|(dx, dy)| (dx, dy, ((dx * dx + dy * dy) as f32 * space_coeff).exp()))
        .collect::<Vec<_>>();

    let (rows, cols) = (src.rows(), src.cols());
    let data = src.as_slice();
    let border = BorderMode::Reflect101;

    parallel::par_iter_rows_indexed(dst, |y, dst_row| {
        for (x, out) in dst_row.chunks_exact_mut(C).enumerate() {
            let center = &data[(y * cols + x) * C..(y * cols + x + 1) * C];
            let mut sum = [0.0f32; C];
            let mut wsum = 0.0f32;

            for &(dx, dy, space_w) in &offsets {
                let (Some(sx), Some(sy)) = (
                    border.map_index(x as isize + dx, cols),
                    border.map_index(y as isize + dy, rows),
                ) else {
                    continue;
                };
                let pixel = &data[(sy * cols + sx) * C..(sy * cols + sx + 1) * C];
                let dist = pixel
                    .iter()
                    .zip(center)
                    .map(|(&a, &b)| a.abs_diff(b) as usize)
                    .sum::<usize>();
                let w = space_w * color_lut[dist];
                for (s, &p) in sum.iter_mut().zip(pixel) {
                    *s += w * p as f32;
                }
                wsum += w;
            }

            for (o, s) in out.iter_mut().zip(sum) {
                *o = u8::from_f32(s / wsum);
            }
        }
    });

    Ok(())
}

/// Compute the first order derivatives of an image along x and y.
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W, C).
/// * `dx` - The horizontal derivative with shape (H, W, C).
/// * `dy` - The vertical derivative with shape (H, W, C).
/// * `kernel_size` - The sobel aperture, 3 or 5.
pub fn spatial_gradient<T: ImageDtype, const C: usize>(
    src: &Image<T, C>,
    dx: &mut Image<f32, C>,
    dy: &mut Image<f32, C>,
    kernel_size: usize,
) -> Result<(), ImageError> {
    let (deriv, smooth) = kernels::sobel_kernel_1d(kernel_size)?;
    separable_filter(src, dx, &deriv, &smooth)?;
    separable_filter(src, dy, &smooth, &deriv)
}

/// Compute the sobel gradient magnitude.
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W, C).
/// * `dst` - The destination image with shape (H, W, C).
/// * `kernel_size` - The sobel aperture, 3 or 5.
pub fn sobel<T: ImageDtype, const C: usize>(
    src: &Image<T, C>,
    dst: &mut Image<f32, C>,
    kernel_size: usize,
) -> Result<(), ImageError> {
    check_same_size(src, dst)?;

    let mut gx = Image::<f32, C>::from_size_val(src.size(), 0.0)?;
    let mut gy = Image::<f32, C>::from_size_val(src.size(), 0.0)?;
    spatial_gradient(src, &mut gx, &mut gy, kernel_size)?;

    parallel::par_iter_rows_val_two(&gx, &gy, dst, |&gx, &gy, out| {
        *out = (gx * gx + gy * gy).sqrt();
    });

    Ok(())
}

/// Apply the 3x3 laplacian. The output keeps the sign of the response.
pub fn laplacian<T: ImageDtype, const C: usize>(
    src: &Image<T, C>,
    dst: &mut Image<f32, C>,
) -> Result<(), ImageError> {
    filter2d(src, dst, &kernels::laplacian_kernel(), (3, 3))
}

/// Sharpen an image with the 3x3 sharpening kernel.
pub fn sharpen<const C: usize>(
    src: &Image<u8, C>,
    dst: &mut Image<u8, C>,
) -> Result<(), ImageError> {
    filter2d(src, dst, &kernels::sharpen_kernel(), (3, 3))
}

/// Emboss an image with the 3x3 emboss kernel.
pub fn emboss<const C: usize>(
    src: &Image<u8, C>,
    dst: &mut Image<u8, C>,
) -> Result<(), ImageError> {
    filter2d(src, dst, &kernels::emboss_kernel(), (3, 3))
}

/// Sharpen an image by adding back the difference to a gaussian blurred copy.
///
/// `dst = src + amount * (src - blurred)`, leaving pixels whose difference is
/// below `threshold` untouched.
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W, C).
/// * `dst` - The destination image with shape (H, W, C).
/// * `sigma` - The sigma of the blur. The kernel spans `2 * ceil(3 * sigma) + 1` pixels.
/// * `amount` - Strength of the sharpening.
/// * `threshold` - Minimum absolute difference to sharpen.
///
/// # Errors
///
/// `sigma` must be positive.
pub fn unsharp_mask<const C: usize>(
    src: &Image<u8, C>,
    dst: &mut Image<u8, C>,
    sigma: f32,
    amount: f32,
    threshold: f32,
) -> Result<(), ImageError> {
    if sigma <= 0.0 {
        return Err(ImageError::invalid_parameter(
            "sigma",
            format!("must be positive, got {sigma}"),
        ));
    }
    check_same_size(src, dst)?;

    let kernel_size = 2 * (3.0 * sigma).ceil() as usize + 1;
    let kernel = kernels::gaussian_kernel_1d(kernel_size, sigma);

    let mut blurred = Image::<f32, C>::from_size_val(src.size(), 0.0)?;
    separable_filter_with_border(src, &mut blurred, &kernel, &kernel, BorderMode::Reflect101)?;

    parallel::par_iter_rows_val_two(src, &blurred, dst, |&s, &b, out| {
        let diff = s as f32 - b;
        *out = if diff.abs() < threshold {
            s
        } else {
            u8::from_f32(s as f32 + amount * diff)
        };
    });

    Ok(())
}
