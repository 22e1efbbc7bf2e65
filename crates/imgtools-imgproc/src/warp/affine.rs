use std::f32::consts::PI;

use imgtools_image::{Image, ImageDtype, ImageError};

use crate::interpolation::InterpolationMode;
use crate::parallel;

/// Inverts a 2x3 affine transformation matrix.
///
/// Arguments:
///
/// * `m` - The 2x3 affine transformation matrix.
///
/// Returns:
///
/// The inverted 2x3 affine transformation matrix.
pub fn invert_affine_transform(m: &[f32; 6]) -> [f32; 6] {
    let (a, b, c, d, e, f) = (m[0], m[1], m[2], m[3], m[4], m[5]);

    // follow OpenCV: a singular matrix inverts to zeros
    // https://github.com/opencv/opencv/blob/4.9.0/modules/imgproc/src/imgwarp.cpp#L2765
    let determinant = a * e - b * d;
    let inv_determinant = if determinant != 0.0 {
        1.0 / determinant
    } else {
        0.0
    };

    let new_a = e * inv_determinant;
    let new_b = -b * inv_determinant;
    let new_d = -d * inv_determinant;
    let new_e = a * inv_determinant;
    let new_c = -(new_a * c + new_b * f);
    let new_f = -(new_d * c + new_e * f);

    [new_a, new_b, new_c, new_d, new_e, new_f]
}

/// Returns a 2x3 rotation matrix for a 2D rotation around a center point.
///
/// The rotation matrix is defined as:
///
/// | alpha  beta  tx |
/// | -beta  alpha ty |
///
/// where:
///
/// alpha = scale * cos(angle)
/// beta = scale * sin(angle)
/// tx = (1 - alpha) * center.x - beta * center.y
/// ty = beta * center.x + (1 - alpha) * center.y
///
/// # Arguments
///
/// * `center` - The center point of the rotation.
/// * `angle` - The angle of rotation in degrees, counter-clockwise.
/// * `scale` - The scale factor.
///
/// # Example
///
/// ```
/// use imgtools_imgproc::warp::get_rotation_matrix2d;
///
/// let m = get_rotation_matrix2d((0.0, 0.0), 0.0, 2.0);
/// assert_eq!(m, [2.0, 0.0, 0.0, -0.0, 2.0, 0.0]);
/// ```
pub fn get_rotation_matrix2d(center: (f32, f32), angle: f32, scale: f32) -> [f32; 6] {
    let angle = angle * PI / 180.0f32;
    let alpha = scale * angle.cos();
    let beta = scale * angle.sin();

    let tx = (1.0 - alpha) * center.0 - beta * center.1;
    let ty = beta * center.0 + (1.0 - alpha) * center.1;

    [alpha, beta, tx, -beta, alpha, ty]
}

/// Applies an affine transformation to a point.
fn transform_point(x: f32, y: f32, m: &[f32; 6]) -> (f32, f32) {
    let u = m[0] * x + m[1] * y + m[2];
    let v = m[3] * x + m[4] * y + m[5];
    (u, v)
}

/// Samples channel `k` of `src` at `(u, v)`, reading zero outside the image.
///
/// Bilinear and area sampling blend the border pixels with the zero
/// background, so content fades out over the last pixel instead of smearing.
fn sample_zero_border<T: ImageDtype, const C: usize>(
    src: &Image<T, C>,
    u: f32,
    v: f32,
    k: usize,
    interpolation: InterpolationMode,
) -> f32 {
    let (cols, rows) = (src.cols() as isize, src.rows() as isize);
    let data = src.as_slice();
    let at = |x: isize, y: isize| {
        if x < 0 || y < 0 || x >= cols || y >= rows {
            0.0
        } else {
            data[(y * cols + x) as usize * C + k].to_f32()
        }
    };

    match interpolation {
        InterpolationMode::Nearest => at(u.round() as isize, v.round() as isize),
        InterpolationMode::Bilinear | InterpolationMode::Area => {
            let (x0, y0) = (u.floor(), v.floor());
            let (fx, fy) = (u - x0, v - y0);
            let (x0, y0) = (x0 as isize, y0 as isize);
            at(x0, y0) * (1.0 - fx) * (1.0 - fy)
                + at(x0 + 1, y0) * fx * (1.0 - fy)
                + at(x0, y0 + 1) * (1.0 - fx) * fy
                + at(x0 + 1, y0 + 1) * fx * fy
        }
    }
}

/// Applies an affine transformation to an image.
///
/// Pixels outside the source read as zero. Destination pixels that map
/// entirely outside the source are zero, and bilinear sampling blends the
/// source border with that zero background.
///
/// # Arguments
///
/// * `src` - The input image with shape (height, width, channels).
/// * `dst` - The output image with shape (new_height, new_width, channels).
/// * `m` - The 2x3 affine transformation matrix mapping source to destination.
/// * `interpolation` - The interpolation mode to use.
///
/// # Example
///
/// ```
/// use imgtools_image::{Image, ImageSize};
/// use imgtools_imgproc::interpolation::InterpolationMode;
/// use imgtools_imgproc::warp::warp_affine;
///
/// let src = Image::<_, 3>::from_size_val(
///    ImageSize {
///       width: 4,
///      height: 5,
///  },
///  1f32,
/// ).unwrap();
///
/// let m = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
///
/// let mut dst = Image::<_, 3>::from_size_val(src.size(), 0.0).unwrap();
///
/// warp_affine(&src, &mut dst, &m, InterpolationMode::Nearest).unwrap();
///
/// assert_eq!(dst.as_slice(), src.as_slice());
/// ```
pub fn warp_affine<T: ImageDtype, const C: usize>(
    src: &Image<T, C>,
    dst: &mut Image<T, C>,
    m: &[f32; 6],
    interpolation: InterpolationMode,
) -> Result<(), ImageError> {
    crate::utils::check_not_empty(src)?;

    // invert affine transform matrix to find corresponding positions in src from dst
    let m_inv = invert_affine_transform(m);
    let (src_cols, src_rows) = (src.cols() as f32, src.rows() as f32);

    parallel::par_iter_rows_indexed(dst, |y, dst_row| {
        for (x, dst_pixel) in dst_row.chunks_exact_mut(C).enumerate() {
            let (u, v) = transform_point(x as f32, y as f32, &m_inv);

            // no source pixel within reach
            if u <= -1.0 || u >= src_cols || v <= -1.0 || v >= src_rows {
                dst_pixel.fill(T::default());
                continue;
            }
            for (k, pixel) in dst_pixel.iter_mut().enumerate() {
                *pixel = T::from_f32(sample_zero_border(src, u, v, k, interpolation));
            }
        }
    });

    Ok(())
}

/// Shift an image by `(tx, ty)` pixels. Uncovered pixels become zero.
pub fn translate<T: ImageDtype, const C: usize>(
    src: &Image<T, C>,
    dst: &mut Image<T, C>,
    tx: f32,
    ty: f32,
    interpolation: InterpolationMode,
) -> Result<(), ImageError> {
    warp_affine(src, dst, &[1.0, 0.0, tx, 0.0, 1.0, ty], interpolation)
}

/// Rotate an image counter-clockwise by `angle` degrees around `center`.
///
/// When `center` is `None` the rotation happens around the image center
/// `(width / 2, height / 2)`.
pub fn rotate<T: ImageDtype, const C: usize>(
    src: &Image<T, C>,
    dst: &mut Image<T, C>,
    angle: f32,
    center: Option<(f32, f32)>,
    scale: f32,
    interpolation: InterpolationMode,
) -> Result<(), ImageError> {
    let center = center.unwrap_or(((src.cols() / 2) as f32, (src.rows() / 2) as f32));
    let m = get_rotation_matrix2d(center, angle, scale);
    warp_affine(src, dst, &m, interpolation)
}
