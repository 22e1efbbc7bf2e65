use crate::{parallel, utils::check_same_size};
use imgtools_image::{Image, ImageError};

// D65 reference white
const XN: f32 = 0.950_456;
const ZN: f32 = 1.088_754;

const EPSILON: f32 = 216.0 / 24389.0;
const KAPPA: f32 = 24389.0 / 27.0;

#[inline]
fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

#[inline]
fn linear_to_srgb(c: f32) -> f32 {
    if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

#[inline]
fn lab_f(t: f32) -> f32 {
    if t > EPSILON {
        t.cbrt()
    } else {
        (KAPPA * t + 16.0) / 116.0
    }
}

#[inline]
fn lab_f_inv(t: f32) -> f32 {
    let t3 = t * t * t;
    if t3 > EPSILON {
        t3
    } else {
        (116.0 * t - 16.0) / KAPPA
    }
}

/// Convert a normalized sRGB triplet in [0, 1] to CIE L*a*b*.
///
/// Returns `(L, a, b)` with L in [0, 100].
pub fn lab_from_srgb_pixel(r: f32, g: f32, b: f32) -> (f32, f32, f32) {
    let (r, g, b) = (srgb_to_linear(r), srgb_to_linear(g), srgb_to_linear(b));

    let x = 0.412_453 * r + 0.357_580 * g + 0.180_423 * b;
    let y = 0.212_671 * r + 0.715_160 * g + 0.072_169 * b;
    let z = 0.019_334 * r + 0.119_193 * g + 0.950_227 * b;

    let fx = lab_f(x / XN);
    let fy = lab_f(y);
    let fz = lab_f(z / ZN);

    (116.0 * fy - 16.0, 500.0 * (fx - fy), 200.0 * (fy - fz))
}

/// Convert CIE L*a*b* back to a normalized sRGB triplet, clamped to [0, 1].
pub fn srgb_from_lab_pixel(l: f32, a: f32, b: f32) -> (f32, f32, f32) {
    let fy = (l + 16.0) / 116.0;
    let fx = fy + a / 500.0;
    let fz = fy - b / 200.0;

    let x = lab_f_inv(fx) * XN;
    let y = lab_f_inv(fy);
    let z = lab_f_inv(fz) * ZN;

    let r = 3.240_479 * x - 1.537_150 * y - 0.498_535 * z;
    let g = -0.969_256 * x + 1.875_992 * y + 0.041_556 * z;
    let bl = 0.055_648 * x - 0.204_043 * y + 1.057_311 * z;

    (
        linear_to_srgb(r.clamp(0.0, 1.0)),
        linear_to_srgb(g.clamp(0.0, 1.0)),
        linear_to_srgb(bl.clamp(0.0, 1.0)),
    )
}

/// Convert an RGB8 image to an 8-bit Lab image.
///
/// The 8-bit encoding stores `L * 255 / 100`, `a + 128` and `b + 128`.
///
/// # Example
///
/// ```
/// use imgtools_image::Image;
/// use imgtools_imgproc::color::lab_from_rgb_u8;
///
/// let image = Image::<u8, 3>::new([1, 1].into(), vec![255, 255, 255]).unwrap();
/// let mut lab = Image::<u8, 3>::from_size_val(image.size(), 0).unwrap();
///
/// lab_from_rgb_u8(&image, &mut lab).unwrap();
/// assert_eq!(lab.as_slice(), &[255, 128, 128]);
/// ```
pub fn lab_from_rgb_u8(src: &Image<u8, 3>, dst: &mut Image<u8, 3>) -> Result<(), ImageError> {
    check_same_size(src, dst)?;

    parallel::par_iter_rows(src, dst, |src_pixel, dst_pixel| {
        let (l, a, b) = lab_from_srgb_pixel(
            src_pixel[0] as f32 / 255.0,
            src_pixel[1] as f32 / 255.0,
            src_pixel[2] as f32 / 255.0,
        );
        dst_pixel[0] = (l * 255.0 / 100.0).round().clamp(0.0, 255.0) as u8;
        dst_pixel[1] = (a + 128.0).round().clamp(0.0, 255.0) as u8;
        dst_pixel[2] = (b + 128.0).round().clamp(0.0, 255.0) as u8;
    });

    Ok(())
}

/// Convert an 8-bit Lab image, as produced by [`lab_from_rgb_u8`], back to RGB8.
pub fn rgb_from_lab_u8(src: &Image<u8, 3>, dst: &mut Image<u8, 3>) -> Result<(), ImageError> {
    check_same_size(src, dst)?;

    parallel::par_iter_rows(src, dst, |src_pixel, dst_pixel| {
        let l = src_pixel[0] as f32 * 100.0 / 255.0;
        let a = src_pixel[1] as f32 - 128.0;
        let b = src_pixel[2] as f32 - 128.0;
        let (r, g, bl) = srgb_from_lab_pixel(l, a, b);
        dst_pixel[0] = (r * 255.0).round().clamp(0.0, 255.0) as u8;
        dst_pixel[1] = (g * 255.0).round().clamp(0.0, 255.0) as u8;
        dst_pixel[2] = (bl * 255.0).round().clamp(0.0, 255.0) as u8;
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use imgtools_image::{Image, ImageError};

    #[test]
    fn lab_reference_colors() {
        let (l, a, b) = super::lab_from_srgb_pixel(1.0, 0.0, 0.0);
        approx::assert_abs_diff_eq!(l, 53.24, epsilon = 0.1);
        approx::assert_abs_diff_eq!(a, 80.09, epsilon = 0.2);
        approx::assert_abs_diff_eq!(b, 67.20, epsilon = 0.2);

        let (l, a, b) = super::lab_from_srgb_pixel(0.0, 0.0, 0.0);
        approx::assert_abs_diff_eq!(l, 0.0, epsilon = 1e-4);
        approx::assert_abs_diff_eq!(a, 0.0, epsilon = 1e-4);
        approx::assert_abs_diff_eq!(b, 0.0, epsilon = 1e-4);
    }

    #[test]
    fn lab_roundtrip_float() {
        for (r, g, b) in [
            (200.0, 30.0, 40.0),
            (10.0, 180.0, 90.0),
            (60.0, 60.0, 220.0),
            (128.0, 128.0, 128.0),
        ] {
            let (l, a, bb) = super::lab_from_srgb_pixel(r / 255.0, g / 255.0, b / 255.0);
            let (r2, g2, b2) = super::srgb_from_lab_pixel(l, a, bb);
            approx::assert_abs_diff_eq!(r2 * 255.0, r, epsilon = 1e-3 * 255.0);
            approx::assert_abs_diff_eq!(g2 * 255.0, g, epsilon = 1e-3 * 255.0);
            approx::assert_abs_diff_eq!(b2 * 255.0, b, epsilon = 1e-3 * 255.0);
        }
    }

    #[test]
    fn lab_roundtrip_u8() -> Result<(), ImageError> {
        // muted colors: saturated ones near the gamut edge lose more than a
        // few levels once a and b are stored in 8 bits
        #[rustfmt::skip]
        let image = Image::<u8, 3>::new(
            [4, 1].into(),
            vec![
                150, 120, 100,
                90, 110, 140,
                100, 140, 110,
                128, 128, 128,
            ],
        )?;

        let mut lab = Image::<u8, 3>::from_size_val(image.size(), 0)?;
        super::lab_from_rgb_u8(&image, &mut lab)?;

        let mut rgb = Image::<u8, 3>::from_size_val(image.size(), 0)?;
        super::rgb_from_lab_u8(&lab, &mut rgb)?;

        for (a, b) in image.as_slice().iter().zip(rgb.as_slice()) {
            assert!((*a as i32 - *b as i32).abs() <= 6, "{a} vs {b}");
        }

        Ok(())
    }
}
