use crate::{parallel, utils::check_same_size};
use imgtools_image::{Image, ImageError};

/// Convert an RGB8 image to an 8-bit HSV image.
///
/// The output channels follow the 8-bit convention used by most vision toolkits:
///
/// * H: hue in degrees divided by two, in the range [0, 180).
/// * S: saturation in the range [0, 255].
/// * V: value in the range [0, 255].
///
/// # Example
///
/// ```
/// use imgtools_image::Image;
/// use imgtools_imgproc::color::hsv_from_rgb_u8;
///
/// let image = Image::<u8, 3>::new([1, 1].into(), vec![0, 0, 255]).unwrap();
/// let mut hsv = Image::<u8, 3>::from_size_val(image.size(), 0).unwrap();
///
/// hsv_from_rgb_u8(&image, &mut hsv).unwrap();
/// assert_eq!(hsv.as_slice(), &[120, 255, 255]);
/// ```
pub fn hsv_from_rgb_u8(src: &Image<u8, 3>, dst: &mut Image<u8, 3>) -> Result<(), ImageError> {
    check_same_size(src, dst)?;

    parallel::par_iter_rows(src, dst, |src_pixel, dst_pixel| {
        let r = src_pixel[0] as f32;
        let g = src_pixel[1] as f32;
        let b = src_pixel[2] as f32;

        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let delta = max - min;

        let h = if delta == 0.0 {
            0.0
        } else if max == r {
            60.0 * ((g - b) / delta)
        } else if max == g {
            60.0 * ((b - r) / delta) + 120.0
        } else {
            60.0 * ((r - g) / delta) + 240.0
        };
        let h = if h < 0.0 { h + 360.0 } else { h };

        let s = if max == 0.0 { 0.0 } else { delta / max * 255.0 };

        // 360 degrees wrap back to hue 0
        dst_pixel[0] = ((h / 2.0).round() as u16 % 180) as u8;
        dst_pixel[1] = s.round().clamp(0.0, 255.0) as u8;
        dst_pixel[2] = max as u8;
    });

    Ok(())
}
