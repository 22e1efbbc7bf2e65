use imgtools_image::{Image, ImageError};

use crate::{histogram::compute_histogram, parallel, utils::check_same_size};

fn apply_lut<const C: usize>(
    src: &Image<u8, C>,
    dst: &mut Image<u8, C>,
    luts: &[[u8; 256]; C],
) {
    parallel::par_iter_rows(src, dst, |src_pixel, dst_pixel| {
        for c in 0..C {
            dst_pixel[c] = luts[c][src_pixel[c] as usize];
        }
    });
}

/// Equalize the histogram of a grayscale image.
///
/// The cumulative histogram, starting from the first populated level, is
/// stretched over [0, 255]. A constant image is returned unchanged.
///
/// # Example
///
/// ```
/// use imgtools_image::Image;
/// use imgtools_imgproc::enhance::equalize_histogram;
///
/// let image = Image::<u8, 1>::new([4, 1].into(), vec![0, 0, 100, 200]).unwrap();
/// let mut dst = Image::<u8, 1>::from_size_val(image.size(), 0).unwrap();
///
/// equalize_histogram(&image, &mut dst).unwrap();
/// assert_eq!(dst.as_slice(), &[0, 0, 128, 255]);
/// ```
pub fn equalize_histogram(src: &Image<u8, 1>, dst: &mut Image<u8, 1>) -> Result<(), ImageError> {
    check_same_size(src, dst)?;

    let mut hist = [0usize; 256];
    compute_histogram(src, &mut hist, 256)?;

    let total = src.as_slice().len();
    let mut lut = [0u8; 256];

    let Some(first) = hist.iter().position(|&h| h > 0) else {
        return Ok(());
    };

    if hist[first] == total {
        dst.as_slice_mut().fill(first as u8);
        return Ok(());
    }

    let scale = 255.0 / (total - hist[first]) as f32;
    let mut sum = 0usize;
    for i in first + 1..256 {
        sum += hist[i];
        lut[i] = (sum as f32 * scale).round().min(255.0) as u8;
    }

    apply_lut(src, dst, &[lut]);

    Ok(())
}

/// Stretch each channel so that the `cutoff` darkest and brightest fractions
/// of the pixels saturate to 0 and 255.
///
/// The low level is the first intensity whose cumulative count exceeds
/// `cutoff * total`, the high level the first one reaching
/// `(1 - cutoff) * total`. A channel where both levels coincide is copied
/// unchanged.
///
/// # Errors
///
/// Returns [`ImageError::InvalidParameter`] unless `0 <= cutoff < 0.5`.
pub fn auto_contrast<const C: usize>(
    src: &Image<u8, C>,
    dst: &mut Image<u8, C>,
    cutoff: f32,
) -> Result<(), ImageError> {
    if !(0.0..0.5).contains(&cutoff) {
        return Err(ImageError::invalid_parameter(
            "cutoff",
            format!("must be in [0, 0.5), got {cutoff}"),
        ));
    }
    check_same_size(src, dst)?;
    crate::utils::check_not_empty(src)?;

    let mut hists = [[0usize; 256]; C];
    for pixel in src.as_slice().chunks_exact(C) {
        for (hist, &v) in hists.iter_mut().zip(pixel) {
            hist[v as usize] += 1;
        }
    }

    let total = src.size().area() as f32;
    let mut luts = [[0u8; 256]; C];

    for (c, (hist, lut)) in hists.iter().zip(luts.iter_mut()).enumerate() {
        let mut cdf = [0f32; 256];
        let mut acc = 0usize;
        for (d, &h) in cdf.iter_mut().zip(hist) {
            acc += h;
            *d = acc as f32;
        }

        let low = cdf.partition_point(|&v| v <= cutoff * total).min(255);
        let high = cdf.partition_point(|&v| v < (1.0 - cutoff) * total).min(255);

        if high <= low {
            log::warn!("auto_contrast: channel {c} is flat at level {low}, copying it");
            for (i, v) in lut.iter_mut().enumerate() {
                *v = i as u8;
            }
            continue;
        }

        let range = (high - low) as f32;
        for (i, v) in lut.iter_mut().enumerate() {
            let clipped = i.clamp(low, high);
            *v = ((clipped - low) as f32 / range * 255.0) as u8;
        }
    }

    apply_lut(src, dst, &luts);

    Ok(())
}
