use std::str::FromStr;

use imgtools_image::{Image, ImageError};

use crate::{
    border::BorderMode,
    filter::{kernels, separable_filter_with_border},
    histogram::compute_histogram,
    parallel,
    utils::check_same_size,
};

/// The type of thresholding to apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ThresholdType {
    /// Binary thresholding: values above the threshold become `max_value`.
    #[default]
    Binary,
    /// Inverse binary thresholding: values above the threshold become zero.
    BinaryInv,
}

impl ThresholdType {
    const NAMES: [&'static str; 2] = ["binary", "binary_inv"];
}

impl FromStr for ThresholdType {
    type Err = ImageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "binary" => Ok(Self::Binary),
            "binary_inv" => Ok(Self::BinaryInv),
            _ => Err(ImageError::unknown_option(
                "threshold type",
                s,
                &Self::NAMES,
            )),
        }
    }
}

/// How the local threshold of [`adaptive_threshold`] is computed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AdaptiveMethod {
    /// Plain mean of the block.
    Mean,
    /// Gaussian weighted mean of the block.
    #[default]
    Gaussian,
}

impl AdaptiveMethod {
    const NAMES: [&'static str; 2] = ["mean", "gaussian"];
}

impl FromStr for AdaptiveMethod {
    type Err = ImageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mean" => Ok(Self::Mean),
            "gaussian" => Ok(Self::Gaussian),
            _ => Err(ImageError::unknown_option(
                "adaptive method",
                s,
                &Self::NAMES,
            )),
        }
    }
}

// global threshold shared by the automatic methods, `src > threshold` selects
pub(crate) fn threshold_u8<const C: usize>(
    src: &Image<u8, C>,
    dst: &mut Image<u8, C>,
    threshold: u8,
    max_value: u8,
    thresh_type: ThresholdType,
) -> Result<(), ImageError> {
    check_same_size(src, dst)?;

    let (above, below) = match thresh_type {
        ThresholdType::Binary => (max_value, 0),
        ThresholdType::BinaryInv => (0, max_value),
    };

    // run the thresholding operation in parallel
    parallel::par_iter_rows_val(src, dst, |src_pixel, dst_pixel| {
        *dst_pixel = if *src_pixel > threshold { above } else { below };
    });

    Ok(())
}

/// Threshold every pixel against a statistic of its neighborhood.
///
/// A pixel is selected when `src - local_mean > -c`, i.e. when it exceeds the local
/// mean minus `c`. Neighborhoods replicate the image border. The local mean is
/// rounded to `u8`, and a fractional `c` is rounded up for
/// [`ThresholdType::Binary`] and down for [`ThresholdType::BinaryInv`].
///
/// # Arguments
///
/// * `src` - The grayscale input image.
/// * `dst` - The binarized output image.
/// * `max_value` - Value given to selected pixels.
/// * `method` - How the local mean is computed.
/// * `thresh_type` - Whether selected pixels get `max_value` or zero.
/// * `block_size` - Side of the neighborhood, odd and greater than 1.
/// * `c` - Constant subtracted from the local mean.
///
/// # Errors
///
/// Returns [`ImageError::InvalidBlockSize`] for even block sizes or sizes below 3.
pub fn adaptive_threshold(
    src: &Image<u8, 1>,
    dst: &mut Image<u8, 1>,
    max_value: u8,
    method: AdaptiveMethod,
    thresh_type: ThresholdType,
    block_size: usize,
    c: f64,
) -> Result<(), ImageError> {
    if block_size % 2 == 0 || block_size <= 1 {
        return Err(ImageError::InvalidBlockSize(block_size));
    }
    check_same_size(src, dst)?;

    let kernel = match method {
        AdaptiveMethod::Mean => kernels::box_blur_kernel_1d(block_size),
        AdaptiveMethod::Gaussian => kernels::gaussian_kernel_1d(block_size, 0.0),
    };

    let mut mean = Image::<u8, 1>::from_size_val(src.size(), 0)?;
    separable_filter_with_border(src, &mut mean, &kernel, &kernel, BorderMode::Replicate)?;

    let (delta, selected, rejected) = match thresh_type {
        ThresholdType::Binary => (c.ceil() as i32, max_value, 0),
        ThresholdType::BinaryInv => (c.floor() as i32, 0, max_value),
    };

    parallel::par_iter_rows_val_two(src, &mean, dst, |&s, &m, out| {
        *out = if s as i32 - m as i32 > -delta {
            selected
        } else {
            rejected
        };
    });

    Ok(())
}

/// Binarize an image with the threshold that maximizes the between-class variance.
///
/// # Arguments
///
/// * `src` - The grayscale input image.
/// * `dst` - The output image.
/// * `max_value` - The value given to pixels above the threshold (below for
///   [`ThresholdType::BinaryInv`]).
/// * `thresh_type` - The binarization type.
///
/// # Returns
///
/// The threshold found.
///
/// # Example
///
/// ```
/// use imgtools_image::{Image, ImageSize};
/// use imgtools_imgproc::threshold::{otsu_threshold, ThresholdType};
///
/// let data = vec![100u8, 200, 50, 150, 200, 250];
/// let image = Image::<_, 1>::new(
///    ImageSize {
///       width: 2,
///     height: 3,
///   },
///   data,
/// ).unwrap();
///
/// let mut thresholded = Image::<_, 1>::from_size_val(image.size(), 0).unwrap();
///
/// let t = otsu_threshold(&image, &mut thresholded, 255, ThresholdType::Binary).unwrap();
///
/// assert_eq!(t, 100.0);
/// assert_eq!(thresholded.as_slice(), [0, 255, 0, 255, 255, 255]);
/// ```
pub fn otsu_threshold(
    src: &Image<u8, 1>,
    dst: &mut Image<u8, 1>,
    max_value: u8,
    thresh_type: ThresholdType,
) -> Result<f64, ImageError> {
    check_same_size(src, dst)?;

    const BINS: usize = 256;
    let mut histogram = [0usize; BINS];
    compute_histogram(src, &mut histogram, BINS)?;

    let total_pixels = src.size().area() as f64;

    // Calculate total sum for mean computation
    let sum_total = histogram
        .iter()
        .enumerate()
        .map(|(i, &count)| i as f64 * count as f64)
        .sum::<f64>();

    let mut best_variance = 0.0;
    let mut best_threshold = 0u8;

    // Initialize accumulators
    let mut weight_back = 0.0;
    let mut sum_back = 0.0;

    // Iterate through all possible thresholds
    for (current_threshold, &hist_count) in histogram.iter().enumerate() {
        // Update background class accumulators
        weight_back += hist_count as f64;
        sum_back += current_threshold as f64 * hist_count as f64;

        // Skip empty classes
        if weight_back == 0.0 || weight_back == total_pixels {
            continue;
        }

        // Calculate means for both classes
        let mean_back = sum_back / weight_back;
        let weight_fore = total_pixels - weight_back;
        let mean_fore = (sum_total - sum_back) / weight_fore;

        // Calculate between-class variance
        let variance = weight_back * weight_fore * (mean_back - mean_fore).powi(2);

        if variance > best_variance {
            best_variance = variance;
            best_threshold = current_threshold as u8;
        }
    }

    log::debug!("otsu threshold: {best_threshold}");
    threshold_u8(src, dst, best_threshold, max_value, thresh_type)?;

    Ok(best_threshold as f64)
}

/// Binarize an image with the triangle method.
///
/// A line is drawn from the histogram peak to the far end of the longer tail;
/// the threshold is the bin farthest from that line. Works best on images with
/// one dominant mode, such as sparse foreground on a uniform background.
///
/// # Arguments
///
/// * `src` - The grayscale input image.
/// * `dst` - The output image.
/// * `max_value` - The value given to pixels above the threshold.
/// * `thresh_type` - The binarization type.
///
/// # Returns
///
/// The threshold found.
pub fn triangle_threshold(
    src: &Image<u8, 1>,
    dst: &mut Image<u8, 1>,
    max_value: u8,
    thresh_type: ThresholdType,
) -> Result<f64, ImageError> {
    check_same_size(src, dst)?;

    const BINS: usize = 256;
    let mut hist = [0usize; BINS];
    compute_histogram(src, &mut hist, BINS)?;

    let mut left_bound = hist.iter().position(|&h| h > 0).unwrap_or(0);
    left_bound = left_bound.saturating_sub(1);

    let mut right_bound = hist.iter().rposition(|&h| h > 0).unwrap_or(0);
    if right_bound < BINS - 1 {
        right_bound += 1;
    }

    // first bin holding the maximum count
    let (mut max_ind, max) = hist
        .iter()
        .enumerate()
        .fold((0, 0), |(bi, bm), (i, &h)| if h > bm { (i, h) } else { (bi, bm) });

    // walk along the longer tail
    let flipped = max_ind - left_bound < right_bound - max_ind;
    if flipped {
        hist.reverse();
        left_bound = BINS - 1 - right_bound;
        max_ind = BINS - 1 - max_ind;
    }

    let mut thresh = left_bound;
    let a = max as i64;
    let b = left_bound as i64 - max_ind as i64;
    let mut dist = 0i64;
    for (i, &h) in hist.iter().enumerate().take(max_ind + 1).skip(left_bound + 1) {
        let temp = a * i as i64 + b * h as i64;
        if temp > dist {
            dist = temp;
            thresh = i;
        }
    }
    thresh = thresh.saturating_sub(1);

    if flipped {
        thresh = BINS - 1 - thresh;
    }

    log::debug!("triangle threshold: {thresh}");
    threshold_u8(src, dst, thresh as u8, max_value, thresh_type)?;

    Ok(thresh as f64)
}
