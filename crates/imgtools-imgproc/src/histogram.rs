use std::str::FromStr;

use imgtools_image::{Image, ImageError};
use rayon::prelude::*;

use crate::utils::check_same_size;

// slack when comparing accumulated float masses
const CDF_EPS: f32 = 1e-6;

/// Compute the pixel intensity histogram of an image.
///
/// NOTE: this is limited to 8-bit 1-channel images. Counts are added to `hist`.
///
/// # Arguments
///
/// * `src` - The input image to compute the histogram.
/// * `hist` - The output histogram.
/// * `num_bins` - The number of bins to use for the histogram.
///
/// # Errors
///
/// Returns an error if the number of bins is invalid.
///
/// # Example
///
/// ```
/// use imgtools_image::{Image, ImageSize};
/// use imgtools_imgproc::histogram::compute_histogram;
///
/// let image = Image::<u8, 1>::new(
///   ImageSize {
///     width: 3,
///     height: 3,
///   },
///   vec![0, 2, 4, 128, 130, 132, 254, 255, 255],
/// ).unwrap();
///
/// let mut histogram = vec![0; 3];
///
/// compute_histogram(&image, &mut histogram, 3).unwrap();
/// assert_eq!(histogram, vec![3, 3, 3]);
/// ```
pub fn compute_histogram(
    src: &Image<u8, 1>,
    hist: &mut [usize],
    num_bins: usize,
) -> Result<(), ImageError> {
    if num_bins == 0 || num_bins > 256 {
        return Err(ImageError::InvalidHistogramBins(num_bins));
    }

    if hist.len() != num_bins {
        return Err(ImageError::HistogramLengthMismatch(hist.len(), num_bins));
    }

    let mut bin_lut = [0usize; 256];
    for (i, bin) in bin_lut.iter_mut().enumerate() {
        *bin = (i * num_bins) >> 8;
    }

    let counts = src
        .as_slice()
        .par_chunks(4096)
        .fold(
            || vec![0usize; num_bins],
            |mut local, chunk| {
                for &px in chunk {
                    local[bin_lut[px as usize]] += 1;
                }
                local
            },
        )
        .reduce(
            || vec![0usize; num_bins],
            |mut a, b| {
                for (i, val) in b.iter().enumerate() {
                    a[i] += val;
                }
                a
            },
        );

    for (h, c) in hist.iter_mut().zip(counts) {
        *h += c;
    }

    Ok(())
}

/// Compute a histogram of `bins` uniform bins over the half open `range`.
///
/// Values outside `[range.0, range.1)` are ignored, as are pixels where the
/// optional mask is zero.
///
/// # Errors
///
/// Fails for zero bins, an empty range or a mask of a different size.
///
/// # Example
///
/// ```
/// use imgtools_image::Image;
/// use imgtools_imgproc::histogram::calc_histogram;
///
/// let image = Image::<u8, 1>::new([4, 1].into(), vec![0, 10, 200, 255]).unwrap();
/// let hist = calc_histogram(&image, None, 2, (0.0, 256.0)).unwrap();
/// assert_eq!(hist, vec![2.0, 2.0]);
/// ```
pub fn calc_histogram(
    src: &Image<u8, 1>,
    mask: Option<&Image<u8, 1>>,
    bins: usize,
    range: (f32, f32),
) -> Result<Vec<f32>, ImageError> {
    if bins == 0 {
        return Err(ImageError::InvalidHistogramBins(bins));
    }

    let (lo, hi) = range;
    if !(hi > lo) {
        return Err(ImageError::invalid_parameter(
            "range",
            format!("upper bound {hi} must exceed lower bound {lo}"),
        ));
    }

    if let Some(mask) = mask {
        check_same_size(src, mask)?;
    }

    // per intensity bin index, None when the value falls outside the range
    let scale = bins as f32 / (hi - lo);
    let mut bin_lut = [None; 256];
    for (i, bin) in bin_lut.iter_mut().enumerate() {
        let v = i as f32;
        if v >= lo && v < hi {
            *bin = Some((((v - lo) * scale) as usize).min(bins - 1));
        }
    }

    let mut hist = vec![0f32; bins];
    match mask {
        Some(mask) => {
            for (&px, &m) in src.as_slice().iter().zip(mask.as_slice()) {
                if let (true, Some(bin)) = (m != 0, bin_lut[px as usize]) {
                    hist[bin] += 1.0;
                }
            }
        }
        None => {
            for &px in src.as_slice() {
                if let Some(bin) = bin_lut[px as usize] {
                    hist[bin] += 1.0;
                }
            }
        }
    }

    Ok(hist)
}

/// Compute one histogram per channel with [`calc_histogram`].
pub fn calc_histograms<const C: usize>(
    src: &Image<u8, C>,
    mask: Option<&Image<u8, 1>>,
    bins: usize,
    range: (f32, f32),
) -> Result<Vec<Vec<f32>>, ImageError> {
    src.split_channels()?
        .iter()
        .map(|ch| calc_histogram(ch, mask, bins, range))
        .collect()
}

fn histogram_sum(hist: &[f32]) -> Result<f32, ImageError> {
    let total: f32 = hist.iter().sum();
    if total <= 0.0 {
        return Err(ImageError::invalid_parameter(
            "hist",
            "histogram must have a positive total count",
        ));
    }
    Ok(total)
}

/// Cumulative histogram normalized so that the last bin equals one.
///
/// # Example
///
/// ```
/// use imgtools_imgproc::histogram::cumulative_histogram;
///
/// let cdf = cumulative_histogram(&[1.0, 1.0, 2.0]).unwrap();
/// assert_eq!(cdf, vec![0.25, 0.5, 1.0]);
/// ```
pub fn cumulative_histogram(hist: &[f32]) -> Result<Vec<f32>, ImageError> {
    let total = histogram_sum(hist)?;
    let mut acc = 0.0;
    Ok(hist
        .iter()
        .map(|&h| {
            acc += h;
            acc / total
        })
        .collect())
}

/// Scale a histogram so that its bins sum to one.
pub fn normalize_histogram(hist: &[f32]) -> Result<Vec<f32>, ImageError> {
    let total = histogram_sum(hist)?;
    Ok(hist.iter().map(|&h| h / total).collect())
}

/// Metric used by [`compare_histograms`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HistCompareMethod {
    /// Pearson correlation, 1 for identical histograms.
    Correlation,
    /// Chi-square distance, 0 for identical histograms.
    ChiSquare,
    /// Sum of bin-wise minima.
    Intersection,
    /// Bhattacharyya distance, 0 for identical histograms.
    Bhattacharyya,
}

impl FromStr for HistCompareMethod {
    type Err = ImageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "correlation" => Ok(HistCompareMethod::Correlation),
            "chisqr" => Ok(HistCompareMethod::ChiSquare),
            "intersect" => Ok(HistCompareMethod::Intersection),
            "bhattacharyya" => Ok(HistCompareMethod::Bhattacharyya),
            _ => Err(ImageError::unknown_option(
                "histogram comparison method",
                s,
                &["correlation", "chisqr", "intersect", "bhattacharyya"],
            )),
        }
    }
}

/// Compare two histograms of the same length.
///
/// The formulas follow the usual definitions used by vision toolkits, e.g.
/// a correlation of two constant histograms is reported as 1.
pub fn compare_histograms(
    hist1: &[f32],
    hist2: &[f32],
    method: HistCompareMethod,
) -> Result<f64, ImageError> {
    if hist1.len() != hist2.len() {
        return Err(ImageError::HistogramLengthMismatch(hist1.len(), hist2.len()));
    }
    if hist1.is_empty() {
        return Err(ImageError::InvalidHistogramBins(0));
    }

    let pairs = hist1.iter().zip(hist2).map(|(&a, &b)| (a as f64, b as f64));

    let result = match method {
        HistCompareMethod::Correlation => {
            let n = hist1.len() as f64;
            let mean1 = hist1.iter().map(|&a| a as f64).sum::<f64>() / n;
            let mean2 = hist2.iter().map(|&b| b as f64).sum::<f64>() / n;
            let (num, s1, s2) = pairs.fold((0.0, 0.0, 0.0), |(num, s1, s2), (a, b)| {
                let (da, db) = (a - mean1, b - mean2);
                (num + da * db, s1 + da * da, s2 + db * db)
            });
            if (s1 * s2).abs() > f64::EPSILON {
                num / (s1 * s2).sqrt()
            } else {
                1.0
            }
        }
        HistCompareMethod::ChiSquare => pairs
            .filter(|(a, _)| a.abs() > f64::EPSILON)
            .map(|(a, b)| (a - b).powi(2) / a)
            .sum(),
        HistCompareMethod::Intersection => pairs.map(|(a, b)| a.min(b)).sum(),
        HistCompareMethod::Bhattacharyya => {
            let (coeff, s1, s2) = pairs.fold((0.0, 0.0, 0.0), |(coeff, s1, s2), (a, b)| {
                (coeff + (a * b).sqrt(), s1 + a, s2 + b)
            });
            let norm = if (s1 * s2).abs() > f64::EPSILON {
                1.0 / (s1 * s2).sqrt()
            } else {
                1.0
            };
            (1.0 - coeff * norm).max(0.0).sqrt()
        }
    };

    Ok(result)
}

// first level whose cumulative mass reaches `c`
fn inverse_cdf(c: f32, cdf: &[f32]) -> u8 {
    let level = cdf.partition_point(|&v| v < c - CDF_EPS);
    level.min(cdf.len() - 1) as u8
}

/// Remap the intensities of `src` so that its histogram follows `reference`.
///
/// Each channel is matched independently: a source level maps to the first
/// reference level whose cumulative mass reaches the source cumulative mass.
pub fn match_histogram<const C: usize>(
    src: &Image<u8, C>,
    reference: &Image<u8, C>,
    dst: &mut Image<u8, C>,
) -> Result<(), ImageError> {
    check_same_size(src, dst)?;
    crate::utils::check_not_empty(src)?;
    crate::utils::check_not_empty(reference)?;

    let src_hists = calc_histograms(src, None, 256, (0.0, 256.0))?;
    let ref_hists = calc_histograms(reference, None, 256, (0.0, 256.0))?;

    let mut luts = [[0u8; 256]; C];
    for (lut, (src_hist, ref_hist)) in luts.iter_mut().zip(src_hists.iter().zip(&ref_hists)) {
        let src_cdf = cumulative_histogram(src_hist)?;
        let ref_cdf = cumulative_histogram(ref_hist)?;
        for (entry, &c) in lut.iter_mut().zip(&src_cdf) {
            *entry = inverse_cdf(c, &ref_cdf);
        }
    }

    crate::parallel::par_iter_rows(src, dst, |src_pixel, dst_pixel| {
        for c in 0..C {
            dst_pixel[c] = luts[c][src_pixel[c] as usize];
        }
    });

    Ok(())
}

/// Descriptive statistics of a histogram, see [`histogram_stats`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HistogramStats {
    /// Mean bin index.
    pub mean: f64,
    /// First bin where the cumulative mass reaches one half.
    pub median: usize,
    /// Standard deviation of the bin index.
    pub std: f64,
    /// Shannon entropy in bits.
    pub entropy: f64,
}

/// Compute the mean, median, standard deviation and entropy of a histogram.
///
/// The histogram is normalized first so raw counts are accepted.
///
/// # Example
///
/// ```
/// use imgtools_imgproc::histogram::histogram_stats;
///
/// let stats = histogram_stats(&[0.0, 5.0, 0.0, 5.0]).unwrap();
/// assert_eq!(stats.mean, 2.0);
/// assert_eq!(stats.median, 1);
/// assert_eq!(stats.std, 1.0);
/// ```
pub fn histogram_stats(hist: &[f32]) -> Result<HistogramStats, ImageError> {
    let p = normalize_histogram(hist)?;

    let mean: f64 = p.iter().enumerate().map(|(i, &v)| i as f64 * v as f64).sum();
    let variance: f64 = p
        .iter()
        .enumerate()
        .map(|(i, &v)| (i as f64 - mean).powi(2) * v as f64)
        .sum();

    let mut acc = 0.0f64;
    let median = p
        .iter()
        .position(|&v| {
            acc += v as f64;
            acc >= 0.5
        })
        .unwrap_or(p.len() - 1);

    let entropy = -p
        .iter()
        .map(|&v| v as f64 * (v as f64 + 1e-10).log2())
        .sum::<f64>();

    Ok(HistogramStats {
        mean,
        median,
        std: variance.sqrt(),
        entropy,
    })
}
