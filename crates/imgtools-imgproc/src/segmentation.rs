use std::{cmp::Reverse, collections::BinaryHeap};

use imgtools_image::{Image, ImageError};
use rayon::{iter::ParallelIterator, slice::ParallelSliceMut};

use crate::{
    color::gray_from_rgb_u8,
    core::subtract,
    morphology::{dilate, morphology_ex, Kernel, MorphOp},
    threshold::{otsu_threshold, ThresholdType},
    utils::check_same_size,
};

// stands in for an unbounded squared distance without producing NaNs
const FAR: f64 = 1e20;

// 1d squared distance transform of a sampled function (Felzenszwalb-Huttenlocher).
// `v` holds the parabola locations and `z` the boundaries between them.
fn edt_1d(f: &[f64], d: &mut [f64], v: &mut [usize], z: &mut [f64]) {
    let n = f.len();
    if n == 0 {
        return;
    }

    let intersect = |q: usize, p: usize| {
        let (qf, pf) = (q as f64, p as f64);
        ((f[q] + qf * qf) - (f[p] + pf * pf)) / (2.0 * qf - 2.0 * pf)
    };

    let mut k = 0;
    v[0] = 0;
    z[0] = f64::NEG_INFINITY;
    z[1] = f64::INFINITY;

    for q in 1..n {
        let mut s = intersect(q, v[k]);
        while k > 0 && s <= z[k] {
            k -= 1;
            s = intersect(q, v[k]);
        }
        k += 1;
        v[k] = q;
        z[k] = s;
        z[k + 1] = f64::INFINITY;
    }

    k = 0;
    for (q, out) in d.iter_mut().enumerate() {
        while z[k + 1] < q as f64 {
            k += 1;
        }
        let dq = q as f64 - v[k] as f64;
        *out = dq * dq + f[v[k]];
    }
}

/// Compute the exact euclidean distance of every pixel to the nearest zero pixel.
///
/// Zero pixels get a distance of 0. When the image has no zero pixel at all
/// every distance is `f32::INFINITY`.
///
/// # Arguments
///
/// * `src` - The binary input image, non zero pixels are foreground.
/// * `dst` - The output distances.
///
/// # Example
///
/// ```
/// use imgtools_image::Image;
/// use imgtools_imgproc::segmentation::distance_transform;
///
/// let image = Image::<u8, 1>::new([5, 1].into(), vec![0, 255, 255, 255, 0]).unwrap();
/// let mut distances = Image::<f32, 1>::from_size_val(image.size(), 0.0).unwrap();
///
/// distance_transform(&image, &mut distances).unwrap();
/// assert_eq!(distances.as_slice(), &[0.0, 1.0, 2.0, 1.0, 0.0]);
/// ```
pub fn distance_transform(src: &Image<u8, 1>, dst: &mut Image<f32, 1>) -> Result<(), ImageError> {
    check_same_size(src, dst)?;

    let (rows, cols) = (src.rows(), src.cols());
    let mut squared = src
        .as_slice()
        .iter()
        .map(|&v| if v == 0 { 0.0 } else { FAR })
        .collect::<Vec<f64>>();

    // columns
    let n = rows.max(cols);
    let mut f = vec![0.0; n];
    let mut d = vec![0.0; n];
    let mut v = vec![0usize; n];
    let mut z = vec![0.0; n + 1];
    for x in 0..cols {
        for y in 0..rows {
            f[y] = squared[y * cols + x];
        }
        edt_1d(&f[..rows], &mut d[..rows], &mut v, &mut z);
        for y in 0..rows {
            squared[y * cols + x] = d[y];
        }
    }

    // rows, independent of each other
    if cols > 0 {
        squared.par_chunks_exact_mut(cols).for_each(|row| {
            let f = row.to_vec();
            let mut v = vec![0usize; cols];
            let mut z = vec![0.0; cols + 1];
            edt_1d(&f, row, &mut v, &mut z);
        });
    }

    dst.as_slice_mut()
        .iter_mut()
        .zip(squared.iter())
        .for_each(|(out, &sq)| {
            *out = if sq >= FAR / 2.0 {
                f32::INFINITY
            } else {
                sq.sqrt() as f32
            };
        });

    Ok(())
}

/// Label the 8-connected components of the non zero pixels.
///
/// Background pixels get label 0 and components are numbered from 1 in
/// raster order of their first pixel.
///
/// # Returns
///
/// The number of components found.
pub fn connected_components(
    src: &Image<u8, 1>,
    labels: &mut Image<i32, 1>,
) -> Result<usize, ImageError> {
    check_same_size(src, labels)?;

    let (rows, cols) = (src.rows() as isize, src.cols() as isize);
    let pixels = src.as_slice();
    let out = labels.as_slice_mut();
    out.fill(0);

    let mut count = 0;
    let mut stack = Vec::new();

    for start in 0..pixels.len() {
        if pixels[start] == 0 || out[start] != 0 {
            continue;
        }

        count += 1;
        let label = count as i32;
        out[start] = label;
        stack.push(start);

        while let Some(idx) = stack.pop() {
            let (x, y) = ((idx as isize) % cols, (idx as isize) / cols);
            for dy in -1..=1 {
                for dx in -1..=1 {
                    let (nx, ny) = (x + dx, y + dy);
                    if nx < 0 || ny < 0 || nx >= cols || ny >= rows {
                        continue;
                    }
                    let nidx = (ny * cols + nx) as usize;
                    if pixels[nidx] != 0 && out[nidx] == 0 {
                        out[nidx] = label;
                        stack.push(nidx);
                    }
                }
            }
        }
    }

    Ok(count)
}

const IN_QUEUE: i32 = -2;
const BOUNDARY: i32 = -1;

// largest absolute channel difference between two pixels
fn color_diff(a: &[u8], b: &[u8]) -> u8 {
    a.iter()
        .zip(b)
        .map(|(&p, &q)| p.abs_diff(q))
        .max()
        .unwrap_or(0)
}

/// Flood a marker image over the color gradient of `src`.
///
/// Positive markers seed the regions and zero marks unknown pixels. Unknown
/// pixels are flooded in order of increasing color difference to an already
/// labeled neighbor (4-connectivity). Pixels where two regions meet are set
/// to `-1`.
///
/// # Arguments
///
/// * `src` - The RGB image driving the flooding.
/// * `markers` - The seed labels, overwritten with the final labels.
pub fn watershed(src: &Image<u8, 3>, markers: &mut Image<i32, 1>) -> Result<(), ImageError> {
    check_same_size(src, markers)?;

    let (rows, cols) = (src.rows(), src.cols());
    let pixels = src.as_slice();
    let labels = markers.as_slice_mut();
    let pixel = |idx: usize| &pixels[idx * 3..idx * 3 + 3];

    let neighbors = |idx: usize| {
        let (x, y) = (idx % cols, idx / cols);
        [
            (x > 0).then(|| idx - 1),
            (x + 1 < cols).then(|| idx + 1),
            (y > 0).then(|| idx - cols),
            (y + 1 < rows).then(|| idx + cols),
        ]
        .into_iter()
        .flatten()
    };

    // min-heap on (priority, insertion order) so equal priorities pop first in first out
    let mut queue = BinaryHeap::new();
    let mut order = 0u64;

    for idx in 0..labels.len() {
        if labels[idx] != 0 {
            continue;
        }
        let priority = neighbors(idx)
            .filter(|&n| labels[n] > 0)
            .map(|n| color_diff(pixel(idx), pixel(n)))
            .min();
        if let Some(priority) = priority {
            queue.push(Reverse((priority, order, idx)));
            order += 1;
            labels[idx] = IN_QUEUE;
        }
    }

    while let Some(Reverse((_, _, idx))) = queue.pop() {
        let mut label = 0;
        for n in neighbors(idx) {
            let t = labels[n];
            if t > 0 {
                if label == 0 {
                    label = t;
                } else if t != label {
                    label = BOUNDARY;
                }
            }
        }
        if label == 0 {
            label = BOUNDARY;
        }
        labels[idx] = label;

        if label == BOUNDARY {
            continue;
        }

        for n in neighbors(idx) {
            if labels[n] == 0 {
                queue.push(Reverse((color_diff(pixel(idx), pixel(n)), order, n)));
                order += 1;
                labels[n] = IN_QUEUE;
            }
        }
    }

    Ok(())
}

/// Parameters of [`watershed_segmentation`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WatershedConfig {
    /// Side of the square structuring element used for cleaning and dilation.
    pub kernel_size: usize,
    /// Iterations of the opening that removes noise from the binary mask.
    pub open_iterations: usize,
    /// Iterations of the dilation giving the sure background.
    pub dilate_iterations: usize,
    /// Fraction of the largest distance above which pixels are sure foreground.
    pub fg_ratio: f32,
    /// Binarization applied after Otsu. The inverse form suits dark objects on a light background.
    pub threshold_type: ThresholdType,
}

impl Default for WatershedConfig {
    fn default() -> Self {
        Self {
            kernel_size: 3,
            open_iterations: 2,
            dilate_iterations: 3,
            fg_ratio: 0.7,
            threshold_type: ThresholdType::BinaryInv,
        }
    }
}

/// The output of [`watershed_segmentation`].
#[derive(Debug, Clone)]
pub struct WatershedResult {
    /// Region labels: 1 is the background, objects start at 2 and boundaries are -1.
    pub labels: Image<i32, 1>,
    /// Number of object regions, the background excluded.
    pub num_regions: usize,
}

/// Segment touching objects with a marker based watershed.
///
/// The image is binarized with Otsu and cleaned with an opening. A dilation
/// gives the sure background and a threshold on the distance transform the
/// sure foreground. The band between them is left for the watershed to decide.
///
/// # Errors
///
/// Fails for empty images, a `fg_ratio` outside `[0, 1)` or an invalid kernel size.
pub fn watershed_segmentation(
    src: &Image<u8, 3>,
    config: &WatershedConfig,
) -> Result<WatershedResult, ImageError> {
    crate::utils::check_not_empty(src)?;
    if !(0.0..1.0).contains(&config.fg_ratio) {
        return Err(ImageError::invalid_parameter(
            "fg_ratio",
            format!("must be in [0, 1), got {}", config.fg_ratio),
        ));
    }
    crate::utils::check_odd_kernel(config.kernel_size)?;

    let size = src.size();
    let kernel = Kernel::rect(config.kernel_size, config.kernel_size)?;

    let mut gray = Image::<u8, 1>::from_size_val(size, 0)?;
    gray_from_rgb_u8(src, &mut gray)?;

    let mut binary = Image::<u8, 1>::from_size_val(size, 0)?;
    otsu_threshold(&gray, &mut binary, 255, config.threshold_type)?;

    let mut opened = Image::<u8, 1>::from_size_val(size, 0)?;
    morphology_ex(
        &binary,
        &mut opened,
        MorphOp::Open,
        &kernel,
        config.open_iterations,
    )?;

    let mut sure_bg = Image::<u8, 1>::from_size_val(size, 0)?;
    dilate(&opened, &mut sure_bg, &kernel, config.dilate_iterations)?;

    let mut distances = Image::<f32, 1>::from_size_val(size, 0.0)?;
    distance_transform(&opened, &mut distances)?;

    let max_distance = distances
        .as_slice()
        .iter()
        .copied()
        .filter(|d| d.is_finite())
        .fold(0.0f32, f32::max);
    let fg_threshold = config.fg_ratio * max_distance;

    let sure_fg = Image::<u8, 1>::new(
        size,
        distances
            .as_slice()
            .iter()
            .map(|&d| if d > fg_threshold { 255 } else { 0 })
            .collect(),
    )?;

    let mut unknown = Image::<u8, 1>::from_size_val(size, 0)?;
    subtract(&sure_bg, &sure_fg, &mut unknown)?;

    let mut markers = Image::<i32, 1>::from_size_val(size, 0)?;
    let num_regions = connected_components(&sure_fg, &mut markers)?;

    markers
        .as_slice_mut()
        .iter_mut()
        .zip(unknown.as_slice())
        .for_each(|(m, &u)| *m = if u != 0 { 0 } else { *m + 1 });

    log::debug!(
        "watershed: max distance {max_distance}, foreground threshold {fg_threshold}, {num_regions} markers"
    );

    if num_regions == 0 {
        log::warn!("watershed: no sure foreground found");
    }

    watershed(src, &mut markers)?;

    Ok(WatershedResult {
        labels: markers,
        num_regions,
    })
}
