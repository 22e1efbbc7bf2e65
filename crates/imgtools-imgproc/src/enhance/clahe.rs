use imgtools_image::{Image, ImageError};

use crate::{
    color::{lab_from_rgb_u8, rgb_from_lab_u8},
    parallel,
    utils::{check_not_empty, check_same_size},
};

/// Contrast Limited Adaptive Histogram Equalization.
///
/// The image is split into a grid of tiles. Each tile gets its own equalization
/// lookup table built from a histogram clipped at `clip_limit` times the mean
/// bin count, and pixels blend the tables of the four nearest tile centers.
///
/// # Example
///
/// ```
/// use imgtools_image::Image;
/// use imgtools_imgproc::enhance::Clahe;
///
/// let image = Image::<u8, 1>::new([4, 4].into(), (0..16).map(|v| v * 4).collect()).unwrap();
/// let mut dst = Image::<u8, 1>::from_size_val(image.size(), 0).unwrap();
///
/// Clahe::new(2.0, (2, 2)).apply_gray(&image, &mut dst).unwrap();
/// assert_eq!(dst.size(), image.size());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Clahe {
    /// Histogram clip factor relative to the mean bin height. Zero or less disables clipping.
    pub clip_limit: f32,
    /// Number of tiles along x and y.
    pub grid_size: (usize, usize),
}

impl Default for Clahe {
    fn default() -> Self {
        Self {
            clip_limit: 2.0,
            grid_size: (8, 8),
        }
    }
}

// tile layout of an image under a requested grid
struct TileGrid {
    tile_w: usize,
    tile_h: usize,
    tiles_x: usize,
    tiles_y: usize,
}

impl TileGrid {
    fn new(cols: usize, rows: usize, grid: (usize, usize)) -> Self {
        let tile_w = cols.div_ceil(grid.0.min(cols));
        let tile_h = rows.div_ceil(grid.1.min(rows));
        Self {
            tile_w,
            tile_h,
            tiles_x: cols.div_ceil(tile_w),
            tiles_y: rows.div_ceil(tile_h),
        }
    }

    // neighbouring tile indices and blend weight of the second one
    fn neighbours(pos: usize, tile_len: usize, num_tiles: usize) -> (usize, usize, f32) {
        let f = pos as f32 / tile_len as f32 - 0.5;
        let t1 = f.floor();
        let alpha = f - t1;
        let t1 = t1 as isize;
        let last = num_tiles as isize - 1;
        (t1.clamp(0, last) as usize, (t1 + 1).clamp(0, last) as usize, alpha)
    }
}

impl Clahe {
    /// Create a CLAHE operator.
    pub fn new(clip_limit: f32, grid_size: (usize, usize)) -> Self {
        Self {
            clip_limit,
            grid_size,
        }
    }

    fn tile_lut(&self, hist: &mut [usize; 256], area: usize) -> [u8; 256] {
        if self.clip_limit > 0.0 {
            let limit = ((self.clip_limit * area as f32 / 256.0) as usize).max(1);

            let mut excess = 0;
            for h in hist.iter_mut() {
                if *h > limit {
                    excess += *h - limit;
                    *h = limit;
                }
            }

            // spread the clipped mass evenly, then the remainder with a stride
            let batch = excess / 256;
            let mut residual = excess % 256;
            hist.iter_mut().for_each(|h| *h += batch);
            if residual > 0 {
                let step = (256 / residual).max(1);
                let mut i = 0;
                while i < 256 && residual > 0 {
                    hist[i] += 1;
                    residual -= 1;
                    i += step;
                }
            }
        }

        let scale = 255.0 / area as f32;
        let mut lut = [0u8; 256];
        let mut sum = 0;
        for (v, &h) in lut.iter_mut().zip(hist.iter()) {
            sum += h;
            *v = (sum as f32 * scale).round().min(255.0) as u8;
        }
        lut
    }

    /// Equalize a grayscale image.
    ///
    /// # Errors
    ///
    /// Fails when the grid has a zero dimension, the image is empty or the
    /// sizes of `src` and `dst` differ.
    pub fn apply_gray(&self, src: &Image<u8, 1>, dst: &mut Image<u8, 1>) -> Result<(), ImageError> {
        check_same_size(src, dst)?;
        check_not_empty(src)?;

        if self.grid_size.0 == 0 || self.grid_size.1 == 0 {
            return Err(ImageError::invalid_parameter(
                "grid_size",
                format!("tiles must be non zero, got {:?}", self.grid_size),
            ));
        }

        let (cols, rows) = (src.cols(), src.rows());
        let grid = TileGrid::new(cols, rows, self.grid_size);
        log::debug!(
            "clahe: {}x{} tiles of {}x{} px, clip limit {}",
            grid.tiles_x,
            grid.tiles_y,
            grid.tile_w,
            grid.tile_h,
            self.clip_limit
        );

        let data = src.as_slice();
        let mut luts = Vec::with_capacity(grid.tiles_x * grid.tiles_y);
        for ty in 0..grid.tiles_y {
            let (y0, y1) = (ty * grid.tile_h, ((ty + 1) * grid.tile_h).min(rows));
            for tx in 0..grid.tiles_x {
                let (x0, x1) = (tx * grid.tile_w, ((tx + 1) * grid.tile_w).min(cols));

                let mut hist = [0usize; 256];
                for y in y0..y1 {
                    for &v in &data[y * cols + x0..y * cols + x1] {
                        hist[v as usize] += 1;
                    }
                }
                luts.push(self.tile_lut(&mut hist, (x1 - x0) * (y1 - y0)));
            }
        }

        let x_neighbours: Vec<_> = (0..cols)
            .map(|x| TileGrid::neighbours(x, grid.tile_w, grid.tiles_x))
            .collect();

        parallel::par_iter_rows_indexed(dst, |y, dst_row| {
            let (ty1, ty2, ya) = TileGrid::neighbours(y, grid.tile_h, grid.tiles_y);
            let src_row = &data[y * cols..(y + 1) * cols];

            for ((out, &v), &(tx1, tx2, xa)) in
                dst_row.iter_mut().zip(src_row).zip(x_neighbours.iter())
            {
                let v = v as usize;
                let lut = |ty: usize, tx: usize| luts[ty * grid.tiles_x + tx][v] as f32;

                let top = lut(ty1, tx1) * (1.0 - xa) + lut(ty1, tx2) * xa;
                let bottom = lut(ty2, tx1) * (1.0 - xa) + lut(ty2, tx2) * xa;
                *out = (top * (1.0 - ya) + bottom * ya).round().clamp(0.0, 255.0) as u8;
            }
        });

        Ok(())
    }

    /// Equalize the lightness of an RGB image through its Lab L channel.
    pub fn apply_rgb(&self, src: &Image<u8, 3>, dst: &mut Image<u8, 3>) -> Result<(), ImageError> {
        check_same_size(src, dst)?;

        let mut lab = Image::<u8, 3>::from_size_val(src.size(), 0)?;
        lab_from_rgb_u8(src, &mut lab)?;

        let [l, a, b]: [Image<u8, 1>; 3] = lab
            .split_channels()?
            .try_into()
            .map_err(|_| ImageError::ChannelIndexOutOfBounds(3, 3))?;

        let mut l_eq = Image::<u8, 1>::from_size_val(src.size(), 0)?;
        self.apply_gray(&l, &mut l_eq)?;

        let lab = Image::from_channels(&[l_eq, a, b])?;
        rgb_from_lab_u8(&lab, dst)
    }
}

#[cfg(test)]
mod tests {
    use super::Clahe;
    use imgtools_image::{Image, ImageError};

    #[test]
    fn clahe_flat_image_stays_flat() -> Result<(), ImageError> {
        let image = Image::<u8, 1>::from_size_val([16, 16].into(), 100)?;
        let mut dst = Image::<u8, 1>::from_size_val(image.size(), 0)?;

        Clahe::new(2.0, (2, 2)).apply_gray(&image, &mut dst)?;

        let first = dst.as_slice()[0];
        assert!(dst.as_slice().iter().all(|&v| v == first));
        Ok(())
    }

    #[test]
    fn clahe_stretches_low_contrast() -> Result<(), ImageError> {
        let data = (0..32 * 32).map(|i| 100 + ((i % 32) as u8)).collect();
        let image = Image::<u8, 1>::new([32, 32].into(), data)?;
        let mut dst = Image::<u8, 1>::from_size_val(image.size(), 0)?;

        Clahe::new(4.0, (4, 4)).apply_gray(&image, &mut dst)?;

        let min = dst.as_slice().iter().min().copied().unwrap_or(0);
        let max = dst.as_slice().iter().max().copied().unwrap_or(0);
        assert!(max - min > 31, "range {min}..{max}");
        Ok(())
    }

    #[test]
    fn clahe_invalid_grid() -> Result<(), ImageError> {
        let image = Image::<u8, 1>::from_size_val([4, 4].into(), 0)?;
        let mut dst = image.clone();
        assert!(Clahe::new(2.0, (0, 4)).apply_gray(&image, &mut dst).is_err());
        Ok(())
    }

    #[test]
    fn clahe_grid_larger_than_image() -> Result<(), ImageError> {
        let image = Image::<u8, 1>::new([3, 2].into(), vec![0, 50, 100, 150, 200, 250])?;
        let mut dst = image.clone();
        Clahe::default().apply_gray(&image, &mut dst)?;
        assert_eq!(dst.size(), image.size());
        Ok(())
    }

    #[test]
    fn clahe_rgb_keeps_gray_neutral() -> Result<(), ImageError> {
        let data = (0..16 * 16)
            .flat_map(|i| {
                let v = 60 + (i % 16) as u8 * 4;
                [v, v, v]
            })
            .collect();
        let image = Image::<u8, 3>::new([16, 16].into(), data)?;
        let mut dst = Image::<u8, 3>::from_size_val(image.size(), 0)?;

        Clahe::default().apply_rgb(&image, &mut dst)?;

        for px in dst.as_slice().chunks_exact(3) {
            let hi = px.iter().max().copied().unwrap_or(0);
            let lo = px.iter().min().copied().unwrap_or(0);
            assert!(hi - lo <= 3, "{px:?}");
        }
        Ok(())
    }
}
