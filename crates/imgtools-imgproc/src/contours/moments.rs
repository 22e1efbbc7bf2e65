use imgtools_image::ImageError;

use super::{arc_length, bounding_rect, contour_area, convex_hull, Point, Rect};

/// Spatial, central and normalized central moments of a polygon up to order three.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(missing_docs)]
pub struct Moments {
    pub m00: f64,
    pub m10: f64,
    pub m01: f64,
    pub m20: f64,
    pub m11: f64,
    pub m02: f64,
    pub m30: f64,
    pub m21: f64,
    pub m12: f64,
    pub m03: f64,

    pub mu20: f64,
    pub mu11: f64,
    pub mu02: f64,
    pub mu30: f64,
    pub mu21: f64,
    pub mu12: f64,
    pub mu03: f64,

    pub nu20: f64,
    pub nu11: f64,
    pub nu02: f64,
    pub nu30: f64,
    pub nu21: f64,
    pub nu12: f64,
    pub nu03: f64,
}

impl Moments {
    /// Center of mass, `None` for a degenerate polygon.
    pub fn centroid(&self) -> Option<(f64, f64)> {
        if self.m00.abs() < f64::EPSILON {
            return None;
        }
        Some((self.m10 / self.m00, self.m01 / self.m00))
    }

    /// The seven Hu invariants, insensitive to translation, scale and rotation.
    pub fn hu_moments(&self) -> [f64; 7] {
        let (n20, n11, n02) = (self.nu20, self.nu11, self.nu02);
        let (n30, n21, n12, n03) = (self.nu30, self.nu21, self.nu12, self.nu03);

        let t0 = n30 + n12;
        let t1 = n21 + n03;
        let q0 = t0 * t0;
        let q1 = t1 * t1;
        let n4 = 4.0 * n11;
        let s = n20 + n02;
        let d = n20 - n02;

        [
            s,
            d * d + n4 * n11,
            (n30 - 3.0 * n12).powi(2) + (3.0 * n21 - n03).powi(2),
            q0 + q1,
            (n30 - 3.0 * n12) * t0 * (q0 - 3.0 * q1) + (3.0 * n21 - n03) * t1 * (3.0 * q0 - q1),
            d * (q0 - q1) + n4 * t0 * t1,
            (3.0 * n21 - n03) * t0 * (q0 - 3.0 * q1) - (n30 - 3.0 * n12) * t1 * (3.0 * q0 - q1),
        ]
    }
}

/// Compute the moments of the polygon outlined by `points`.
///
/// The integrals are evaluated over the polygon interior with Green's theorem,
/// so the orientation of the outline does not matter. Polygons with fewer than
/// three points or no area give all zero moments.
pub fn compute_moments(points: &[Point<i32>]) -> Moments {
    if points.len() < 3 {
        return Moments::default();
    }

    let (mut a00, mut a10, mut a01) = (0.0, 0.0, 0.0);
    let (mut a20, mut a11, mut a02) = (0.0, 0.0, 0.0);
    let (mut a30, mut a21, mut a12, mut a03) = (0.0, 0.0, 0.0, 0.0);

    let mut prev = points[points.len() - 1];
    for &p in points {
        let (xp, yp) = (prev.x as f64, prev.y as f64);
        let (x, y) = (p.x as f64, p.y as f64);

        let (xp2, yp2) = (xp * xp, yp * yp);
        let (x2, y2) = (x * x, y * y);
        let dxy = xp * y - x * yp;
        let xs = xp + x;
        let ys = yp + y;

        a00 += dxy;
        a10 += dxy * xs;
        a01 += dxy * ys;
        a20 += dxy * (xp * xs + x2);
        a11 += dxy * (xp * (ys + yp) + x * (ys + y));
        a02 += dxy * (yp * ys + y2);
        a30 += dxy * xs * (xp2 + x2);
        a03 += dxy * ys * (yp2 + y2);
        a21 += dxy * (xp2 * (3.0 * yp + y) + 2.0 * x * xp * ys + x2 * (yp + 3.0 * y));
        a12 += dxy * (yp2 * (3.0 * xp + x) + 2.0 * y * yp * xs + y2 * (xp + 3.0 * x));

        prev = p;
    }

    if a00.abs() < f64::EPSILON {
        return Moments::default();
    }

    // flip clockwise outlines
    let sign = a00.signum();
    let mut m = Moments {
        m00: sign * a00 / 2.0,
        m10: sign * a10 / 6.0,
        m01: sign * a01 / 6.0,
        m20: sign * a20 / 12.0,
        m11: sign * a11 / 24.0,
        m02: sign * a02 / 12.0,
        m30: sign * a30 / 20.0,
        m21: sign * a21 / 60.0,
        m12: sign * a12 / 60.0,
        m03: sign * a03 / 20.0,
        ..Default::default()
    };

    let cx = m.m10 / m.m00;
    let cy = m.m01 / m.m00;

    m.mu20 = m.m20 - m.m10 * cx;
    m.mu11 = m.m11 - m.m10 * cy;
    m.mu02 = m.m02 - m.m01 * cy;
    m.mu30 = m.m30 - cx * (3.0 * m.mu20 + cx * m.m10);
    m.mu21 = m.m21 - cx * (2.0 * m.mu11 + cx * m.m01) - cy * m.mu20;
    m.mu12 = m.m12 - cy * (2.0 * m.mu11 + cy * m.m10) - cx * m.mu02;
    m.mu03 = m.m03 - cy * (3.0 * m.mu02 + cy * m.m01);

    let inv_m00 = 1.0 / m.m00;
    let s2 = inv_m00 * inv_m00;
    let s3 = s2 * inv_m00.sqrt();

    m.nu20 = m.mu20 * s2;
    m.nu11 = m.mu11 * s2;
    m.nu02 = m.mu02 * s2;
    m.nu30 = m.mu30 * s3;
    m.nu21 = m.mu21 * s3;
    m.nu12 = m.mu12 * s3;
    m.nu03 = m.mu03 * s3;

    m
}

/// Geometric description of a closed contour.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ShapeDescriptors {
    /// Enclosed area.
    pub area: f64,
    /// Closed arc length.
    pub perimeter: f64,
    /// Center of mass, falling back to the mean point for degenerate outlines.
    pub centroid: (f64, f64),
    /// Upright bounding box.
    pub bounding_rect: Rect,
    /// Bounding box width over height.
    pub aspect_ratio: f64,
    /// Area over bounding box area.
    pub extent: f64,
    /// Area over convex hull area.
    pub solidity: f64,
    /// `4 * pi * area / perimeter^2`, 1 for a perfect disc.
    pub circularity: f64,
    /// Diameter of the disc with the same area.
    pub equivalent_diameter: f64,
    /// Angle of the major axis in degrees, in `(-90, 90]`.
    pub orientation: f64,
    /// The seven Hu invariants.
    pub hu_moments: [f64; 7],
}

fn ratio(num: f64, den: f64) -> f64 {
    if den > 0.0 {
        num / den
    } else {
        0.0
    }
}

/// Describe the shape outlined by `points`.
///
/// # Errors
///
/// Fails for an empty point list.
///
/// # Example
///
/// ```
/// use imgtools_imgproc::contours::{compute_shape_descriptors, Point};
///
/// let square = [Point::new(0, 0), Point::new(10, 0), Point::new(10, 10), Point::new(0, 10)];
/// let desc = compute_shape_descriptors(&square).unwrap();
///
/// assert_eq!(desc.area, 100.0);
/// assert_eq!(desc.perimeter, 40.0);
/// assert_eq!(desc.centroid, (5.0, 5.0));
/// assert_eq!(desc.solidity, 1.0);
/// ```
pub fn compute_shape_descriptors(points: &[Point<i32>]) -> Result<ShapeDescriptors, ImageError> {
    if points.is_empty() {
        return Err(ImageError::invalid_parameter("points", "contour has no points"));
    }

    let area = contour_area(points);
    let perimeter = arc_length(points, true);
    let moments = compute_moments(points);

    let centroid = moments.centroid().unwrap_or_else(|| {
        let n = points.len() as f64;
        let (sx, sy) = points
            .iter()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x as f64, sy + p.y as f64));
        (sx / n, sy / n)
    });

    let rect = bounding_rect(points);
    let hull_area = contour_area(&convex_hull(points));

    let orientation = if moments.mu20 == moments.mu02 && moments.mu11 == 0.0 {
        0.0
    } else {
        0.5 * (2.0 * moments.mu11).atan2(moments.mu20 - moments.mu02).to_degrees()
    };

    Ok(ShapeDescriptors {
        area,
        perimeter,
        centroid,
        bounding_rect: rect,
        aspect_ratio: ratio(rect.width as f64, rect.height as f64),
        extent: ratio(area, rect.area() as f64),
        solidity: ratio(area, hull_area),
        circularity: ratio(4.0 * std::f64::consts::PI * area, perimeter * perimeter),
        equivalent_diameter: (4.0 * area / std::f64::consts::PI).sqrt(),
        orientation,
        hu_moments: moments.hu_moments(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn rect(x0: i32, y0: i32, x1: i32, y1: i32) -> Vec<Point<i32>> {
        vec![
            Point::new(x0, y0),
            Point::new(x1, y0),
            Point::new(x1, y1),
            Point::new(x0, y1),
        ]
    }

    #[test]
    fn test_rect_moments() {
        let m = compute_moments(&rect(0, 0, 4, 2));
        assert_relative_eq!(m.m00, 8.0);
        assert_relative_eq!(m.m10, 16.0);
        assert_relative_eq!(m.m01, 8.0);
        // w^3 h / 12 and w h^3 / 12 about the centroid
        assert_relative_eq!(m.mu20, 64.0 * 2.0 / 12.0, epsilon = 1e-9);
        assert_relative_eq!(m.mu02, 4.0 * 8.0 / 12.0, epsilon = 1e-9);
        assert_relative_eq!(m.mu11, 0.0, epsilon = 1e-9);
        assert_relative_eq!(m.mu30, 0.0, epsilon = 1e-9);
        assert_eq!(m.centroid(), Some((2.0, 1.0)));

        // orientation of the outline does not matter
        let mut reversed = rect(0, 0, 4, 2);
        reversed.reverse();
        assert_eq!(compute_moments(&reversed), m);

        assert_eq!(compute_moments(&rect(0, 0, 4, 2)[..2]), Moments::default());
        assert_eq!(Moments::default().centroid(), None);
    }

    #[test]
    fn test_hu_moments_invariance() {
        let small = compute_moments(&rect(0, 0, 4, 2)).hu_moments();
        let moved = compute_moments(&rect(10, 20, 14, 22)).hu_moments();
        let scaled = compute_moments(&rect(0, 0, 40, 20)).hu_moments();
        let rotated = compute_moments(&rect(0, 0, 2, 4)).hu_moments();

        for i in 0..7 {
            assert_relative_eq!(small[i], moved[i], epsilon = 1e-9);
            assert_relative_eq!(small[i], scaled[i], epsilon = 1e-9);
            assert_relative_eq!(small[i], rotated[i], epsilon = 1e-9);
        }
        // first invariant of a 2:1 rectangle: (w^2 + h^2) / (12 w h)
        assert_relative_eq!(small[0], 20.0 / 96.0, epsilon = 1e-12);
    }

    #[test]
    fn test_shape_descriptors() -> Result<(), ImageError> {
        let desc = compute_shape_descriptors(&rect(0, 0, 8, 4))?;
        assert_eq!(desc.area, 32.0);
        assert_eq!(desc.perimeter, 24.0);
        assert_eq!(desc.centroid, (4.0, 2.0));
        assert_eq!(desc.aspect_ratio, 9.0 / 5.0);
        assert_relative_eq!(desc.extent, 32.0 / 45.0);
        assert_relative_eq!(desc.solidity, 1.0);
        assert_relative_eq!(desc.circularity, 4.0 * std::f64::consts::PI * 32.0 / 576.0);
        assert_relative_eq!(desc.equivalent_diameter, (128.0 / std::f64::consts::PI).sqrt());
        assert_relative_eq!(desc.orientation, 0.0, epsilon = 1e-9);

        let tall = compute_shape_descriptors(&rect(0, 0, 4, 8))?;
        assert_relative_eq!(tall.orientation.abs(), 90.0, epsilon = 1e-9);

        // a notch lowers the solidity
        let l_shape = [
            Point::new(0, 0),
            Point::new(4, 0),
            Point::new(4, 2),
            Point::new(2, 2),
            Point::new(2, 4),
            Point::new(0, 4),
        ];
        let desc = compute_shape_descriptors(&l_shape)?;
        assert_eq!(desc.area, 12.0);
        assert_relative_eq!(desc.solidity, 12.0 / 14.0);

        let point = compute_shape_descriptors(&[Point::new(3, 3)])?;
        assert_eq!(point.area, 0.0);
        assert_eq!(point.centroid, (3.0, 3.0));
        assert_eq!(point.circularity, 0.0);

        assert!(compute_shape_descriptors(&[]).is_err());
        Ok(())
    }
}
