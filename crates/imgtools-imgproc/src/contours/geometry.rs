use imgtools_image::ImageError;

use super::Point;

/// An axis aligned rectangle in pixel coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rect {
    /// Left column.
    pub x: i32,
    /// Top row.
    pub y: i32,
    /// Width in pixels.
    pub width: i32,
    /// Height in pixels.
    pub height: i32,
}

impl Rect {
    /// The number of pixels covered.
    pub fn area(&self) -> i64 {
        self.width as i64 * self.height as i64
    }
}

fn to_f64(p: &Point<i32>) -> (f64, f64) {
    (p.x as f64, p.y as f64)
}

/// Length of a polyline, including the closing segment when `closed`.
pub fn arc_length(points: &[Point<i32>], closed: bool) -> f64 {
    let open_length = points
        .windows(2)
        .map(|w| distance(&w[0], &w[1]))
        .sum::<f64>();

    match (closed, points.first(), points.last()) {
        (true, Some(first), Some(last)) if points.len() > 1 => open_length + distance(last, first),
        _ => open_length,
    }
}

fn distance(a: &Point<i32>, b: &Point<i32>) -> f64 {
    let (ax, ay) = to_f64(a);
    let (bx, by) = to_f64(b);
    (ax - bx).hypot(ay - by)
}

// twice the signed polygon area, positive for counter clockwise in a y-up frame
fn signed_area2(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(p, q)| p.x as f64 * q.y as f64 - q.x as f64 * p.y as f64)
        .sum()
}

/// Area enclosed by a closed polygon, computed with the shoelace formula.
///
/// The result is always non negative whatever the orientation.
///
/// # Example
///
/// ```
/// use imgtools_imgproc::contours::{contour_area, Point};
///
/// let square = [Point::new(0, 0), Point::new(4, 0), Point::new(4, 4), Point::new(0, 4)];
/// assert_eq!(contour_area(&square), 16.0);
/// ```
pub fn contour_area(points: &[Point<i32>]) -> f64 {
    signed_area2(points).abs() / 2.0
}

/// The smallest upright rectangle holding every point.
///
/// Both ends are inclusive, so a single point gives a 1x1 rectangle and an empty
/// slice gives an empty rectangle at the origin.
pub fn bounding_rect(points: &[Point<i32>]) -> Rect {
    let Some(first) = points.first() else {
        return Rect::default();
    };

    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }

    Rect {
        x: min_x,
        y: min_y,
        width: max_x - min_x + 1,
        height: max_y - min_y + 1,
    }
}

fn cross(o: &Point<i32>, a: &Point<i32>, b: &Point<i32>) -> i64 {
    (a.x as i64 - o.x as i64) * (b.y as i64 - o.y as i64)
        - (a.y as i64 - o.y as i64) * (b.x as i64 - o.x as i64)
}

/// Convex hull of a point set with the monotone chain algorithm.
///
/// Collinear points on the hull edges are dropped. The hull starts at the
/// lowest x (then lowest y) point.
pub fn convex_hull(points: &[Point<i32>]) -> Vec<Point<i32>> {
    let mut sorted = points.to_vec();
    sorted.sort_unstable_by_key(|p| (p.x, p.y));
    sorted.dedup();

    if sorted.len() < 3 {
        return sorted;
    }

    let mut hull: Vec<Point<i32>> = Vec::with_capacity(2 * sorted.len());

    // lower chain
    for p in &sorted {
        while hull.len() >= 2 && cross(&hull[hull.len() - 2], &hull[hull.len() - 1], p) <= 0 {
            hull.pop();
        }
        hull.push(*p);
    }

    // upper chain
    let lower_len = hull.len() + 1;
    for p in sorted.iter().rev().skip(1) {
        while hull.len() >= lower_len
            && cross(&hull[hull.len() - 2], &hull[hull.len() - 1], p) <= 0
        {
            hull.pop();
        }
        hull.push(*p);
    }

    // the last point repeats the first
    hull.pop();
    hull
}

// distance from `p` to the segment `a`-`b`
fn segment_distance(p: &Point<i32>, a: &Point<i32>, b: &Point<i32>) -> f64 {
    let (px, py) = to_f64(p);
    let (ax, ay) = to_f64(a);
    let (bx, by) = to_f64(b);
    let (dx, dy) = (bx - ax, by - ay);
    let len2 = dx * dx + dy * dy;
    if len2 == 0.0 {
        return (px - ax).hypot(py - ay);
    }
    let t = (((px - ax) * dx + (py - ay) * dy) / len2).clamp(0.0, 1.0);
    (px - (ax + t * dx)).hypot(py - (ay + t * dy))
}

// marks the kept points of `points[start..=end]`
fn douglas_peucker(
    points: &[Point<i32>],
    start: usize,
    end: usize,
    epsilon: f64,
    keep: &mut [bool],
) {
    let mut stack = vec![(start, end)];
    while let Some((s, e)) = stack.pop() {
        if e <= s + 1 {
            continue;
        }
        let (mut max_dist, mut index) = (0.0, s);
        for i in s + 1..e {
            let d = segment_distance(&points[i], &points[s], &points[e]);
            if d > max_dist {
                max_dist = d;
                index = i;
            }
        }
        if max_dist > epsilon {
            keep[index] = true;
            stack.push((s, index));
            stack.push((index, e));
        }
    }
}

/// Simplify a polyline with the Douglas-Peucker algorithm.
///
/// Every removed point lies within `epsilon` of the simplified curve. Closed
/// curves are split at the point farthest from the first one so that both
/// halves are simplified independently.
///
/// # Arguments
///
/// * `points` - The curve to simplify.
/// * `epsilon` - Maximum distance between the curve and its approximation.
/// * `closed` - Whether the last point connects back to the first.
///
/// # Errors
///
/// `epsilon` must be non negative.
pub fn approximate_contour(
    points: &[Point<i32>],
    epsilon: f64,
    closed: bool,
) -> Result<Vec<Point<i32>>, ImageError> {
    if epsilon.is_nan() || epsilon < 0.0 {
        return Err(ImageError::invalid_parameter(
            "epsilon",
            format!("must be non negative, got {epsilon}"),
        ));
    }

    let n = points.len();
    if n < 3 {
        return Ok(points.to_vec());
    }

    let mut keep = vec![false; n];
    keep[0] = true;

    if closed {
        // anchor at the point farthest from the start
        let (far, _) = points
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, p)| (i, distance(p, &points[0])))
            .fold((0, 0.0), |best, cur| if cur.1 > best.1 { cur } else { best });
        if far == 0 {
            return Ok(vec![points[0]]);
        }
        keep[far] = true;
        douglas_peucker(points, 0, far, epsilon, &mut keep);

        // second half wraps around to the start
        let mut wrapped = points[far..].to_vec();
        wrapped.push(points[0]);
        let mut keep_wrapped = vec![false; wrapped.len()];
        douglas_peucker(&wrapped, 0, wrapped.len() - 1, epsilon, &mut keep_wrapped);
        for (i, k) in keep_wrapped.iter().enumerate().take(wrapped.len() - 1) {
            if *k {
                keep[far + i] = true;
            }
        }
    } else {
        keep[n - 1] = true;
        douglas_peucker(points, 0, n - 1, epsilon, &mut keep);
    }

    Ok(points
        .iter()
        .zip(keep)
        .filter(|(_, k)| *k)
        .map(|(p, _)| *p)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_outline(lo: i32, hi: i32) -> Vec<Point<i32>> {
        let mut pts = Vec::new();
        for x in lo..hi {
            pts.push(Point::new(x, lo));
        }
        for y in lo..hi {
            pts.push(Point::new(hi, y));
        }
        for x in (lo + 1..=hi).rev() {
            pts.push(Point::new(x, hi));
        }
        for y in (lo + 1..=hi).rev() {
            pts.push(Point::new(lo, y));
        }
        pts
    }

    #[test]
    fn test_area_and_length() {
        let square = square_outline(0, 10);
        assert_eq!(contour_area(&square), 100.0);
        assert_eq!(arc_length(&square, true), 40.0);
        assert_eq!(arc_length(&square, false), 39.0);

        let mut reversed = square.clone();
        reversed.reverse();
        assert_eq!(contour_area(&reversed), 100.0);

        assert_eq!(contour_area(&square[..2]), 0.0);
        assert_eq!(arc_length(&[], true), 0.0);
    }

    #[test]
    fn test_bounding_rect() {
        let rect = bounding_rect(&[Point::new(3, 7), Point::new(5, 2), Point::new(4, 4)]);
        assert_eq!(
            rect,
            Rect {
                x: 3,
                y: 2,
                width: 3,
                height: 6
            }
        );
        assert_eq!(rect.area(), 18);
        assert_eq!(bounding_rect(&[]), Rect::default());
    }

    #[test]
    fn test_convex_hull() {
        let mut points = square_outline(0, 4);
        points.push(Point::new(2, 2));
        points.push(Point::new(1, 3));

        let hull = convex_hull(&points);
        assert_eq!(
            hull,
            vec![
                Point::new(0, 0),
                Point::new(4, 0),
                Point::new(4, 4),
                Point::new(0, 4)
            ]
        );
        assert_eq!(contour_area(&hull), 16.0);

        let two = [Point::new(1, 1), Point::new(0, 0), Point::new(1, 1)];
        assert_eq!(convex_hull(&two), vec![Point::new(0, 0), Point::new(1, 1)]);
    }

    #[test]
    fn test_approximate_contour() -> Result<(), ImageError> {
        let square = square_outline(0, 10);
        let approx = approximate_contour(&square, 1.0, true)?;
        assert_eq!(approx.len(), 4);
        for corner in [
            Point::new(0, 0),
            Point::new(10, 0),
            Point::new(10, 10),
            Point::new(0, 10),
        ] {
            assert!(approx.contains(&corner));
        }

        // an open straight line keeps its end points
        let line = (0..20).map(|x| Point::new(x, x / 10)).collect::<Vec<_>>();
        let approx = approximate_contour(&line, 2.0, false)?;
        assert_eq!(approx, vec![Point::new(0, 0), Point::new(19, 1)]);

        // zero tolerance keeps every corner of a zig-zag
        let zigzag = [
            Point::new(0, 0),
            Point::new(1, 1),
            Point::new(2, 0),
            Point::new(3, 1),
        ];
        assert_eq!(approximate_contour(&zigzag, 0.0, false)?, zigzag.to_vec());

        assert!(approximate_contour(&square, -1.0, true).is_err());
        Ok(())
    }
}
