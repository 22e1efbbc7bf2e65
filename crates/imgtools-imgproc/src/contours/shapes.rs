use imgtools_image::{Image, ImageError};

use super::{
    approximate_contour, arc_length, bounding_rect, compute_moments, contour_area, find_contours,
    Point, Rect, RetrievalMode,
};

/// Parameters of [`detect_shapes`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ShapeDetectorConfig {
    /// Contours enclosing less area are skipped.
    pub min_area: f64,
    /// Approximation tolerance as a fraction of the contour perimeter.
    pub epsilon_ratio: f64,
    /// Minimum circularity for outlines with many vertices to count as circles.
    pub circle_circularity: f64,
}

impl Default for ShapeDetectorConfig {
    fn default() -> Self {
        Self {
            min_area: 50.0,
            epsilon_ratio: 0.02,
            circle_circularity: 0.8,
        }
    }
}

/// The recognized shape families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(missing_docs)]
pub enum ShapeKind {
    Triangle,
    Square,
    Rectangle,
    Pentagon,
    Hexagon,
    Circle,
    Polygon,
}

impl ShapeKind {
    /// Lower case name of the shape.
    pub fn as_str(&self) -> &'static str {
        match self {
            ShapeKind::Triangle => "triangle",
            ShapeKind::Square => "square",
            ShapeKind::Rectangle => "rectangle",
            ShapeKind::Pentagon => "pentagon",
            ShapeKind::Hexagon => "hexagon",
            ShapeKind::Circle => "circle",
            ShapeKind::Polygon => "polygon",
        }
    }
}

impl std::fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified outer contour.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DetectedShape {
    /// The shape family.
    pub kind: ShapeKind,
    /// Vertices of the approximated outline.
    pub vertices: Vec<Point<i32>>,
    /// Area enclosed by the traced contour.
    pub area: f64,
    /// Center of mass of the traced contour.
    pub centroid: (f64, f64),
    /// Upright bounding box of the traced contour.
    pub bounding_rect: Rect,
}

fn classify(vertices: &[Point<i32>], circularity: f64, config: &ShapeDetectorConfig) -> ShapeKind {
    match vertices.len() {
        3 => ShapeKind::Triangle,
        4 => {
            let rect = bounding_rect(vertices);
            let aspect = rect.width as f64 / rect.height as f64;
            if (0.95..=1.05).contains(&aspect) {
                ShapeKind::Square
            } else {
                ShapeKind::Rectangle
            }
        }
        5 => ShapeKind::Pentagon,
        6 => ShapeKind::Hexagon,
        _ if circularity >= config.circle_circularity => ShapeKind::Circle,
        _ => ShapeKind::Polygon,
    }
}

/// Find the outer contours of a binary image and classify them by shape.
///
/// Each contour is simplified with a tolerance of `epsilon_ratio` times its
/// perimeter and named after its vertex count. Four sided outlines with a
/// bounding box aspect within 5% of one are squares. Outlines with more than
/// six vertices are circles when round enough.
///
/// # Arguments
///
/// * `src` - The binary image, non zero pixels are foreground.
/// * `config` - Detection parameters.
///
/// # Returns
///
/// The detected shapes in raster order of their topmost pixel.
pub fn detect_shapes(
    src: &Image<u8, 1>,
    config: &ShapeDetectorConfig,
) -> Result<Vec<DetectedShape>, ImageError> {
    if config.epsilon_ratio < 0.0 {
        return Err(ImageError::invalid_parameter(
            "epsilon_ratio",
            format!("must be non negative, got {}", config.epsilon_ratio),
        ));
    }

    let contours = find_contours(src, RetrievalMode::External);
    if contours.is_empty() {
        log::warn!("no contours found");
    }

    let mut shapes = Vec::new();
    for contour in contours {
        let area = contour_area(&contour.points);
        if area < config.min_area {
            continue;
        }

        let perimeter = arc_length(&contour.points, true);
        let vertices =
            approximate_contour(&contour.points, config.epsilon_ratio * perimeter, true)?;
        let circularity = 4.0 * std::f64::consts::PI * area / (perimeter * perimeter);

        let centroid = compute_moments(&contour.points)
            .centroid()
            .unwrap_or_default();

        shapes.push(DetectedShape {
            kind: classify(&vertices, circularity, config),
            vertices,
            area,
            centroid,
            bounding_rect: bounding_rect(&contour.points),
        });
    }

    log::debug!("detected {} shapes", shapes.len());

    Ok(shapes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draw(img: &mut Image<u8, 1>, inside: impl Fn(i32, i32) -> bool) -> Result<(), ImageError> {
        for y in 0..img.height() {
            for x in 0..img.width() {
                if inside(x as i32, y as i32) {
                    img.set_pixel(x, y, 0, 255)?;
                }
            }
        }
        Ok(())
    }

    #[test]
    fn test_detect_shapes() -> Result<(), ImageError> {
        let mut img = Image::<u8, 1>::from_size_val([160, 50].into(), 0)?;
        // square, rectangle, right triangle, disc and a speck
        draw(&mut img, |x, y| (5..=24).contains(&x) && (5..=24).contains(&y))?;
        draw(&mut img, |x, y| (35..=74).contains(&x) && (10..=29).contains(&y))?;
        draw(&mut img, |x, y| (5..=35).contains(&y) && x >= 85 && x <= 85 + (y - 5))?;
        draw(&mut img, |x, y| (x - 140).pow(2) + (y - 25).pow(2) <= 15 * 15)?;
        draw(&mut img, |x, y| (1..=3).contains(&x) && (45..=47).contains(&y))?;

        let shapes = detect_shapes(&img, &ShapeDetectorConfig::default())?;
        assert_eq!(shapes.len(), 4);

        let kind_at = |x: f64| {
            shapes
                .iter()
                .find(|s| (s.centroid.0 - x).abs() < 15.0)
                .map(|s| s.kind)
        };
        assert_eq!(kind_at(14.5), Some(ShapeKind::Square));
        assert_eq!(kind_at(54.5), Some(ShapeKind::Rectangle));
        assert_eq!(kind_at(95.0), Some(ShapeKind::Triangle));
        assert_eq!(kind_at(140.0), Some(ShapeKind::Circle));

        let square = shapes
            .iter()
            .find(|s| s.kind == ShapeKind::Square)
            .map(|s| s.bounding_rect);
        assert_eq!(
            square,
            Some(Rect {
                x: 5,
                y: 5,
                width: 20,
                height: 20
            })
        );
        Ok(())
    }

    #[test]
    fn test_classify() {
        let config = ShapeDetectorConfig::default();
        let pts = |n: usize| vec![Point::new(0, 0); n];
        assert_eq!(classify(&pts(5), 0.0, &config), ShapeKind::Pentagon);
        assert_eq!(classify(&pts(6), 0.0, &config), ShapeKind::Hexagon);
        assert_eq!(classify(&pts(9), 0.5, &config), ShapeKind::Polygon);
        assert_eq!(classify(&pts(9), 0.9, &config), ShapeKind::Circle);
        assert_eq!(ShapeKind::Hexagon.to_string(), "hexagon");
    }

    #[test]
    fn test_detect_shapes_empty() -> Result<(), ImageError> {
        let img = Image::<u8, 1>::from_size_val([10, 10].into(), 0)?;
        assert!(detect_shapes(&img, &ShapeDetectorConfig::default())?.is_empty());
        Ok(())
    }
}
