use std::{
    collections::VecDeque,
    ops::{Add, Sub},
    str::FromStr,
};

use imgtools_image::{Image, ImageError};

/// Specification for Border Type.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BorderType {
    /// Perimeter of foreground regions
    Outer,
    /// Perimeter of background regions enclosed by foreground.
    Hole,
}

/// A 2-dimensional point.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point<T> {
    /// x-coordinate.
    pub x: T,
    /// y-coordinate.
    pub y: T,
}

impl<T> Point<T> {
    /// Construct a point at (x, y).
    pub fn new(x: T, y: T) -> Point<T> {
        Point::<T> { x, y }
    }
}

impl<T: num_traits::Num> Add for Point<T> {
    type Output = Self;

    fn add(self, other: Point<T>) -> Point<T> {
        Point::new(self.x + other.x, self.y + other.y)
    }
}

impl<T: num_traits::Num> Sub for Point<T> {
    type Output = Self;

    fn sub(self, other: Point<T>) -> Point<T> {
        Point::new(self.x - other.x, self.y - other.y)
    }
}

/// The border for any region.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Contour {
    /// The points on the border, in tracing order.
    pub points: Vec<Point<i32>>,
    /// The type of the border. Outer or Hole.
    pub border_type: BorderType,
    /// Index of the enclosing contour, if any.
    pub parent: Option<usize>,
}

impl Contour {
    /// Constructor for contour.
    pub fn new(points: Vec<Point<i32>>, border_type: BorderType, parent: Option<usize>) -> Self {
        Contour {
            points,
            border_type,
            parent,
        }
    }
}

/// Which contours [`find_contours`] returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RetrievalMode {
    /// Only the outer borders that no other contour encloses.
    #[default]
    External,
    /// Every border, keeping the parent links.
    List,
}

impl RetrievalMode {
    const NAMES: [&'static str; 2] = ["external", "list"];
}

impl FromStr for RetrievalMode {
    type Err = ImageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "external" => Ok(Self::External),
            "list" => Ok(Self::List),
            _ => Err(ImageError::unknown_option("retrieval mode", s, &Self::NAMES)),
        }
    }
}

// Direction offsets: E, SE, S, SW, W, NW, N, NE.
const DIRECTIONS: [Point<i32>; 8] = [
    Point { x: 1, y: 0 },
    Point { x: 1, y: 1 },
    Point { x: 0, y: 1 },
    Point { x: -1, y: 1 },
    Point { x: -1, y: 0 },
    Point { x: -1, y: -1 },
    Point { x: 0, y: -1 },
    Point { x: 1, y: -1 },
];

fn rotate_to_value<U: PartialEq + Copy>(values: &mut VecDeque<U>, value: U) {
    if let Some(rotate_pos) = values.iter().position(|x| *x == value) {
        values.rotate_left(rotate_pos);
    }
}

/// Finds the borders of the foreground regions of the image. All non zero pixels
/// are treated as foreground.
///
/// Borders are traced with the border following algorithm of Suzuki and Abe,
/// which also recovers the nesting of outer borders and holes.
///
/// # Arguments
///
/// * `src` - The binary source image.
/// * `mode` - Which contours to return.
///
/// # Returns
///
/// The contours in raster order of their starting pixel. Hole contours are
/// reversed so that every contour runs the same way round its region.
///
/// # Example
///
/// ```
/// use imgtools_image::Image;
/// use imgtools_imgproc::contours::{find_contours, RetrievalMode};
///
/// let mut image = Image::<u8, 1>::from_size_val([6, 6].into(), 0).unwrap();
/// for y in 1..4 {
///     for x in 1..5 {
///         image.set_pixel(x, y, 0, 255).unwrap();
///     }
/// }
///
/// let contours = find_contours(&image, RetrievalMode::External);
/// assert_eq!(contours.len(), 1);
/// assert_eq!(contours[0].points.len(), 10);
/// ```
pub fn find_contours(src: &Image<u8, 1>, mode: RetrievalMode) -> Vec<Contour> {
    let width = src.width();
    let height = src.height();
    let mut image_values = src
        .as_slice()
        .iter()
        .map(|&v| i32::from(v > 0))
        .collect::<Vec<_>>();
    let mut contours: Vec<Contour> = Vec::new();
    let mut nbd = 1i32; // new-border label

    let at = |x: usize, y: usize| x + y * width;

    let mut directions = VecDeque::from(DIRECTIONS.to_vec());

    let non_zero_at = |image: &[i32], x: i32, y: i32| {
        let in_bounds = x > -1 && x < width as i32 && y > -1 && y < height as i32;
        if in_bounds && image[at(x as usize, y as usize)] != 0 {
            Some(Point::new(x as usize, y as usize))
        } else {
            None
        }
    };

    for y in 0..height {
        let mut lnbd = 0i32;

        for x in 0..width {
            // Only consider pixels that are foreground.
            if image_values[at(x, y)] == 0 {
                continue;
            }

            // Determine border type and parent.
            let maybe_border = if image_values[at(x, y)] == 1
                && (x == 0 || image_values[at(x - 1, y)] == 0)
            {
                Some((Point::new(x as i32 - 1, y as i32), BorderType::Outer))
            } else if image_values[at(x, y)] >= 1
                && x + 1 < width
                && image_values[at(x + 1, y)] == 0
            {
                if image_values[at(x, y)] > 1 {
                    lnbd = image_values[at(x, y)];
                }
                Some((Point::new(x as i32 + 1, y as i32), BorderType::Hole))
            } else {
                None
            };

            if let Some((adj, border_type)) = maybe_border {
                nbd += 1;

                let parent = if lnbd.abs() >= 2 {
                    let parent_index = (lnbd.abs() - 2) as usize;
                    let parent_contour = &contours[parent_index];
                    if (border_type == BorderType::Outer)
                        ^ (parent_contour.border_type == BorderType::Outer)
                    {
                        Some(parent_index)
                    } else {
                        parent_contour.parent
                    }
                } else {
                    None
                };

                let mut contour_points = Vec::new();
                let curr = Point::new(x, y);
                rotate_to_value(
                    &mut directions,
                    Point::new(adj.x - curr.x as i32, adj.y - curr.y as i32),
                );

                let first = directions.iter().find_map(|diff| {
                    non_zero_at(&image_values, curr.x as i32 + diff.x, curr.y as i32 + diff.y)
                });

                if let Some(pos1) = first {
                    let mut pos2 = pos1;
                    let mut pos3 = curr;

                    loop {
                        contour_points.push(Point::new(pos3.x as i32, pos3.y as i32));

                        rotate_to_value(
                            &mut directions,
                            Point::new(
                                pos2.x as i32 - pos3.x as i32,
                                pos2.y as i32 - pos3.y as i32,
                            ),
                        );

                        // pos2 is foreground, so the search always succeeds
                        let Some(pos4) = directions.iter().rev().find_map(|diff| {
                            non_zero_at(
                                &image_values,
                                pos3.x as i32 + diff.x,
                                pos3.y as i32 + diff.y,
                            )
                        }) else {
                            break;
                        };

                        let mut is_right_edge = false;
                        for diff in directions.iter().rev() {
                            if *diff
                                == Point::new(
                                    pos4.x as i32 - pos3.x as i32,
                                    pos4.y as i32 - pos3.y as i32,
                                )
                            {
                                break;
                            }
                            if *diff == Point::new(1, 0) {
                                is_right_edge = true;
                                break;
                            }
                        }

                        if pos3.x + 1 == width || is_right_edge {
                            image_values[at(pos3.x, pos3.y)] = -nbd;
                        } else if image_values[at(pos3.x, pos3.y)] == 1 {
                            image_values[at(pos3.x, pos3.y)] = nbd;
                        }

                        if pos4 == curr && pos3 == pos1 {
                            break;
                        }
                        pos2 = pos3;
                        pos3 = pos4;
                    }
                } else {
                    // Single pixel contour.
                    contour_points.push(Point::new(x as i32, y as i32));
                    image_values[at(x, y)] = -nbd;
                }

                // if hole border, reverse points to make counter clockwise.
                if border_type == BorderType::Hole {
                    contour_points.reverse();
                }

                contours.push(Contour::new(contour_points, border_type, parent));
            }

            if image_values[at(x, y)] != 1 {
                lnbd = image_values[at(x, y)].abs();
            }
        }
    }

    match mode {
        RetrievalMode::List => contours,
        RetrievalMode::External => contours
            .into_iter()
            .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imgtools_image::ImageSize;
    use std::ops::RangeInclusive;

    fn fill(
        img: &mut Image<u8, 1>,
        xs: RangeInclusive<usize>,
        ys: RangeInclusive<usize>,
        v: u8,
    ) -> Result<(), ImageError> {
        for y in ys {
            for x in xs.clone() {
                img.set_pixel(x, y, 0, v)?;
            }
        }
        Ok(())
    }

    fn create_test_image_basic() -> Result<Image<u8, 1>, ImageError> {
        let mut img = Image::new(
            ImageSize {
                width: 10,
                height: 10,
            },
            vec![0; 10 * 10],
        )?;
        fill(&mut img, 2..=7, 2..=7, 255)?;
        fill(&mut img, 4..=5, 4..=5, 0)?;
        Ok(img)
    }

    fn create_test_image_nested() -> Result<Image<u8, 1>, ImageError> {
        let mut img = Image::new(
            ImageSize {
                width: 20,
                height: 20,
            },
            vec![0; 20 * 20],
        )?;
        fill(&mut img, 2..=17, 2..=17, 255)?;
        fill(&mut img, 5..=14, 5..=14, 0)?;
        fill(&mut img, 8..=11, 8..=11, 255)?;
        Ok(img)
    }

    #[test]
    fn test_basic_contours() -> Result<(), ImageError> {
        let img = create_test_image_basic()?;
        let contours = find_contours(&img, RetrievalMode::List);

        assert_eq!(contours.len(), 2);

        // Outer contour
        let outer = &contours[0];
        assert_eq!(outer.border_type, BorderType::Outer);
        assert!(outer.points.contains(&Point::new(2, 2)));
        assert!(outer.points.contains(&Point::new(7, 2)));
        assert!(outer.points.contains(&Point::new(7, 7)));
        assert!(outer.points.contains(&Point::new(2, 7)));

        // Hole contour
        let hole = &contours[1];
        assert_eq!(hole.border_type, BorderType::Hole);
        assert_eq!(hole.parent, Some(0));
        assert!(hole.points.contains(&Point::new(3, 4)));
        assert!(hole.points.contains(&Point::new(6, 4)));
        assert!(hole.points.contains(&Point::new(5, 6)));
        assert!(hole.points.contains(&Point::new(5, 3)));

        let external = find_contours(&img, RetrievalMode::External);
        assert_eq!(external.len(), 1);
        assert_eq!(external[0], contours[0]);
        Ok(())
    }

    #[test]
    fn test_single_pixel() -> Result<(), ImageError> {
        let mut img = Image::<u8, 1>::from_size_val([5, 5].into(), 0)?;
        img.set_pixel(2, 2, 0, 255)?;

        let contours = find_contours(&img, RetrievalMode::List);
        assert_eq!(contours.len(), 1);
        assert_eq!(contours[0].points, vec![Point::new(2, 2)]);
        assert_eq!(contours[0].border_type, BorderType::Outer);

        Ok(())
    }

    #[test]
    fn test_nested_contours() -> Result<(), ImageError> {
        let img = create_test_image_nested()?;

        let contours = find_contours(&img, RetrievalMode::List);
        assert_eq!(contours.len(), 3);

        // Checking if hierarchy holds.
        assert_eq!(contours[0].border_type, BorderType::Outer);
        assert_eq!(contours[1].border_type, BorderType::Hole);
        assert_eq!(contours[1].parent, Some(0));
        assert_eq!(contours[2].border_type, BorderType::Outer);
        assert_eq!(contours[2].parent, Some(1));

        // the island inside the hole is not external
        assert_eq!(find_contours(&img, RetrievalMode::External).len(), 1);
        Ok(())
    }

    #[test]
    fn test_touching_border_and_separate_blobs() -> Result<(), ImageError> {
        let mut img = Image::<u8, 1>::from_size_val([12, 6].into(), 0)?;
        fill(&mut img, 0..=2, 0..=2, 1)?;
        fill(&mut img, 6..=11, 2..=5, 200)?;

        let contours = find_contours(&img, RetrievalMode::External);
        assert_eq!(contours.len(), 2);
        assert!(contours[0].points.contains(&Point::new(0, 0)));
        assert!(contours[1].points.contains(&Point::new(11, 5)));
        Ok(())
    }

    #[test]
    fn test_retrieval_mode_from_str() {
        assert_eq!("LIST".parse(), Ok(RetrievalMode::List));
        assert!("tree".parse::<RetrievalMode>().is_err());
    }
}
