//! Contour extraction and contour based shape analysis.

mod find;
pub use find::{find_contours, BorderType, Contour, Point, RetrievalMode};

mod geometry;
pub use geometry::{
    approximate_contour, arc_length, bounding_rect, contour_area, convex_hull, Rect,
};

mod moments;
pub use moments::{compute_moments, compute_shape_descriptors, Moments, ShapeDescriptors};

mod shapes;
pub use shapes::{detect_shapes, DetectedShape, ShapeDetectorConfig, ShapeKind};
