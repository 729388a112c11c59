//! Axis-aligned rectangle geometry
//!
//! All functions here are total: they accept any finite coordinates, including
//! degenerate (zero-area or inverted) boxes, and never divide by zero.

use serde::{Deserialize, Serialize};

/// Bounding box in image pixel coordinates (corner format)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct BoundingBox {
    /// Left edge
    pub x_min: f32,
    /// Top edge
    pub y_min: f32,
    /// Right edge
    pub x_max: f32,
    /// Bottom edge
    pub y_max: f32,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates
    #[must_use]
    pub fn new(x_min: f32, y_min: f32, x_max: f32, y_max: f32) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    /// Create a bounding box from centre coordinates and size
    #[must_use]
    pub fn from_center(cx: f32, cy: f32, width: f32, height: f32) -> Self {
        Self::new(
            cx - width / 2.0,
            cy - height / 2.0,
            cx + width / 2.0,
            cy + height / 2.0,
        )
    }

    #[must_use]
    #[inline]
    pub fn width(&self) -> f32 {
        self.x_max - self.x_min
    }

    #[must_use]
    #[inline]
    pub fn height(&self) -> f32 {
        self.y_max - self.y_min
    }

    /// Area of the box; degenerate boxes have zero area
    #[must_use]
    #[inline]
    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    /// Get center coordinates
    #[must_use]
    pub fn center(&self) -> (f32, f32) {
        (
            (self.x_min + self.x_max) / 2.0,
            (self.y_min + self.y_max) / 2.0,
        )
    }

    /// All coordinates finite and both axes strictly ordered
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        [self.x_min, self.y_min, self.x_max, self.y_max]
            .iter()
            .all(|v| v.is_finite())
            && self.x_min < self.x_max
            && self.y_min < self.y_max
    }

    /// Clamp every edge into `[0, width] x [0, height]`
    ///
    /// The result may be degenerate when the box lies outside the image.
    #[must_use]
    pub fn clip_to(&self, width: f32, height: f32) -> Self {
        Self::new(
            self.x_min.max(0.0).min(width),
            self.y_min.max(0.0).min(height),
            self.x_max.max(0.0).min(width),
            self.y_max.max(0.0).min(height),
        )
    }

    /// Intersection over Union with another box
    #[must_use]
    #[inline]
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        overlap_ratio(self, other)
    }

    /// Whether `other` lies entirely inside this box (edges inclusive)
    #[must_use]
    #[inline]
    pub fn contains(&self, other: &BoundingBox) -> bool {
        is_contained(other, self)
    }
}

impl From<[f32; 4]> for BoundingBox {
    fn from(c: [f32; 4]) -> Self {
        Self::new(c[0], c[1], c[2], c[3])
    }
}

impl From<BoundingBox> for [f32; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x_min, b.y_min, b.x_max, b.y_max]
    }
}

/// Intersection over Union of two boxes
///
/// Returns exactly `0.0` when the boxes do not intersect (intersection width or
/// height `<= 0`) and when the union is empty.
#[must_use]
pub fn overlap_ratio(a: &BoundingBox, b: &BoundingBox) -> f32 {
    // f64 so that areas of large finite boxes do not overflow
    let side = |min: f32, max: f32| (f64::from(max) - f64::from(min)).max(0.0);

    let ix_min = a.x_min.max(b.x_min);
    let iy_min = a.y_min.max(b.y_min);
    let ix_max = a.x_max.min(b.x_max);
    let iy_max = a.y_max.min(b.y_max);

    let intersection_width = f64::from(ix_max) - f64::from(ix_min);
    let intersection_height = f64::from(iy_max) - f64::from(iy_min);
    // Negated comparisons so that NaN also lands here
    if !(intersection_width > 0.0) || !(intersection_height > 0.0) {
        return 0.0;
    }

    let intersection_area = intersection_width * intersection_height;
    let area_a = side(a.x_min, a.x_max) * side(a.y_min, a.y_max);
    let area_b = side(b.x_min, b.x_max) * side(b.y_min, b.y_max);
    let union_area = area_a + area_b - intersection_area;

    if union_area > 0.0 {
        (intersection_area / union_area) as f32
    } else {
        0.0
    }
}

/// Whether every edge of `inner` lies within or on the matching edge of `outer`
#[must_use]
pub fn is_contained(inner: &BoundingBox, outer: &BoundingBox) -> bool {
    inner.x_min >= outer.x_min
        && inner.y_min >= outer.y_min
        && inner.x_max <= outer.x_max
        && inner.y_max <= outer.y_max
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox(x1: f32, y1: f32, x2: f32, y2: f32) -> BoundingBox {
        BoundingBox::new(x1, y1, x2, y2)
    }

    #[test]
    fn test_iou_identical_boxes() {
        let a = bbox(0.0, 0.0, 10.0, 10.0);
        assert!((overlap_ratio(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_iou_partial_overlap() {
        let a = bbox(0.0, 0.0, 10.0, 10.0);
        let b = bbox(5.0, 5.0, 15.0, 15.0);
        // 25 / (100 + 100 - 25)
        let expected = 25.0 / 175.0;
        assert!((overlap_ratio(&a, &b) - expected).abs() < 1e-6);
        assert_eq!(overlap_ratio(&a, &b), overlap_ratio(&b, &a));
    }

    #[test]
    fn test_iou_disjoint_and_touching() {
        let a = bbox(0.0, 0.0, 10.0, 10.0);
        assert_eq!(overlap_ratio(&a, &bbox(20.0, 20.0, 30.0, 30.0)), 0.0);
        // Sharing an edge has zero-width intersection
        assert_eq!(overlap_ratio(&a, &bbox(10.0, 0.0, 20.0, 10.0)), 0.0);
    }

    #[test]
    fn test_iou_degenerate_boxes() {
        let point = bbox(5.0, 5.0, 5.0, 5.0);
        assert_eq!(overlap_ratio(&point, &point), 0.0);

        let line = bbox(0.0, 5.0, 10.0, 5.0);
        let a = bbox(0.0, 0.0, 10.0, 10.0);
        assert_eq!(overlap_ratio(&line, &a), 0.0);

        let inverted = bbox(10.0, 10.0, 0.0, 0.0);
        assert_eq!(overlap_ratio(&inverted, &a), 0.0);
        assert_eq!(inverted.area(), 0.0);
    }

    #[test]
    fn test_iou_large_finite_coordinates() {
        let huge = bbox(0.0, 0.0, 1e20, 1e20);
        assert!((overlap_ratio(&huge, &huge) - 1.0).abs() < 1e-6);

        let half = bbox(0.0, 0.0, 5e19, 1e20);
        assert!((overlap_ratio(&huge, &half) - 0.5).abs() < 1e-6);

        let extreme = bbox(-f32::MAX, -f32::MAX, f32::MAX, f32::MAX);
        assert!((overlap_ratio(&extreme, &extreme) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_iou_nested() {
        let outer = bbox(0.0, 0.0, 10.0, 10.0);
        let inner = bbox(0.0, 0.0, 5.0, 5.0);
        assert!((overlap_ratio(&outer, &inner) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_containment_is_boundary_inclusive() {
        let outer = bbox(0.0, 0.0, 10.0, 10.0);
        assert!(is_contained(&outer, &outer));
        assert!(is_contained(&bbox(0.0, 0.0, 5.0, 5.0), &outer));
        assert!(is_contained(&bbox(2.0, 2.0, 8.0, 8.0), &outer));
        assert!(!is_contained(&bbox(2.0, 2.0, 10.5, 8.0), &outer));
        assert!(!is_contained(&outer, &bbox(2.0, 2.0, 8.0, 8.0)));
        assert!(outer.contains(&bbox(1.0, 1.0, 2.0, 2.0)));
    }

    #[test]
    fn test_well_formed() {
        assert!(bbox(0.0, 0.0, 1.0, 1.0).is_well_formed());
        assert!(!bbox(1.0, 0.0, 0.0, 1.0).is_well_formed());
        assert!(!bbox(0.0, 0.0, 0.0, 1.0).is_well_formed());
        assert!(!bbox(0.0, f32::NAN, 1.0, 1.0).is_well_formed());
        assert!(!bbox(0.0, 0.0, f32::INFINITY, 1.0).is_well_formed());
    }

    #[test]
    fn test_clip_to_image() {
        let b = bbox(-5.0, 10.0, 120.0, 50.0).clip_to(100.0, 40.0);
        assert_eq!(b, bbox(0.0, 10.0, 100.0, 40.0));

        let outside = bbox(150.0, 150.0, 200.0, 200.0).clip_to(100.0, 100.0);
        assert_eq!(outside.area(), 0.0);
    }

    #[test]
    fn test_center_and_from_center() {
        let b = BoundingBox::from_center(5.0, 5.0, 4.0, 2.0);
        assert_eq!(b, bbox(3.0, 4.0, 7.0, 6.0));
        assert_eq!(b.center(), (5.0, 5.0));
    }

    #[test]
    fn test_serializes_as_corner_array() {
        let b = bbox(1.0, 2.0, 3.0, 4.0);
        let json = serde_json::to_string(&b).unwrap();
        assert_eq!(json, "[1.0,2.0,3.0,4.0]");
        let back: BoundingBox = serde_json::from_str(&json).unwrap();
        assert_eq!(back, b);
    }
}
