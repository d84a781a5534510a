//! The part of a requested area not yet covered by retrieved tiles.

use geo::{Area, BooleanOps, BoundingRect, MultiPolygon, Polygon, Rect};

/// Areas smaller than this (in square degrees) count as empty.
///
/// Polygon subtraction leaves slivers where tile edges and request edges
/// coincide up to rounding.
pub const EMPTY_AREA: f64 = 1e-9;

/// Uncovered geometry of a request; only ever shrinks.
#[derive(Debug, Clone, PartialEq)]
pub struct Coverage {
    remainder: MultiPolygon<f64>,
}

impl Coverage {
    /// Start with the whole requested geometry uncovered.
    pub fn new(geometry: MultiPolygon<f64>) -> Self {
        Self {
            remainder: geometry,
        }
    }

    /// Nothing left to cover.
    pub fn empty() -> Self {
        Self::new(MultiPolygon::new(Vec::new()))
    }

    /// Uncovered area of a longitude/latitude box.
    ///
    /// Boxes whose east edge lies west of their west edge cross the
    /// antimeridian and are split in two.
    pub fn from_bounds(west: f64, south: f64, east: f64, north: f64) -> Self {
        let rect = |w: f64, e: f64| Rect::new((w, south), (e, north)).to_polygon();
        let polygons = if east < west {
            vec![rect(west, 180.0), rect(-180.0, east)]
        } else if east > 180.0 {
            vec![rect(west, 180.0), rect(-180.0, east - 360.0)]
        } else {
            vec![rect(west, east)]
        };
        Self::new(MultiPolygon::new(polygons))
    }

    /// Remaining geometry.
    pub fn geometry(&self) -> &MultiPolygon<f64> {
        &self.remainder
    }

    /// Remaining area in square degrees.
    pub fn area(&self) -> f64 {
        self.remainder.unsigned_area()
    }

    /// Whether nothing measurable remains.
    pub fn is_empty(&self) -> bool {
        self.area() <= EMPTY_AREA
    }

    /// Bounding box of the remainder.
    pub fn bounds(&self) -> Option<Rect<f64>> {
        self.remainder.bounding_rect()
    }

    /// Remove a retrieved footprint.
    pub fn subtract(&mut self, footprint: &Polygon<f64>) {
        let footprint = MultiPolygon::new(vec![footprint.clone()]);
        self.remainder = self.remainder.difference(&footprint);
        if self.is_empty() {
            self.remainder = MultiPolygon::new(Vec::new());
        }
    }

    /// Mark everything covered.
    pub fn clear(&mut self) {
        self.remainder = MultiPolygon::new(Vec::new());
    }

    /// Consume into the remaining geometry.
    pub fn into_geometry(self) -> MultiPolygon<f64> {
        self.remainder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square(x: f64, y: f64, size: f64) -> Polygon<f64> {
        Rect::new((x, y), (x + size, y + size)).to_polygon()
    }

    #[test]
    fn test_subtract_shrinks() {
        let mut coverage = Coverage::from_bounds(0.0, 0.0, 20.0, 10.0);
        assert_relative_eq!(coverage.area(), 200.0);

        coverage.subtract(&square(0.0, 0.0, 10.0));
        assert_relative_eq!(coverage.area(), 100.0);

        // Tiles larger than the remainder only remove the overlap.
        coverage.subtract(&square(10.0, -5.0, 20.0));
        assert!(coverage.is_empty());
        assert_eq!(coverage.area(), 0.0);
    }

    #[test]
    fn test_disjoint_subtraction_is_noop() {
        let mut coverage = Coverage::from_bounds(0.0, 0.0, 1.0, 1.0);
        coverage.subtract(&square(5.0, 5.0, 1.0));
        assert_relative_eq!(coverage.area(), 1.0);
    }

    #[test]
    fn test_antimeridian_split() {
        let coverage = Coverage::from_bounds(170.0, 0.0, -170.0, 10.0);
        assert_eq!(coverage.geometry().0.len(), 2);
        assert_relative_eq!(coverage.area(), 200.0);

        let unwrapped = Coverage::from_bounds(170.0, 0.0, 190.0, 10.0);
        assert_relative_eq!(unwrapped.area(), 200.0);
        let bounds = unwrapped.bounds().unwrap();
        assert_eq!(bounds.min().x, -180.0);
        assert_eq!(bounds.max().x, 180.0);
    }

    #[test]
    fn test_empty() {
        assert!(Coverage::empty().is_empty());
        assert!(Coverage::from_bounds(5.0, 5.0, 5.0, 6.0).is_empty());
    }
}
