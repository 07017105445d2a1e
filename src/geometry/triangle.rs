use std::ops::{Add, Index, Mul};

use super::{FloatType, WorldPoint, WorldVector};

#[derive(Clone, Debug, PartialEq)]
pub struct Triangle<Point>([Point; 3]);

impl<Point> Triangle<Point> {
    pub fn new(a: Point, b: Point, c: Point) -> Triangle<Point> {
        Triangle([a, b, c])
    }
}

impl<Point> Index<usize> for Triangle<Point> {
    type Output = Point;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl Triangle<WorldPoint> {
    /// Returns edge vectors, coming from self[0]
    pub fn edges(&self) -> [WorldVector; 2] {
        [self.0[1] - self.0[0], self.0[2] - self.0[0]]
    }

    /// Returns a normal vector of the triangle, not normalized.
    pub fn normal(&self) -> WorldVector {
        let [e1, e2] = self.edges();
        e1.cross(&e2)
    }
}

/// Position inside a triangle, weights of vertices 1 and 2.
/// Vertex 0 gets the remaining `1 - u - v`.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct BarycentricCoordinates {
    pub u: FloatType,
    pub v: FloatType,
}

impl BarycentricCoordinates {
    /// Maps two uniform numbers from [0, 1) to a uniformly distributed position in the triangle.
    pub fn from_uniform(u1: FloatType, u2: FloatType) -> Self {
        let sqrt_u1 = u1.sqrt();
        BarycentricCoordinates {
            u: sqrt_u1 * (1.0 - u2),
            v: sqrt_u1 * u2,
        }
    }

    pub fn is_inside(&self) -> bool {
        self.u > 0.0 && self.v > 0.0 && self.u + self.v < 1.0
    }

    pub fn interpolate<T>(&self, a: T, b: T, c: T) -> T
    where
        T: Mul<FloatType, Output = T> + Add<Output = T>,
    {
        let w = 1.0 - self.u - self.v;
        a * w + b * self.u + c * self.v
    }

    pub fn interpolate_triangle<T>(&self, triangle: &Triangle<T>) -> T
    where
        T: Copy + Mul<FloatType, Output = T> + Add<Output = T>,
    {
        self.interpolate(triangle[0], triangle[1], triangle[2])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::assert;
    use test_case::test_case;

    #[test]
    fn normal_follows_winding() {
        let triangle = Triangle::new(
            WorldPoint::new(0.0, 0.0, 0.0),
            WorldPoint::new(1.0, 0.0, 0.0),
            WorldPoint::new(0.0, 1.0, 0.0),
        );
        assert!(triangle.normal() == WorldVector::new(0.0, 0.0, 1.0));
    }

    #[test_case(0.0, 0.0 => false)]
    #[test_case(0.25, 0.25 => true)]
    #[test_case(0.6, 0.6 => false)]
    #[test_case(0.5, -0.1 => false)]
    fn inside(u: FloatType, v: FloatType) -> bool {
        BarycentricCoordinates { u, v }.is_inside()
    }

    #[test]
    fn interpolate_weights_vertices() {
        let triangle = Triangle::new(
            WorldVector::new(1.0, 0.0, 0.0),
            WorldVector::new(0.0, 1.0, 0.0),
            WorldVector::new(0.0, 0.0, 1.0),
        );
        let coords = BarycentricCoordinates { u: 0.25, v: 0.5 };
        let interpolated = coords.interpolate_triangle(&triangle);
        assert!((interpolated - WorldVector::new(0.25, 0.25, 0.5)).norm() < 1e-6);
    }

    #[test]
    fn uniform_mapping_stays_inside() {
        for i in 1..10 {
            for j in 1..10 {
                let coords = BarycentricCoordinates::from_uniform(i as f32 / 10.0, j as f32 / 10.0);
                assert!(coords.is_inside());
            }
        }
    }
}
