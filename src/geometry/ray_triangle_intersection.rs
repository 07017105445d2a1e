use nalgebra::Matrix3;

use super::{BarycentricCoordinates, FloatType, Ray, Triangle, WorldPoint};

impl Triangle<WorldPoint> {
    /// Calculates ray intersection with the (two sided) triangle.
    /// Solves `[v0 - v1 | v0 - v2 | d] * (beta, gamma, t) = v0 - o` by inverting the system matrix.
    /// Returns distance along the ray and barycentric coordinates of the hit,
    /// or None if the ray is parallel to the triangle plane or passes outside the triangle.
    pub fn intersect(&self, ray: &Ray) -> Option<(FloatType, BarycentricCoordinates)> {
        let [e1, e2] = self.edges();
        let system = Matrix3::from_columns(&[-e1, -e2, ray.direction]);
        let inverse = system.try_inverse()?;
        let solution = inverse * (self[0] - ray.origin);

        let coords = BarycentricCoordinates {
            u: solution[0],
            v: solution[1],
        };
        if coords.is_inside() {
            Some((solution[2], coords))
        } else {
            None
        }
    }
}
