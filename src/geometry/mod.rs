mod interval;
pub mod quartic;
mod ray_triangle_intersection;
mod triangle;

use nalgebra::{Matrix3, Matrix4, Point2, Point3, Unit, Vector2, Vector3};

use crate::scene::MaterialIdx;

pub use interval::Interval;
pub use triangle::{BarycentricCoordinates, Triangle};

pub type FloatType = f32;

/// Tolerance used when normalizing user supplied vectors.
pub const EPSILON: FloatType = 1e-6;

pub type ScreenPoint = Point2<u32>;
pub type ScreenSize = Vector2<u32>;
/// Normalized device coordinates, x in [-1, 1] left to right, y scaled by the aspect
/// ratio, up positive.
pub type ScreenCoordinate = Point2<FloatType>;

pub type WorldPoint = Point3<FloatType>;
pub type WorldVector = Vector3<FloatType>;
/// Homogeneous affine transform.
pub type WorldMatrix = Matrix4<FloatType>;
pub type NormalMatrix = Matrix3<FloatType>;

#[derive(Copy, Clone, Debug)]
pub struct Ray {
    pub origin: WorldPoint,
    /// Direction of the ray.
    /// Normalized for rays created with `Ray::new`, rays mapped into a local frame
    /// of a transform keep the `t` parametrization of the world ray instead.
    pub direction: WorldVector,
}

impl Ray {
    pub fn new(origin: WorldPoint, direction: WorldVector) -> Ray {
        Ray {
            origin,
            direction: direction.normalize(),
        }
    }

    /// Maps the ray through a homogeneous matrix without renormalizing,
    /// so that distances along the result match distances along `self`.
    pub fn transformed(&self, matrix: &WorldMatrix) -> Ray {
        Ray {
            origin: matrix.transform_point(&self.origin),
            direction: matrix.transform_vector(&self.direction),
        }
    }

    pub fn point_at(&self, t: FloatType) -> WorldPoint {
        self.origin + self.direction * t
    }

    pub fn unit_direction(&self) -> Unit<WorldVector> {
        Unit::new_normalize(self.direction)
    }
}

/// Closest intersection of a ray with the scene.
#[derive(Copy, Clone, Debug)]
pub struct Hit {
    pub t: FloatType,
    pub material: MaterialIdx,
    pub normal: Unit<WorldVector>,
}

impl Hit {
    /// Returns the hit with its normal flipped to face against the ray direction.
    pub fn facing(self, ray: &Ray) -> Hit {
        if ray.direction.dot(self.normal.as_ref()) > 0.0 {
            Hit {
                normal: -self.normal,
                ..self
            }
        } else {
            self
        }
    }
}

/// Mirror reflection of `direction` about `normal`.
pub fn reflect(direction: &WorldVector, normal: &Unit<WorldVector>) -> WorldVector {
    direction - normal.as_ref() * (2.0 * direction.dot(normal.as_ref()))
}

/// Builds two unit vectors that complete `normal` to a right handed orthonormal basis.
pub fn orthonormal_basis(normal: &Unit<WorldVector>) -> (Unit<WorldVector>, Unit<WorldVector>) {
    // Helper axis along the smallest normal component can never be parallel to it.
    let helper = if normal.x.abs() <= normal.y.abs() && normal.x.abs() <= normal.z.abs() {
        WorldVector::x()
    } else if normal.y.abs() <= normal.z.abs() {
        WorldVector::y()
    } else {
        WorldVector::z()
    };
    let tangent = Unit::new_normalize(helper.cross(normal.as_ref()));
    let bitangent = Unit::new_normalize(normal.cross(tangent.as_ref()));
    (tangent, bitangent)
}
