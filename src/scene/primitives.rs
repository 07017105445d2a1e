use std::f32::consts::TAU;

use nalgebra::Unit;
use ordered_float::OrderedFloat;
use rand_distr::{Distribution, UnitSphere};

use crate::geometry::{
    self, BarycentricCoordinates, FloatType, Hit, Interval, Ray, WorldPoint, WorldVector, quartic,
};

use super::{MaterialIdx, Object, ObjectArena, Surface, SurfaceSample};

#[derive(Clone, Debug)]
pub struct Sphere {
    pub center: WorldPoint,
    pub radius: FloatType,
    pub material: MaterialIdx,
}

impl Sphere {
    pub fn new(center: WorldPoint, radius: FloatType, material: MaterialIdx) -> Sphere {
        Sphere {
            center,
            radius,
            material,
        }
    }
}

impl Object for Sphere {
    fn intersect(&self, _objects: &ObjectArena, ray: &Ray, range: Interval) -> Option<Hit> {
        let oc = ray.origin - self.center;
        let a = ray.direction.norm_squared();
        let half_b = oc.dot(&ray.direction);
        let c = oc.norm_squared() - self.radius * self.radius;
        let discriminant = half_b * half_b - a * c;

        if discriminant < 0.0 {
            return None;
        }

        let sqrt_disc = discriminant.sqrt();
        let t1 = (-half_b - sqrt_disc) / a;
        let t2 = (-half_b + sqrt_disc) / a;
        let t = if t1 > range.min { t1 } else { t2 };
        if !range.surrounds(t) {
            return None;
        }

        let point = ray.point_at(t);
        Some(Hit {
            t,
            material: self.material,
            normal: Unit::new_normalize(point - self.center),
        })
    }
}

impl Surface for Sphere {
    fn material(&self) -> MaterialIdx {
        self.material
    }

    fn sample_surface(&self, rng: &mut impl rand::Rng) -> SurfaceSample {
        let [x, y, z]: [FloatType; 3] = UnitSphere.sample(rng);
        let normal = Unit::new_normalize(WorldVector::new(x, y, z));
        SurfaceSample {
            point: self.center + normal.as_ref() * self.radius,
            normal,
        }
    }
}

/// Infinite plane of points `p` with `p . normal == offset`.
#[derive(Clone, Debug)]
pub struct Plane {
    pub normal: Unit<WorldVector>,
    pub offset: FloatType,
    pub material: MaterialIdx,
}

impl Plane {
    pub fn new(normal: WorldVector, offset: FloatType, material: MaterialIdx) -> Plane {
        Plane {
            normal: Unit::new_normalize(normal),
            offset,
            material,
        }
    }
}

impl Object for Plane {
    fn intersect(&self, _objects: &ObjectArena, ray: &Ray, range: Interval) -> Option<Hit> {
        let denominator = ray.direction.dot(self.normal.as_ref());
        if denominator == 0.0 {
            return None;
        }
        let t = (self.offset - ray.origin.coords.dot(self.normal.as_ref())) / denominator;
        if !range.surrounds(t) {
            return None;
        }
        Some(Hit {
            t,
            material: self.material,
            normal: self.normal,
        })
    }
}

impl Surface for Plane {
    fn material(&self) -> MaterialIdx {
        self.material
    }

    /// Planes have no finite area, the emitting point is the one closest to the local origin.
    fn sample_surface(&self, _rng: &mut impl rand::Rng) -> SurfaceSample {
        SurfaceSample {
            point: WorldPoint::from(self.normal.as_ref() * self.offset),
            normal: self.normal,
        }
    }
}

/// Triangle with per vertex normals.
#[derive(Clone, Debug)]
pub struct Triangle {
    pub vertices: geometry::Triangle<WorldPoint>,
    pub normals: geometry::Triangle<WorldVector>,
    pub material: MaterialIdx,
}

impl Triangle {
    pub fn new(
        vertices: [WorldPoint; 3],
        normals: [WorldVector; 3],
        material: MaterialIdx,
    ) -> Triangle {
        let [a, b, c] = vertices;
        let [na, nb, nc] = normals;
        Triangle {
            vertices: geometry::Triangle::new(a, b, c),
            normals: geometry::Triangle::new(na, nb, nc),
            material,
        }
    }

    /// Triangle with all three normals equal to the face normal (counter clockwise winding).
    pub fn flat(vertices: [WorldPoint; 3], material: MaterialIdx) -> Triangle {
        let [a, b, c] = vertices;
        let face = geometry::Triangle::new(a, b, c).normal().normalize();
        Triangle::new(vertices, [face; 3], material)
    }

    fn normal_at(&self, coords: &BarycentricCoordinates) -> Unit<WorldVector> {
        Unit::new_normalize(coords.interpolate_triangle(&self.normals))
    }
}

impl Object for Triangle {
    fn intersect(&self, _objects: &ObjectArena, ray: &Ray, range: Interval) -> Option<Hit> {
        let (t, coords) = self.vertices.intersect(ray)?;
        if !range.surrounds(t) {
            return None;
        }
        Some(Hit {
            t,
            material: self.material,
            normal: self.normal_at(&coords),
        })
    }
}

impl Surface for Triangle {
    fn material(&self) -> MaterialIdx {
        self.material
    }

    fn sample_surface(&self, rng: &mut impl rand::Rng) -> SurfaceSample {
        let coords = BarycentricCoordinates::from_uniform(rng.random(), rng.random());
        let [e1, e2] = self.vertices.edges();
        SurfaceSample {
            point: self.vertices[0] + e1 * coords.u + e2 * coords.v,
            normal: self.normal_at(&coords),
        }
    }
}

/// Torus centered at the origin, symmetric about the y axis.
#[derive(Clone, Debug)]
pub struct Torus {
    /// Distance from the center to the middle of the tube.
    pub major_radius: FloatType,
    /// Radius of the tube.
    pub minor_radius: FloatType,
    pub material: MaterialIdx,
}

impl Torus {
    pub fn new(major_radius: FloatType, minor_radius: FloatType, material: MaterialIdx) -> Torus {
        Torus {
            major_radius,
            minor_radius,
            material,
        }
    }

    /// Coefficients of the monic quartic in `t` whose roots are the ray-torus intersections.
    /// Derived from `(|p|^2 - R^2 - r^2)^2 = 4 R^2 (r^2 - p.y^2)`.
    fn quartic_coefficients(&self, ray: &Ray) -> [f64; 4] {
        let o = ray.origin.coords.cast::<f64>();
        let d = ray.direction.cast::<f64>();
        let big_r2 = (self.major_radius as f64).powi(2);
        let small_r2 = (self.minor_radius as f64).powi(2);

        let g = d.norm_squared();
        let e = o.norm_squared() - small_r2 - big_r2;
        let f = o.dot(&d);
        let four_r2 = 4.0 * big_r2;

        let a4 = g * g;
        let a3 = 4.0 * g * f;
        let a2 = 2.0 * g * e + 4.0 * f * f + four_r2 * d.y * d.y;
        let a1 = 4.0 * f * e + 2.0 * four_r2 * o.y * d.y;
        let a0 = e * e - four_r2 * (small_r2 - o.y * o.y);

        [a3 / a4, a2 / a4, a1 / a4, a0 / a4]
    }

    fn normal_at(&self, point: &WorldPoint) -> Option<Unit<WorldVector>> {
        let alpha = self.major_radius / point.xz().coords.norm();
        let normal = WorldVector::new((1.0 - alpha) * point.x, point.y, (1.0 - alpha) * point.z);
        Unit::try_new(normal, geometry::EPSILON)
    }
}

impl Object for Torus {
    fn intersect(&self, _objects: &ObjectArena, ray: &Ray, range: Interval) -> Option<Hit> {
        let [a, b, c, d] = self.quartic_coefficients(ray);
        let t = quartic::solve_quartic(a, b, c, d)
            .into_iter()
            .filter(|root| root.im == 0.0)
            .map(|root| root.re as FloatType)
            .filter(|t| range.surrounds(*t))
            .min_by_key(|t| OrderedFloat(*t))?;

        Some(Hit {
            t,
            material: self.material,
            normal: self.normal_at(&ray.point_at(t))?,
        })
    }
}

impl Surface for Torus {
    fn material(&self) -> MaterialIdx {
        self.material
    }

    fn sample_surface(&self, rng: &mut impl rand::Rng) -> SurfaceSample {
        let theta = rng.random_range(0.0..TAU);
        let phi = rng.random_range(0.0..TAU);
        let (sin_theta, cos_theta) = theta.sin_cos();
        let (sin_phi, cos_phi) = phi.sin_cos();

        let ring = WorldPoint::new(
            self.major_radius * cos_theta,
            0.0,
            self.major_radius * sin_theta,
        );
        let normal = Unit::new_normalize(WorldVector::new(
            cos_phi * cos_theta,
            sin_phi,
            cos_phi * sin_theta,
        ));
        SurfaceSample {
            point: ring + normal.as_ref() * self.minor_radius,
            normal,
        }
    }
}
