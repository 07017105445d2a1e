use nalgebra::Unit;
use rand_distr::{Distribution, Poisson};

use crate::{
    geometry::{FloatType, Hit, Interval, Ray, WorldPoint},
    scene::Scene,
    util::Color,
};

use super::RenderError;

/// Minimal distance of a hit from the origin of a secondary ray.
pub const SELF_INTERSECTION_EPSILON: FloatType = 1e-3;

/// Random number of extension steps of a subpath, Poisson distributed around a mean.
#[derive(Clone, Debug)]
pub struct PathLength(Option<Poisson<FloatType>>);

impl PathLength {
    pub fn new(mean: FloatType) -> Result<PathLength, RenderError> {
        if !(mean.is_finite() && mean >= 0.0) {
            return Err(RenderError::InvalidMeanPathLength(mean));
        }
        if mean == 0.0 {
            return Ok(PathLength(None));
        }
        Poisson::new(mean)
            .map(|distribution| PathLength(Some(distribution)))
            .map_err(|_| RenderError::InvalidMeanPathLength(mean))
    }

    pub fn sample(&self, rng: &mut impl rand::Rng) -> usize {
        self.0
            .as_ref()
            .map_or(0, |distribution| distribution.sample(rng) as usize)
    }
}

/// Random walk through the scene.
/// `hits[k]` is where `rays[k]` ends, with its normal facing against `rays[k]`,
/// and `rays[k + 1]` is the continuation sampled there, so there is always one more ray than hits.
#[derive(Clone, Debug)]
pub struct Subpath {
    pub rays: Vec<Ray>,
    pub hits: Vec<Hit>,
    /// Product of the densities of all rays up to and including `rays[k]`.
    pub densities: Vec<f64>,
}

impl Subpath {
    /// Follows `seed` for at most `steps` intersections, stopping early when the walk
    /// leaves the scene.
    pub fn trace(
        scene: &Scene,
        seed: Ray,
        seed_density: f64,
        t_min: FloatType,
        steps: usize,
        rng: &mut impl rand::Rng,
    ) -> Subpath {
        let mut path = Subpath {
            rays: vec![seed],
            hits: Vec::with_capacity(steps),
            densities: Vec::with_capacity(steps),
        };
        let sampler = scene.sampler();
        let mut density = seed_density;
        let mut range = Interval::beyond(t_min);
        let mut ray = seed;

        for _ in 0..steps {
            let Some(hit) = scene.intersect(&ray, range) else {
                break;
            };
            let hit = hit.facing(&ray);
            let material = scene.material(hit.material);
            let direction = sampler.sample(&ray, &hit, material, rng);

            path.densities.push(density);
            path.hits.push(hit);
            density *= sampler.pdf(&ray, &direction, &hit, material) as f64;
            ray = Ray::new(ray.point_at(hit.t), direction.into_inner());
            path.rays.push(ray);
            range = Interval::beyond(SELF_INTERSECTION_EPSILON);
        }

        path
    }

    /// World position of `hits[k]`.
    pub fn vertex(&self, k: usize) -> WorldPoint {
        self.rays[k].point_at(self.hits[k].t)
    }

    /// Number of surface interactions.
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Product of reflectances at every hit before `hits[e]`, for light travelling
    /// towards the path origin.
    /// Entry `e` is what multiplies radiance arriving at `hits[e]` and reflected back
    /// along the path.
    pub fn eye_throughputs(&self, scene: &Scene) -> Vec<Color> {
        self.throughputs(|k| {
            let hit = &self.hits[k];
            scene.material(hit.material).shade(
                &self.rays[k],
                hit,
                &self.rays[k + 1].unit_direction(),
                &Color::repeat(1.0),
            )
        })
    }

    /// Product of reflectances at every hit before `hits[e]`, for light travelling
    /// away from the path origin.
    pub fn light_throughputs(&self, scene: &Scene) -> Vec<Color> {
        self.throughputs(|k| {
            let hit = &self.hits[k];
            let viewer = Ray {
                origin: self.vertex(k),
                direction: -self.rays[k + 1].direction,
            };
            scene.material(hit.material).shade(
                &viewer,
                hit,
                &Unit::new_normalize(-self.rays[k].direction),
                &Color::repeat(1.0),
            )
        })
    }

    fn throughputs(&self, reflectance: impl Fn(usize) -> Color) -> Vec<Color> {
        (0..self.len())
            .scan(Color::repeat(1.0), |throughput, k| {
                let current = *throughput;
                *throughput = throughput.component_mul(&reflectance(k));
                Some(current)
            })
            .collect()
    }
}
