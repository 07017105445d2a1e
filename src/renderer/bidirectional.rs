use nalgebra::{Unit, Vector3};

use crate::{
    geometry::{EPSILON, FloatType, Interval, Ray, WorldPoint, WorldVector},
    sampler::{cosine_pdf, sample_cosine_hemisphere},
    scene::{LightSample, Scene},
    util::Color,
};

use super::{
    RenderError, RenderSettings,
    subpath::{PathLength, SELF_INTERSECTION_EPSILON, Subpath},
};

/// Power heuristic exponent.
const MIS_EXPONENT: i32 = 2;

/// Weighted average of path contributions, each weighted by a power of the density of its strategy.
#[derive(Clone, Debug, Default)]
pub struct MisAccumulator {
    weighted_sum: Vector3<f64>,
    total_weight: f64,
}

impl MisAccumulator {
    pub fn add(&mut self, contribution: &Color, density: f64) {
        let weight = density.powi(MIS_EXPONENT);
        self.weighted_sum += contribution.cast::<f64>() * weight;
        self.total_weight += weight;
    }

    /// None when nothing with a non-zero weight was added.
    pub fn estimate(&self) -> Option<Color> {
        (self.total_weight > 0.0)
            .then(|| (self.weighted_sum / self.total_weight).cast::<FloatType>())
    }
}

/// Radiance along one camera ray together with the lengths of the subpaths that produced it.
#[derive(Clone, Debug)]
pub struct SampleEstimate {
    pub color: Color,
    pub eye_length: usize,
    pub light_length: Option<usize>,
}

/// Bidirectional path tracer connecting every eye subpath prefix with every light subpath prefix.
pub struct Bidirectional<'a> {
    scene: &'a Scene,
    path_length: PathLength,
    cosine_term: bool,
}

impl<'a> Bidirectional<'a> {
    pub fn new(scene: &'a Scene, settings: &RenderSettings) -> Result<Self, RenderError> {
        if !scene.lamps().is_empty() {
            log::warn!(
                "Ignoring {} point and directional lamps, \
                 only emitting surfaces light bidirectional paths",
                scene.lamps().len()
            );
        }
        Ok(Bidirectional {
            scene,
            path_length: PathLength::new(settings.mean_path_length)?,
            cosine_term: settings.cosine_term,
        })
    }

    pub fn sample(&self, camera_ray: Ray, rng: &mut impl rand::Rng) -> SampleEstimate {
        let scene = self.scene;
        let eye_steps = 1 + self.path_length.sample(rng);
        let eye = Subpath::trace(scene, camera_ray, 1.0, scene.camera().t_min(), eye_steps, rng);

        let Some(first_hit) = eye.hits.first() else {
            return SampleEstimate {
                color: scene.background().color(&camera_ray.direction),
                eye_length: 0,
                light_length: None,
            };
        };

        let first_material = scene.material(first_hit.material);
        let mut color = first_material.emitted_light
            + scene.ambient_light().component_mul(&first_material.diffuse_color);

        let lights = scene.lights();
        if lights.is_empty() {
            return SampleEstimate {
                color,
                eye_length: eye.len(),
                light_length: None,
            };
        }
        let light = &lights[rng.random_range(0..lights.len())];
        let Some(light_sample) = scene.sample_light(light, rng) else {
            return SampleEstimate {
                color,
                eye_length: eye.len(),
                light_length: None,
            };
        };

        let direction = sample_cosine_hemisphere(&light_sample.normal, rng);
        let seed_density = cosine_pdf(&direction, &light_sample.normal) as f64;
        let seed = Ray::new(light_sample.point, direction.into_inner());
        let light_steps = self.path_length.sample(rng);
        let light_path = Subpath::trace(
            scene,
            seed,
            seed_density,
            SELF_INTERSECTION_EPSILON,
            light_steps,
            rng,
        );

        color += self
            .connect(&eye, &light_path, &light_sample)
            .estimate()
            .unwrap_or_else(Color::zeros);

        SampleEstimate {
            color,
            eye_length: eye.len(),
            light_length: Some(light_path.len()),
        }
    }

    /// Accumulates every unoccluded combination of an eye vertex with a light vertex.
    /// Light vertex 0 is the point on the emitter, vertex `l > 0` is `light_path.hits[l - 1]`.
    fn connect(
        &self,
        eye: &Subpath,
        light_path: &Subpath,
        light_sample: &LightSample,
    ) -> MisAccumulator {
        let scene = self.scene;
        let emitted = &scene.material(light_sample.material).emitted_light;
        let white = Color::repeat(1.0);
        let eye_throughputs = eye.eye_throughputs(scene);
        let light_throughputs = light_path.light_throughputs(scene);

        let mut accumulator = MisAccumulator::default();
        for (e, eye_hit) in eye.hits.iter().enumerate() {
            let eye_point = eye.vertex(e);
            for l in 0..=light_path.len() {
                let light_point = if l == 0 {
                    light_sample.point
                } else {
                    light_path.vertex(l - 1)
                };
                let Some(direction) = self.unoccluded_direction(&eye_point, &light_point) else {
                    continue;
                };
                // Hit normals face the arriving ray, a connection leaving through the back
                // of either surface is blocked by that surface.
                if direction.dot(eye_hit.normal.as_ref()) <= 0.0 {
                    continue;
                }
                if l > 0 && direction.dot(light_path.hits[l - 1].normal.as_ref()) >= 0.0 {
                    continue;
                }

                let eye_reflectance =
                    scene
                        .material(eye_hit.material)
                        .shade(&eye.rays[e], eye_hit, &direction, &white);

                let (light_side, emission_direction, light_density) = if l == 0 {
                    (white, -direction.into_inner(), 1.0)
                } else {
                    let k = l - 1;
                    let light_hit = &light_path.hits[k];
                    let viewer = Ray {
                        origin: eye_point,
                        direction: direction.into_inner(),
                    };
                    let light_reflectance = scene.material(light_hit.material).shade(
                        &viewer,
                        light_hit,
                        &Unit::new_normalize(-light_path.rays[k].direction),
                        &white,
                    );
                    (
                        light_throughputs[k].component_mul(&light_reflectance),
                        light_path.rays[0].direction,
                        light_path.densities[k],
                    )
                };

                let mut contribution = emitted
                    .component_mul(&eye_throughputs[e])
                    .component_mul(&eye_reflectance)
                    .component_mul(&light_side);
                if self.cosine_term {
                    contribution *= light_sample.normal.dot(&emission_direction).max(0.0);
                }

                accumulator.add(&contribution, eye.densities[e] * light_density);
            }
        }
        accumulator
    }

    /// Unit direction from `from` to `to`, or None if the scene blocks the segment between them.
    fn unoccluded_direction(
        &self,
        from: &WorldPoint,
        to: &WorldPoint,
    ) -> Option<Unit<WorldVector>> {
        let (direction, distance) = Unit::try_new_and_get(to - from, EPSILON)?;
        let ray = Ray {
            origin: *from,
            direction: direction.into_inner(),
        };
        let range = Interval::new(
            SELF_INTERSECTION_EPSILON,
            distance - SELF_INTERSECTION_EPSILON,
        );
        match self.scene.intersect(&ray, range) {
            Some(_) => None,
            None => Some(direction),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        camera::Camera,
        material::Material,
        scene::{Background, Group, Plane, SceneBuilder, Sphere, Triangle},
    };
    use assert2::{assert, let_assert};
    use rand::{SeedableRng, rngs::SmallRng};

    #[test]
    fn empty_accumulator_has_no_estimate() {
        assert!(MisAccumulator::default().estimate().is_none());
    }

    #[test]
    fn zero_density_has_no_estimate() {
        let mut accumulator = MisAccumulator::default();
        accumulator.add(&Color::repeat(1.0), 0.0);
        assert!(accumulator.estimate().is_none());
    }

    #[test]
    fn weights_are_squared_densities() {
        let mut accumulator = MisAccumulator::default();
        accumulator.add(&Color::repeat(1.0), 1.0);
        accumulator.add(&Color::repeat(6.0), 2.0);
        let_assert!(Some(estimate) = accumulator.estimate());
        assert!((estimate - Color::repeat(5.0)).norm() < 1e-5);
    }

    fn camera() -> Camera {
        Camera::builder()
            .center(WorldPoint::new(0.0, 2.0, 2.0))
            .forward(WorldVector::new(0.0, -1.0, -1.0))
            .up(WorldVector::new(0.0, 1.0, 0.0))
            .field_of_view(1.0)
            .build()
    }

    fn settings(cosine_term: bool) -> RenderSettings {
        RenderSettings {
            mean_path_length: 0.0,
            cosine_term,
            ..Default::default()
        }
    }

    /// Ray from the camera onto the floor right below the light.
    fn floor_ray() -> Ray {
        Ray::new(WorldPoint::new(0.0, 2.0, 2.0), WorldVector::new(0.0, -1.0, -1.0))
    }

    /// Gray floor at y = 0 with a tiny emitting triangle hanging above the origin.
    fn lit_floor(light_faces_down: bool, blocker: bool) -> Scene {
        let mut builder = SceneBuilder::default();
        let gray =
            builder.add_material(Material::builder().diffuse_color(Color::repeat(0.5)).build());
        let lamp = builder.add_material(
            Material::builder()
                .diffuse_color(Color::zeros())
                .emitted_light(Color::repeat(2.0))
                .build(),
        );
        let floor = builder
            .add_object(Plane::new(WorldVector::new(0.0, 1.0, 0.0), 0.0, gray))
            .unwrap();
        let mut corners = [
            WorldPoint::new(-0.01, 1.0, -0.01),
            WorldPoint::new(0.01, 1.0, -0.01),
            WorldPoint::new(0.0, 1.0, 0.01),
        ];
        if !light_faces_down {
            corners.swap(1, 2);
        }
        let light = builder.add_object(Triangle::flat(corners, lamp)).unwrap();
        let mut members = vec![floor, light];
        if blocker {
            members.push(
                builder
                    .add_object(Sphere::new(WorldPoint::new(0.0, 0.5, 0.0), 0.2, gray))
                    .unwrap(),
            );
        }
        let root = builder.add_object(Group::new(members)).unwrap();
        builder.build(root, camera()).unwrap()
    }

    #[test]
    fn direct_lighting_from_small_emitter() {
        let scene = lit_floor(true, false);
        let integrator = Bidirectional::new(&scene, &settings(true)).unwrap();
        let mut rng = SmallRng::seed_from_u64(0);
        for _ in 0..20 {
            let estimate = integrator.sample(floor_ray(), &mut rng);
            // emitted * diffuse * cos at floor * cos at emitter
            assert!((estimate.color - Color::repeat(1.0)).norm() < 1e-3);
            assert!(estimate.eye_length == 1);
            assert!(estimate.light_length == Some(0));
        }
    }

    #[test]
    fn emitter_facing_away_needs_cosine_term() {
        let scene = lit_floor(false, false);
        let mut rng = SmallRng::seed_from_u64(1);

        let with_cosine = Bidirectional::new(&scene, &settings(true)).unwrap();
        let estimate = with_cosine.sample(floor_ray(), &mut rng);
        assert!(estimate.color.norm() < 1e-6);

        let without_cosine = Bidirectional::new(&scene, &settings(false)).unwrap();
        let estimate = without_cosine.sample(floor_ray(), &mut rng);
        assert!((estimate.color - Color::repeat(1.0)).norm() < 1e-3);
    }

    #[test]
    fn occluded_connection_adds_nothing() {
        let scene = lit_floor(true, true);
        let integrator = Bidirectional::new(&scene, &settings(true)).unwrap();
        let mut rng = SmallRng::seed_from_u64(2);
        let estimate = integrator.sample(floor_ray(), &mut rng);
        assert!(estimate.color == Color::zeros());
    }

    #[test]
    fn longer_paths_stay_finite_and_non_negative() {
        let scene = lit_floor(true, true);
        let settings = RenderSettings {
            mean_path_length: 4.0,
            ..Default::default()
        };
        let integrator = Bidirectional::new(&scene, &settings).unwrap();
        let mut rng = SmallRng::seed_from_u64(3);
        for _ in 0..200 {
            let estimate = integrator.sample(floor_ray(), &mut rng);
            assert!(estimate.color.iter().all(|c| c.is_finite() && *c >= 0.0));
        }
    }

    #[test]
    fn no_light_reaches_below_a_floor() {
        let mut builder = SceneBuilder::default();
        let gray =
            builder.add_material(Material::builder().diffuse_color(Color::repeat(0.5)).build());
        let lamp = builder.add_material(
            Material::builder()
                .diffuse_color(Color::zeros())
                .emitted_light(Color::repeat(5.0))
                .build(),
        );
        let floor = builder
            .add_object(Plane::new(WorldVector::new(0.0, 1.0, 0.0), 0.0, gray))
            .unwrap();
        let basement = builder
            .add_object(Plane::new(WorldVector::new(0.0, 1.0, 0.0), -1.0, gray))
            .unwrap();
        let light = builder
            .add_object(Triangle::flat(
                [
                    WorldPoint::new(-0.5, 2.0, -0.5),
                    WorldPoint::new(0.5, 2.0, -0.5),
                    WorldPoint::new(0.0, 2.0, 0.5),
                ],
                lamp,
            ))
            .unwrap();
        let root = builder.add_object(Group::new(vec![floor, basement, light])).unwrap();
        let scene = builder.build(root, camera()).unwrap();

        let settings = RenderSettings {
            mean_path_length: 3.0,
            ..Default::default()
        };
        let integrator = Bidirectional::new(&scene, &settings).unwrap();
        let mut rng = SmallRng::seed_from_u64(6);
        let ray = Ray::new(WorldPoint::new(0.0, -0.5, 0.0), WorldVector::new(0.0, -1.0, 0.0));
        let n = 2000;
        let sum: Color = (0..n).map(|_| integrator.sample(ray, &mut rng).color).sum();
        // Only connections grazing along the floor plane can leave a rounding error sized trace.
        assert!(sum.norm() / (n as FloatType) < 1e-3);
    }

    #[test]
    fn longer_paths_converge_to_direct_light() {
        let mut builder = SceneBuilder::default();
        let gray =
            builder.add_material(Material::builder().diffuse_color(Color::repeat(0.5)).build());
        let lamp = builder.add_material(
            Material::builder()
                .diffuse_color(Color::zeros())
                .emitted_light(Color::repeat(2.0))
                .build(),
        );
        // Small receiver, so that light and eye subpaths almost never find a second surface.
        let receiver = builder
            .add_object(Triangle::flat(
                [
                    WorldPoint::new(-0.1, 0.0, -0.1),
                    WorldPoint::new(0.1, 0.0, -0.1),
                    WorldPoint::new(0.0, 0.0, 0.1),
                ],
                gray,
            ))
            .unwrap();
        let light = builder
            .add_object(Triangle::flat(
                [
                    WorldPoint::new(-0.01, 1.0, -0.01),
                    WorldPoint::new(0.01, 1.0, -0.01),
                    WorldPoint::new(0.0, 1.0, 0.01),
                ],
                lamp,
            ))
            .unwrap();
        let root = builder.add_object(Group::new(vec![receiver, light])).unwrap();
        let scene = builder.build(root, camera()).unwrap();

        let settings = RenderSettings {
            mean_path_length: 2.0,
            ..Default::default()
        };
        let integrator = Bidirectional::new(&scene, &settings).unwrap();
        let mut rng = SmallRng::seed_from_u64(7);
        let n = 1000;
        let mean = (0..n)
            .map(|_| integrator.sample(floor_ray(), &mut rng).color)
            .sum::<Color>()
            / n as FloatType;
        // emitted * diffuse * cos at receiver * cos at emitter
        assert!((mean - Color::repeat(1.0)).norm() < 1e-2);
    }

    #[test]
    fn miss_returns_background() {
        let mut builder = SceneBuilder::default();
        let white = builder.add_material(Material::default());
        let ball = builder
            .add_object(Sphere::new(WorldPoint::new(0.0, 50.0, 0.0), 1.0, white))
            .unwrap();
        builder.set_background(Background::Uniform(Color::new(0.1, 0.2, 0.3)));
        let scene = builder.build(ball, camera()).unwrap();

        let integrator = Bidirectional::new(&scene, &settings(true)).unwrap();
        let mut rng = SmallRng::seed_from_u64(4);
        let estimate = integrator.sample(floor_ray(), &mut rng);
        assert!(estimate.color == Color::new(0.1, 0.2, 0.3));
        assert!(estimate.eye_length == 0);
    }

    #[test]
    fn no_lights_shows_ambient_diffuse() {
        let mut builder = SceneBuilder::default();
        let red = builder.add_material(
            Material::builder()
                .diffuse_color(Color::new(0.8, 0.1, 0.1))
                .build(),
        );
        let floor = builder
            .add_object(Plane::new(WorldVector::new(0.0, 1.0, 0.0), 0.0, red))
            .unwrap();
        let scene = builder.build(floor, camera()).unwrap();

        let integrator = Bidirectional::new(&scene, &settings(true)).unwrap();
        let mut rng = SmallRng::seed_from_u64(5);
        let estimate = integrator.sample(floor_ray(), &mut rng);
        assert!(estimate.color == Color::new(0.8, 0.1, 0.1));
        assert!(estimate.light_length.is_none());
    }

    #[test]
    fn invalid_mean_path_length_is_rejected() {
        let scene = lit_floor(true, false);
        let settings = RenderSettings {
            mean_path_length: -1.0,
            ..Default::default()
        };
        let_assert!(
            Err(RenderError::InvalidMeanPathLength(_)) = Bidirectional::new(&scene, &settings)
        );
    }
}
