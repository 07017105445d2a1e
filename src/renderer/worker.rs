use rand::{Rng as _, SeedableRng, rngs::SmallRng};

use crate::{
    geometry::{FloatType, Interval, ScreenCoordinate, ScreenPoint, ScreenSize, WorldVector},
    renderer::{
        Integrator, RenderError, RenderSettings,
        bidirectional::{Bidirectional, SampleEstimate},
        whitted::Whitted,
    },
    scene::Scene,
    util::{Color, Rgb, Stats, color_to_rgb},
};

/// Result of rendering one pixel, with the subpath lengths seen while doing it.
#[derive(Clone, Debug, Default)]
pub struct PixelEstimate {
    pub color: Rgb,
    pub eye_lengths: Stats,
    pub light_lengths: Stats,
    pub first_hit: Option<FirstHit>,
}

/// Surface seen through the center of a pixel.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FirstHit {
    /// Zero when the ray leaves the scene.
    pub normal: WorldVector,
    /// Infinite when the ray leaves the scene.
    pub depth: FloatType,
}

enum Tracer<'a> {
    Bidirectional(Bidirectional<'a>),
    Whitted(Whitted<'a>),
}

/// Shared, read only state of a render. Every pixel gets its own generator derived from the seed,
/// so the output does not depend on which thread renders which pixel.
pub struct Worker<'a> {
    scene: &'a Scene,
    tracer: Tracer<'a>,
    resolution: ScreenSize,
    sample_count: u32,
    seed: u64,
    feature_buffers: bool,
}

impl<'a> Worker<'a> {
    pub fn new(
        scene: &'a Scene,
        settings: &RenderSettings,
        resolution: ScreenSize,
        seed: u64,
    ) -> Result<Self, RenderError> {
        let tracer = match settings.integrator {
            Integrator::Bidirectional => {
                Tracer::Bidirectional(Bidirectional::new(scene, settings)?)
            }
            Integrator::Whitted { bounces } => Tracer::Whitted(Whitted::new(scene, bounces)),
        };
        Ok(Worker {
            scene,
            tracer,
            resolution,
            sample_count: settings.sample_count.get(),
            seed,
            feature_buffers: settings.feature_buffers,
        })
    }

    pub fn render_pixel(&self, point: &ScreenPoint) -> PixelEstimate {
        let mut rng = SmallRng::seed_from_u64(self.pixel_seed(point));
        let mut estimate = PixelEstimate::default();
        let mut sum = Color::zeros();

        for _ in 0..self.sample_count {
            let ray = self
                .scene
                .camera()
                .generate_ray(&self.jittered_coordinate(point, &mut rng));
            match &self.tracer {
                Tracer::Bidirectional(tracer) => {
                    let SampleEstimate {
                        color,
                        eye_length,
                        light_length,
                    } = tracer.sample(ray, &mut rng);
                    sum += color;
                    estimate.eye_lengths.add_sample(eye_length);
                    if let Some(light_length) = light_length {
                        estimate.light_lengths.add_sample(light_length);
                    }
                }
                Tracer::Whitted(tracer) => sum += tracer.sample(ray, &mut rng),
            }
        }

        estimate.color = color_to_rgb(&(sum / self.sample_count as FloatType));
        if self.feature_buffers {
            estimate.first_hit = Some(self.first_hit(point));
        }
        estimate
    }

    fn first_hit(&self, point: &ScreenPoint) -> FirstHit {
        let camera = self.scene.camera();
        let ray = camera.generate_ray(&self.screen_coordinate(point, 0.5, 0.5));
        match self.scene.intersect(&ray, Interval::beyond(camera.t_min())) {
            Some(hit) => FirstHit {
                normal: hit.normal.into_inner(),
                depth: hit.t,
            },
            None => FirstHit {
                normal: WorldVector::zeros(),
                depth: FloatType::INFINITY,
            },
        }
    }

    fn pixel_seed(&self, point: &ScreenPoint) -> u64 {
        let index = point.y as u64 * self.resolution.x as u64 + point.x as u64;
        self.seed ^ index.wrapping_mul(0x9e37_79b9_7f4a_7c15)
    }

    /// Random position inside the pixel in normalized device coordinates.
    fn jittered_coordinate(&self, point: &ScreenPoint, rng: &mut SmallRng) -> ScreenCoordinate {
        self.screen_coordinate(point, rng.random(), rng.random())
    }

    /// x spans [-1, 1] left to right, y grows upwards and is scaled by the aspect ratio.
    fn screen_coordinate(
        &self,
        point: &ScreenPoint,
        dx: FloatType,
        dy: FloatType,
    ) -> ScreenCoordinate {
        let width = self.resolution.x as FloatType;
        let height = self.resolution.y as FloatType;
        let x = point.x as FloatType + dx;
        let y = point.y as FloatType + dy;
        ScreenCoordinate::new(2.0 * x / width - 1.0, (1.0 - 2.0 * y / height) * height / width)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        camera::Camera,
        geometry::{WorldPoint, WorldVector},
        material::Material,
        scene::{Background, Sphere},
    };
    use assert2::{assert, let_assert};

    fn scene() -> Scene {
        let mut builder = Scene::builder();
        let white = builder.add_material(Material::default());
        let ball = builder
            .add_object(Sphere::new(WorldPoint::origin(), 1.0, white))
            .unwrap();
        builder.set_background(Background::Uniform(Color::new(0.0, 0.0, 1.0)));
        let camera = Camera::builder()
            .center(WorldPoint::new(0.0, 0.0, 5.0))
            .forward(WorldVector::new(0.0, 0.0, -1.0))
            .up(WorldVector::new(0.0, 1.0, 0.0))
            .field_of_view(FloatType::to_radians(60.0))
            .build();
        builder.build(ball, camera).unwrap()
    }

    fn worker(scene: &Scene, seed: u64) -> Worker<'_> {
        Worker::new(scene, &RenderSettings::default(), ScreenSize::new(40, 30), seed).unwrap()
    }

    #[test]
    fn coordinates_cover_the_image() {
        let scene = scene();
        let worker = worker(&scene, 0);
        let mut rng = SmallRng::seed_from_u64(0);

        let top_left = worker.jittered_coordinate(&ScreenPoint::new(0, 0), &mut rng);
        let bottom_right = worker.jittered_coordinate(&ScreenPoint::new(39, 29), &mut rng);
        assert!(top_left.x >= -1.0 && top_left.x < -0.9);
        assert!(top_left.y <= 0.75 && top_left.y > 0.65);
        assert!(bottom_right.x > 0.9 && bottom_right.x <= 1.0);
        assert!(bottom_right.y >= -0.75 && bottom_right.y < -0.65);
    }

    #[test]
    fn center_sees_sphere_corner_sees_background() {
        let scene = scene();
        let worker = worker(&scene, 0);

        // No lights, so the sphere shows its diffuse color under white ambient light.
        let center = worker.render_pixel(&ScreenPoint::new(20, 15));
        assert!(center.color == Rgb::new(1.0, 1.0, 1.0));
        assert!(center.eye_lengths.min >= 1);

        let corner = worker.render_pixel(&ScreenPoint::new(0, 0));
        assert!(corner.color == Rgb::new(0.0, 0.0, 1.0));
        assert!(corner.eye_lengths.max == 0);
        assert!(corner.light_lengths.count == 0);
    }

    #[test]
    fn same_seed_same_pixel() {
        let scene = scene();
        let a = worker(&scene, 42).render_pixel(&ScreenPoint::new(21, 14));
        let b = worker(&scene, 42).render_pixel(&ScreenPoint::new(21, 14));
        assert!(a.color == b.color);
        assert!(a.eye_lengths == b.eye_lengths);
    }

    #[test]
    fn first_hit_only_when_requested() {
        let scene = scene();
        let center = ScreenPoint::new(20, 15);
        assert!(worker(&scene, 0).render_pixel(&center).first_hit.is_none());

        let settings = RenderSettings {
            feature_buffers: true,
            ..Default::default()
        };
        let worker = Worker::new(&scene, &settings, ScreenSize::new(40, 30), 0).unwrap();
        let_assert!(Some(hit) = worker.render_pixel(&center).first_hit);
        // Center pixel looks almost straight at the front of the unit ball from z = 5.
        assert!((hit.depth - 4.0).abs() < 1e-2);
        assert!(hit.normal.z > 0.99);

        let_assert!(Some(miss) = worker.render_pixel(&ScreenPoint::new(0, 0)).first_hit);
        assert!(miss.depth == FloatType::INFINITY);
        assert!(miss.normal == WorldVector::zeros());
    }
}
