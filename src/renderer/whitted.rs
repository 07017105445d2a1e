use nalgebra::Unit;

use crate::{
    geometry::{EPSILON, FloatType, Hit, Interval, Ray, WorldPoint, WorldVector, reflect},
    scene::Scene,
    util::Color,
};

use super::subpath::SELF_INTERSECTION_EPSILON;

/// Recursive ray tracer with shadow rays, mirror reflection and refraction.
pub struct Whitted<'a> {
    scene: &'a Scene,
    bounces: u32,
}

impl<'a> Whitted<'a> {
    pub fn new(scene: &'a Scene, bounces: u32) -> Self {
        Whitted { scene, bounces }
    }

    pub fn sample(&self, camera_ray: Ray, rng: &mut impl rand::Rng) -> Color {
        self.trace(&camera_ray, self.scene.camera().t_min(), self.bounces, 1.0, rng)
    }

    /// `refractive_index` is the index of the medium the ray is travelling through.
    fn trace(
        &self,
        ray: &Ray,
        t_min: FloatType,
        bounces: u32,
        refractive_index: FloatType,
        rng: &mut impl rand::Rng,
    ) -> Color {
        let scene = self.scene;
        let Some(raw_hit) = scene.intersect(ray, Interval::beyond(t_min)) else {
            return scene.background().color(&ray.direction);
        };
        let entering = ray.direction.dot(raw_hit.normal.as_ref()) < 0.0;
        let hit = raw_hit.facing(ray);
        let material = scene.material(hit.material);
        let point = ray.point_at(hit.t);

        let mut color =
            material.emitted_light + scene.ambient_light().component_mul(&material.diffuse_color);
        color += self.direct_light(ray, &hit, rng);

        if bounces == 0 {
            return color;
        }
        let t_min = t_min.max(SELF_INTERSECTION_EPSILON);

        if material.specular_color != Color::zeros() {
            let reflected = Ray::new(point, reflect(&ray.direction, &hit.normal));
            let reflected_color = self.trace(&reflected, t_min, bounces - 1, refractive_index, rng);
            color += reflected_color.component_mul(&material.specular_color);
        }

        if material.transmission_color != Color::zeros() {
            let next_index = if entering {
                material.refractive_index
            } else {
                1.0
            };
            let ratio = refractive_index / next_index;
            if let Some(direction) = refract(&ray.unit_direction(), &hit.normal, ratio) {
                let refracted = Ray::new(point, direction);
                let refracted_color = self.trace(&refracted, t_min, bounces - 1, next_index, rng);
                color += refracted_color.component_mul(&material.transmission_color);
            }
        }

        color
    }

    /// Light from one sampled point on every emitter and from every lamp, shadow tested.
    fn direct_light(&self, ray: &Ray, hit: &Hit, rng: &mut impl rand::Rng) -> Color {
        let scene = self.scene;
        let point = ray.point_at(hit.t);
        let material = scene.material(hit.material);

        let from_emitters = scene
            .lights()
            .iter()
            .filter_map(|light| {
                let sample = scene.sample_light(light, rng)?;
                let (direction, distance) = Unit::try_new_and_get(sample.point - point, EPSILON)?;
                if self.is_shadowed(&point, &direction, distance) {
                    return None;
                }
                let cosine = sample.normal.dot(&-direction.into_inner()).max(0.0);
                let intensity = scene.material(sample.material).emitted_light * cosine;
                Some(material.shade(ray, hit, &direction, &intensity))
            })
            .sum::<Color>();

        let from_lamps = scene
            .lamps()
            .iter()
            .filter_map(|lamp| {
                let illumination = lamp.illuminate(&point)?;
                if self.is_shadowed(
                    &point,
                    &illumination.direction_to_light,
                    illumination.distance,
                ) {
                    return None;
                }
                Some(material.shade(
                    ray,
                    hit,
                    &illumination.direction_to_light,
                    &illumination.intensity,
                ))
            })
            .sum::<Color>();

        from_emitters + from_lamps
    }

    fn is_shadowed(
        &self,
        point: &WorldPoint,
        direction: &Unit<WorldVector>,
        distance: FloatType,
    ) -> bool {
        let shadow_ray = Ray {
            origin: *point,
            direction: direction.into_inner(),
        };
        let range = Interval::new(
            SELF_INTERSECTION_EPSILON,
            distance - SELF_INTERSECTION_EPSILON,
        );
        self.scene.intersect(&shadow_ray, range).is_some()
    }
}

/// Direction of a ray refracted through a surface, None on total internal reflection.
/// `normal` faces against `incident` and `ratio` is the incident over transmitted refractive index.
fn refract(
    incident: &Unit<WorldVector>,
    normal: &Unit<WorldVector>,
    ratio: FloatType,
) -> Option<WorldVector> {
    let cos_incident = -incident.dot(normal.as_ref());
    let k = 1.0 - ratio * ratio * (1.0 - cos_incident * cos_incident);
    if k <= 0.0 {
        return None;
    }
    Some(incident.as_ref() * ratio + normal.as_ref() * (ratio * cos_incident - k.sqrt()))
}
