use bon::bon;
use nalgebra::Unit;

use crate::{
    geometry::{FloatType, Hit, Ray, WorldVector, reflect},
    util::Color,
};

/// Surface reflectance and emission.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub diffuse_color: Color,
    pub specular_color: Color,
    pub transmission_color: Color,
    pub emitted_light: Color,
    pub shininess: FloatType,
    pub refractive_index: FloatType,
}

#[bon]
impl Material {
    #[builder]
    pub fn new(
        #[builder(default = Color::repeat(1.0))] diffuse_color: Color,
        #[builder(default = Color::zeros())] specular_color: Color,
        #[builder(default = Color::zeros())] transmission_color: Color,
        #[builder(default = Color::zeros())] emitted_light: Color,
        #[builder(default = 1.0)] shininess: FloatType,
        #[builder(default = 1.0)] refractive_index: FloatType,
    ) -> Self {
        Material {
            diffuse_color,
            specular_color,
            transmission_color,
            emitted_light,
            shininess,
            refractive_index,
        }
    }
}

impl Material {
    /// Light reflected towards `-ray.direction` for light arriving from `dir_to_light`.
    /// Diffuse plus a Phong lobe around the mirror direction, not clamped.
    pub fn shade(
        &self,
        ray: &Ray,
        hit: &Hit,
        dir_to_light: &Unit<WorldVector>,
        light_intensity: &Color,
    ) -> Color {
        let normal = &hit.normal;
        let diffuse = dir_to_light.dot(normal.as_ref()).max(0.0);

        let reflected = reflect(&ray.direction, normal).normalize();
        let specular = reflected
            .dot(dir_to_light.as_ref())
            .max(0.0)
            .powf(self.shininess);

        (self.diffuse_color * diffuse + self.specular_color * specular)
            .component_mul(light_intensity)
    }

    pub fn emits(&self) -> bool {
        self.emitted_light != Color::zeros()
    }

    /// Probability of picking the specular lobe when sampling a continuation direction.
    pub fn specular_probability(&self) -> FloatType {
        let specular = self.specular_color.sum();
        let diffuse = self.diffuse_color.sum();
        if specular + diffuse > 0.0 {
            specular / (specular + diffuse)
        } else {
            0.0
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Material::builder().build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        geometry::{WorldPoint, test::unit_vector},
        scene::MaterialIdx,
    };
    use assert2::assert;
    use proptest::prop_assert;
    use test_case::test_case;
    use test_strategy::proptest;

    fn floor_hit() -> Hit {
        Hit {
            t: 1.0,
            material: MaterialIdx::new(0),
            normal: WorldVector::y_axis(),
        }
    }

    fn down_ray() -> Ray {
        Ray::new(WorldPoint::new(1.0, 1.0, 0.0), WorldVector::new(-1.0, -1.0, 0.0))
    }

    #[test]
    fn defaults() {
        let material = Material::default();
        assert!(material.diffuse_color == Color::repeat(1.0));
        assert!(material.specular_color == Color::zeros());
        assert!(material.shininess == 1.0);
        assert!(material.refractive_index == 1.0);
        assert!(!material.emits());
    }

    #[test]
    fn diffuse_follows_cosine() {
        let material = Material::builder().diffuse_color(Color::new(1.0, 0.5, 0.0)).build();
        let light = Unit::new_normalize(WorldVector::new(1.0, 1.0, 0.0));
        let color = material.shade(&down_ray(), &floor_hit(), &light, &Color::repeat(2.0));
        let cos = FloatType::sqrt(0.5);
        assert!((color - Color::new(2.0 * cos, cos, 0.0)).norm() < 1e-5);
    }

    #[test]
    fn specular_peaks_at_mirror_direction() {
        let material = Material::builder()
            .diffuse_color(Color::zeros())
            .specular_color(Color::repeat(1.0))
            .shininess(20.0)
            .build();
        let mirror = Unit::new_normalize(WorldVector::new(-1.0, 1.0, 0.0));
        let off_mirror = Unit::new_normalize(WorldVector::new(0.0, 1.0, 0.0));
        let intensity = Color::repeat(1.0);

        let peak = material.shade(&down_ray(), &floor_hit(), &mirror, &intensity);
        let off = material.shade(&down_ray(), &floor_hit(), &off_mirror, &intensity);
        assert!((peak - Color::repeat(1.0)).norm() < 1e-5);
        assert!(off.x < 1e-2);
    }

    #[test]
    fn light_below_surface_gives_no_diffuse() {
        let material = Material::default();
        let light = Unit::new_normalize(WorldVector::new(0.0, -1.0, 0.0));
        let color = material.shade(&down_ray(), &floor_hit(), &light, &Color::repeat(1.0));
        assert!(color == Color::zeros());
    }

    #[proptest]
    fn shade_is_non_negative(
        #[strategy(unit_vector())] light: Unit<WorldVector>,
        #[strategy(unit_vector())] incoming: Unit<WorldVector>,
    ) {
        let material = Material::builder()
            .specular_color(Color::repeat(0.5))
            .shininess(7.0)
            .build();
        let ray = Ray::new(WorldPoint::origin(), *incoming.as_ref());
        let color = material.shade(&ray, &floor_hit(), &light, &Color::repeat(1.0));
        prop_assert!(color.iter().all(|c| *c >= 0.0));
    }

    #[test_case(Color::repeat(1.0), Color::zeros() => 0.0; "diffuse only")]
    #[test_case(Color::zeros(), Color::repeat(1.0) => 1.0; "specular only")]
    #[test_case(Color::new(1.0, 1.0, 0.0), Color::new(0.0, 0.0, 2.0) => 0.5; "mixed")]
    #[test_case(Color::zeros(), Color::zeros() => 0.0; "black")]
    fn specular_probability(diffuse: Color, specular: Color) -> FloatType {
        Material::builder()
            .diffuse_color(diffuse)
            .specular_color(specular)
            .build()
            .specular_probability()
    }
}
