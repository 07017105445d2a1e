use std::f32::consts::{PI, TAU};

use nalgebra::Unit;
use rand_distr::{Distribution, UnitDisc};

use crate::{
    geometry::{FloatType, Hit, Ray, WorldVector, orthonormal_basis, reflect},
    material::Material,
};

/// Rejected draws from the specular lobe before falling back to the diffuse lobe.
const SPECULAR_LOBE_ATTEMPTS: usize = 16;

/// Strategy for choosing the continuation direction of a path at a surface.
/// `pdf` always evaluates the same mixture that `sample` draws from.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Sampler {
    /// Density proportional to the cosine with the normal.
    CosineHemisphere,
    /// Mirror reflection only. Reported with unit density.
    PureReflectance,
    /// Diffuse lobe or a Phong lobe around the mirror direction,
    /// picked by the material's specular probability.
    BlinnPhong,
    /// Mirror direction or cosine hemisphere, picked by the material's specular probability.
    #[default]
    Mixed,
}

impl Sampler {
    /// Draws a new direction leaving the surface at `hit`.
    /// `hit.normal` is expected to face against `ray`.
    pub fn sample(
        &self,
        ray: &Ray,
        hit: &Hit,
        material: &Material,
        rng: &mut impl rand::Rng,
    ) -> Unit<WorldVector> {
        match self {
            Sampler::CosineHemisphere => sample_cosine_hemisphere(&hit.normal, rng),
            Sampler::PureReflectance => mirror(ray, hit),
            Sampler::BlinnPhong => {
                if rng.random::<FloatType>() < material.specular_probability() {
                    let axis = mirror(ray, hit);
                    for _ in 0..SPECULAR_LOBE_ATTEMPTS {
                        let direction = sample_phong_lobe(&axis, material.shininess, rng);
                        if direction.dot(hit.normal.as_ref()) > 0.0 {
                            return direction;
                        }
                    }
                }
                sample_cosine_hemisphere(&hit.normal, rng)
            }
            Sampler::Mixed => {
                if rng.random::<FloatType>() < material.specular_probability() {
                    mirror(ray, hit)
                } else {
                    sample_cosine_hemisphere(&hit.normal, rng)
                }
            }
        }
    }

    /// Density of `sample` returning `direction`, per unit solid angle.
    pub fn pdf(
        &self,
        ray: &Ray,
        direction: &Unit<WorldVector>,
        hit: &Hit,
        material: &Material,
    ) -> FloatType {
        match self {
            Sampler::CosineHemisphere => cosine_pdf(direction, &hit.normal),
            Sampler::PureReflectance => 1.0,
            Sampler::BlinnPhong => {
                let p = material.specular_probability();
                let lobe = phong_lobe_pdf(direction, &mirror(ray, hit), material.shininess);
                p * lobe + (1.0 - p) * cosine_pdf(direction, &hit.normal)
            }
            Sampler::Mixed => {
                let p = material.specular_probability();
                p + (1.0 - p) * cosine_pdf(direction, &hit.normal)
            }
        }
    }
}

fn mirror(ray: &Ray, hit: &Hit) -> Unit<WorldVector> {
    Unit::new_normalize(reflect(&ray.direction, &hit.normal))
}

/// Lifts a uniform point on the unit disc to the hemisphere around `normal`.
pub fn sample_cosine_hemisphere(
    normal: &Unit<WorldVector>,
    rng: &mut impl rand::Rng,
) -> Unit<WorldVector> {
    let [x, y]: [FloatType; 2] = UnitDisc.sample(rng);
    let z = (1.0 - x * x - y * y).max(0.0).sqrt();
    let (tangent, bitangent) = orthonormal_basis(normal);
    Unit::new_normalize(tangent.as_ref() * x + bitangent.as_ref() * y + normal.as_ref() * z)
}

pub fn cosine_pdf(direction: &Unit<WorldVector>, normal: &Unit<WorldVector>) -> FloatType {
    direction.dot(normal.as_ref()).max(0.0) / PI
}

/// Direction with density proportional to `cos(alpha)^shininess` around `axis`.
fn sample_phong_lobe(
    axis: &Unit<WorldVector>,
    shininess: FloatType,
    rng: &mut impl rand::Rng,
) -> Unit<WorldVector> {
    let cos_alpha = rng.random::<FloatType>().powf(1.0 / (shininess + 1.0));
    let sin_alpha = (1.0 - cos_alpha * cos_alpha).max(0.0).sqrt();
    let (sin_phi, cos_phi) = (TAU * rng.random::<FloatType>()).sin_cos();
    let (tangent, bitangent) = orthonormal_basis(axis);
    Unit::new_normalize(
        tangent.as_ref() * (sin_alpha * cos_phi)
            + bitangent.as_ref() * (sin_alpha * sin_phi)
            + axis.as_ref() * cos_alpha,
    )
}

fn phong_lobe_pdf(
    direction: &Unit<WorldVector>,
    axis: &Unit<WorldVector>,
    shininess: FloatType,
) -> FloatType {
    let cos_alpha = direction.dot(axis.as_ref()).max(0.0);
    (shininess + 1.0) / TAU * cos_alpha.powf(shininess)
}
