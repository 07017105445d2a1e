mod composite;
pub mod demo;
mod lamps;
pub mod primitives;

use index_vec::IndexVec;
use nalgebra::Unit;
use thiserror::Error;

use crate::{
    camera::Camera,
    geometry::{FloatType, Hit, Interval, NormalMatrix, Ray, WorldMatrix, WorldPoint, WorldVector},
    material::Material,
    sampler::Sampler,
    util::Color,
};

pub use composite::{Group, Transform};
pub use lamps::{Illumination, Lamp};
pub use primitives::{Plane, Sphere, Torus, Triangle};

index_vec::define_index_type! {
    pub struct ObjectIdx = u32;
}

index_vec::define_index_type! {
    pub struct MaterialIdx = u32;
}

pub type ObjectArena = IndexVec<ObjectIdx, Shape>;

/// Renderable object
pub trait Object {
    /// Returns the nearest intersection with `t` strictly inside `range`.
    /// Composite objects look their children up in `objects`.
    fn intersect(&self, objects: &ObjectArena, ray: &Ray, range: Interval) -> Option<Hit>;
}

/// Point on the surface of a leaf shape, in the shape's own frame.
#[derive(Copy, Clone, Debug)]
pub struct SurfaceSample {
    pub point: WorldPoint,
    pub normal: Unit<WorldVector>,
}

/// Leaf shape that carries a material and can be sampled as an emitter.
pub trait Surface {
    fn material(&self) -> MaterialIdx;
    fn sample_surface(&self, rng: &mut impl rand::Rng) -> SurfaceSample;
}

#[derive(Clone, Debug)]
pub enum Shape {
    Sphere(Sphere),
    Plane(Plane),
    Triangle(Triangle),
    Torus(Torus),
    Group(Group),
    Transform(Transform),
}

macro_rules! shape_from {
    ( $( $variant:ident ),* ) => {
        $(
            impl From<$variant> for Shape {
                fn from(value: $variant) -> Self {
                    Shape::$variant(value)
                }
            }
        )*
    };
}

shape_from!(Sphere, Plane, Triangle, Torus, Group, Transform);

impl Shape {
    /// Material of a leaf shape, None for composites.
    pub fn material(&self) -> Option<MaterialIdx> {
        match self {
            Shape::Sphere(s) => Some(s.material()),
            Shape::Plane(s) => Some(s.material()),
            Shape::Triangle(s) => Some(s.material()),
            Shape::Torus(s) => Some(s.material()),
            Shape::Group(_) | Shape::Transform(_) => None,
        }
    }

    /// Objects referenced by a composite shape.
    pub fn children(&self) -> &[ObjectIdx] {
        match self {
            Shape::Group(group) => group.members(),
            Shape::Transform(transform) => std::slice::from_ref(transform.child()),
            _ => &[],
        }
    }

    fn sample_surface(&self, rng: &mut impl rand::Rng) -> Option<SurfaceSample> {
        match self {
            Shape::Sphere(s) => Some(s.sample_surface(rng)),
            Shape::Plane(s) => Some(s.sample_surface(rng)),
            Shape::Triangle(s) => Some(s.sample_surface(rng)),
            Shape::Torus(s) => Some(s.sample_surface(rng)),
            Shape::Group(_) | Shape::Transform(_) => None,
        }
    }
}

impl Object for Shape {
    fn intersect(&self, objects: &ObjectArena, ray: &Ray, range: Interval) -> Option<Hit> {
        match self {
            Shape::Sphere(s) => s.intersect(objects, ray, range),
            Shape::Plane(s) => s.intersect(objects, ray, range),
            Shape::Triangle(s) => s.intersect(objects, ray, range),
            Shape::Torus(s) => s.intersect(objects, ray, range),
            Shape::Group(s) => s.intersect(objects, ray, range),
            Shape::Transform(s) => s.intersect(objects, ray, range),
        }
    }
}

/// Emissive leaf shape together with the accumulated transform of the path leading to it.
#[derive(Clone, Debug)]
pub struct Light {
    object: ObjectIdx,
    to_world: WorldMatrix,
    normal_to_world: NormalMatrix,
}

impl Light {
    pub fn object(&self) -> ObjectIdx {
        self.object
    }
}

/// World space point sampled on a light.
#[derive(Copy, Clone, Debug)]
pub struct LightSample {
    pub point: WorldPoint,
    pub normal: Unit<WorldVector>,
    pub material: MaterialIdx,
}

/// Radiance arriving from directions that leave the scene.
#[derive(Clone, Debug)]
pub enum Background {
    Uniform(Color),
    /// Vertical blend, `horizon` for rays pointing down, `zenith` for rays pointing up.
    Gradient { horizon: Color, zenith: Color },
}

impl Default for Background {
    fn default() -> Self {
        Background::Uniform(Color::repeat(0.5))
    }
}

impl Background {
    pub fn color(&self, direction: &WorldVector) -> Color {
        match self {
            Background::Uniform(color) => *color,
            Background::Gradient { horizon, zenith } => {
                let t = 0.5 * (direction.normalize().y + 1.0);
                horizon * (1.0 - t) + zenith * t
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("Object {object:?} is referenced before it was added")]
    DanglingObject { object: ObjectIdx },
    #[error("Material {material:?} is referenced before it was added")]
    DanglingMaterial { material: MaterialIdx },
    #[error("Transform matrix is not invertible")]
    SingularTransform,
    #[error("Root object {root:?} does not exist")]
    MissingRoot { root: ObjectIdx },
    #[error("Point lamp falloff must be positive, got {falloff}")]
    InvalidFalloff { falloff: FloatType },
}

pub struct Scene {
    objects: ObjectArena,
    materials: IndexVec<MaterialIdx, Material>,
    root: ObjectIdx,
    lights: Vec<Light>,
    lamps: Vec<Lamp>,

    camera: Camera,
    ambient_light: Color,
    background: Background,
    sampler: Sampler,
}

impl Scene {
    pub fn builder() -> SceneBuilder {
        SceneBuilder::default()
    }

    /// Nearest intersection of the ray with the whole scene.
    pub fn intersect(&self, ray: &Ray, range: Interval) -> Option<Hit> {
        self.objects[self.root].intersect(&self.objects, ray, range)
    }

    /// Draws a world space point on the light's surface.
    pub fn sample_light(&self, light: &Light, rng: &mut impl rand::Rng) -> Option<LightSample> {
        let shape = &self.objects[light.object];
        let material = shape.material()?;
        let sample = shape.sample_surface(rng)?;
        Some(LightSample {
            point: light.to_world.transform_point(&sample.point),
            normal: Unit::new_normalize(light.normal_to_world * sample.normal.as_ref()),
            material,
        })
    }

    pub fn object(&self, index: ObjectIdx) -> &Shape {
        &self.objects[index]
    }

    pub fn material(&self, index: MaterialIdx) -> &Material {
        &self.materials[index]
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn lamps(&self) -> &[Lamp] {
        &self.lamps
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn ambient_light(&self) -> &Color {
        &self.ambient_light
    }

    pub fn background(&self) -> &Background {
        &self.background
    }

    pub fn sampler(&self) -> &Sampler {
        &self.sampler
    }
}

/// Assembles a scene bottom up.
/// Objects can only reference objects and materials added before them, which keeps the
/// graph acyclic.
#[derive(Default)]
pub struct SceneBuilder {
    objects: ObjectArena,
    materials: IndexVec<MaterialIdx, Material>,
    lamps: Vec<Lamp>,
    ambient_light: Option<Color>,
    background: Background,
    sampler: Sampler,
}

impl SceneBuilder {
    pub fn add_material(&mut self, material: Material) -> MaterialIdx {
        self.materials.push(material)
    }

    pub fn add_object(&mut self, shape: impl Into<Shape>) -> Result<ObjectIdx, SceneError> {
        let shape = shape.into();
        if let Some(material) = shape.material() {
            if material >= self.materials.next_idx() {
                return Err(SceneError::DanglingMaterial { material });
            }
        }
        if let Some(&object) = shape
            .children()
            .iter()
            .find(|child| **child >= self.objects.next_idx())
        {
            return Err(SceneError::DanglingObject { object });
        }
        Ok(self.objects.push(shape))
    }

    pub fn add_lamp(&mut self, lamp: Lamp) -> Result<&mut Self, SceneError> {
        if let Lamp::Point { falloff, .. } = lamp
            && !lamp.is_valid()
        {
            return Err(SceneError::InvalidFalloff { falloff });
        }
        self.lamps.push(lamp);
        Ok(self)
    }

    pub fn set_ambient_light(&mut self, ambient_light: Color) -> &mut Self {
        self.ambient_light = Some(ambient_light);
        self
    }

    pub fn set_background(&mut self, background: Background) -> &mut Self {
        self.background = background;
        self
    }

    pub fn set_sampler(&mut self, sampler: Sampler) -> &mut Self {
        self.sampler = sampler;
        self
    }

    pub fn build(self, root: ObjectIdx, camera: Camera) -> Result<Scene, SceneError> {
        if root >= self.objects.next_idx() {
            return Err(SceneError::MissingRoot { root });
        }

        let mut lights = Vec::new();
        collect_lights(
            &self.objects,
            &self.materials,
            root,
            &WorldMatrix::identity(),
            &WorldMatrix::identity(),
            &mut lights,
        );

        let unlit = lights.is_empty() && self.lamps.is_empty();
        let ambient_light = match (self.ambient_light, unlit) {
            (Some(ambient_light), _) => ambient_light,
            (None, true) => {
                log::warn!("No lights in the scene, using white ambient light");
                Color::repeat(1.0)
            }
            (None, false) => Color::zeros(),
        };
        log::debug!(
            "Scene has {} objects, {} materials, {} lights and {} lamps",
            self.objects.len(),
            self.materials.len(),
            lights.len(),
            self.lamps.len()
        );

        Ok(Scene {
            objects: self.objects,
            materials: self.materials,
            root,
            lights,
            lamps: self.lamps,
            camera,
            ambient_light,
            background: self.background,
            sampler: self.sampler,
        })
    }
}

/// Walks the object graph and records every emissive leaf with its accumulated transform.
fn collect_lights(
    objects: &ObjectArena,
    materials: &IndexVec<MaterialIdx, Material>,
    index: ObjectIdx,
    to_world: &WorldMatrix,
    from_world: &WorldMatrix,
    lights: &mut Vec<Light>,
) {
    match &objects[index] {
        Shape::Group(group) => {
            for member in group.members() {
                collect_lights(objects, materials, *member, to_world, from_world, lights);
            }
        }
        Shape::Transform(transform) => collect_lights(
            objects,
            materials,
            *transform.child(),
            &(to_world * transform.matrix()),
            &(transform.inverse() * from_world),
            lights,
        ),
        leaf => {
            if leaf.material().is_some_and(|material| materials[material].emits()) {
                lights.push(Light {
                    object: index,
                    to_world: *to_world,
                    normal_to_world: from_world.fixed_view::<3, 3>(0, 0).transpose(),
                });
            }
        }
    }
}
