//! Built-in scenes used by the command line tool and the benchmark.

use nalgebra::{Translation3, UnitQuaternion};

use crate::{
    camera::Camera,
    geometry::{FloatType, WorldMatrix, WorldPoint, WorldVector},
    material::Material,
    scene::{
        Background, Group, MaterialIdx, ObjectIdx, Plane, Scene, SceneBuilder, SceneError, Sphere,
        Torus, Transform, Triangle,
    },
    util::Color,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Demo {
    /// Diffuse, mirror and glass balls on a floor under a spherical lamp.
    Spheres,
    /// Tilted glossy torus lit by a square ceiling panel.
    Torus,
    /// Closed box with colored walls and a ceiling panel.
    Box,
}

impl Demo {
    pub const ALL: [Demo; 3] = [Demo::Spheres, Demo::Torus, Demo::Box];
}

pub fn build(demo: Demo) -> Result<Scene, SceneError> {
    match demo {
        Demo::Spheres => spheres(),
        Demo::Torus => torus(),
        Demo::Box => closed_box(),
    }
}

fn camera(center: WorldPoint, look_at: WorldPoint) -> Camera {
    Camera::builder()
        .center(center)
        .forward(look_at - center)
        .up(WorldVector::y())
        .field_of_view(FloatType::to_radians(50.0))
        .build()
}

fn lamp(builder: &mut SceneBuilder, intensity: FloatType) -> MaterialIdx {
    builder.add_material(
        Material::builder()
            .diffuse_color(Color::zeros())
            .emitted_light(Color::repeat(intensity))
            .build(),
    )
}

/// Two triangles covering an axis aligned square in the plane `y = height`, facing down.
fn ceiling_panel(
    builder: &mut SceneBuilder,
    height: FloatType,
    half_size: FloatType,
    material: MaterialIdx,
) -> Result<[ObjectIdx; 2], SceneError> {
    let corner = |x: FloatType, z: FloatType| WorldPoint::new(x * half_size, height, z * half_size);
    Ok([
        builder.add_object(Triangle::flat(
            [corner(-1.0, -1.0), corner(1.0, -1.0), corner(1.0, 1.0)],
            material,
        ))?,
        builder.add_object(Triangle::flat(
            [corner(-1.0, -1.0), corner(1.0, 1.0), corner(-1.0, 1.0)],
            material,
        ))?,
    ])
}

fn spheres() -> Result<Scene, SceneError> {
    let mut builder = Scene::builder();
    let floor_material =
        builder.add_material(Material::builder().diffuse_color(Color::repeat(0.6)).build());
    let red = builder.add_material(
        Material::builder()
            .diffuse_color(Color::new(0.7, 0.15, 0.1))
            .specular_color(Color::repeat(0.1))
            .shininess(20.0)
            .build(),
    );
    let mirror = builder.add_material(
        Material::builder()
            .diffuse_color(Color::repeat(0.05))
            .specular_color(Color::repeat(0.9))
            .shininess(500.0)
            .build(),
    );
    let glass = builder.add_material(
        Material::builder()
            .diffuse_color(Color::zeros())
            .specular_color(Color::repeat(0.05))
            .transmission_color(Color::repeat(0.9))
            .refractive_index(1.5)
            .shininess(200.0)
            .build(),
    );
    let light = lamp(&mut builder, 8.0);

    let members = vec![
        builder.add_object(Plane::new(WorldVector::y(), 0.0, floor_material))?,
        builder.add_object(Sphere::new(WorldPoint::new(-1.3, 0.6, 0.0), 0.6, red))?,
        builder.add_object(Sphere::new(WorldPoint::new(0.0, 0.7, -0.8), 0.7, mirror))?,
        builder.add_object(Sphere::new(WorldPoint::new(1.2, 0.5, 0.4), 0.5, glass))?,
        builder.add_object(Sphere::new(WorldPoint::new(0.0, 3.5, 1.0), 0.4, light))?,
    ];
    let root = builder.add_object(Group::new(members))?;

    builder.set_background(Background::Gradient {
        horizon: Color::new(0.8, 0.85, 0.9),
        zenith: Color::new(0.25, 0.4, 0.8),
    });
    builder.build(
        root,
        camera(WorldPoint::new(0.0, 1.6, 5.0), WorldPoint::new(0.0, 0.6, 0.0)),
    )
}

fn torus() -> Result<Scene, SceneError> {
    let mut builder = Scene::builder();
    let floor_material =
        builder.add_material(Material::builder().diffuse_color(Color::repeat(0.5)).build());
    let gold = builder.add_material(
        Material::builder()
            .diffuse_color(Color::new(0.6, 0.45, 0.15))
            .specular_color(Color::new(0.3, 0.25, 0.1))
            .shininess(50.0)
            .build(),
    );
    let light = lamp(&mut builder, 6.0);

    let ring = builder.add_object(Torus::new(1.0, 0.35, gold))?;
    let tilt = Translation3::new(0.0, 1.2, 0.0).to_homogeneous()
        * UnitQuaternion::from_axis_angle(&WorldVector::x_axis(), FloatType::to_radians(35.0))
            .to_homogeneous();
    let tilted_ring = builder.add_object(Transform::new(tilt, ring)?)?;

    let mut members = vec![
        builder.add_object(Plane::new(WorldVector::y(), 0.0, floor_material))?,
        tilted_ring,
    ];
    members.extend(ceiling_panel(&mut builder, 4.0, 0.75, light)?);
    let root = builder.add_object(Group::new(members))?;

    builder.set_background(Background::Uniform(Color::repeat(0.05)));
    builder.build(
        root,
        camera(WorldPoint::new(0.0, 2.5, 5.0), WorldPoint::new(0.0, 1.0, 0.0)),
    )
}

fn closed_box() -> Result<Scene, SceneError> {
    let mut builder = Scene::builder();
    let white =
        builder.add_material(Material::builder().diffuse_color(Color::repeat(0.75)).build());
    let red =
        builder.add_material(Material::builder().diffuse_color(Color::new(0.75, 0.1, 0.1)).build());
    let green =
        builder.add_material(Material::builder().diffuse_color(Color::new(0.1, 0.75, 0.1)).build());
    let light = lamp(&mut builder, 12.0);

    let wall = |builder: &mut SceneBuilder, normal: WorldVector, offset: FloatType, material| {
        builder.add_object(Plane::new(normal, offset, material))
    };
    let mut members = vec![
        wall(&mut builder, WorldVector::y(), 0.0, white)?,
        wall(&mut builder, -WorldVector::y(), -2.0, white)?,
        wall(&mut builder, WorldVector::z(), -1.0, white)?,
        wall(&mut builder, -WorldVector::z(), -4.0, white)?,
        wall(&mut builder, WorldVector::x(), -1.0, red)?,
        wall(&mut builder, -WorldVector::x(), -1.0, green)?,
        builder.add_object(Sphere::new(WorldPoint::new(0.4, 0.4, -0.2), 0.4, white))?,
    ];
    // Just below the ceiling so the panel is not hidden inside the wall.
    members.extend(ceiling_panel(&mut builder, 1.99, 0.3, light)?);

    let block = builder.add_object(Sphere::new(WorldPoint::origin(), 1.0, white))?;
    let squashed = WorldMatrix::new_translation(&WorldVector::new(-0.45, 0.25, 0.2))
        * WorldMatrix::new_nonuniform_scaling(&WorldVector::new(0.35, 0.25, 0.35));
    members.push(builder.add_object(Transform::new(squashed, block)?)?);

    let root = builder.add_object(Group::new(members))?;
    builder.build(
        root,
        camera(WorldPoint::new(0.0, 1.0, 3.5), WorldPoint::new(0.0, 1.0, 0.0)),
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::geometry::{Interval, Ray, ScreenCoordinate};
    use assert2::{assert, let_assert};
    use test_case::test_case;

    #[test_case(Demo::Spheres, 5, 1)]
    #[test_case(Demo::Torus, 3, 2)]
    #[test_case(Demo::Box, 4, 2)]
    fn demo_builds_with_lights(demo: Demo, material_count: usize, light_count: usize) {
        let_assert!(Ok(scene) = build(demo));
        assert!(scene.lights().len() == light_count);
        assert!(scene.ambient_light() == &Color::zeros());
        for index in 0..material_count {
            // Panics when out of range.
            let _ = scene.material(index.into());
        }
    }

    #[test_case(Demo::Spheres)]
    #[test_case(Demo::Torus)]
    #[test_case(Demo::Box)]
    fn camera_looks_at_something(demo: Demo) {
        let scene = build(demo).unwrap();
        let ray = scene.camera().generate_ray(&ScreenCoordinate::origin());
        assert!(scene.intersect(&ray, Interval::beyond(0.0)).is_some());
    }

    #[test]
    fn box_is_closed() {
        let scene = build(Demo::Box).unwrap();
        let origin = WorldPoint::new(0.0, 1.0, 1.0);
        for direction in [
            WorldVector::x(),
            -WorldVector::x(),
            WorldVector::y(),
            -WorldVector::y(),
            WorldVector::z(),
            -WorldVector::z(),
            WorldVector::new(1.0, 1.0, 1.0),
        ] {
            let ray = Ray::new(origin, direction);
            assert!(scene.intersect(&ray, Interval::beyond(0.0)).is_some());
        }
    }

    #[test]
    fn tilted_torus_is_above_the_floor() {
        let scene = build(Demo::Torus).unwrap();
        // The tilt axis is x, so the tube still crosses it at x = 1, lifted to y = 1.2.
        // The ray meets the tilted tube 0.35 / cos(35°) above that.
        let ray = Ray::new(WorldPoint::new(1.0, 3.0, 0.0), -WorldVector::y());
        let_assert!(Some(hit) = scene.intersect(&ray, Interval::beyond(0.0)));
        assert!(hit.t > 1.3 && hit.t < 1.45);
    }
}
