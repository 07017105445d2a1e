use assert2::assert;
use bon::bon;
use nalgebra::Unit;

use crate::geometry::{EPSILON, FloatType, Ray, ScreenCoordinate, WorldPoint, WorldVector};

/// Pinhole perspective camera.
#[derive(Copy, Clone, Debug)]
pub struct Camera {
    center: WorldPoint,

    forward: Unit<WorldVector>,
    up: Unit<WorldVector>,
    right: Unit<WorldVector>,

    /// Distance from the center to the image plane spanning [-1, 1] horizontally.
    image_plane_distance: FloatType,

    t_min: FloatType,
}

#[bon]
impl Camera {
    #[builder]
    pub fn new(
        center: WorldPoint,
        forward: WorldVector,
        up: WorldVector,
        /// Horizontal field of view in radians
        field_of_view: FloatType,
        #[builder(default = 0.0)] t_min: FloatType,
    ) -> Self {
        let forward = Unit::try_new(forward, EPSILON).expect("Forward vector must be non-zero");
        let up = Unit::try_new(up, EPSILON).expect("Up vector must be non-zero");
        let right = Unit::try_new(forward.cross(up.as_ref()), EPSILON)
            .expect("`up` and `forward` must be linearly independent");
        let up = Unit::new_normalize(right.cross(forward.as_ref()));

        assert!(field_of_view > 0.0);
        assert!(field_of_view < std::f32::consts::PI);
        assert!(t_min >= 0.0);

        Camera {
            center,
            forward,
            up,
            right,
            image_plane_distance: 1.0 / (field_of_view / 2.0).tan(),
            t_min,
        }
    }
}

impl Camera {
    /// Ray through a point in normalized device coordinates.
    pub fn generate_ray(&self, point: &ScreenCoordinate) -> Ray {
        let direction = self.right.as_ref() * point.x
            + self.up.as_ref() * point.y
            + self.forward.as_ref() * self.image_plane_distance;
        Ray::new(self.center, direction)
    }

    /// Camera rays ignore hits closer than this.
    pub fn t_min(&self) -> FloatType {
        self.t_min
    }
}
