use nalgebra::Unit;

use crate::{
    geometry::{EPSILON, FloatType, WorldPoint, WorldVector},
    util::Color,
};

/// Light source without a surface. Only the Whitted integrator can see these,
/// they can never be hit by a ray.
#[derive(Clone, Debug)]
pub enum Lamp {
    /// Radiates in all directions, dimmed by `falloff * distance^2`.
    Point {
        position: WorldPoint,
        color: Color,
        falloff: FloatType,
    },
    /// Parallel light travelling along `direction`.
    Directional {
        direction: Unit<WorldVector>,
        color: Color,
    },
}

/// Light arriving at a point from a lamp.
#[derive(Copy, Clone, Debug)]
pub struct Illumination {
    pub direction_to_light: Unit<WorldVector>,
    pub intensity: Color,
    /// Infinite for directional lamps.
    pub distance: FloatType,
}

impl Lamp {
    pub fn point(position: WorldPoint, color: Color, falloff: FloatType) -> Lamp {
        Lamp::Point {
            position,
            color,
            falloff,
        }
    }

    pub fn directional(direction: Unit<WorldVector>, color: Color) -> Lamp {
        Lamp::Directional { direction, color }
    }

    /// None when the point coincides with a point lamp.
    pub fn illuminate(&self, point: &WorldPoint) -> Option<Illumination> {
        match self {
            Lamp::Point {
                position,
                color,
                falloff,
            } => {
                let (direction_to_light, distance) =
                    Unit::try_new_and_get(position - point, EPSILON)?;
                Some(Illumination {
                    direction_to_light,
                    intensity: color / (falloff * distance * distance),
                    distance,
                })
            }
            Lamp::Directional { direction, color } => Some(Illumination {
                direction_to_light: -*direction,
                intensity: *color,
                distance: FloatType::INFINITY,
            }),
        }
    }

    pub(super) fn is_valid(&self) -> bool {
        match self {
            Lamp::Point { falloff, .. } => falloff.is_finite() && *falloff > 0.0,
            Lamp::Directional { .. } => true,
        }
    }
}
