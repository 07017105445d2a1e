use nalgebra::Unit;

use crate::geometry::{Hit, Interval, NormalMatrix, Ray, WorldMatrix};

use super::{Object, ObjectArena, ObjectIdx, SceneError};

/// Ordered collection of objects, intersected by a linear scan.
#[derive(Clone, Debug, Default)]
pub struct Group {
    members: Vec<ObjectIdx>,
}

impl Group {
    pub fn new(members: Vec<ObjectIdx>) -> Group {
        Group { members }
    }

    pub fn members(&self) -> &[ObjectIdx] {
        &self.members
    }
}

impl Object for Group {
    fn intersect(&self, objects: &ObjectArena, ray: &Ray, range: Interval) -> Option<Hit> {
        self.members.iter().fold(None, |best: Option<Hit>, member| {
            let range = best.map_or(range, |hit| range.closer_than(hit.t));
            objects[*member].intersect(objects, ray, range).or(best)
        })
    }
}

/// Child object placed in the world by an affine matrix.
#[derive(Clone, Debug)]
pub struct Transform {
    matrix: WorldMatrix,
    inverse: WorldMatrix,
    normal_matrix: NormalMatrix,
    child: ObjectIdx,
}

impl Transform {
    pub fn new(matrix: WorldMatrix, child: ObjectIdx) -> Result<Transform, SceneError> {
        let inverse = matrix.try_inverse().ok_or(SceneError::SingularTransform)?;
        Ok(Transform {
            matrix,
            inverse,
            normal_matrix: inverse.fixed_view::<3, 3>(0, 0).transpose(),
            child,
        })
    }

    pub fn matrix(&self) -> &WorldMatrix {
        &self.matrix
    }

    pub fn inverse(&self) -> &WorldMatrix {
        &self.inverse
    }

    pub fn child(&self) -> &ObjectIdx {
        &self.child
    }
}

impl Object for Transform {
    fn intersect(&self, objects: &ObjectArena, ray: &Ray, range: Interval) -> Option<Hit> {
        let local_ray = ray.transformed(&self.inverse);
        let hit = objects[self.child].intersect(objects, &local_ray, range)?;
        Some(Hit {
            normal: Unit::new_normalize(self.normal_matrix * hit.normal.as_ref()),
            ..hit
        })
    }
}
