use crate::math::{Mat4, Vec3};
use std::sync::Arc;

/// Lightweight, type-safe handle for objects registered with the world.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub(crate) u64);

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ObjectId({})", self.0)
    }
}

/// Axis-aligned bounds in mesh space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds {
    pub center: Vec3,
    pub extents: Vec3,
}

impl Bounds {
    pub fn from_points(points: &[Vec3]) -> Self {
        let Some(first) = points.first() else {
            return Self::default();
        };
        let (min, max) = points
            .iter()
            .fold((*first, *first), |(min, max), p| (min.min(*p), max.max(*p)));
        Self {
            center: (min + max) * 0.5,
            extents: (max - min) * 0.5,
        }
    }
}

/// Triangle mesh used for occlusion testing.
///
/// Immutable once built; a registered object keeps its mesh until it is
/// unregistered.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    vertices: Vec<Vec3>,
    indices: Vec<u32>,
    bounds: Bounds,
}

impl Mesh {
    /// Builds a mesh, dropping a trailing partial triangle and computing bounds.
    pub fn new(vertices: Vec<Vec3>, mut indices: Vec<u32>) -> Self {
        let whole = indices.len() - indices.len() % 3;
        indices.truncate(whole);
        let bounds = Bounds::from_points(&vertices);
        Self {
            vertices,
            indices,
            bounds,
        }
    }

    /// Unit cube centered on the origin (12 triangles)
    pub fn cube() -> Self {
        let vertices = vec![
            Vec3::new(-0.5, -0.5, -0.5),
            Vec3::new(0.5, -0.5, -0.5),
            Vec3::new(0.5, 0.5, -0.5),
            Vec3::new(-0.5, 0.5, -0.5),
            Vec3::new(-0.5, -0.5, 0.5),
            Vec3::new(0.5, -0.5, 0.5),
            Vec3::new(0.5, 0.5, 0.5),
            Vec3::new(-0.5, 0.5, 0.5),
        ];
        #[rustfmt::skip]
        let indices = vec![
            0, 2, 1, 0, 3, 2, // back
            4, 5, 6, 4, 6, 7, // front
            0, 1, 5, 0, 5, 4, // bottom
            3, 7, 6, 3, 6, 2, // top
            0, 4, 7, 0, 7, 3, // left
            1, 2, 6, 1, 6, 5, // right
        ];
        Self::new(vertices, indices)
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Scalar acoustic coefficients of a surface.
///
/// Only `absorbance` reaches the kernel; the others are carried for hosts that
/// author them alongside.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AcousticBehavior {
    pub hardness: f32,
    pub smoothness: f32,
    pub permeability: f32,
    pub absorbance: f32,
    pub density: f32,
}

/// Everything needed to register an object with the world.
#[derive(Debug, Clone)]
pub struct SceneObjectDesc {
    pub mesh: Arc<Mesh>,
    pub transform: Mat4,
    pub acoustics: AcousticBehavior,
    /// Request a sound-source id so rays can be attributed to this object
    pub sound_source: bool,
}

impl SceneObjectDesc {
    pub fn new(mesh: Arc<Mesh>, transform: Mat4) -> Self {
        Self {
            mesh,
            transform,
            acoustics: AcousticBehavior::default(),
            sound_source: false,
        }
    }

    pub fn sound_source(mut self, enable: bool) -> Self {
        self.sound_source = enable;
        self
    }

    pub fn acoustics(mut self, acoustics: AcousticBehavior) -> Self {
        self.acoustics = acoustics;
        self
    }
}

/// A registered ray-traceable object.
#[derive(Debug, Clone)]
pub struct SceneObject {
    pub(crate) id: ObjectId,
    pub(crate) mesh: Arc<Mesh>,
    pub(crate) transform: Mat4,
    pub(crate) acoustics: AcousticBehavior,
    pub(crate) wants_sound_source: bool,
}

impl SceneObject {
    pub(crate) fn new(id: ObjectId, desc: SceneObjectDesc) -> Self {
        Self {
            id,
            mesh: desc.mesh,
            transform: desc.transform,
            acoustics: desc.acoustics,
            wants_sound_source: desc.sound_source,
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn mesh(&self) -> &Arc<Mesh> {
        &self.mesh
    }

    pub fn transform(&self) -> Mat4 {
        self.transform
    }

    pub fn acoustics(&self) -> AcousticBehavior {
        self.acoustics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cube_mesh() {
        let cube = Mesh::cube();
        assert_eq!(cube.vertices().len(), 8);
        assert_eq!(cube.triangle_count(), 12);
        assert_eq!(cube.bounds().center, Vec3::ZERO);
        assert_eq!(cube.bounds().extents, Vec3::splat(0.5));
    }

    #[test]
    fn test_partial_triangle_is_dropped() {
        let mesh = Mesh::new(vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![0, 1]);
        assert_eq!(mesh.triangle_count(), 0);
        assert!(mesh.indices().is_empty());
    }

    #[test]
    fn test_bounds_of_offset_points() {
        let bounds = Bounds::from_points(&[Vec3::new(1.0, 2.0, 3.0), Vec3::new(3.0, 2.0, -1.0)]);
        assert_eq!(bounds.center, Vec3::new(2.0, 2.0, 1.0));
        assert_eq!(bounds.extents, Vec3::new(1.0, 0.0, 2.0));
        assert_eq!(Bounds::from_points(&[]), Bounds::default());
    }
}
