//! Flattening registered objects into GPU geometry buffers.

use crate::error::{RaySonicError, Result};
use crate::gpu::AcousticBackend;
use crate::math::Mat4;
use crate::scene::{ObjectId, SceneObject, SoundSourceRegistry};
use bytemuck::{Pod, Zeroable};

/// Vertex as laid out in the kernel's `array<vec4<f32>>` (w = 1).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuVertex {
    pub position: [f32; 4],
}

/// Per-object record matching the kernel's `MeshObject` struct (112 bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuObjectRecord {
    pub local_to_world: [[f32; 4]; 4],
    /// First entry of this object in the shared index buffer
    pub indices_offset: u32,
    pub indices_count: u32,
    /// 0 when the object is not a sound source
    pub sound_source_id: u32,
    pub absorbance: f32,
    pub center: [f32; 3],
    pub _pad0: f32,
    pub extents: [f32; 3],
    pub _pad1: f32,
}

/// CPU copy of everything uploaded to the kernel for one object set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeometryBuffers {
    pub vertices: Vec<GpuVertex>,
    pub indices: Vec<u32>,
    pub objects: Vec<GpuObjectRecord>,
    /// Object of each record, in record order
    pub object_order: Vec<ObjectId>,
}

impl GeometryBuffers {
    pub fn vertices_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn indices_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    pub fn objects_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.objects)
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Flattens `objects` into fresh buffers.
    ///
    /// Indices are offset by the object's first vertex so a single shared
    /// index buffer addresses the shared vertex buffer.
    pub fn build(objects: &[SceneObject], registry: &SoundSourceRegistry) -> Self {
        let vertex_total: usize = objects.iter().map(|o| o.mesh.vertices().len()).sum();
        let index_total: usize = objects.iter().map(|o| o.mesh.indices().len()).sum();

        let mut buffers = Self {
            vertices: Vec::with_capacity(vertex_total),
            indices: Vec::with_capacity(index_total),
            objects: Vec::with_capacity(objects.len()),
            object_order: Vec::with_capacity(objects.len()),
        };

        for object in objects {
            let mesh = &object.mesh;
            let first_vertex = buffers.vertices.len() as u32;
            let first_index = buffers.indices.len() as u32;

            buffers.vertices.extend(mesh.vertices().iter().map(|v| GpuVertex {
                position: v.extend(1.0).to_array(),
            }));
            buffers
                .indices
                .extend(mesh.indices().iter().map(|i| i + first_vertex));

            let sound_source_id = registry
                .find_id(object.id)
                .map(|id| id.get() as u32)
                .unwrap_or(0);
            let bounds = mesh.bounds();

            buffers.objects.push(GpuObjectRecord {
                local_to_world: object.transform.to_cols_array_2d(),
                indices_offset: first_index,
                indices_count: mesh.indices().len() as u32,
                sound_source_id,
                absorbance: object.acoustics.absorbance,
                center: bounds.center.to_array(),
                _pad0: 0.0,
                extents: bounds.extents.to_array(),
                _pad1: 0.0,
            });
            buffers.object_order.push(object.id);
        }

        buffers
    }
}

/// Owns the geometry buffers and keeps the backend's copy in sync.
///
/// New buffers are built aside and only replace the current ones after a
/// successful upload, so the kernel never sees a half-built set.
#[derive(Debug, Default)]
pub struct SceneGeometryBuffer {
    buffers: GeometryBuffers,
}

impl SceneGeometryBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffers(&self) -> &GeometryBuffers {
        &self.buffers
    }

    pub fn object_count(&self) -> usize {
        self.buffers.objects.len()
    }

    pub fn vertex_count(&self) -> usize {
        self.buffers.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.buffers.triangle_count()
    }

    /// Full rebuild after the object set changed.
    pub fn rebuild(
        &mut self,
        objects: &[SceneObject],
        registry: &SoundSourceRegistry,
        backend: &mut dyn AcousticBackend,
    ) -> Result<&GeometryBuffers> {
        let buffers = GeometryBuffers::build(objects, registry);
        backend.upload_geometry(&buffers)?;

        log::info!(
            "Rebuilt scene geometry: {} objects, {} vertices, {} triangles",
            buffers.objects.len(),
            buffers.vertices.len(),
            buffers.triangle_count()
        );
        self.buffers = buffers;
        Ok(&self.buffers)
    }

    /// Rewrites only the transforms of the existing records.
    ///
    /// `objects` must be the set the buffers were last rebuilt from, in the
    /// same order.
    pub fn patch_transforms(
        &mut self,
        objects: &[SceneObject],
        backend: &mut dyn AcousticBackend,
    ) -> Result<&GeometryBuffers> {
        let records = Self::patched_records(&self.buffers, objects)?;
        backend.upload_object_records(&records)?;

        log::debug!("Patched {} object transforms", records.len());
        self.buffers.objects = records;
        Ok(&self.buffers)
    }

    fn patched_records(
        buffers: &GeometryBuffers,
        objects: &[SceneObject],
    ) -> Result<Vec<GpuObjectRecord>> {
        let same_order = objects.len() == buffers.object_order.len()
            && objects
                .iter()
                .zip(&buffers.object_order)
                .all(|(object, id)| object.id == *id);
        if !same_order {
            return Err(RaySonicError::GeometryOutOfDate(format!(
                "{} objects given, {} records built",
                objects.len(),
                buffers.object_order.len()
            )));
        }

        Ok(buffers
            .objects
            .iter()
            .zip(objects)
            .map(|(record, object)| GpuObjectRecord {
                local_to_world: object.transform.to_cols_array_2d(),
                ..*record
            })
            .collect())
    }
}

/// Column-major matrix as stored in a record.
pub fn record_transform(record: &GpuObjectRecord) -> Mat4 {
    Mat4::from_cols_array_2d(&record.local_to_world)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::testing::RecordingBackend;
    use crate::math::Vec3;
    use crate::scene::{AcousticBehavior, Mesh, SceneObjectDesc};
    use std::sync::Arc;

    fn object(id: u64, mesh: &Arc<Mesh>, at: Vec3, sound_source: bool) -> SceneObject {
        SceneObject::new(
            ObjectId(id),
            SceneObjectDesc::new(mesh.clone(), Mat4::from_translation(at))
                .sound_source(sound_source),
        )
    }

    #[test]
    fn test_build_offsets_indices() {
        let cube = Arc::new(Mesh::cube());
        let triangle = Arc::new(Mesh::new(vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![0, 1, 2]));
        let objects = vec![
            object(1, &cube, Vec3::ZERO, false),
            object(2, &triangle, Vec3::X, false),
        ];

        let buffers = GeometryBuffers::build(&objects, &SoundSourceRegistry::new());
        assert_eq!(buffers.vertices.len(), 11);
        assert_eq!(buffers.indices.len(), 39);
        assert_eq!(&buffers.indices[36..], &[8, 9, 10]);
        assert_eq!(buffers.objects[1].indices_offset, 36);
        assert_eq!(buffers.objects[1].indices_count, 3);
        assert_eq!(buffers.vertices[8].position, [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(buffers.object_order, vec![ObjectId(1), ObjectId(2)]);
    }

    #[test]
    fn test_record_carries_source_id_and_absorbance() {
        let cube = Arc::new(Mesh::cube());
        let mut registry = SoundSourceRegistry::new();
        registry.register(ObjectId(5));
        let mut source = object(5, &cube, Vec3::ZERO, true);
        source.acoustics = AcousticBehavior {
            absorbance: 0.3,
            ..Default::default()
        };
        let objects = vec![object(4, &cube, Vec3::ZERO, false), source];

        let buffers = GeometryBuffers::build(&objects, &registry);
        assert_eq!(buffers.objects[0].sound_source_id, 0);
        assert_eq!(buffers.objects[1].sound_source_id, 1);
        assert_eq!(buffers.objects[1].absorbance, 0.3);
        assert_eq!(buffers.objects[1].extents, [0.5, 0.5, 0.5]);
    }

    #[test]
    fn test_record_layout_size() {
        assert_eq!(std::mem::size_of::<GpuObjectRecord>(), 112);
        assert_eq!(std::mem::size_of::<GpuVertex>(), 16);
    }

    #[test]
    fn test_patch_matches_rebuild() {
        let cube = Arc::new(Mesh::cube());
        let registry = SoundSourceRegistry::new();
        let mut backend = RecordingBackend::default();
        let mut geometry = SceneGeometryBuffer::new();

        let mut objects = vec![
            object(1, &cube, Vec3::ZERO, false),
            object(2, &cube, Vec3::Y, false),
        ];
        geometry.rebuild(&objects, &registry, &mut backend).unwrap();

        objects[0].transform = Mat4::from_translation(Vec3::new(3.0, 0.0, 1.0));
        objects[1].transform = Mat4::from_rotation_z(1.0);
        let patched = geometry
            .patch_transforms(&objects, &mut backend)
            .unwrap()
            .clone();

        let rebuilt = GeometryBuffers::build(&objects, &registry);
        assert_eq!(patched, rebuilt);
        assert_eq!(
            bytemuck::cast_slice::<_, u8>(&patched.objects),
            bytemuck::cast_slice::<_, u8>(&rebuilt.objects)
        );
        assert_eq!(record_transform(&patched.objects[1]), Mat4::from_rotation_z(1.0));
        assert_eq!(backend.geometry_uploads, 1);
        assert_eq!(backend.record_uploads, 1);
    }

    #[test]
    fn test_patch_rejects_changed_object_set() {
        let cube = Arc::new(Mesh::cube());
        let registry = SoundSourceRegistry::new();
        let mut backend = RecordingBackend::default();
        let mut geometry = SceneGeometryBuffer::new();

        let objects = vec![object(1, &cube, Vec3::ZERO, false)];
        geometry.rebuild(&objects, &registry, &mut backend).unwrap();

        let grown = vec![
            object(1, &cube, Vec3::ZERO, false),
            object(2, &cube, Vec3::ZERO, false),
        ];
        assert!(matches!(
            geometry.patch_transforms(&grown, &mut backend),
            Err(RaySonicError::GeometryOutOfDate(_))
        ));
        assert_eq!(backend.record_uploads, 0);
    }

    #[test]
    fn test_failed_upload_keeps_previous_buffers() {
        let cube = Arc::new(Mesh::cube());
        let registry = SoundSourceRegistry::new();
        let mut backend = RecordingBackend::default();
        let mut geometry = SceneGeometryBuffer::new();

        geometry
            .rebuild(&[object(1, &cube, Vec3::ZERO, false)], &registry, &mut backend)
            .unwrap();

        backend.fail_uploads = true;
        let result = geometry.rebuild(
            &[
                object(1, &cube, Vec3::ZERO, false),
                object(2, &cube, Vec3::ZERO, false),
            ],
            &registry,
            &mut backend,
        );
        assert!(matches!(result, Err(RaySonicError::GpuResource(_))));
        assert_eq!(geometry.object_count(), 1);
    }
}
