//! Scene-side bookkeeping: registered objects, sound-source ids, dirty flags
//! and the flattened geometry the kernel traces against.

mod geometry;
mod object;
mod registry;
mod tracker;

pub use geometry::{
    GeometryBuffers, GpuObjectRecord, GpuVertex, SceneGeometryBuffer, record_transform,
};
pub use object::{AcousticBehavior, Bounds, Mesh, ObjectId, SceneObject, SceneObjectDesc};
pub use registry::{SoundSourceId, SoundSourceRegistry};
pub use tracker::{FrameWork, SceneChangeTracker};
