//! GPU side of the acoustic pipeline.
//!
//! The kernel itself is opaque: the crate defines its inputs (geometry
//! buffers, [`KernelUniforms`], ray-state buffers) and the shape of its
//! output, and drives it through the [`AcousticBackend`] trait.
//! [`WgpuAcousticBackend`] is the `wgpu` implementation.

mod dispatcher;
mod readback;
mod wgpu_backend;

pub use dispatcher::{
    AcousticRayDispatcher, CompletedReadback, DispatchGrid, DispatchOutcome, DispatchState,
    KernelUniforms, ReadbackPoll,
};
pub use readback::{ReadbackBuffer, ReadbackCompletion, ReadbackPool};
pub use wgpu_backend::{
    DEFAULT_KERNEL, DEFAULT_KERNEL_GROUP_SIZE, WgpuAcousticBackend, WgpuBackendDesc,
};

use crate::error::Result;
use crate::scene::{GeometryBuffers, GpuObjectRecord};

/// Device-side operations the pipeline needs from a GPU.
///
/// All calls come from the logic thread and must not block. Read-back
/// results are reported later through the [`ReadbackCompletion`] handed to
/// `request_readback`, typically from inside `poll`.
pub trait AcousticBackend {
    /// Replaces vertex, index and object-record buffers as one set.
    fn upload_geometry(&mut self, buffers: &GeometryBuffers) -> Result<()>;

    /// Replaces only the object records; vertex and index data are kept.
    fn upload_object_records(&mut self, records: &[GpuObjectRecord]) -> Result<()>;

    /// Resets the ray-state buffers, binds everything and runs the kernel.
    fn dispatch(&mut self, uniforms: &KernelUniforms, grid: DispatchGrid) -> Result<()>;

    /// Starts copying the result texture of the last dispatch into `target`.
    fn request_readback(
        &mut self,
        target: ReadbackBuffer,
        completion: ReadbackCompletion,
    ) -> Result<()>;

    /// Advances outstanding device work and fires finished completions.
    fn poll(&mut self);
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::error::RaySonicError;

    /// Backend double that records calls and completes read-backs on `poll`.
    #[derive(Default)]
    pub struct RecordingBackend {
        pub geometry_uploads: usize,
        pub record_uploads: usize,
        pub dispatches: Vec<(KernelUniforms, DispatchGrid)>,
        pub readback_requests: usize,
        pub pending: Vec<(ReadbackBuffer, ReadbackCompletion)>,
        pub fail_uploads: bool,
        pub fail_dispatch: bool,
        pub fail_next_readback: Option<String>,
        pub hold_readbacks: bool,
        pub result: Vec<f32>,
    }

    impl RecordingBackend {
        pub fn gpu_calls(&self) -> usize {
            self.geometry_uploads + self.record_uploads + self.dispatches.len()
        }
    }

    impl AcousticBackend for RecordingBackend {
        fn upload_geometry(&mut self, _buffers: &GeometryBuffers) -> Result<()> {
            if self.fail_uploads {
                return Err(RaySonicError::GpuResource("out of memory".into()));
            }
            self.geometry_uploads += 1;
            Ok(())
        }

        fn upload_object_records(&mut self, _records: &[GpuObjectRecord]) -> Result<()> {
            if self.fail_uploads {
                return Err(RaySonicError::GpuResource("out of memory".into()));
            }
            self.record_uploads += 1;
            Ok(())
        }

        fn dispatch(&mut self, uniforms: &KernelUniforms, grid: DispatchGrid) -> Result<()> {
            if self.fail_dispatch {
                return Err(RaySonicError::GpuDevice("device lost".into()));
            }
            self.dispatches.push((*uniforms, grid));
            Ok(())
        }

        fn request_readback(
            &mut self,
            target: ReadbackBuffer,
            completion: ReadbackCompletion,
        ) -> Result<()> {
            self.readback_requests += 1;
            self.pending.push((target, completion));
            Ok(())
        }

        fn poll(&mut self) {
            if self.hold_readbacks {
                return;
            }
            for (mut buffer, completion) in self.pending.drain(..) {
                if let Some(reason) = self.fail_next_readback.take() {
                    completion.fail(buffer, reason);
                    continue;
                }
                let n = buffer.len().min(self.result.len());
                buffer[..n].copy_from_slice(&self.result[..n]);
                completion.complete(buffer);
            }
        }
    }
}
