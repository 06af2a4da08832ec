use crate::acoustics::ResultLayout;
use crate::config::RaySonicWorldDesc;
use crate::error::Result;
use crate::gpu::AcousticBackend;
use crate::gpu::readback::{ReadbackBuffer, ReadbackCompletion, ReadbackMessage, ReadbackPool};
use crate::math::{Mat4, kernel_emitter_matrix};
use bytemuck::{Pod, Zeroable};
use crossbeam_channel::{Receiver, Sender};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Per-dispatch uniforms matching the kernel's `Params` struct (96 bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct KernelUniforms {
    /// Emitter local-to-world, forward column negated
    pub source: [[f32; 4]; 4],
    /// Sub-pixel jitter in [0, 1)
    pub pixel_offset: [f32; 2],
    pub seed: f32,
    /// Bounce limit plus the primary ray
    pub bounces: u32,
    pub diffractions: u32,
    pub width: u32,
    pub height: u32,
    pub parameter_count: u32,
}

/// Workgroup counts of one dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchGrid {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl DispatchGrid {
    /// One thread per pixel, one z slice per diffraction layer.
    pub fn for_layout(layout: &ResultLayout, group_size: u32) -> Self {
        Self {
            x: layout.width.div_ceil(group_size),
            y: layout.height.div_ceil(group_size),
            z: layout.diffraction_layers,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Idle,
    Dispatched { ticket: u64 },
    ReadbackPending { ticket: u64, generation: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Issued { ticket: u64 },
    /// A read-back is still in flight; nothing was submitted
    Busy,
}

/// A finished read-back, owned by whoever polled it.
///
/// Dropping it returns the buffer to the pool.
#[derive(Debug)]
pub struct CompletedReadback {
    pub ticket: u64,
    /// Source registry generation when the dispatch was issued
    pub generation: u64,
    pub layout: ResultLayout,
    pub buffer: ReadbackBuffer,
}

#[derive(Debug)]
pub enum ReadbackPoll {
    /// Nothing in flight
    Idle,
    /// Still waiting on the device
    Pending,
    Completed(CompletedReadback),
    /// The transfer failed; its buffer has been released
    Failed { ticket: u64, reason: String },
}

/// Drives the acoustic kernel with at most one read-back in flight.
///
/// `Idle → Dispatched → ReadbackPending → Idle`; a dispatch requested in any
/// state but `Idle` is refused without touching the backend.
pub struct AcousticRayDispatcher {
    layout: ResultLayout,
    bounces: u32,
    group_size: u32,
    rng: StdRng,
    state: DispatchState,
    pool: ReadbackPool,
    sender: Sender<ReadbackMessage>,
    receiver: Receiver<ReadbackMessage>,
    next_ticket: u64,
}

impl AcousticRayDispatcher {
    pub fn new(desc: &RaySonicWorldDesc) -> Self {
        let rng = match desc.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self {
            layout: ResultLayout::from_desc(desc),
            bounces: desc.bounces,
            group_size: desc.group_size,
            rng,
            state: DispatchState::Idle,
            pool: ReadbackPool::new(),
            sender,
            receiver,
            next_ticket: 0,
        }
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        self.state != DispatchState::Idle
    }

    pub fn layout(&self) -> ResultLayout {
        self.layout
    }

    pub fn grid(&self) -> DispatchGrid {
        DispatchGrid::for_layout(&self.layout, self.group_size)
    }

    /// Pool the read-back buffers come from.
    pub fn pool(&self) -> &ReadbackPool {
        &self.pool
    }

    /// Fresh uniforms for one dispatch, drawing new jitter and seed.
    pub fn uniforms(&mut self, emitter_transform: Mat4) -> KernelUniforms {
        KernelUniforms {
            source: kernel_emitter_matrix(emitter_transform).to_cols_array_2d(),
            pixel_offset: [
                self.rng.gen_range(0.0..1.0),
                self.rng.gen_range(0.0..1.0),
            ],
            seed: self.rng.gen_range(0.0..1.0),
            bounces: self.bounces + 1,
            diffractions: self.layout.diffraction_layers - 1,
            width: self.layout.width,
            height: self.layout.height,
            parameter_count: self.layout.parameter_count,
        }
    }

    /// Runs the kernel and requests its read-back.
    ///
    /// `generation` is the sound-source registry generation the geometry was
    /// built with; it travels with the result.
    pub fn dispatch(
        &mut self,
        backend: &mut dyn AcousticBackend,
        emitter_transform: Mat4,
        generation: u64,
    ) -> Result<DispatchOutcome> {
        if self.is_busy() {
            log::debug!("Dispatch refused, read-back still in flight ({:?})", self.state);
            return Ok(DispatchOutcome::Busy);
        }

        let ticket = self.next_ticket;
        self.next_ticket += 1;

        let uniforms = self.uniforms(emitter_transform);
        let grid = self.grid();

        self.state = DispatchState::Dispatched { ticket };
        if let Err(e) = backend.dispatch(&uniforms, grid) {
            self.state = DispatchState::Idle;
            return Err(e);
        }

        let target = self.pool.acquire(self.layout.len());
        let completion = ReadbackCompletion::new(ticket, self.sender.clone());
        if let Err(e) = backend.request_readback(target, completion) {
            self.state = DispatchState::Idle;
            return Err(e);
        }

        self.state = DispatchState::ReadbackPending { ticket, generation };
        log::debug!(
            "Dispatched acoustic kernel {} ({}x{}x{} groups)",
            ticket,
            grid.x,
            grid.y,
            grid.z
        );
        Ok(DispatchOutcome::Issued { ticket })
    }

    /// Collects the pending read-back if the device has finished it.
    pub fn poll(&mut self, backend: &mut dyn AcousticBackend) -> ReadbackPoll {
        backend.poll();

        while let Ok(message) = self.receiver.try_recv() {
            let DispatchState::ReadbackPending { ticket, generation } = self.state else {
                log::debug!("Discarding read-back {} with none pending", message.ticket());
                continue;
            };
            if message.ticket() != ticket {
                log::debug!("Discarding stale read-back {}", message.ticket());
                continue;
            }

            self.state = DispatchState::Idle;
            return match message {
                ReadbackMessage::Completed { buffer, .. } => {
                    ReadbackPoll::Completed(CompletedReadback {
                        ticket,
                        generation,
                        layout: self.layout,
                        buffer,
                    })
                }
                ReadbackMessage::Failed { reason, buffer, .. } => {
                    drop(buffer);
                    log::warn!("Read-back {} failed, skipping this update: {}", ticket, reason);
                    ReadbackPoll::Failed { ticket, reason }
                }
            };
        }

        match self.state {
            DispatchState::ReadbackPending { .. } => ReadbackPoll::Pending,
            _ => ReadbackPoll::Idle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::testing::RecordingBackend;
    use crate::math::{Pose, Vec3};

    fn desc() -> RaySonicWorldDesc {
        RaySonicWorldDesc::new()
            .texture_size(10, 6)
            .diffractions(2)
            .bounces(3)
            .rng_seed(7)
    }

    #[test]
    fn test_grid_rounds_up() {
        let dispatcher = AcousticRayDispatcher::new(&desc());
        assert_eq!(dispatcher.grid(), DispatchGrid { x: 3, y: 2, z: 3 });
    }

    #[test]
    fn test_uniforms() {
        let mut dispatcher = AcousticRayDispatcher::new(&desc());
        let pose = Pose::from_position(Vec3::new(1.0, 2.0, 3.0));
        let uniforms = dispatcher.uniforms(pose.to_matrix());

        assert_eq!(uniforms.bounces, 4);
        assert_eq!(uniforms.diffractions, 2);
        assert_eq!((uniforms.width, uniforms.height), (10, 6));
        assert_eq!(uniforms.source[2], [0.0, 0.0, -1.0, 0.0]);
        assert_eq!(uniforms.source[3], [1.0, 2.0, 3.0, 1.0]);
        assert!((0.0..1.0).contains(&uniforms.seed));
        assert!(uniforms.pixel_offset.iter().all(|v| (0.0..1.0).contains(v)));
        assert_eq!(std::mem::size_of::<KernelUniforms>(), 96);

        let next = dispatcher.uniforms(pose.to_matrix());
        assert_ne!(uniforms.seed, next.seed);
    }

    #[test]
    fn test_seeded_dispatchers_agree() {
        let mut a = AcousticRayDispatcher::new(&desc());
        let mut b = AcousticRayDispatcher::new(&desc());
        assert_eq!(a.uniforms(Mat4::IDENTITY), b.uniforms(Mat4::IDENTITY));
    }

    #[test]
    fn test_at_most_one_in_flight() {
        let mut dispatcher = AcousticRayDispatcher::new(&desc());
        let mut backend = RecordingBackend {
            hold_readbacks: true,
            ..Default::default()
        };

        let first = dispatcher.dispatch(&mut backend, Mat4::IDENTITY, 0).unwrap();
        assert_eq!(first, DispatchOutcome::Issued { ticket: 0 });
        assert_eq!(
            dispatcher.state(),
            DispatchState::ReadbackPending {
                ticket: 0,
                generation: 0
            }
        );

        for _ in 0..3 {
            let again = dispatcher.dispatch(&mut backend, Mat4::IDENTITY, 0).unwrap();
            assert_eq!(again, DispatchOutcome::Busy);
            assert!(matches!(dispatcher.poll(&mut backend), ReadbackPoll::Pending));
        }
        assert_eq!(backend.dispatches.len(), 1);
        assert_eq!(backend.readback_requests, 1);
        assert_eq!(backend.pending.len(), 1);
        assert_eq!(dispatcher.pool().outstanding(), 1);

        backend.hold_readbacks = false;
        assert!(matches!(
            dispatcher.poll(&mut backend),
            ReadbackPoll::Completed(_)
        ));
        assert_eq!(dispatcher.state(), DispatchState::Idle);
        // completed readback was dropped by the match above
        assert_eq!(dispatcher.pool().outstanding(), 0);

        let third = dispatcher.dispatch(&mut backend, Mat4::IDENTITY, 0).unwrap();
        assert_eq!(third, DispatchOutcome::Issued { ticket: 1 });
    }

    #[test]
    fn test_completed_buffer_carries_result_and_generation() {
        let mut dispatcher = AcousticRayDispatcher::new(&desc());
        let layout = dispatcher.layout();
        let mut backend = RecordingBackend {
            result: vec![0.25; layout.len()],
            ..Default::default()
        };

        dispatcher.dispatch(&mut backend, Mat4::IDENTITY, 42).unwrap();
        match dispatcher.poll(&mut backend) {
            ReadbackPoll::Completed(done) => {
                assert_eq!(done.generation, 42);
                assert_eq!(done.buffer.len(), layout.len());
                assert!(done.buffer.iter().all(|v| *v == 0.25));
                assert_eq!(dispatcher.pool().outstanding(), 1);
            }
            other => panic!("expected completion, got {:?}", other),
        }
        assert_eq!(dispatcher.pool().outstanding(), 0);
        assert!(matches!(dispatcher.poll(&mut backend), ReadbackPoll::Idle));
    }

    #[test]
    fn test_readback_error_returns_to_idle_and_releases() {
        let mut dispatcher = AcousticRayDispatcher::new(&desc());
        let mut backend = RecordingBackend {
            fail_next_readback: Some("device lost".into()),
            ..Default::default()
        };

        dispatcher.dispatch(&mut backend, Mat4::IDENTITY, 0).unwrap();
        match dispatcher.poll(&mut backend) {
            ReadbackPoll::Failed { ticket, reason } => {
                assert_eq!(ticket, 0);
                assert_eq!(reason, "device lost");
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(dispatcher.state(), DispatchState::Idle);
        assert_eq!(dispatcher.pool().outstanding(), 0);
    }

    #[test]
    fn test_dispatch_error_returns_to_idle() {
        let mut dispatcher = AcousticRayDispatcher::new(&desc());
        let mut backend = RecordingBackend {
            fail_dispatch: true,
            ..Default::default()
        };

        assert!(dispatcher.dispatch(&mut backend, Mat4::IDENTITY, 0).is_err());
        assert_eq!(dispatcher.state(), DispatchState::Idle);
        assert_eq!(backend.readback_requests, 0);
        assert_eq!(dispatcher.pool().outstanding(), 0);
    }
}
