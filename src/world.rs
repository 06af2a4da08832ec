use crate::acoustics::AcousticSignalExtractor;
use crate::audio_data::AudioClip;
use crate::config::RaySonicWorldDesc;
use crate::error::{RaySonicError, Result};
use crate::events::RaySonicEvent;
use crate::gpu::{
    AcousticBackend, AcousticRayDispatcher, CompletedReadback, DispatchOutcome, ReadbackPoll,
    WgpuAcousticBackend, WgpuBackendDesc,
};
use crate::math::Mat4;
use crate::modulator::SourceAudioModulator;
use crate::playback::PlaybackDevice;
use crate::scene::{
    FrameWork, Mesh, ObjectId, SceneChangeTracker, SceneGeometryBuffer, SceneObject,
    SceneObjectDesc, SoundSourceId, SoundSourceRegistry,
};
use crossbeam_channel::{Receiver, Sender};
use std::collections::HashMap;
use std::sync::Arc;

/// Scene state tying geometry, ray dispatch and per-source audio together.
///
/// `RaySonicWorld` is owned by the host and driven from its main loop. The
/// host registers meshes, forwards transform changes and calls [`tick`]
/// once per simulation step. Nothing in a tick blocks: GPU results arrive on
/// a later tick and are applied to the sources' audio then.
///
/// # Tick order
///
/// 1. Collect a finished read-back, if any, and apply it to every source.
/// 2. Observe the change tracker.
/// 3. Rebuild or patch the geometry buffers as needed.
/// 4. Dispatch the kernel, unless a read-back is still in flight.
///
/// [`tick`]: RaySonicWorld::tick
pub struct RaySonicWorld<B: AcousticBackend = WgpuAcousticBackend> {
    desc: RaySonicWorldDesc,
    backend: B,
    objects: Vec<SceneObject>,
    next_object_id: u64,
    registry: SoundSourceRegistry,
    modulators: HashMap<ObjectId, SourceAudioModulator>,
    tracker: SceneChangeTracker,
    geometry: SceneGeometryBuffer,
    dispatcher: AcousticRayDispatcher,
    extractor: AcousticSignalExtractor,
    emitter_transform: Mat4,
    event_sender: Sender<RaySonicEvent>,
    event_receiver: Receiver<RaySonicEvent>,
}

impl RaySonicWorld<WgpuAcousticBackend> {
    /// Creates a world on a headless `wgpu` device of its own.
    ///
    /// With the bundled kernel `desc.group_size` must equal
    /// [`DEFAULT_KERNEL_GROUP_SIZE`](crate::gpu::DEFAULT_KERNEL_GROUP_SIZE);
    /// a custom shader's `@workgroup_size` must match it as well but is not
    /// checked.
    pub fn with_gpu(desc: RaySonicWorldDesc, backend_desc: &WgpuBackendDesc) -> Result<Self> {
        desc.validate()?;
        backend_desc.check_group_size(desc.group_size)?;
        let backend = WgpuAcousticBackend::new_headless(backend_desc)?;
        Self::new(desc, backend)
    }
}

impl<B: AcousticBackend> RaySonicWorld<B> {
    /// Creates an empty world driving `backend`.
    ///
    /// # Errors
    ///
    /// Returns [`RaySonicError::Configuration`] when `desc` fails validation.
    pub fn new(desc: RaySonicWorldDesc, backend: B) -> Result<Self> {
        desc.validate()?;
        let (event_sender, event_receiver) = crossbeam_channel::unbounded();

        log::info!(
            "Created RaySonic world: {}x{} rays, {} bounces, {} diffractions",
            desc.texture_width,
            desc.texture_height,
            desc.bounces,
            desc.diffractions
        );

        Ok(Self {
            dispatcher: AcousticRayDispatcher::new(&desc),
            extractor: AcousticSignalExtractor::new(desc.spread_mode),
            desc,
            backend,
            objects: Vec::new(),
            next_object_id: 0,
            registry: SoundSourceRegistry::new(),
            modulators: HashMap::new(),
            tracker: SceneChangeTracker::new(),
            geometry: SceneGeometryBuffer::new(),
            emitter_transform: Mat4::IDENTITY,
            event_sender,
            event_receiver,
        })
    }

    pub fn desc(&self) -> &RaySonicWorldDesc {
        &self.desc
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn registry(&self) -> &SoundSourceRegistry {
        &self.registry
    }

    pub fn geometry(&self) -> &SceneGeometryBuffer {
        &self.geometry
    }

    pub fn dispatcher(&self) -> &AcousticRayDispatcher {
        &self.dispatcher
    }

    /// Registers a ray-traceable object.
    ///
    /// Objects flagged as sound sources also receive a [`SoundSourceId`]; once
    /// 255 sources exist further ones are still traced as occluders but are
    /// never attributed (a [`RaySonicEvent::SourceRejected`] is emitted).
    ///
    /// # Errors
    ///
    /// Returns [`RaySonicError::EmptyMesh`] when the mesh has no triangle and
    /// [`RaySonicError::Configuration`] when an index points past the vertices.
    pub fn register_object(&mut self, desc: SceneObjectDesc) -> Result<ObjectId> {
        let id = ObjectId(self.next_object_id);
        Self::check_mesh(id, &desc.mesh)?;
        self.next_object_id += 1;

        let object = SceneObject::new(id, desc);
        if object.wants_sound_source {
            match self.registry.register(id) {
                Some(source_id) => self.send_event(RaySonicEvent::SourceRegistered {
                    object: id,
                    source_id,
                }),
                None => self.send_event(RaySonicEvent::SourceRejected { object: id }),
            }
        }

        log::debug!(
            "Registered {} ({} triangles)",
            id,
            object.mesh.triangle_count()
        );
        self.objects.push(object);
        self.tracker.mark_objects_changed();
        Ok(id)
    }

    fn check_mesh(id: ObjectId, mesh: &Mesh) -> Result<()> {
        if mesh.triangle_count() == 0 {
            return Err(RaySonicError::EmptyMesh(id.to_string()));
        }
        let vertex_count = mesh.vertices().len() as u32;
        if let Some(index) = mesh.indices().iter().find(|i| **i >= vertex_count) {
            return Err(RaySonicError::Configuration(format!(
                "Mesh for {} indexes vertex {} of {}",
                id, index, vertex_count
            )));
        }
        Ok(())
    }

    /// Removes an object, its source id and its audio. Unknown ids are
    /// ignored; returns whether anything was removed.
    pub fn unregister_object(&mut self, id: ObjectId) -> bool {
        let Some(position) = self.objects.iter().position(|o| o.id == id) else {
            return false;
        };
        self.objects.remove(position);

        if let Some(mut modulator) = self.modulators.remove(&id) {
            modulator.on_detach();
        }
        if let Some(source_id) = self.registry.unregister(id) {
            self.send_event(RaySonicEvent::SourceUnregistered {
                object: id,
                source_id,
            });
        }

        log::debug!("Unregistered {}", id);
        self.tracker.mark_objects_changed();
        true
    }

    /// Meshes are fixed at registration: a live object always refuses.
    ///
    /// # Errors
    ///
    /// [`RaySonicError::ObjectRegistered`] for a registered object,
    /// [`RaySonicError::ObjectNotFound`] otherwise. Unregister the object and
    /// register it again with the new mesh instead.
    pub fn set_object_mesh(&mut self, id: ObjectId, _mesh: Arc<Mesh>) -> Result<()> {
        if self.object(id).is_some() {
            Err(RaySonicError::ObjectRegistered(id.to_string()))
        } else {
            Err(RaySonicError::ObjectNotFound(id.to_string()))
        }
    }

    pub fn object(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    /// Registered objects in buffer order.
    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn is_sound_source(&self, id: ObjectId) -> bool {
        self.registry.find_id(id).is_some()
    }

    pub fn source_id(&self, id: ObjectId) -> Option<SoundSourceId> {
        self.registry.find_id(id)
    }

    /// Updates an object's world transform; the next tick patches it in.
    pub fn set_object_transform(&mut self, id: ObjectId, transform: Mat4) -> Result<()> {
        let object = self
            .objects
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| RaySonicError::ObjectNotFound(id.to_string()))?;

        if object.transform != transform {
            object.transform = transform;
            self.tracker.mark_transform_changed();
        }
        Ok(())
    }

    /// Moves the ray emitter (the listener). Accepts a [`Mat4`] or a
    /// [`Pose`](crate::math::Pose).
    pub fn set_emitter_transform(&mut self, transform: impl Into<Mat4>) {
        let transform = transform.into();
        if self.emitter_transform != transform {
            self.emitter_transform = transform;
            self.tracker.mark_transform_changed();
        }
    }

    pub fn emitter_transform(&self) -> Mat4 {
        self.emitter_transform
    }

    /// Gives a sound source its playback device and clip, and starts it.
    ///
    /// A previous device of the same object is stopped and dropped. An
    /// invalid clip is reported as [`RaySonicEvent::ClipRejected`]; the
    /// source then stays silent until [`set_source_clip`](Self::set_source_clip)
    /// provides a valid one. An object without a sound-source id (not flagged,
    /// or rejected once 255 sources exist) always stays silent.
    ///
    /// # Errors
    ///
    /// Returns [`RaySonicError::ObjectNotFound`] if `id` is not registered.
    pub fn attach_source_audio(
        &mut self,
        id: ObjectId,
        device: Box<dyn PlaybackDevice>,
        clip: Option<AudioClip>,
    ) -> Result<()> {
        if self.object(id).is_none() {
            return Err(RaySonicError::ObjectNotFound(id.to_string()));
        }

        if let Some(mut previous) = self.modulators.remove(&id) {
            previous.on_detach();
        }

        let mut modulator = SourceAudioModulator::new(device, self.desc.clip_limits);
        self.apply_clip(id, &mut modulator, clip);
        modulator.on_attach();
        self.modulators.insert(id, modulator);
        Ok(())
    }

    /// Swaps the clip of a source that already has audio attached.
    pub fn set_source_clip(&mut self, id: ObjectId, clip: Option<AudioClip>) -> Result<()> {
        let mut modulator = self
            .modulators
            .remove(&id)
            .ok_or_else(|| RaySonicError::ObjectNotFound(id.to_string()))?;

        modulator.stop(false);
        self.apply_clip(id, &mut modulator, clip);
        modulator.play_if_valid();
        self.modulators.insert(id, modulator);
        Ok(())
    }

    fn apply_clip(
        &self,
        id: ObjectId,
        modulator: &mut SourceAudioModulator,
        clip: Option<AudioClip>,
    ) {
        // without an id no ray is ever attributed, so the clip would never be attenuated
        if self.registry.find_id(id).is_none() {
            log::warn!("{} has no sound-source id, its audio stays silent", id);
            modulator.attach_clip(None);
            self.send_event(RaySonicEvent::ClipRejected {
                object: id,
                reason: "object has no sound-source id".to_string(),
            });
            return;
        }

        let reason = match &clip {
            None => Some("no clip".to_string()),
            Some(c) => c.validate(&self.desc.clip_limits).err().map(|e| e.to_string()),
        };
        modulator.attach_clip(clip);
        if let Some(reason) = reason {
            self.send_event(RaySonicEvent::ClipRejected { object: id, reason });
        }
    }

    pub fn play_source(&mut self, id: ObjectId) -> Result<()> {
        self.modulator_mut(id)?.play_if_valid();
        Ok(())
    }

    /// Pauses (keeping the position) or stops a source.
    pub fn stop_source(&mut self, id: ObjectId, pause: bool) -> Result<()> {
        self.modulator_mut(id)?.stop(pause);
        Ok(())
    }

    pub fn modulator(&self, id: ObjectId) -> Option<&SourceAudioModulator> {
        self.modulators.get(&id)
    }

    fn modulator_mut(&mut self, id: ObjectId) -> Result<&mut SourceAudioModulator> {
        self.modulators
            .get_mut(&id)
            .ok_or_else(|| RaySonicError::ObjectNotFound(id.to_string()))
    }

    /// Runs one cooperative step and returns the GPU work it selected.
    ///
    /// Failures are logged and reported as events; the affected frame is
    /// skipped and the world stays usable.
    pub fn tick(&mut self) -> FrameWork {
        if self.dispatcher.is_busy() {
            self.collect_readback();
        }

        let work = self.tracker.observe();
        match work {
            FrameWork::Idle => return work,
            FrameWork::FullRebuild => {
                match self
                    .geometry
                    .rebuild(&self.objects, &self.registry, &mut self.backend)
                {
                    Ok(buffers) => {
                        let event = RaySonicEvent::GeometryRebuilt {
                            objects: buffers.objects.len(),
                            vertices: buffers.vertices.len(),
                            triangles: buffers.triangle_count(),
                        };
                        self.send_event(event);
                    }
                    Err(e) => {
                        self.report_gpu_error("Geometry rebuild failed", e);
                        return work;
                    }
                }
            }
            FrameWork::PatchTransforms => {
                match self.geometry.patch_transforms(&self.objects, &mut self.backend) {
                    Ok(buffers) => {
                        let event = RaySonicEvent::TransformsPatched {
                            objects: buffers.objects.len(),
                        };
                        self.send_event(event);
                    }
                    Err(RaySonicError::GeometryOutOfDate(reason)) => {
                        log::warn!("Transform patch out of date ({}), rebuilding", reason);
                        self.tracker.mark_objects_changed();
                        return work;
                    }
                    Err(e) => {
                        self.report_gpu_error("Transform patch failed", e);
                        return work;
                    }
                }
            }
            FrameWork::DispatchOnly => {}
        }

        match self.dispatcher.dispatch(
            &mut self.backend,
            self.emitter_transform,
            self.registry.generation(),
        ) {
            Ok(DispatchOutcome::Issued { .. }) => {}
            Ok(DispatchOutcome::Busy) => {
                self.tracker.defer_dispatch();
                self.send_event(RaySonicEvent::DispatchDeferred);
            }
            Err(e) => self.report_gpu_error("Dispatch failed", e),
        }
        work
    }

    fn collect_readback(&mut self) {
        match self.dispatcher.poll(&mut self.backend) {
            ReadbackPoll::Completed(done) => self.apply_readback(done),
            ReadbackPoll::Failed { ticket, reason } => {
                self.send_event(RaySonicEvent::ReadbackFailed {
                    ticket,
                    error: reason,
                });
            }
            ReadbackPoll::Idle | ReadbackPoll::Pending => {}
        }
    }

    fn apply_readback(&mut self, done: CompletedReadback) {
        let mut targets = Vec::new();
        for (object, source_id) in self.registry.iter() {
            if !self.modulators.get(&object).is_some_and(|m| m.has_clip()) {
                continue;
            }
            let assigned = self.registry.assigned_generation(source_id).unwrap_or(u64::MAX);
            if assigned > done.generation {
                log::debug!("Skipping stale result for {} ({})", object, source_id);
                self.send_event(RaySonicEvent::StaleResultSkipped { object, source_id });
                continue;
            }
            targets.push((object, source_id));
        }

        let ids: Vec<SoundSourceId> = targets.iter().map(|(_, id)| *id).collect();
        let signals = self.extractor.extract_all(&done.buffer, &ids, &done.layout);

        let hits = if self.desc.diagnostics {
            let hits = self.extractor.hit_count(&done.buffer, &done.layout);
            log::info!("Read-back {}: {} source hits", done.ticket, hits);
            hits
        } else {
            0
        };

        let mut updated = 0;
        for (object, source_id) in targets {
            let signal = signals.get(&source_id).copied().unwrap_or_default();
            if let Some(modulator) = self.modulators.get_mut(&object) {
                modulator.on_acoustic_update(signal.volume, signal.spread);
                updated += 1;
                self.send_event(RaySonicEvent::SourceUpdated {
                    object,
                    volume: signal.volume,
                    spread: signal.spread,
                });
            }
        }

        self.send_event(RaySonicEvent::ReadbackCompleted {
            ticket: done.ticket,
            sources_updated: updated,
            hits,
        });
    }

    fn report_gpu_error(&self, context: &str, error: RaySonicError) {
        log::warn!("{}, skipping this frame: {}", context, error);
        self.send_event(RaySonicEvent::GpuError {
            error: error.to_string(),
        });
    }

    fn send_event(&self, event: RaySonicEvent) {
        // the receiver lives as long as the world
        let _ = self.event_sender.send(event);
    }

    /// Drains every event produced since the last call.
    pub fn poll_events(&self) -> Vec<RaySonicEvent> {
        self.event_receiver.try_iter().collect()
    }
}

impl<B: AcousticBackend> Drop for RaySonicWorld<B> {
    fn drop(&mut self) {
        for modulator in self.modulators.values_mut() {
            modulator.on_detach();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::testing::RecordingBackend;
    use crate::math::Vec3;
    use crate::playback::testing::MockDevice;

    fn world() -> RaySonicWorld<RecordingBackend> {
        let desc = RaySonicWorldDesc::new().texture_size(4, 4).rng_seed(1);
        RaySonicWorld::new(desc, RecordingBackend::default()).unwrap()
    }

    fn cube_at(at: Vec3) -> SceneObjectDesc {
        SceneObjectDesc::new(Arc::new(Mesh::cube()), Mat4::from_translation(at))
    }

    fn clip() -> AudioClip {
        AudioClip::from_samples("loop", vec![1.0; 8], 48_000, 1).unwrap()
    }

    /// Result buffer where the first `hits` pixels reached `id` at `distance`.
    fn result_for(world: &RaySonicWorld<RecordingBackend>, id: u8, hits: usize, distance: f32) -> Vec<f32> {
        let layout = world.dispatcher().layout();
        let mut buffer = vec![0.0; layout.len()];
        let ids = layout.layer_offset(0, 0);
        let distances = layout.layer_offset(0, 1);
        for pixel in 0..hits {
            buffer[ids + pixel] = id as f32 / 256.0;
            buffer[distances + pixel] = distance;
        }
        buffer
    }

    #[test]
    fn test_rejects_empty_mesh() {
        let mut world = world();
        let empty = SceneObjectDesc::new(Arc::new(Mesh::new(vec![Vec3::ZERO], vec![])), Mat4::IDENTITY);
        assert!(matches!(
            world.register_object(empty),
            Err(RaySonicError::EmptyMesh(_))
        ));
        assert_eq!(world.object_count(), 0);
    }

    #[test]
    fn test_rejects_out_of_range_index() {
        let mut world = world();
        let broken = SceneObjectDesc::new(
            Arc::new(Mesh::new(vec![Vec3::ZERO, Vec3::X], vec![0, 1, 2])),
            Mat4::IDENTITY,
        );
        assert!(matches!(
            world.register_object(broken),
            Err(RaySonicError::Configuration(_))
        ));
    }

    #[test]
    fn test_mesh_is_fixed_while_registered() {
        let mut world = world();
        let id = world.register_object(cube_at(Vec3::ZERO)).unwrap();
        assert!(matches!(
            world.set_object_mesh(id, Arc::new(Mesh::cube())),
            Err(RaySonicError::ObjectRegistered(_))
        ));

        world.unregister_object(id);
        assert!(matches!(
            world.set_object_mesh(id, Arc::new(Mesh::cube())),
            Err(RaySonicError::ObjectNotFound(_))
        ));
    }

    #[test]
    fn test_idle_tick_does_no_gpu_work() {
        let mut world = world();
        world.register_object(cube_at(Vec3::ZERO)).unwrap();
        assert_eq!(world.tick(), FrameWork::FullRebuild);
        let calls = world.backend().gpu_calls();

        // read-back completes on this tick, nothing else is dirty
        assert_eq!(world.tick(), FrameWork::Idle);
        assert_eq!(world.tick(), FrameWork::Idle);
        assert_eq!(world.backend().gpu_calls(), calls);
    }

    #[test]
    fn test_transform_change_patches() {
        let mut world = world();
        let id = world.register_object(cube_at(Vec3::ZERO)).unwrap();
        world.tick();
        world.tick();

        world.set_object_transform(id, Mat4::from_translation(Vec3::Y)).unwrap();
        assert_eq!(world.tick(), FrameWork::PatchTransforms);
        assert_eq!(world.backend().geometry_uploads, 1);
        assert_eq!(world.backend().record_uploads, 1);

        // same transform again is not a change
        world.tick();
        world.set_object_transform(id, Mat4::from_translation(Vec3::Y)).unwrap();
        assert_eq!(world.tick(), FrameWork::Idle);
    }

    #[test]
    fn test_busy_dispatch_is_deferred() {
        let mut world = world();
        world.backend_mut().hold_readbacks = true;
        world.register_object(cube_at(Vec3::ZERO)).unwrap();
        world.tick();

        world.set_emitter_transform(Mat4::from_translation(Vec3::X));
        assert_eq!(world.tick(), FrameWork::PatchTransforms);
        assert_eq!(world.backend().dispatches.len(), 1);
        assert!(world.poll_events().contains(&RaySonicEvent::DispatchDeferred));

        world.backend_mut().hold_readbacks = false;
        assert_eq!(world.tick(), FrameWork::DispatchOnly);
        assert_eq!(world.backend().dispatches.len(), 2);
    }

    #[test]
    fn test_readback_drives_source_volume() {
        let mut world = world();
        let source = world
            .register_object(cube_at(Vec3::Z).sound_source(true))
            .unwrap();
        let device = MockDevice::new();
        world
            .attach_source_audio(source, Box::new(device.clone()), Some(clip()))
            .unwrap();
        assert!(device.snapshot().plays == 1);

        let id = world.source_id(source).unwrap().get();
        world.backend_mut().result = result_for(&world, id, 4, 0.5);
        world.tick();
        world.tick();

        let state = world.modulator(source).unwrap().clip_state().unwrap();
        assert_eq!(state.current_volume(), 0.5);
        assert_eq!(device.snapshot().samples, vec![0.5; 8]);
        assert!(world.poll_events().iter().any(|e| matches!(
            e,
            RaySonicEvent::ReadbackCompleted {
                sources_updated: 1,
                ..
            }
        )));
    }

    #[test]
    fn test_failed_readback_leaves_audio_untouched() {
        let mut world = world();
        let source = world
            .register_object(cube_at(Vec3::Z).sound_source(true))
            .unwrap();
        let device = MockDevice::new();
        world
            .attach_source_audio(source, Box::new(device.clone()), Some(clip()))
            .unwrap();
        let pushes = device.snapshot().buffer_pushes;

        world.backend_mut().fail_next_readback = Some("lost".into());
        world.tick();
        world.tick();

        assert_eq!(device.snapshot().buffer_pushes, pushes);
        assert_eq!(world.dispatcher().pool().outstanding(), 0);
        assert!(world.poll_events().iter().any(|e| matches!(e, RaySonicEvent::ReadbackFailed { .. })));
    }

    #[test]
    fn test_invalid_clip_reported() {
        let mut world = world();
        let source = world
            .register_object(cube_at(Vec3::Z).sound_source(true))
            .unwrap();
        let hi_res = AudioClip::from_samples("hi", vec![1.0; 8], 96_000, 1).unwrap();
        world
            .attach_source_audio(source, Box::new(MockDevice::new()), Some(hi_res))
            .unwrap();

        assert!(!world.modulator(source).unwrap().has_clip());
        assert!(world
            .poll_events()
            .iter()
            .any(|e| matches!(e, RaySonicEvent::ClipRejected { .. })));
    }

    #[test]
    fn test_failed_rebuild_skips_dispatch_until_next_change() {
        let mut world = world();
        world.backend_mut().fail_uploads = true;
        world.register_object(cube_at(Vec3::ZERO)).unwrap();

        assert_eq!(world.tick(), FrameWork::FullRebuild);
        assert!(world.backend().dispatches.is_empty());
        assert!(world
            .poll_events()
            .iter()
            .any(|e| matches!(e, RaySonicEvent::GpuError { .. })));

        // nothing changed since, so the failed frame is not retried on its own
        assert_eq!(world.tick(), FrameWork::Idle);
        assert!(world.backend().dispatches.is_empty());

        world.backend_mut().fail_uploads = false;
        world.register_object(cube_at(Vec3::X)).unwrap();
        assert_eq!(world.tick(), FrameWork::FullRebuild);
        assert_eq!(world.backend().geometry_uploads, 1);
        assert_eq!(world.backend().dispatches.len(), 1);
        assert!(world
            .poll_events()
            .iter()
            .any(|e| matches!(e, RaySonicEvent::GeometryRebuilt { objects: 2, .. })));
    }

    #[test]
    fn test_audio_on_plain_object_stays_silent() {
        let mut world = world();
        let wall = world.register_object(cube_at(Vec3::Z)).unwrap();
        let device = MockDevice::new();
        world
            .attach_source_audio(wall, Box::new(device.clone()), Some(clip()))
            .unwrap();

        assert!(!world.modulator(wall).unwrap().has_clip());
        assert_eq!(device.snapshot().plays, 0);
        assert!(world.poll_events().iter().any(|e| matches!(
            e,
            RaySonicEvent::ClipRejected { object, .. } if *object == wall
        )));

        world.backend_mut().result = result_for(&world, 1, 4, 0.5);
        world.tick();
        world.tick();
        assert_eq!(device.snapshot().buffer_pushes, 0);
    }

    #[test]
    fn test_unknown_object_errors() {
        let mut world = world();
        let id = world.register_object(cube_at(Vec3::ZERO)).unwrap();
        world.unregister_object(id);

        assert!(!world.unregister_object(id));
        assert!(world.set_object_transform(id, Mat4::IDENTITY).is_err());
        assert!(world.play_source(id).is_err());
        assert!(world
            .attach_source_audio(id, Box::new(MockDevice::new()), None)
            .is_err());
    }
}
