//! # RaySonic
//!
//! GPU ray-traced acoustics for real-time applications.
//!
//! Rays are traced from a listener through the scene on the GPU; every ray
//! that reaches a sound-emitting object is attributed to it. Each source's
//! volume follows how close and unoccluded its rays were, and its reverb
//! follows how much those rays disagreed.
//!
//! ## Quick Start
//!
//! ```no_run
//! use raysonic::*;
//! use raysonic::math::{Mat4, Vec3};
//! use std::sync::Arc;
//!
//! let desc = RaySonicWorldDesc::new().texture_size(128, 128).bounces(2);
//! let mut world = RaySonicWorld::with_gpu(desc, &WgpuBackendDesc::default())?;
//!
//! // Walls and sources are meshes registered once
//! let wall = Arc::new(Mesh::cube());
//! world.register_object(SceneObjectDesc::new(wall.clone(), Mat4::IDENTITY))?;
//! let radio = world.register_object(
//!     SceneObjectDesc::new(wall, Mat4::from_translation(Vec3::new(0.0, 0.0, 4.0)))
//!         .sound_source(true),
//! )?;
//!
//! let clip = AudioClip::from_file("radio.wav", &LoadOptions::default())?;
//! world.attach_source_audio(radio, Box::new(CpalPlaybackDevice::new()?), Some(clip))?;
//!
//! loop {
//!     world.set_emitter_transform(Mat4::from_translation(Vec3::new(0.0, 1.7, 0.0)));
//!     world.tick();
//!     for event in world.poll_events() {
//!         if event.is_error() {
//!             eprintln!("{:?}", event);
//!         }
//!     }
//! #   break;
//! }
//! # Ok::<(), RaySonicError>(())
//! ```
//!
//! ## Key Components
//!
//! - **[`RaySonicWorld`]**: owns the scene and drives one cooperative step per [`RaySonicWorld::tick`]
//! - **[`SceneGeometryBuffer`]**: flattens registered meshes into the kernel's buffers
//! - **[`AcousticRayDispatcher`]**: issues the kernel with at most one read-back in flight
//! - **[`AcousticSignalExtractor`]**: turns a read-back into per-source volume and spread
//! - **[`SourceAudioModulator`]**: applies those values to a source's looping clip
//! - **[`PlaybackDevice`]**: the audio output seam, implemented by [`CpalPlaybackDevice`]
//! - **[`AcousticBackend`]**: the GPU seam, implemented by [`WgpuAcousticBackend`]

pub mod acoustics;
pub mod audio_data;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod gpu;
pub mod math;
pub mod modulator;
pub mod playback;
pub mod scene;
pub mod world;

pub use acoustics::{AcousticSignal, AcousticSignalExtractor, ResultLayout};
pub use audio_data::{AudioClip, LoadOptions};
pub use config::{ClipLimits, RaySonicWorldDesc, SpreadMode};
pub use engine::CpalPlaybackDevice;
pub use error::{RaySonicError, Result};
pub use events::RaySonicEvent;
pub use gpu::{
    AcousticBackend, AcousticRayDispatcher, DispatchOutcome, ReadbackPoll, WgpuAcousticBackend,
    WgpuBackendDesc,
};
pub use modulator::{AudioClipState, SourceAudioModulator};
pub use playback::{ClipFormat, PlayState, PlaybackDevice, ReverbStage};
pub use scene::{
    AcousticBehavior, FrameWork, Mesh, ObjectId, SceneChangeTracker, SceneGeometryBuffer,
    SceneObjectDesc, SoundSourceId, SoundSourceRegistry,
};
pub use world::RaySonicWorld;
