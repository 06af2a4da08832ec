//! Event types for RaySonic

use crate::scene::{ObjectId, SoundSourceId};

/// Notifications produced by [`crate::RaySonicWorld::tick`] and the
/// registration API, drained with [`crate::RaySonicWorld::poll_events`].
#[derive(Debug, Clone, PartialEq)]
pub enum RaySonicEvent {
    SourceRegistered {
        object: ObjectId,
        source_id: SoundSourceId,
    },
    SourceUnregistered {
        object: ObjectId,
        source_id: SoundSourceId,
    },
    /// All 255 ids are taken; the object is traced but never heard
    SourceRejected {
        object: ObjectId,
    },
    ClipRejected {
        object: ObjectId,
        reason: String,
    },
    GeometryRebuilt {
        objects: usize,
        vertices: usize,
        triangles: usize,
    },
    TransformsPatched {
        objects: usize,
    },
    /// A read-back was still in flight; the dispatch moves to a later tick
    DispatchDeferred,
    ReadbackCompleted {
        ticket: u64,
        sources_updated: usize,
        hits: usize,
    },
    ReadbackFailed {
        ticket: u64,
        error: String,
    },
    /// The source's id was reassigned after the result was traced
    StaleResultSkipped {
        object: ObjectId,
        source_id: SoundSourceId,
    },
    SourceUpdated {
        object: ObjectId,
        volume: f32,
        spread: f32,
    },
    GpuError {
        error: String,
    },
}

impl RaySonicEvent {
    pub fn object(&self) -> Option<ObjectId> {
        match self {
            Self::SourceRegistered { object, .. }
            | Self::SourceUnregistered { object, .. }
            | Self::SourceRejected { object }
            | Self::ClipRejected { object, .. }
            | Self::StaleResultSkipped { object, .. }
            | Self::SourceUpdated { object, .. } => Some(*object),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Self::SourceRejected { .. }
                | Self::ClipRejected { .. }
                | Self::ReadbackFailed { .. }
                | Self::GpuError { .. }
        )
    }
}
