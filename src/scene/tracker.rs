/// GPU work selected for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameWork {
    /// Nothing changed; no GPU work this tick
    Idle,
    /// Only transforms moved; patch object records then dispatch
    PatchTransforms,
    /// The object set changed; rebuild every buffer then dispatch
    FullRebuild,
    /// Geometry is current but a previous dispatch was refused
    DispatchOnly,
}

impl FrameWork {
    pub fn dispatches(self) -> bool {
        !matches!(self, Self::Idle)
    }
}

/// Dirty flags observed once per tick.
#[derive(Debug, Default)]
pub struct SceneChangeTracker {
    objects_changed: bool,
    transforms_changed: bool,
    dispatch_deferred: bool,
}

impl SceneChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// An object was added or removed.
    pub fn mark_objects_changed(&mut self) {
        self.objects_changed = true;
    }

    /// A watched transform (object or emitter) moved since the last tick.
    pub fn mark_transform_changed(&mut self) {
        self.transforms_changed = true;
    }

    /// Geometry was refreshed but the dispatch could not be issued.
    pub fn defer_dispatch(&mut self) {
        self.dispatch_deferred = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.objects_changed || self.transforms_changed || self.dispatch_deferred
    }

    /// Returns this tick's work and clears every flag.
    ///
    /// A full rebuild also refreshes transforms, so it wins over a patch.
    pub fn observe(&mut self) -> FrameWork {
        let work = if self.objects_changed {
            FrameWork::FullRebuild
        } else if self.transforms_changed {
            FrameWork::PatchTransforms
        } else if self.dispatch_deferred {
            FrameWork::DispatchOnly
        } else {
            FrameWork::Idle
        };

        self.objects_changed = false;
        self.transforms_changed = false;
        self.dispatch_deferred = false;
        work
    }
}
