use crate::scene::ObjectId;
use std::collections::HashMap;

/// Identifier of a sound source as encoded into the result texture (1..=255).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SoundSourceId(u8);

impl SoundSourceId {
    pub const MAX: u8 = 255;

    /// Returns `None` for 0, which the kernel reads as "not a source".
    pub fn new(value: u8) -> Option<Self> {
        (value != 0).then_some(Self(value))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Exclusive bounds of the id channel values attributed to this source.
    pub fn band(self) -> (f32, f32) {
        let id = self.0 as f32;
        ((id - 0.5) / 256.0, (id + 0.5) / 256.0)
    }

    /// Whether an id-channel sample belongs to this source.
    pub fn matches(self, value: f32) -> bool {
        let (low, high) = self.band();
        value > low && value < high
    }
}

impl std::fmt::Display for SoundSourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SoundSourceId({})", self.0)
    }
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    object: ObjectId,
    assigned_generation: u64,
}

/// Assigns small integer ids to sound-emitting objects.
///
/// Ids are never compacted: removing a source leaves the others untouched,
/// and the freed id goes to the next registration. Every change bumps the
/// generation so results traced before a reassignment can be recognised.
#[derive(Debug)]
pub struct SoundSourceRegistry {
    slots: Vec<Option<Slot>>,
    by_object: HashMap<ObjectId, SoundSourceId>,
    order: Vec<ObjectId>,
    generation: u64,
}

impl Default for SoundSourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SoundSourceRegistry {
    pub fn new() -> Self {
        Self {
            slots: vec![None; SoundSourceId::MAX as usize],
            by_object: HashMap::new(),
            order: Vec::new(),
            generation: 0,
        }
    }

    /// Assigns the lowest free id, or `None` once 255 sources are registered.
    ///
    /// Registering an object twice returns its existing id.
    pub fn register(&mut self, object: ObjectId) -> Option<SoundSourceId> {
        if let Some(id) = self.by_object.get(&object) {
            return Some(*id);
        }

        let Some(index) = self.slots.iter().position(Option::is_none) else {
            log::error!(
                "Too many active sound sources ({}), {} is excluded from acoustic attribution",
                SoundSourceId::MAX,
                object
            );
            return None;
        };

        self.generation += 1;
        self.slots[index] = Some(Slot {
            object,
            assigned_generation: self.generation,
        });
        let id = SoundSourceId((index + 1) as u8);
        self.by_object.insert(object, id);
        self.order.push(object);

        log::debug!("Registered sound source {} as {}", object, id);
        Some(id)
    }

    /// Frees the object's id. Unknown objects are ignored.
    pub fn unregister(&mut self, object: ObjectId) -> Option<SoundSourceId> {
        let id = self.by_object.remove(&object)?;
        self.slots[id.0 as usize - 1] = None;
        self.order.retain(|o| *o != object);
        self.generation += 1;

        log::debug!("Unregistered sound source {} (freed {})", object, id);
        Some(id)
    }

    pub fn find_id(&self, object: ObjectId) -> Option<SoundSourceId> {
        self.by_object.get(&object).copied()
    }

    pub fn object(&self, id: SoundSourceId) -> Option<ObjectId> {
        self.slots[id.0 as usize - 1].map(|slot| slot.object)
    }

    /// Generation at which `id` was last handed out, if it is live.
    pub fn assigned_generation(&self, id: SoundSourceId) -> Option<u64> {
        self.slots[id.0 as usize - 1].map(|slot| slot.assigned_generation)
    }

    /// Monotonic counter bumped on every registration change.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Live sources in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, SoundSourceId)> + '_ {
        self.order
            .iter()
            .filter_map(|object| self.by_object.get(object).map(|id| (*object, *id)))
    }
}
