mod world_desc;

pub use world_desc::{ClipLimits, RaySonicWorldDesc, SpreadMode};
