//! Turning ray-trace results into per-source acoustic parameters.

mod extractor;

pub use extractor::{AcousticSignal, AcousticSignalExtractor, ResultLayout};
