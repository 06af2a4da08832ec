use crate::config::{RaySonicWorldDesc, SpreadMode};
use crate::scene::SoundSourceId;
use std::collections::HashMap;

/// Shape of one read-back result texture.
///
/// Array layer `d * parameter_count + p` holds parameter `p` of diffraction
/// pass `d`; each layer is `width * height` floats in row-major order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultLayout {
    pub width: u32,
    pub height: u32,
    pub parameter_count: u32,
    pub diffraction_layers: u32,
}

impl ResultLayout {
    /// Parameter holding the encoded sound-source id.
    pub const ID_CHANNEL: u32 = 0;
    /// Parameter holding the distance value (0 = no hit).
    pub const DISTANCE_CHANNEL: u32 = 1;

    pub fn new(width: u32, height: u32, parameter_count: u32, diffraction_layers: u32) -> Self {
        Self {
            width,
            height,
            parameter_count,
            diffraction_layers,
        }
    }

    pub fn from_desc(desc: &RaySonicWorldDesc) -> Self {
        Self::new(
            desc.texture_width,
            desc.texture_height,
            desc.parameter_count,
            desc.diffraction_layers(),
        )
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn layer_count(&self) -> u32 {
        self.parameter_count * self.diffraction_layers
    }

    /// Total floats in one result buffer.
    pub fn len(&self) -> usize {
        self.pixel_count() * self.layer_count() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn layer_index(&self, diffraction: u32, parameter: u32) -> u32 {
        diffraction * self.parameter_count + parameter
    }

    /// Offset of the first float of a layer.
    pub fn layer_offset(&self, diffraction: u32, parameter: u32) -> usize {
        self.layer_index(diffraction, parameter) as usize * self.pixel_count()
    }
}

/// Acoustic parameters of one source for one read-back.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AcousticSignal {
    /// Mean closeness of the rays reaching the source (0 = silent)
    pub volume: f32,
    /// Deviation of the per-ray closeness around `volume`; drives reverb
    pub spread: f32,
}

impl AcousticSignal {
    pub const SILENT: Self = Self {
        volume: 0.0,
        spread: 0.0,
    };
}

#[derive(Debug, Clone, Copy, Default)]
struct Accumulator {
    sum: f64,
    count: u32,
    deviation: f64,
}

impl Accumulator {
    fn volume(&self) -> f64 {
        if self.count > 0 {
            self.sum / self.count as f64
        } else {
            0.0
        }
    }
}

/// Reduces a result buffer to a volume and spread per sound source.
#[derive(Debug, Clone, Default)]
pub struct AcousticSignalExtractor {
    spread_mode: SpreadMode,
}

impl AcousticSignalExtractor {
    pub fn new(spread_mode: SpreadMode) -> Self {
        Self { spread_mode }
    }

    pub fn spread_mode(&self) -> SpreadMode {
        self.spread_mode
    }

    /// Signal for a single source. No matching samples yields silence.
    pub fn extract(
        &self,
        buffer: &[f32],
        source_id: SoundSourceId,
        layout: &ResultLayout,
    ) -> AcousticSignal {
        self.extract_all(buffer, &[source_id], layout)
            .remove(&source_id)
            .unwrap_or(AcousticSignal::SILENT)
    }

    /// Signals for several sources, scanning the buffer twice in total.
    ///
    /// Every requested id gets an entry, silent when no ray reached it.
    pub fn extract_all(
        &self,
        buffer: &[f32],
        source_ids: &[SoundSourceId],
        layout: &ResultLayout,
    ) -> HashMap<SoundSourceId, AcousticSignal> {
        let mut result: HashMap<SoundSourceId, AcousticSignal> = source_ids
            .iter()
            .map(|id| (*id, AcousticSignal::SILENT))
            .collect();

        if layout.parameter_count <= ResultLayout::DISTANCE_CHANNEL {
            log::warn!(
                "Result layout has {} parameters, no distance channel to read",
                layout.parameter_count
            );
            return result;
        }
        if buffer.len() < layout.len() {
            log::warn!(
                "Result buffer holds {} floats, layout expects {}; treating as silence",
                buffer.len(),
                layout.len()
            );
            return result;
        }

        // slot per encodable id, None when not requested
        let mut slots: [Option<usize>; 256] = [None; 256];
        for (index, id) in source_ids.iter().enumerate() {
            slots[id.get() as usize] = Some(index);
        }
        let mut accumulators = vec![Accumulator::default(); source_ids.len()];

        self.for_each_sample(buffer, layout, |id_value, closeness| {
            if let Some(index) = Self::slot_for(&slots, id_value) {
                let acc = &mut accumulators[index];
                acc.sum += closeness as f64;
                acc.count += 1;
            }
        });

        let volumes: Vec<f64> = accumulators.iter().map(Accumulator::volume).collect();
        self.for_each_sample(buffer, layout, |id_value, closeness| {
            if let Some(index) = Self::slot_for(&slots, id_value) {
                accumulators[index].deviation += (closeness as f64 - volumes[index]).abs();
            }
        });

        for (id, acc) in source_ids.iter().zip(&accumulators) {
            if acc.count == 0 {
                continue;
            }
            let mean_deviation = acc.deviation / acc.count as f64;
            let spread = match self.spread_mode {
                SpreadMode::MeanAbsoluteDeviation => mean_deviation,
                SpreadMode::RootMeanAbsoluteDeviation => mean_deviation.sqrt(),
            };
            result.insert(
                *id,
                AcousticSignal {
                    volume: acc.volume() as f32,
                    spread: spread as f32,
                },
            );
        }

        result
    }

    /// Number of samples whose id channel is non-zero, over all layers.
    pub fn hit_count(&self, buffer: &[f32], layout: &ResultLayout) -> usize {
        if layout.parameter_count <= ResultLayout::DISTANCE_CHANNEL || buffer.len() < layout.len() {
            return 0;
        }
        let pixels = layout.pixel_count();
        (0..layout.diffraction_layers)
            .map(|d| {
                let offset = layout.layer_offset(d, ResultLayout::ID_CHANNEL);
                buffer[offset..offset + pixels]
                    .iter()
                    .filter(|v| **v > 0.0)
                    .count()
            })
            .sum()
    }

    /// Calls `visit(id_value, 1 - distance)` for every sample with a hit.
    fn for_each_sample(
        &self,
        buffer: &[f32],
        layout: &ResultLayout,
        mut visit: impl FnMut(f32, f32),
    ) {
        let pixels = layout.pixel_count();
        for d in 0..layout.diffraction_layers {
            let ids = layout.layer_offset(d, ResultLayout::ID_CHANNEL);
            let distances = layout.layer_offset(d, ResultLayout::DISTANCE_CHANNEL);
            let id_layer = &buffer[ids..ids + pixels];
            let distance_layer = &buffer[distances..distances + pixels];

            for (id_value, distance) in id_layer.iter().zip(distance_layer) {
                if *distance > 0.0 {
                    visit(*id_value, 1.0 - *distance);
                }
            }
        }
    }

    fn slot_for(slots: &[Option<usize>; 256], id_value: f32) -> Option<usize> {
        let candidate = (id_value * 256.0).round();
        if !(1.0..=255.0).contains(&candidate) {
            return None;
        }
        let id = SoundSourceId::new(candidate as u8)?;
        if !id.matches(id_value) {
            return None;
        }
        slots[id.get() as usize]
    }
}
