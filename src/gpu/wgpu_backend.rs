//! `wgpu` implementation of [`AcousticBackend`].
//!
//! Geometry lives in read-only storage buffers, the per-dispatch parameters
//! in a uniform buffer and the result in an `R32Float` storage texture array
//! with one layer per (diffraction, parameter) pair. Read-back copies the
//! array into a mappable staging buffer and is collected by a non-blocking
//! `device.poll` on a later tick.

use crate::error::{RaySonicError, Result};
use crate::gpu::{
    AcousticBackend, DispatchGrid, KernelUniforms, ReadbackBuffer, ReadbackCompletion,
};
use crate::scene::{GeometryBuffers, GpuObjectRecord, GpuVertex};
use crossbeam_channel::{Receiver, TryRecvError};
use std::borrow::Cow;
use wgpu::util::DeviceExt;

/// Kernel shipped with the crate; its workgroup size is 4×4×1.
pub const DEFAULT_KERNEL: &str = include_str!("acoustic_rays.wgsl");

/// Workgroup edge length compiled into [`DEFAULT_KERNEL`].
pub const DEFAULT_KERNEL_GROUP_SIZE: u32 = 4;

/// Storage buffers plus the result texture.
const BINDING_COUNT: u32 = 8;
const STORAGE_BUFFER_COUNT: u32 = 6;

/// Shader and naming for a [`WgpuAcousticBackend`].
#[derive(Debug, Clone)]
pub struct WgpuBackendDesc {
    pub shader_source: Cow<'static, str>,
    pub entry_point: String,
    /// Prefix for every GPU object label
    pub label: String,
}

impl Default for WgpuBackendDesc {
    fn default() -> Self {
        Self {
            shader_source: Cow::Borrowed(DEFAULT_KERNEL),
            entry_point: "main".to_string(),
            label: "raysonic".to_string(),
        }
    }
}

impl WgpuBackendDesc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shader(mut self, source: impl Into<Cow<'static, str>>, entry_point: &str) -> Self {
        self.shader_source = source.into();
        self.entry_point = entry_point.to_string();
        self
    }

    pub fn label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }

    pub fn uses_default_kernel(&self) -> bool {
        self.shader_source == DEFAULT_KERNEL
    }

    /// Rejects a dispatch group size the bundled kernel was not compiled for.
    ///
    /// Custom shaders are not inspected; their `@workgroup_size` is the
    /// caller's responsibility.
    pub fn check_group_size(&self, group_size: u32) -> Result<()> {
        if self.uses_default_kernel() && group_size != DEFAULT_KERNEL_GROUP_SIZE {
            return Err(RaySonicError::Configuration(format!(
                "Workgroup size {} does not match the bundled kernel ({})",
                group_size, DEFAULT_KERNEL_GROUP_SIZE
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TargetSize {
    width: u32,
    height: u32,
    layers: u32,
}

impl TargetSize {
    fn from_uniforms(uniforms: &KernelUniforms) -> Self {
        Self {
            width: uniforms.width,
            height: uniforms.height,
            layers: (uniforms.diffractions + 1) * uniforms.parameter_count,
        }
    }

    fn padded_row_bytes(&self) -> u32 {
        let row = self.width * std::mem::size_of::<f32>() as u32;
        row.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT) * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT
    }

    fn float_count(&self) -> usize {
        self.width as usize * self.height as usize * self.layers as usize
    }
}

struct ResultTarget {
    size: TargetSize,
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

struct RayState {
    slots: u64,
    pixels: u64,
    positions: wgpu::Buffer,
    directions: wgpu::Buffer,
    enabled: wgpu::Buffer,
}

struct PendingReadback {
    staging: wgpu::Buffer,
    size: TargetSize,
    target: ReadbackBuffer,
    completion: ReadbackCompletion,
    mapped: Receiver<std::result::Result<(), wgpu::BufferAsyncError>>,
}

/// GPU backend driving the acoustic kernel through `wgpu`.
pub struct WgpuAcousticBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    label: String,
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    objects: wgpu::Buffer,
    vertices: wgpu::Buffer,
    indices: wgpu::Buffer,
    rays: Option<RayState>,
    target: Option<ResultTarget>,
    pending: Option<PendingReadback>,
}

impl WgpuAcousticBackend {
    /// Builds the pipeline on an existing device.
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, desc: &WgpuBackendDesc) -> Result<Self> {
        check_device_limits(&device);

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&format!("{} kernel", desc.label)),
            source: wgpu::ShaderSource::Wgsl(desc.shader_source.clone()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&format!("{} bind group layout", desc.label)),
            entries: &[
                storage_entry(0, true),
                storage_entry(1, true),
                storage_entry(2, true),
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                storage_entry(4, false),
                storage_entry(5, false),
                storage_entry(6, false),
                wgpu::BindGroupLayoutEntry {
                    binding: 7,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::StorageTexture {
                        access: wgpu::StorageTextureAccess::WriteOnly,
                        format: wgpu::TextureFormat::R32Float,
                        view_dimension: wgpu::TextureViewDimension::D2Array,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{} pipeline layout", desc.label)),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(&format!("{} pipeline", desc.label)),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some(desc.entry_point.as_str()),
            compilation_options: Default::default(),
            cache: None,
        });

        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(RaySonicError::GpuDevice(format!(
                "failed to build acoustic kernel: {}",
                error
            )));
        }

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{} uniforms", desc.label)),
            size: std::mem::size_of::<KernelUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let objects = storage_buffer(
            &device,
            &format!("{} objects", desc.label),
            &[],
            std::mem::size_of::<GpuObjectRecord>(),
        );
        let vertices = storage_buffer(
            &device,
            &format!("{} vertices", desc.label),
            &[],
            std::mem::size_of::<GpuVertex>(),
        );
        let indices = storage_buffer(
            &device,
            &format!("{} indices", desc.label),
            &[],
            std::mem::size_of::<u32>(),
        );

        log::info!(
            "Created acoustic backend '{}' (entry point '{}')",
            desc.label,
            desc.entry_point
        );

        Ok(Self {
            device,
            queue,
            label: desc.label.clone(),
            pipeline,
            bind_group_layout,
            uniform_buffer,
            objects,
            vertices,
            indices,
            rays: None,
            target: None,
            pending: None,
        })
    }

    /// Requests its own adapter and device, without a surface.
    pub fn new_headless(desc: &WgpuBackendDesc) -> Result<Self> {
        let instance = wgpu::Instance::default();
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| RaySonicError::GpuDevice(format!("no GPU adapter: {}", e)))?;

        let info = adapter.get_info();
        log::info!("Adapter: {:?} ({:?})", info.name, info.backend);
        check_adapter_support(&adapter);

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some(&format!("{} device", desc.label)),
            required_features: wgpu::Features::empty(),
            required_limits: adapter.limits(),
            memory_hints: wgpu::MemoryHints::Performance,
            ..Default::default()
        }))
        .map_err(|e| RaySonicError::GpuDevice(format!("request_device error: {}", e)))?;

        Self::new(device, queue, desc)
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Whether a read-back is waiting on the device.
    pub fn has_pending_readback(&self) -> bool {
        self.pending.is_some()
    }

    fn check_storage_size(&self, what: &str, bytes: u64) -> Result<()> {
        let limits = self.device.limits();
        let max = (limits.max_storage_buffer_binding_size as u64).min(limits.max_buffer_size);
        if bytes > max {
            return Err(RaySonicError::GpuResource(format!(
                "{} buffer needs {} bytes, device allows {}",
                what, bytes, max
            )));
        }
        Ok(())
    }

    /// Runs `f` inside an out-of-memory error scope.
    fn allocate<T>(&self, what: &str, f: impl FnOnce(&Self) -> T) -> Result<T> {
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let value = f(self);
        match pollster::block_on(self.device.pop_error_scope()) {
            Some(error) => Err(RaySonicError::GpuResource(format!(
                "allocating {}: {}",
                what, error
            ))),
            None => Ok(value),
        }
    }

    fn ensure_target(&mut self, size: TargetSize) -> Result<()> {
        if self.target.as_ref().is_some_and(|t| t.size == size) {
            return Ok(());
        }

        let limits = self.device.limits();
        if size.width > limits.max_texture_dimension_2d
            || size.height > limits.max_texture_dimension_2d
            || size.layers > limits.max_texture_array_layers
        {
            return Err(RaySonicError::GpuResource(format!(
                "result texture {}x{}x{} exceeds device limits",
                size.width, size.height, size.layers
            )));
        }

        let target = self.allocate("result texture", |backend| {
            let texture = backend.device.create_texture(&wgpu::TextureDescriptor {
                label: Some(&format!("{} result", backend.label)),
                size: wgpu::Extent3d {
                    width: size.width,
                    height: size.height,
                    depth_or_array_layers: size.layers,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::R32Float,
                usage: wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::COPY_SRC,
                view_formats: &[],
            });
            let view = texture.create_view(&wgpu::TextureViewDescriptor {
                dimension: Some(wgpu::TextureViewDimension::D2Array),
                ..Default::default()
            });
            ResultTarget {
                size,
                texture,
                view,
            }
        })?;

        log::debug!(
            "Created result texture {}x{} with {} layers",
            size.width,
            size.height,
            size.layers
        );
        self.target = Some(target);
        Ok(())
    }

    fn ensure_rays(&mut self, uniforms: &KernelUniforms) -> Result<()> {
        let pixels = uniforms.width as u64 * uniforms.height as u64;
        let slots = pixels * (uniforms.diffractions as u64 + 1);
        if self
            .rays
            .as_ref()
            .is_some_and(|r| r.slots == slots && r.pixels == pixels)
        {
            return Ok(());
        }

        let vec4_bytes = std::mem::size_of::<[f32; 4]>() as u64;
        self.check_storage_size("ray state", slots * vec4_bytes)?;

        let rays = self.allocate("ray state", |backend| {
            let buffer = |name: &str, size: u64| {
                backend.device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(&format!("{} {}", backend.label, name)),
                    size,
                    usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                })
            };
            RayState {
                slots,
                pixels,
                positions: buffer("ray positions", slots * vec4_bytes),
                directions: buffer("ray directions", slots * vec4_bytes),
                enabled: buffer("ray enabled", pixels * std::mem::size_of::<u32>() as u64),
            }
        })?;

        self.rays = Some(rays);
        Ok(())
    }
}

impl AcousticBackend for WgpuAcousticBackend {
    fn upload_geometry(&mut self, buffers: &GeometryBuffers) -> Result<()> {
        self.check_storage_size("object", buffers.objects_bytes().len() as u64)?;
        self.check_storage_size("vertex", buffers.vertices_bytes().len() as u64)?;
        self.check_storage_size("index", buffers.indices_bytes().len() as u64)?;

        let (objects, vertices, indices) = self.allocate("geometry", |backend| {
            let label = &backend.label;
            (
                storage_buffer(
                    &backend.device,
                    &format!("{} objects", label),
                    buffers.objects_bytes(),
                    std::mem::size_of::<GpuObjectRecord>(),
                ),
                storage_buffer(
                    &backend.device,
                    &format!("{} vertices", label),
                    buffers.vertices_bytes(),
                    std::mem::size_of::<GpuVertex>(),
                ),
                storage_buffer(
                    &backend.device,
                    &format!("{} indices", label),
                    buffers.indices_bytes(),
                    std::mem::size_of::<u32>(),
                ),
            )
        })?;

        self.objects = objects;
        self.vertices = vertices;
        self.indices = indices;
        Ok(())
    }

    fn upload_object_records(&mut self, records: &[GpuObjectRecord]) -> Result<()> {
        let bytes: &[u8] = bytemuck::cast_slice(records);
        if bytes.is_empty() {
            return Ok(());
        }
        if (bytes.len() as u64) > self.objects.size() {
            return Err(RaySonicError::GeometryOutOfDate(format!(
                "{} object records do not fit the uploaded buffer",
                records.len()
            )));
        }
        self.queue.write_buffer(&self.objects, 0, bytes);
        Ok(())
    }

    fn dispatch(&mut self, uniforms: &KernelUniforms, grid: DispatchGrid) -> Result<()> {
        let size = TargetSize::from_uniforms(uniforms);
        self.ensure_target(size)?;
        self.ensure_rays(uniforms)?;

        let (Some(target), Some(rays)) = (&self.target, &self.rays) else {
            return Err(RaySonicError::GpuResource(
                "result texture or ray state missing".into(),
            ));
        };

        self.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniforms));

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{} bind group", self.label)),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.objects.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: self.vertices.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: self.indices.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: self.uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: rays.positions.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: rays.directions.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 6,
                    resource: rays.enabled.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 7,
                    resource: wgpu::BindingResource::TextureView(&target.view),
                },
            ],
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some(&format!("{} dispatch", self.label)),
            });
        // ray state starts zeroed on every dispatch
        encoder.clear_buffer(&rays.positions, 0, None);
        encoder.clear_buffer(&rays.directions, 0, None);
        encoder.clear_buffer(&rays.enabled, 0, None);
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(&format!("{} pass", self.label)),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(grid.x, grid.y, grid.z);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn request_readback(
        &mut self,
        target: ReadbackBuffer,
        completion: ReadbackCompletion,
    ) -> Result<()> {
        if self.pending.is_some() {
            return Err(RaySonicError::Readback(
                "a read-back is already in flight".into(),
            ));
        }
        let Some(result) = &self.target else {
            return Err(RaySonicError::Readback(
                "nothing has been dispatched yet".into(),
            ));
        };

        let size = result.size;
        let padded_row = size.padded_row_bytes();
        let staging_size = padded_row as u64 * size.height as u64 * size.layers as u64;

        let staging = self.allocate("read-back staging", |backend| {
            backend.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(&format!("{} read-back", backend.label)),
                size: staging_size,
                usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        })?;

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some(&format!("{} read-back copy", self.label)),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &result.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row),
                    rows_per_image: Some(size.height),
                },
            },
            wgpu::Extent3d {
                width: size.width,
                height: size.height,
                depth_or_array_layers: size.layers,
            },
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let (sender, mapped) = crossbeam_channel::bounded(1);
        staging
            .slice(..)
            .map_async(wgpu::MapMode::Read, move |result| {
                let _ = sender.send(result);
            });

        self.pending = Some(PendingReadback {
            staging,
            size,
            target,
            completion,
            mapped,
        });
        Ok(())
    }

    fn poll(&mut self) {
        let _ = self.device.poll(wgpu::PollType::Poll);

        let Some(pending) = self.pending.take() else {
            return;
        };

        match pending.mapped.try_recv() {
            Ok(Ok(())) => finish_readback(pending),
            Ok(Err(e)) => pending.completion.fail(pending.target, e.to_string()),
            Err(TryRecvError::Empty) => self.pending = Some(pending),
            Err(TryRecvError::Disconnected) => pending
                .completion
                .fail(pending.target, "map callback dropped"),
        }
    }
}

/// Copies the mapped staging buffer into the target without row padding.
fn finish_readback(pending: PendingReadback) {
    let PendingReadback {
        staging,
        size,
        mut target,
        completion,
        ..
    } = pending;

    if target.len() < size.float_count() {
        let reason = format!(
            "read-back buffer holds {} floats, texture has {}",
            target.len(),
            size.float_count()
        );
        staging.unmap();
        completion.fail(target, reason);
        return;
    }

    {
        let mapped = staging.slice(..).get_mapped_range();
        let padded_row = size.padded_row_bytes() as usize;
        let row_bytes = size.width as usize * std::mem::size_of::<f32>();
        let width = size.width as usize;

        for (row, src) in mapped.chunks_exact(padded_row).enumerate() {
            let dst = &mut target[row * width..(row + 1) * width];
            for (value, bytes) in dst.iter_mut().zip(src[..row_bytes].chunks_exact(4)) {
                *value = bytemuck::pod_read_unaligned(bytes);
            }
        }
    }
    staging.unmap();
    completion.complete(target);
}

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Storage buffer with `contents`; empty contents get one zeroed element
/// since wgpu rejects zero-sized bindings.
fn storage_buffer(
    device: &wgpu::Device,
    label: &str,
    contents: &[u8],
    element_size: usize,
) -> wgpu::Buffer {
    let padding = vec![0u8; element_size.max(16)];
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents: if contents.is_empty() { &padding[..] } else { contents },
        usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
    })
}

fn check_device_limits(device: &wgpu::Device) {
    let limits = device.limits();
    if limits.max_storage_buffers_per_shader_stage < STORAGE_BUFFER_COUNT
        || limits.max_storage_textures_per_shader_stage < 1
        || limits.max_bindings_per_bind_group < BINDING_COUNT
        || limits.max_compute_workgroups_per_dimension == 0
    {
        log::error!(
            "Hardware compatibility: device cannot bind {} storage buffers and a storage texture for compute",
            STORAGE_BUFFER_COUNT
        );
    }
}

fn check_adapter_support(adapter: &wgpu::Adapter) {
    let downlevel = adapter.get_downlevel_capabilities();
    let r32 = adapter.get_texture_format_features(wgpu::TextureFormat::R32Float);
    if !downlevel.flags.contains(wgpu::DownlevelFlags::COMPUTE_SHADERS)
        || !r32
            .allowed_usages
            .contains(wgpu::TextureUsages::STORAGE_BINDING)
    {
        log::error!(
            "Hardware compatibility: adapter lacks compute shaders or R32Float storage textures"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padded_rows() {
        let size = TargetSize {
            width: 10,
            height: 4,
            layers: 2,
        };
        assert_eq!(size.padded_row_bytes(), 256);
        assert_eq!(size.float_count(), 80);

        let wide = TargetSize {
            width: 64,
            height: 1,
            layers: 1,
        };
        assert_eq!(wide.padded_row_bytes(), 256);

        let wider = TargetSize {
            width: 65,
            height: 1,
            layers: 1,
        };
        assert_eq!(wider.padded_row_bytes(), 512);
    }

    #[test]
    fn test_target_layers_from_uniforms() {
        let uniforms = KernelUniforms {
            source: [[0.0; 4]; 4],
            pixel_offset: [0.0; 2],
            seed: 0.0,
            bounces: 1,
            diffractions: 2,
            width: 8,
            height: 8,
            parameter_count: 2,
        };
        assert_eq!(TargetSize::from_uniforms(&uniforms).layers, 6);
    }

    #[test]
    fn test_default_desc_uses_bundled_kernel() {
        let desc = WgpuBackendDesc::default();
        assert_eq!(desc.entry_point, "main");
        assert!(desc.shader_source.contains("texture_storage_2d_array<r32float, write>"));
        assert!(desc.shader_source.contains("@workgroup_size(4, 4, 1)"));
    }

    #[test]
    fn test_group_size_checked_against_bundled_kernel() {
        let desc = WgpuBackendDesc::default();
        assert!(desc.check_group_size(DEFAULT_KERNEL_GROUP_SIZE).is_ok());
        assert!(matches!(
            desc.check_group_size(8),
            Err(RaySonicError::Configuration(_))
        ));

        let custom = WgpuBackendDesc::new().shader("@compute @workgroup_size(8, 8, 1) fn main() {}", "main");
        assert!(!custom.uses_default_kernel());
        assert!(custom.check_group_size(8).is_ok());
    }
}
