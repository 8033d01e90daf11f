use std::time::Duration;

use anyhow::{anyhow, bail, Context as AnyhowContext, Result};

use super::uniforms::MoireUniform;

const READBACK_TIMEOUT: Duration = Duration::from_secs(5);
const WORKGROUP_SIZE: u32 = 8;

/// Human-readable description of the adapter wgpu would hand us.
pub(crate) fn describe_adapter() -> Result<String> {
    let instance = wgpu::Instance::default();
    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions::default()))
        .context("failed to find a suitable GPU adapter")?;
    ensure_compute(&adapter)?;
    Ok(adapter_label(&adapter.get_info()))
}

fn adapter_label(info: &wgpu::AdapterInfo) -> String {
    format!("{} ({:?}, {:?})", info.name, info.backend, info.device_type)
}

fn ensure_compute(adapter: &wgpu::Adapter) -> Result<()> {
    let downlevel = adapter.get_downlevel_capabilities();
    if !downlevel
        .flags
        .contains(wgpu::DownlevelFlags::COMPUTE_SHADERS)
    {
        bail!("adapter does not support compute shaders");
    }
    Ok(())
}

/// Device, pipeline, and buffers for the moiré compute pass.
///
/// Output and readback buffers grow to the largest grid seen so far and are
/// reused across frames.
pub(crate) struct GpuContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    output_buffer: wgpu::Buffer,
    readback_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    capacity: usize,
    pub adapter: String,
}

impl std::fmt::Debug for GpuContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuContext")
            .field("adapter", &self.adapter)
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

impl GpuContext {
    pub(crate) fn new() -> Result<Self> {
        let instance = wgpu::Instance::default();
        let adapter =
            pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions::default()))
                .context("failed to find a suitable GPU adapter")?;
        ensure_compute(&adapter)?;
        let adapter_label = adapter_label(&adapter.get_info());
        tracing::debug!(adapter = %adapter_label, "selected GPU adapter");

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("moirew device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::downlevel_defaults().using_resolution(adapter.limits()),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::default(),
        }))
        .context("failed to create GPU device")?;

        // Uncaptured errors would otherwise panic; log them and let the
        // error scopes around each pass report the failure.
        device.on_uncaptured_error(Box::new(|err| {
            tracing::error!(error = %err, "uncaptured wgpu error");
        }));

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("moire compute shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("moire.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("moire bind group layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: false },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("moire pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("moire compute pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("main"),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            cache: None,
        });
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            bail!("failed to build moire compute pipeline: {err}");
        }

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("moire uniforms"),
            size: std::mem::size_of::<MoireUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let capacity = 1usize;
        let (output_buffer, readback_buffer) = create_output_buffers(&device, capacity);
        let bind_group = create_bind_group(
            &device,
            &bind_group_layout,
            &uniform_buffer,
            &output_buffer,
        );

        Ok(Self {
            device,
            queue,
            pipeline,
            bind_group_layout,
            uniform_buffer,
            output_buffer,
            readback_buffer,
            bind_group,
            capacity,
            adapter: adapter_label,
        })
    }

    fn ensure_capacity(&mut self, cells: usize) {
        let cells = cells.max(1);
        if cells <= self.capacity {
            return;
        }
        self.capacity = cells;
        let (output, readback) = create_output_buffers(&self.device, cells);
        self.output_buffer = output;
        self.readback_buffer = readback;
        self.bind_group = create_bind_group(
            &self.device,
            &self.bind_group_layout,
            &self.uniform_buffer,
            &self.output_buffer,
        );
        tracing::debug!(cells, "grew GPU output buffers");
    }

    /// Runs the compute pass for `uniform` and blocks until the values are
    /// back on the host, row-major.
    pub(crate) fn dispatch(&mut self, uniform: &MoireUniform) -> Result<Vec<f32>> {
        let cells = uniform.width as usize * uniform.height as usize;
        if cells == 0 {
            return Ok(Vec::new());
        }
        self.ensure_capacity(cells);
        let byte_len = (cells * std::mem::size_of::<f32>()) as u64;

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        self.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniform));

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("moire encoder"),
            });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("moire pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &self.bind_group, &[]);
            pass.dispatch_workgroups(
                uniform.width.div_ceil(WORKGROUP_SIZE),
                uniform.height.div_ceil(WORKGROUP_SIZE),
                1,
            );
        }
        encoder.copy_buffer_to_buffer(&self.output_buffer, 0, &self.readback_buffer, 0, byte_len);
        self.queue.submit(Some(encoder.finish()));
        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            bail!("moire compute pass rejected: {err}");
        }

        let slice = self.readback_buffer.slice(0..byte_len);
        let (sender, receiver) = crossbeam_channel::bounded(1);
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        self.device
            .poll(wgpu::PollType::Wait)
            .map_err(|err| anyhow!("GPU poll failed: {err}"))?;
        receiver
            .recv_timeout(READBACK_TIMEOUT)
            .context("GPU readback timed out")?
            .map_err(|err| anyhow!("GPU readback failed: {err}"))?;

        let values = {
            let data = slice.get_mapped_range();
            bytemuck::cast_slice::<u8, f32>(&data).to_vec()
        };
        self.readback_buffer.unmap();
        Ok(values)
    }
}

fn create_output_buffers(device: &wgpu::Device, cells: usize) -> (wgpu::Buffer, wgpu::Buffer) {
    let size = (cells * std::mem::size_of::<f32>()) as u64;
    let output = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("moire output"),
        size,
        usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
        mapped_at_creation: false,
    });
    let readback = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("moire readback"),
        size,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    (output, readback)
}

fn create_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    uniforms: &wgpu::Buffer,
    output: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("moire bind group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: uniforms.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: output.as_entire_binding(),
            },
        ],
    })
}
