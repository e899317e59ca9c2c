//! GPU convolution using wgpu compute shaders
//!
//! Each distinct kernel becomes its own WGSL shader with the taps unrolled.
//! A kernel sequence runs as one command submission that ping-pongs between two
//! storage buffers and reads the result back once.

use std::borrow::Cow;
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use super::cache::KernelCache;
use super::kernel::KernelSpec;
use super::ConvolutionEngine;
use crate::bitmap::Bitmap;
use crate::error::{Result, TerrainError};

const WORKGROUP_SIZE: usize = 8;

/// Uniform block shared by every kernel shader.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct GpuParams {
    width: u32,
    height: u32,
    _pad0: u32,
    _pad1: u32,
}

/// wgpu device plus the kernel pipelines compiled on it.
pub struct GpuConvolution {
    device: wgpu::Device,
    queue: wgpu::Queue,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    pipelines: KernelCache<wgpu::ComputePipeline>,
}

impl GpuConvolution {
    /// Open a GPU device. Fails when no adapter is available.
    pub fn new() -> Result<Self> {
        pollster::block_on(Self::new_async())
    }

    async fn new_async() -> Result<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| TerrainError::Gpu("no compatible adapter".into()))?;
        let adapter_name = adapter.get_info().name;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Convolution GPU"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await
            .map_err(|e| TerrainError::Gpu(e.to_string()))?;

        let storage = |binding: u32, read_only: bool| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Convolution Bind Group Layout"),
            entries: &[
                // source pixels
                storage(0, true),
                // destination pixels
                storage(1, false),
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Convolution Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        tracing::info!(target: "terrain_shaper::convolution", adapter = %adapter_name, "GPU convolution ready");

        Ok(Self {
            device,
            queue,
            bind_group_layout,
            pipeline_layout,
            pipelines: KernelCache::new(),
        })
    }

    fn compile(&self, spec: &KernelSpec) -> Result<wgpu::ComputePipeline> {
        let source = kernel_shader(spec);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let shader = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Convolution Kernel Shader"),
            source: wgpu::ShaderSource::Wgsl(Cow::Owned(source)),
        });
        let pipeline = self.device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Convolution Kernel Pipeline"),
            layout: Some(&self.pipeline_layout),
            module: &shader,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });
        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(TerrainError::Gpu(err.to_string()));
        }
        Ok(pipeline)
    }

    fn bind_group(&self, src: &wgpu::Buffer, dst: &wgpu::Buffer, params: &wgpu::Buffer) -> wgpu::BindGroup {
        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Convolution Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: src.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: dst.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: params.as_entire_binding(),
                },
            ],
        })
    }
}

impl ConvolutionEngine for GpuConvolution {
    fn name(&self) -> &'static str {
        "gpu"
    }

    fn apply_kernels(&self, bitmap: Bitmap, kernels: &[KernelSpec]) -> Result<Bitmap> {
        let (width, height) = bitmap.dimensions();
        if kernels.is_empty() || width == 0 || height == 0 {
            return Ok(bitmap);
        }

        let pipelines = kernels
            .iter()
            .map(|spec| self.pipelines.get_or_compile(spec, |s| self.compile(s)))
            .collect::<Result<Vec<Arc<wgpu::ComputePipeline>>>>()?;

        let size = (width * height * 4) as u64;
        let params = GpuParams {
            width: width as u32,
            height: height as u32,
            _pad0: 0,
            _pad1: 0,
        };
        let params_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Params Buffer"),
            contents: bytemuck::bytes_of(&params),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let front = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Pixel Buffer A"),
            contents: bitmap.as_raw(),
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
        });
        let back = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Pixel Buffer B"),
            size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let bind_groups = [
            self.bind_group(&front, &back, &params_buffer),
            self.bind_group(&back, &front, &params_buffer),
        ];

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Convolution Encoder"),
        });
        let groups_x = width.div_ceil(WORKGROUP_SIZE) as u32;
        let groups_y = height.div_ceil(WORKGROUP_SIZE) as u32;
        for (i, pipeline) in pipelines.iter().enumerate() {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Convolution Pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &bind_groups[i % 2], &[]);
            pass.dispatch_workgroups(groups_x, groups_y, 1);
        }

        let result = if pipelines.len() % 2 == 1 { &back } else { &front };
        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Staging Buffer"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        encoder.copy_buffer_to_buffer(result, 0, &staging, 0, size);
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |r| {
            let _ = sender.send(r);
        });
        self.device.poll(wgpu::Maintain::Wait);
        receiver
            .recv()
            .map_err(|e| TerrainError::Gpu(e.to_string()))?
            .map_err(|e| TerrainError::Gpu(e.to_string()))?;

        let data = slice.get_mapped_range().to_vec();
        staging.unmap();
        Bitmap::from_rgba(width, height, data)
    }
}

/// WGSL compute shader for one kernel, taps unrolled.
pub fn kernel_shader(spec: &KernelSpec) -> String {
    let mut taps = String::new();
    for (dx, dy, weight) in spec.kernel.taps() {
        let sample = format!("fetch(x + ({dx}), y + ({dy})).rgb");
        let term = if spec.inverse {
            format!("(vec3<f32>(1.0) - {sample})")
        } else {
            sample
        };
        taps.push_str(&format!("    acc = acc + ({weight:?}) * {term};\n"));
    }
    let result = if spec.inverse { "vec3<f32>(1.0) - acc" } else { "acc" };

    format!(
        r#"struct Params {{
    width: u32,
    height: u32,
    pad0: u32,
    pad1: u32,
}}

@group(0) @binding(0) var<storage, read> src: array<u32>;
@group(0) @binding(1) var<storage, read_write> dst: array<u32>;
@group(0) @binding(2) var<uniform> params: Params;

fn fetch(x: i32, y: i32) -> vec4<f32> {{
    let cx = u32(clamp(x, 0, i32(params.width) - 1));
    let cy = u32(clamp(y, 0, i32(params.height) - 1));
    return unpack4x8unorm(src[cy * params.width + cx]);
}}

@compute @workgroup_size({WORKGROUP_SIZE}, {WORKGROUP_SIZE})
fn main(@builtin(global_invocation_id) id: vec3<u32>) {{
    if (id.x >= params.width || id.y >= params.height) {{
        return;
    }}
    let x = i32(id.x);
    let y = i32(id.y);
    let centre = fetch(x, y);
    var acc = vec3<f32>(0.0);
{taps}    let rgb = clamp({result}, vec3<f32>(0.0), vec3<f32>(1.0));
    dst[id.y * params.width + id.x] = pack4x8unorm(vec4<f32>(rgb, centre.a));
}}
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convolution::CpuConvolution;

    #[test]
    fn test_shader_unrolls_taps() {
        let spec = KernelSpec::named("surface").unwrap();
        let source = kernel_shader(&spec);
        assert!(source.contains("acc = acc + (-255.0) * fetch(x + (0), y + (-1)).rgb;"));
        assert!(source.contains("acc = acc + (1.0) * fetch(x + (0), y + (0)).rgb;"));
        assert_eq!(source.matches("acc = acc +").count(), 2);
        assert!(source.contains(".rgb;\n    acc = acc + (1.0)"));
        assert!(source.contains("clamp(acc,"));
    }

    #[test]
    fn test_shader_inverse() {
        let source = kernel_shader(&KernelSpec::named("erosion").unwrap());
        assert_eq!(source.matches("(vec3<f32>(1.0) - fetch(").count(), 21);
        assert!(source.contains("clamp(vec3<f32>(1.0) - acc,"));
    }

    #[test]
    fn test_gpu_matches_cpu() {
        let gpu = match GpuConvolution::new() {
            Ok(gpu) => gpu,
            Err(err) => {
                println!("skipping GPU test: {err}");
                return;
            }
        };
        let mut bmp = Bitmap::new_with(21, 13, [0, 0, 0, 255]);
        for (x, y) in [(3, 3), (10, 6), (11, 6), (18, 12), (0, 0)] {
            bmp.set_pixel(x, y, [255, 255, 255, 200]);
        }
        let specs: Vec<KernelSpec> = ["dilation", "dilation", "erosion", "surface", "threshold"]
            .iter()
            .map(|n| KernelSpec::named(n).unwrap())
            .collect();
        let cpu_out = CpuConvolution::new().apply_kernels(bmp.clone(), &specs).unwrap();
        let gpu_out = gpu.apply_kernels(bmp, &specs).unwrap();
        assert_eq!(gpu_out, cpu_out);
    }
}
