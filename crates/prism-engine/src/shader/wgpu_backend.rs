use std::collections::HashMap;

use super::backend::{CompiledStage, ShaderBackend, UniformLocation};
use super::error::ShaderStage;
use super::reflect::{self, ReflectedStage};

/// Fixed-function state shared by every program built by a [`WgpuBackend`].
#[derive(Debug, Clone)]
pub struct PipelineTarget {
    pub format: wgpu::TextureFormat,
    pub vertex_buffers: Vec<wgpu::VertexBufferLayout<'static>>,
    pub blend: Option<wgpu::BlendState>,
    pub topology: wgpu::PrimitiveTopology,
}

/// Compiled stage: the reflected naga module plus the wgpu module built from it.
pub struct WgpuStage {
    reflected: ReflectedStage,
    module: wgpu::ShaderModule,
}

/// Linked program: a render pipeline with an automatically derived layout.
pub struct WgpuProgram {
    pipeline: wgpu::RenderPipeline,
    uniforms: HashMap<String, UniformLocation>,
}

impl WgpuProgram {
    pub fn pipeline(&self) -> &wgpu::RenderPipeline {
        &self.pipeline
    }

    /// Layout of bind group `group` as derived from the shader sources.
    pub fn bind_group_layout(&self, group: u32) -> wgpu::BindGroupLayout {
        self.pipeline.get_bind_group_layout(group)
    }
}

/// [`ShaderBackend`] over a wgpu device.
///
/// Compile = naga parse + validate, then `create_shader_module`.
/// Link = interface check, then `create_render_pipeline`.
/// Device-side validation errors are captured with error scopes and returned
/// as the stage/link log.
pub struct WgpuBackend {
    device: wgpu::Device,
    target: PipelineTarget,
}

impl WgpuBackend {
    pub fn new(device: wgpu::Device, target: PipelineTarget) -> Self {
        Self { device, target }
    }

    fn scoped<T>(&self, f: impl FnOnce(&wgpu::Device) -> T) -> Result<T, String> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = f(&self.device);
        match pollster::block_on(self.device.pop_error_scope()) {
            Some(err) => Err(err.to_string()),
            None => Ok(value),
        }
    }
}

impl ShaderBackend for WgpuBackend {
    type Stage = WgpuStage;
    type Program = WgpuProgram;

    fn compile(
        &mut self,
        stage: ShaderStage,
        label: &str,
        source: &str,
    ) -> Result<CompiledStage<WgpuStage>, String> {
        let reflected = reflect::compile_stage(stage, source)?;

        let label = format!("prism {label} {stage}");
        let module = self.scoped(|device| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label.as_str()),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            })
        })?;

        let info = pollster::block_on(module.get_compilation_info());
        let log = info
            .messages
            .iter()
            .map(|m| format!("{:?}: {}", m.message_type, m.message))
            .collect::<Vec<_>>()
            .join("\n");

        Ok(CompiledStage {
            stage: WgpuStage { reflected, module },
            log,
        })
    }

    fn link(
        &mut self,
        label: &str,
        vertex: &WgpuStage,
        fragment: &WgpuStage,
    ) -> Result<WgpuProgram, String> {
        let interface = reflect::link(&vertex.reflected, &fragment.reflected)?;

        let target = &self.target;
        let label = format!("prism {label} pipeline");
        let pipeline = self.scoped(|device| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label.as_str()),
                layout: None,
                vertex: wgpu::VertexState {
                    module: &vertex.module,
                    entry_point: Some(vertex.reflected.entry_point.as_str()),
                    compilation_options: Default::default(),
                    buffers: &target.vertex_buffers,
                },
                fragment: Some(wgpu::FragmentState {
                    module: &fragment.module,
                    entry_point: Some(fragment.reflected.entry_point.as_str()),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: target.format,
                        blend: target.blend,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: target.topology,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        })?;

        Ok(WgpuProgram {
            pipeline,
            uniforms: interface.uniforms,
        })
    }

    fn uniform_location(&self, program: &WgpuProgram, name: &str) -> Option<UniformLocation> {
        program.uniforms.get(name).copied()
    }

    fn release_stage(&mut self, stage: WgpuStage) {
        log::trace!("releasing {} stage `{}`", stage.reflected.stage, stage.reflected.entry_point);
        drop(stage);
    }

    fn release_program(&mut self, program: WgpuProgram) {
        drop(program);
    }
}
