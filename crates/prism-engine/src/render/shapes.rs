use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::paint::Color;
use crate::render::{RenderCtx, RenderTarget};
use crate::shader::{PipelineTarget, ShaderProgram, WgpuProgram};

/// Name of the uniform every shape program must expose.
pub const SHAPE_UNIFORM: &str = "shape";

/// The primitives the demo can draw.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum Shape {
    #[default]
    Triangle,
    Square,
    /// A quad; the fragment stage cuts the disc out of it.
    Circle,
}

impl Shape {
    pub const ALL: [Shape; 3] = [Shape::Triangle, Shape::Square, Shape::Circle];

    pub const fn label(self) -> &'static str {
        match self {
            Shape::Triangle => "Triangle",
            Shape::Square => "Square",
            Shape::Circle => "Circle",
        }
    }
}

// ── GPU types ─────────────────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct ShapeVertex {
    pub position: [f32; 2], // NDC
    pub uv: [f32; 2],
}

impl ShapeVertex {
    const ATTRS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Float32x2, // position
        1 => Float32x2  // uv
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<ShapeVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// Layout (32 bytes), mirrored by `ShapeUniform` in the WGSL sources:
///
///  offset  0  color   [f32; 4]
///  offset 16  params  [f32; 4]  (.x = aspect correction, .y = scale, .z = time)
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct ShapeUniform {
    pub color: [f32; 4],
    pub params: [f32; 4],
}

impl ShapeUniform {
    pub fn new(color: Color, aspect_correction: f32, scale: f32, time: f32) -> Self {
        Self {
            color: color.to_array(),
            params: [aspect_correction, scale, time, 0.0],
        }
    }
}

const TRIANGLE_VERTICES: [ShapeVertex; 3] = [
    ShapeVertex { position: [-0.5, -0.5], uv: [0.0, 0.0] },
    ShapeVertex { position: [0.5, -0.5], uv: [1.0, 0.0] },
    ShapeVertex { position: [0.0, 0.5], uv: [0.5, 1.0] },
];
const TRIANGLE_INDICES: [u16; 3] = [0, 1, 2];

const QUAD_VERTICES: [ShapeVertex; 4] = [
    ShapeVertex { position: [-0.5, -0.5], uv: [0.0, 0.0] },
    ShapeVertex { position: [0.5, -0.5], uv: [1.0, 0.0] },
    ShapeVertex { position: [0.5, 0.5], uv: [1.0, 1.0] },
    ShapeVertex { position: [-0.5, 0.5], uv: [0.0, 1.0] },
];
const QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

/// Fixed-function state the shape programs are linked against.
pub fn pipeline_target(format: wgpu::TextureFormat) -> PipelineTarget {
    PipelineTarget {
        format,
        vertex_buffers: vec![ShapeVertex::layout()],
        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
        topology: wgpu::PrimitiveTopology::TriangleList,
    }
}

struct Mesh {
    vbo: wgpu::Buffer,
    ibo: wgpu::Buffer,
    index_count: u32,
}

impl Mesh {
    fn new(device: &wgpu::Device, label: &str, vertices: &[ShapeVertex], indices: &[u16]) -> Self {
        let vbo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("prism {label} vbo")),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let ibo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("prism {label} ibo")),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vbo,
            ibo,
            index_count: indices.len() as u32,
        }
    }
}

/// Identifies the program a bind group was built for.
#[derive(PartialEq, Eq)]
struct BindingKey {
    program: String,
    generation: u64,
}

/// Draws one [`Shape`] per call with a caller-supplied program.
///
/// The program is an explicit argument; its `shape` uniform location decides
/// where the per-frame [`ShapeUniform`] is bound. Bind groups are rebuilt
/// when the program is replaced in the cache.
#[derive(Default)]
pub struct ShapeRenderer {
    triangle: Option<Mesh>,
    quad: Option<Mesh>,
    uniform_buffer: Option<wgpu::Buffer>,
    binding: Option<(BindingKey, wgpu::BindGroup)>,
    warned_missing_uniform: bool,
}

impl ShapeRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draw(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        program: &ShaderProgram<WgpuProgram>,
        shape: Shape,
        uniform: &ShapeUniform,
    ) {
        self.ensure_buffers(ctx);
        if !self.ensure_binding(ctx, program) {
            return;
        }

        let Some(ubo) = self.uniform_buffer.as_ref() else { return };
        ctx.queue.write_buffer(ubo, 0, bytemuck::bytes_of(uniform));

        let mesh = match shape {
            Shape::Triangle => self.triangle.as_ref(),
            Shape::Square | Shape::Circle => self.quad.as_ref(),
        };
        let Some(mesh) = mesh else { return };
        let Some((_, bind_group)) = self.binding.as_ref() else { return };
        let Some(group) = program.uniform(SHAPE_UNIFORM).map(|loc| loc.group) else { return };

        let mut rpass = target.load_pass("prism shape pass");
        rpass.set_pipeline(program.raw().pipeline());
        rpass.set_bind_group(group, bind_group, &[]);
        rpass.set_vertex_buffer(0, mesh.vbo.slice(..));
        rpass.set_index_buffer(mesh.ibo.slice(..), wgpu::IndexFormat::Uint16);
        rpass.draw_indexed(0..mesh.index_count, 0, 0..1);
    }

    // ── private helpers ────────────────────────────────────────────────────

    fn ensure_buffers(&mut self, ctx: &RenderCtx<'_>) {
        if self.triangle.is_none() {
            self.triangle = Some(Mesh::new(ctx.device, "triangle", &TRIANGLE_VERTICES, &TRIANGLE_INDICES));
        }
        if self.quad.is_none() {
            self.quad = Some(Mesh::new(ctx.device, "quad", &QUAD_VERTICES, &QUAD_INDICES));
        }
        if self.uniform_buffer.is_none() {
            self.uniform_buffer = Some(ctx.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("prism shape ubo"),
                size: std::mem::size_of::<ShapeUniform>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }));
        }
    }

    /// Returns `false` when the program cannot be drawn with.
    fn ensure_binding(&mut self, ctx: &RenderCtx<'_>, program: &ShaderProgram<WgpuProgram>) -> bool {
        let key = BindingKey {
            program: program.name().to_string(),
            generation: program.generation(),
        };
        if self.binding.as_ref().is_some_and(|(k, _)| *k == key) {
            return true;
        }

        let Some(location) = program.uniform(SHAPE_UNIFORM) else {
            if !self.warned_missing_uniform {
                log::warn!("program `{}` has no `{SHAPE_UNIFORM}` uniform; skipping draw", program.name());
                self.warned_missing_uniform = true;
            }
            return false;
        };
        let Some(ubo) = self.uniform_buffer.as_ref() else { return false };

        let layout = program.raw().bind_group_layout(location.group);
        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("prism shape bind group"),
            layout: &layout,
            entries: &[wgpu::BindGroupEntry {
                binding: location.binding,
                resource: ubo.as_entire_binding(),
            }],
        });

        log::debug!(
            "shape bind group built for `{}` (generation {})",
            key.program,
            key.generation
        );
        self.binding = Some((key, bind_group));
        true
    }
}
