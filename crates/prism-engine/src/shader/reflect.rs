//! WGSL front end: parse, validate and reflect one stage, then check that two
//! stages fit together.
//!
//! This is the device-independent half of [`WgpuBackend`](super::WgpuBackend).

use std::collections::HashMap;

use naga::valid::{Capabilities, ValidationFlags, Validator};
use naga::{AddressSpace, Binding, Handle, Module, Scalar, ScalarKind, Type, TypeInner};

use super::backend::UniformLocation;
use super::error::ShaderStage;

/// A `@location(n)` slot on a stage boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceSlot {
    pub location: u32,
    pub name: Option<String>,
    pub ty: TypeInner,
}

/// A `var<uniform>` read by a stage's entry point.
///
/// Declared but unread globals are left out; the pipeline layout wgpu derives
/// does not contain them either.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReflectedUniform {
    pub name: String,
    pub location: UniformLocation,
    /// Size of the uniform type in bytes.
    pub size: u32,
}

/// A parsed and validated stage.
#[derive(Debug)]
pub struct ReflectedStage {
    pub stage: ShaderStage,
    pub module: Module,
    pub entry_point: String,
    pub inputs: Vec<InterfaceSlot>,
    pub outputs: Vec<InterfaceSlot>,
    pub uniforms: Vec<ReflectedUniform>,
}

/// Result of a successful interface check.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LinkedInterface {
    pub uniforms: HashMap<String, UniformLocation>,
}

/// Parses and validates `source`, requiring an entry point for `stage`.
///
/// The error string is the human-readable diagnostic.
pub fn compile_stage(stage: ShaderStage, source: &str) -> Result<ReflectedStage, String> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| e.emit_to_string(source))?;

    let info = Validator::new(ValidationFlags::all(), Capabilities::all())
        .validate(&module)
        .map_err(|e| error_chain(e.as_inner()))?;

    let wanted = match stage {
        ShaderStage::Vertex => naga::ShaderStage::Vertex,
        ShaderStage::Fragment => naga::ShaderStage::Fragment,
    };

    let mut candidates = module
        .entry_points
        .iter()
        .enumerate()
        .filter(|(_, ep)| ep.stage == wanted);
    let (ep_index, ep) = candidates
        .next()
        .ok_or_else(|| format!("no @{stage} entry point found"))?;
    if candidates.next().is_some() {
        log::debug!("several @{stage} entry points found, using `{}`", ep.name);
    }

    let mut inputs = Vec::new();
    for arg in &ep.function.arguments {
        collect_slots(&module, arg.binding.as_ref(), arg.ty, arg.name.clone(), &mut inputs);
    }

    let mut outputs = Vec::new();
    if let Some(result) = &ep.function.result {
        collect_slots(&module, result.binding.as_ref(), result.ty, None, &mut outputs);
    }

    let ep_info = info.get_entry_point(ep_index);
    let uniforms = module
        .global_variables
        .iter()
        .filter(|(_, var)| var.space == AddressSpace::Uniform)
        .filter(|&(handle, _)| !ep_info[handle].is_empty())
        .filter_map(|(_, var)| {
            let name = var.name.clone()?;
            let binding = var.binding.as_ref()?;
            Some(ReflectedUniform {
                name,
                location: UniformLocation::new(binding.group, binding.binding),
                size: module.types[var.ty].inner.size(module.to_ctx()),
            })
        })
        .collect();

    let entry_point = ep.name.clone();

    Ok(ReflectedStage {
        stage,
        module,
        entry_point,
        inputs,
        outputs,
        uniforms,
    })
}

/// Checks that `fragment` only reads what `vertex` writes and that both
/// stages agree on their uniform bindings.
///
/// All problems are collected into one log.
pub fn link(vertex: &ReflectedStage, fragment: &ReflectedStage) -> Result<LinkedInterface, String> {
    let mut errors = Vec::new();

    for input in &fragment.inputs {
        match vertex.outputs.iter().find(|o| o.location == input.location) {
            None => errors.push(format!(
                "fragment input @location({}){} is not written by the vertex stage",
                input.location,
                slot_name(input)
            )),
            Some(output) if output.ty != input.ty => errors.push(format!(
                "@location({}) type mismatch: vertex writes {}, fragment reads {}",
                input.location,
                type_name(&output.ty),
                type_name(&input.ty)
            )),
            Some(_) => {}
        }
    }

    let mut uniforms: HashMap<String, UniformLocation> = HashMap::new();
    let mut by_binding: HashMap<UniformLocation, &ReflectedUniform> = HashMap::new();

    for uniform in vertex.uniforms.iter().chain(&fragment.uniforms) {
        let loc = uniform.location;

        if let Some(prev) = by_binding.get(&loc) {
            if prev.name != uniform.name {
                errors.push(format!(
                    "@group({}) @binding({}) is declared as `{}` and `{}`",
                    loc.group, loc.binding, prev.name, uniform.name
                ));
            } else if prev.size != uniform.size {
                errors.push(format!(
                    "uniform `{}` has size {} in one stage and {} in the other",
                    uniform.name, prev.size, uniform.size
                ));
            }
            continue;
        }

        if let Some(other) = uniforms.get(&uniform.name)
            && *other != loc
        {
            errors.push(format!(
                "uniform `{}` is bound at @group({}) @binding({}) and @group({}) @binding({})",
                uniform.name, other.group, other.binding, loc.group, loc.binding
            ));
            continue;
        }

        by_binding.insert(loc, uniform);
        uniforms.insert(uniform.name.clone(), loc);
    }

    if errors.is_empty() {
        Ok(LinkedInterface { uniforms })
    } else {
        Err(errors.join("\n"))
    }
}

fn collect_slots(
    module: &Module,
    binding: Option<&Binding>,
    ty: Handle<Type>,
    name: Option<String>,
    out: &mut Vec<InterfaceSlot>,
) {
    match binding {
        Some(Binding::Location { location, .. }) => out.push(InterfaceSlot {
            location: *location,
            name,
            ty: module.types[ty].inner.clone(),
        }),
        Some(Binding::BuiltIn(_)) => {}
        None => {
            if let TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for member in members {
                    if let Some(Binding::Location { location, .. }) = &member.binding {
                        out.push(InterfaceSlot {
                            location: *location,
                            name: member.name.clone(),
                            ty: module.types[member.ty].inner.clone(),
                        });
                    }
                }
            }
        }
    }
}

fn slot_name(slot: &InterfaceSlot) -> String {
    slot.name
        .as_deref()
        .map(|n| format!(" `{n}`"))
        .unwrap_or_default()
}

fn type_name(ty: &TypeInner) -> String {
    match ty {
        TypeInner::Scalar(s) => scalar_name(*s),
        TypeInner::Vector { size, scalar } => format!("vec{}<{}>", *size as u8, scalar_name(*scalar)),
        other => format!("{other:?}"),
    }
}

fn scalar_name(s: Scalar) -> String {
    let bits = u32::from(s.width) * 8;
    match s.kind {
        ScalarKind::Float => format!("f{bits}"),
        ScalarKind::Sint => format!("i{bits}"),
        ScalarKind::Uint => format!("u{bits}"),
        ScalarKind::Bool => "bool".to_string(),
        other => format!("{other:?}"),
    }
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNIFORM: &str = "
struct ShapeUniform {
    color: vec4<f32>,
    params: vec4<f32>,
};
@group(0) @binding(0) var<uniform> shape: ShapeUniform;
";

    const VS_BODY: &str = "
struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(@location(0) position: vec2<f32>, @location(1) uv: vec2<f32>) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = vec4<f32>(position * shape.params.y, 0.0, 1.0);
    out.uv = uv;
    return out;
}
";

    const FS_BODY: &str = "
@fragment
fn fs_main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
    return shape.color * vec4<f32>(uv, 1.0, 1.0);
}
";

    fn vs() -> String {
        format!("{UNIFORM}{VS_BODY}")
    }

    fn fs() -> String {
        format!("{UNIFORM}{FS_BODY}")
    }

    #[test]
    fn reflects_entry_point_and_interface() {
        let stage = compile_stage(ShaderStage::Vertex, &vs()).unwrap();
        assert_eq!(stage.entry_point, "vs_main");
        assert_eq!(stage.inputs.len(), 2);
        assert_eq!(stage.outputs.len(), 1);
        assert_eq!(stage.outputs[0].location, 0);
        assert_eq!(stage.outputs[0].name.as_deref(), Some("uv"));
    }

    #[test]
    fn reflects_uniform_binding_and_size() {
        let stage = compile_stage(ShaderStage::Fragment, &fs()).unwrap();
        assert_eq!(
            stage.uniforms,
            vec![ReflectedUniform {
                name: "shape".into(),
                location: UniformLocation::new(0, 0),
                size: 32,
            }]
        );
    }

    #[test]
    fn syntax_error_produces_a_log() {
        let err = compile_stage(ShaderStage::Fragment, "@fragment fn fs_main( {").unwrap_err();
        assert!(!err.is_empty());
    }

    #[test]
    fn wrong_stage_is_rejected() {
        let err = compile_stage(ShaderStage::Fragment, &vs()).unwrap_err();
        assert!(err.contains("fragment"), "{err}");
    }

    #[test]
    fn validation_error_is_reported() {
        let src = "@fragment fn fs_main() -> @location(0) vec4<f32> { return 1.0; }";
        assert!(compile_stage(ShaderStage::Fragment, src).is_err());
    }

    #[test]
    fn link_builds_uniform_table() {
        let v = compile_stage(ShaderStage::Vertex, &vs()).unwrap();
        let f = compile_stage(ShaderStage::Fragment, &fs()).unwrap();
        let linked = link(&v, &f).unwrap();
        assert_eq!(linked.uniforms.get("shape"), Some(&UniformLocation::new(0, 0)));
        assert_eq!(linked.uniforms.len(), 1);
    }

    #[test]
    fn link_rejects_unwritten_fragment_input() {
        let src = format!(
            "{UNIFORM}
@fragment
fn fs_main(@location(3) tint: vec4<f32>) -> @location(0) vec4<f32> {{
    return tint * shape.color;
}}"
        );
        let v = compile_stage(ShaderStage::Vertex, &vs()).unwrap();
        let f = compile_stage(ShaderStage::Fragment, &src).unwrap();
        let err = link(&v, &f).unwrap_err();
        assert!(err.contains("@location(3)"), "{err}");
    }

    #[test]
    fn link_rejects_type_mismatch() {
        let src = "
@fragment
fn fs_main(@location(0) uv: vec3<f32>) -> @location(0) vec4<f32> {
    return vec4<f32>(uv, 1.0);
}";
        let v = compile_stage(ShaderStage::Vertex, &vs()).unwrap();
        let f = compile_stage(ShaderStage::Fragment, src).unwrap();
        let err = link(&v, &f).unwrap_err();
        assert!(err.contains("vec2<f32>") && err.contains("vec3<f32>"), "{err}");
    }

    #[test]
    fn link_rejects_conflicting_binding_names() {
        let src = "
struct Tint { value: vec4<f32> };
@group(0) @binding(0) var<uniform> tint: Tint;
@fragment
fn fs_main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
    return tint.value;
}";
        let v = compile_stage(ShaderStage::Vertex, &vs()).unwrap();
        let f = compile_stage(ShaderStage::Fragment, src).unwrap();
        let err = link(&v, &f).unwrap_err();
        assert!(err.contains("`shape`") && err.contains("`tint`"), "{err}");
    }

    #[test]
    fn declared_but_unread_uniform_is_not_reflected() {
        let vs = format!(
            "{UNIFORM}
@vertex
fn vs_main(@location(0) position: vec2<f32>) -> @builtin(position) vec4<f32> {{
    return vec4<f32>(position, 0.0, 1.0);
}}"
        );
        let fs = format!(
            "{UNIFORM}
@fragment
fn fs_main() -> @location(0) vec4<f32> {{
    return vec4<f32>(1.0);
}}"
        );
        let v = compile_stage(ShaderStage::Vertex, &vs).unwrap();
        let f = compile_stage(ShaderStage::Fragment, &fs).unwrap();
        assert!(v.uniforms.is_empty());
        assert!(f.uniforms.is_empty());

        let linked = link(&v, &f).unwrap();
        assert!(!linked.uniforms.contains_key("shape"));
    }

    #[test]
    fn uniform_read_by_one_stage_is_linked() {
        let fs = format!(
            "{UNIFORM}
@fragment
fn fs_main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {{
    return vec4<f32>(uv, 0.0, 1.0);
}}"
        );
        let v = compile_stage(ShaderStage::Vertex, &vs()).unwrap();
        let f = compile_stage(ShaderStage::Fragment, &fs).unwrap();
        assert!(f.uniforms.is_empty());
        assert_eq!(link(&v, &f).unwrap().uniforms.get("shape"), Some(&UniformLocation::new(0, 0)));
    }
}
