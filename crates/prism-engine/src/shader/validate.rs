//! WGSL compile and link checks.
//!
//! "Compile" parses and validates one stage and locates its entry point.
//! "Link" checks the interface between the stages and the vertex layout the
//! same way wgpu does when it builds a pipeline:
//! - every vertex input is fed by an attribute of the same scalar kind
//! - every fragment input is written by the vertex stage with the same scalar
//!   kind, at least as many components and the same interpolation and sampling

use std::collections::BTreeMap;

use naga::valid::{Capabilities, ValidationFlags, Validator};
use naga::{Binding, Handle, Interpolation, Module, Sampling, ScalarKind, Type, TypeInner};

use crate::geometry::{AttributeType, VertexLayout};

use super::ShaderStage;

/// Type and interpolation of one `@location` slot.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Varying {
    pub kind: ScalarKind,
    /// Scalar width in bytes.
    pub width: u8,
    pub components: u8,
    pub interpolation: Option<Interpolation>,
    pub sampling: Option<Sampling>,
}

impl Varying {
    /// `true` if a stage reading `self` can consume `provided`.
    fn accepts(&self, provided: &Varying) -> bool {
        self.kind == provided.kind
            && self.width <= provided.width
            && self.components <= provided.components
    }
}

impl std::fmt::Display for Varying {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let scalar = match (self.kind, self.width) {
            (ScalarKind::Float, 2) => "f16",
            (ScalarKind::Float, 8) => "f64",
            (ScalarKind::Float, _) => "f32",
            (ScalarKind::Sint, _) => "i32",
            (ScalarKind::Uint, _) => "u32",
            (ScalarKind::Bool, _) => "bool",
            (ScalarKind::AbstractInt, _) | (ScalarKind::AbstractFloat, _) => "abstract",
        };
        match self.components {
            1 => f.write_str(scalar),
            n => write!(f, "vec{n}<{scalar}>"),
        }
    }
}

/// A stage that parsed, validated, and exposes an entry point for its stage.
#[derive(Debug)]
pub struct CompiledStage {
    stage: ShaderStage,
    entry_point: String,
    inputs: BTreeMap<u32, Varying>,
    outputs: BTreeMap<u32, Varying>,
}

impl CompiledStage {
    /// `@location` slots read by the entry point.
    #[inline]
    pub fn inputs(&self) -> &BTreeMap<u32, Varying> {
        &self.inputs
    }

    /// `@location` slots written by the entry point.
    #[inline]
    pub fn outputs(&self) -> &BTreeMap<u32, Varying> {
        &self.outputs
    }
}

/// Entry points selected by a successful link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedProgram {
    pub vertex_entry: String,
    pub fragment_entry: String,
}

/// Compiles one WGSL stage. On failure returns the compiler log.
pub fn compile(stage: ShaderStage, source: &str) -> Result<CompiledStage, String> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| e.emit_to_string(source))?;

    Validator::new(ValidationFlags::all(), Capabilities::empty())
        .validate(&module)
        .map_err(|e| e.into_inner().to_string())?;

    let naga_stage = stage.to_naga();
    let ep = module
        .entry_points
        .iter()
        .find(|ep| ep.stage == naga_stage)
        .ok_or_else(|| format!("no @{stage} entry point found"))?;

    let mut inputs = BTreeMap::new();
    for arg in &ep.function.arguments {
        collect_varyings(&module, arg.binding.as_ref(), arg.ty, &mut inputs);
    }

    let mut outputs = BTreeMap::new();
    if let Some(result) = &ep.function.result {
        collect_varyings(&module, result.binding.as_ref(), result.ty, &mut outputs);
    }

    Ok(CompiledStage {
        stage,
        entry_point: ep.name.clone(),
        inputs,
        outputs,
    })
}

/// Links a vertex and a fragment stage against `layout`. On failure returns the linker log.
pub fn link(
    vertex: &CompiledStage,
    fragment: &CompiledStage,
    layout: &VertexLayout,
) -> Result<LinkedProgram, String> {
    let mut problems = Vec::new();

    if vertex.stage != ShaderStage::Vertex {
        problems.push(format!("expected a vertex stage, got {}", vertex.stage));
    }
    if fragment.stage != ShaderStage::Fragment {
        problems.push(format!("expected a fragment stage, got {}", fragment.stage));
    }

    for (location, input) in &vertex.inputs {
        match layout.attribute(*location) {
            None => problems.push(format!(
                "vertex input @location({location}) has no matching vertex attribute"
            )),
            Some(attr) if attribute_kind(attr.ty) != input.kind => problems.push(format!(
                "vertex input @location({location}) is {input} but the attribute is {:?}",
                attr.ty
            )),
            Some(_) => {}
        }
    }

    for (location, input) in &fragment.inputs {
        let Some(output) = vertex.outputs.get(location) else {
            problems.push(format!(
                "fragment input @location({location}) is not written by the vertex stage"
            ));
            continue;
        };

        if !input.accepts(output) {
            problems.push(format!(
                "fragment input @location({location}) is {input} but the vertex stage writes {output}"
            ));
        } else if input.interpolation != output.interpolation {
            problems.push(format!(
                "fragment input @location({location}) interpolation {:?} does not match {:?}",
                input.interpolation, output.interpolation
            ));
        } else if input.sampling != output.sampling {
            problems.push(format!(
                "fragment input @location({location}) sampling {:?} does not match {:?}",
                input.sampling, output.sampling
            ));
        }
    }

    if !fragment.outputs.contains_key(&0) {
        problems.push("fragment stage does not write @location(0)".to_string());
    }

    if problems.is_empty() {
        Ok(LinkedProgram {
            vertex_entry: vertex.entry_point.clone(),
            fragment_entry: fragment.entry_point.clone(),
        })
    } else {
        Err(problems.join("\n"))
    }
}

fn attribute_kind(ty: AttributeType) -> ScalarKind {
    match ty {
        AttributeType::Float32 => ScalarKind::Float,
    }
}

fn collect_varyings(
    module: &Module,
    binding: Option<&Binding>,
    ty: Handle<Type>,
    out: &mut BTreeMap<u32, Varying>,
) {
    let inner = &module.types[ty].inner;
    match binding {
        Some(Binding::Location {
            location,
            interpolation,
            sampling,
            ..
        }) => {
            let (scalar, components) = match *inner {
                TypeInner::Scalar(scalar) => (scalar, 1),
                TypeInner::Vector { size, scalar } => (scalar, size as u8),
                // Validation rejects any other varying type.
                _ => return,
            };
            out.insert(
                *location,
                Varying {
                    kind: scalar.kind,
                    width: scalar.width,
                    components,
                    interpolation: *interpolation,
                    sampling: *sampling,
                },
            );
        }
        Some(Binding::BuiltIn(_)) => {}
        None => {
            if let TypeInner::Struct { members, .. } = inner {
                for member in members {
                    collect_varyings(module, member.binding.as_ref(), member.ty, out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::TRIANGLE_LAYOUT;
    use crate::shader::{DEFAULT_FRAGMENT_SOURCE, DEFAULT_VERTEX_SOURCE};

    const FRAGMENT_READS_LOCATION_3: &str = r#"
@fragment
fn fs_main(@location(3) tint: vec3<f32>) -> @location(0) vec4<f32> {
    return vec4<f32>(tint, 1.0);
}
"#;

    const FRAGMENT_READS_VEC4: &str = r#"
@fragment
fn fs_main(@location(0) color: vec4<f32>) -> @location(0) vec4<f32> {
    return color;
}
"#;

    const FRAGMENT_READS_FLAT_INT: &str = r#"
@fragment
fn fs_main(@location(0) @interpolate(flat) color: vec3<i32>) -> @location(0) vec4<f32> {
    return vec4<f32>(vec3<f32>(color), 1.0);
}
"#;

    const FRAGMENT_READS_FLAT_FLOAT: &str = r#"
@fragment
fn fs_main(@location(0) @interpolate(flat) color: vec3<f32>) -> @location(0) vec4<f32> {
    return vec4<f32>(color, 1.0);
}
"#;

    const FRAGMENT_READS_VEC2: &str = r#"
@fragment
fn fs_main(@location(0) rg: vec2<f32>) -> @location(0) vec4<f32> {
    return vec4<f32>(rg, 0.0, 1.0);
}
"#;

    const VERTEX_READS_INT_COLOR: &str = r#"
struct VertexOut {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec3<f32>,
};

@vertex
fn vs_main(@location(0) position: vec3<f32>, @location(1) color: vec3<u32>) -> VertexOut {
    var out: VertexOut;
    out.clip_position = vec4<f32>(position, 1.0);
    out.color = vec3<f32>(color);
    return out;
}
"#;

    #[test]
    fn default_pair_compiles_and_links() {
        let vs = compile(ShaderStage::Vertex, DEFAULT_VERTEX_SOURCE).unwrap();
        let fs = compile(ShaderStage::Fragment, DEFAULT_FRAGMENT_SOURCE).unwrap();

        assert_eq!(vs.inputs().keys().copied().collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(vs.outputs().keys().copied().collect::<Vec<_>>(), vec![0]);
        assert_eq!(vs.outputs()[&0].components, 3);
        assert_eq!(vs.outputs()[&0].interpolation, Some(Interpolation::Perspective));

        let linked = link(&vs, &fs, &TRIANGLE_LAYOUT).unwrap();
        assert_eq!(linked.vertex_entry, "vs_main");
        assert_eq!(linked.fragment_entry, "fs_main");
    }

    #[test]
    fn syntax_error_yields_compiler_log() {
        let log = compile(ShaderStage::Vertex, "fn vs_main( {").unwrap_err();
        assert!(!log.is_empty());
    }

    #[test]
    fn wrong_stage_file_fails_to_compile() {
        let log = compile(ShaderStage::Vertex, DEFAULT_FRAGMENT_SOURCE).unwrap_err();
        assert!(log.contains("vertex"));
    }

    #[test]
    fn unwritten_fragment_input_fails_to_link() {
        let vs = compile(ShaderStage::Vertex, DEFAULT_VERTEX_SOURCE).unwrap();
        let fs = compile(ShaderStage::Fragment, FRAGMENT_READS_LOCATION_3).unwrap();

        let log = link(&vs, &fs, &TRIANGLE_LAYOUT).unwrap_err();
        assert!(log.contains("@location(3)"));
    }

    #[test]
    fn swapped_stages_fail_to_link() {
        let vs = compile(ShaderStage::Vertex, DEFAULT_VERTEX_SOURCE).unwrap();
        let fs = compile(ShaderStage::Fragment, DEFAULT_FRAGMENT_SOURCE).unwrap();
        assert!(link(&fs, &vs, &TRIANGLE_LAYOUT).is_err());
    }

    #[test]
    fn wider_fragment_input_fails_to_link() {
        let vs = compile(ShaderStage::Vertex, DEFAULT_VERTEX_SOURCE).unwrap();
        let fs = compile(ShaderStage::Fragment, FRAGMENT_READS_VEC4).unwrap();

        let log = link(&vs, &fs, &TRIANGLE_LAYOUT).unwrap_err();
        assert!(log.contains("vec4<f32>"), "{log}");
        assert!(log.contains("vec3<f32>"), "{log}");
    }

    #[test]
    fn integer_fragment_input_from_float_output_fails_to_link() {
        let vs = compile(ShaderStage::Vertex, DEFAULT_VERTEX_SOURCE).unwrap();
        let fs = compile(ShaderStage::Fragment, FRAGMENT_READS_FLAT_INT).unwrap();

        let log = link(&vs, &fs, &TRIANGLE_LAYOUT).unwrap_err();
        assert!(log.contains("vec3<i32>"), "{log}");
    }

    #[test]
    fn interpolation_mismatch_fails_to_link() {
        let vs = compile(ShaderStage::Vertex, DEFAULT_VERTEX_SOURCE).unwrap();
        let fs = compile(ShaderStage::Fragment, FRAGMENT_READS_FLAT_FLOAT).unwrap();

        let log = link(&vs, &fs, &TRIANGLE_LAYOUT).unwrap_err();
        assert!(log.contains("interpolation"), "{log}");
    }

    #[test]
    fn narrower_fragment_input_links() {
        let vs = compile(ShaderStage::Vertex, DEFAULT_VERTEX_SOURCE).unwrap();
        let fs = compile(ShaderStage::Fragment, FRAGMENT_READS_VEC2).unwrap();
        assert!(link(&vs, &fs, &TRIANGLE_LAYOUT).is_ok());
    }

    #[test]
    fn integer_vertex_input_on_float_attribute_fails_to_link() {
        let vs = compile(ShaderStage::Vertex, VERTEX_READS_INT_COLOR).unwrap();
        let fs = compile(ShaderStage::Fragment, DEFAULT_FRAGMENT_SOURCE).unwrap();

        let log = link(&vs, &fs, &TRIANGLE_LAYOUT).unwrap_err();
        assert!(log.contains("vertex input @location(1)"), "{log}");
    }
}
