//! WGSL generation.
//!
//! Vertex inputs are emitted only for attributes the layout binds, at the
//! locations given by [`AttributeSlot`]. Missing attributes read as fixed
//! defaults: white color, zero texture coordinates and a zero normal (which
//! leaves the fragment ambient-lit).

use std::fmt::Write as _;

use crate::config::LIGHT_SLOTS;
use crate::lighting::{AMBIENT_STRENGTH, HIGHLIGHT_EXPONENT, SPECULAR_STRENGTH};
use crate::mesh::{AttributeSlot, VertexLayout};

use super::ShaderKind;

pub const VERTEX_ENTRY: &str = "vs_main";
pub const FRAGMENT_ENTRY: &str = "fs_main";

const UNIFORMS: &str = r#"
struct PointLight {
    position: vec4<f32>,
    color: vec4<f32>,
}

struct MeshUniforms {
    model: mat4x4<f32>,
    view: mat4x4<f32>,
    projection: mat4x4<f32>,
    rotation: mat4x4<f32>,
    normal_matrix: mat4x4<f32>,
    view_position: vec4<f32>,
    lights: array<PointLight, LIGHT_SLOTS>,
    material: vec4<f32>,
}

@group(0) @binding(0)
var<uniform> uniforms: MeshUniforms;
"#;

const TEXTURE_BINDINGS: &str = r#"
@group(0) @binding(1)
var base_texture: texture_2d<f32>;
@group(0) @binding(2)
var base_sampler: sampler;
"#;

const VERTEX_OUTPUT: &str = r#"
struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) color: vec4<f32>,
    @location(3) uv: vec2<f32>,
}
"#;

const FRAGMENT_BODY: &str = r#"
    var normal = vec3<f32>(0.0);
    if (length(input.normal) > 0.0) {
        normal = normalize(input.normal);
    }
    let view_dir = normalize(uniforms.view_position.xyz - input.world_position);
    let shininess = uniforms.material.x;

    var diffuse = vec3<f32>(0.0);
    var specular = vec3<f32>(0.0);
    for (var i = 0u; i < LIGHT_SLOTSu; i = i + 1u) {
        let point_light = uniforms.lights[i];
        let to_light = normalize(point_light.position.xyz - input.world_position);
        let intensity = point_light.color.w;
        diffuse += max(dot(normal, to_light), 0.0) * point_light.color.rgb * intensity;
        if (shininess > 0.0) {
            let reflected = reflect(-to_light, normal);
            let highlight = pow(max(dot(view_dir, reflected), 0.0), HIGHLIGHT * shininess);
            specular += SPECULAR * intensity * shininess * highlight * point_light.color.rgb;
        }
    }

    let ambient = vec3<f32>(AMBIENT);
    return vec4<f32>((ambient + diffuse + specular) * base_color, 1.0);
}
"#;

/// Full WGSL module for one shader kind and vertex layout.
pub fn shader_source(kind: ShaderKind, layout: &VertexLayout) -> String {
    let mut source = String::new();
    source.push_str(&UNIFORMS.replace("LIGHT_SLOTS", &LIGHT_SLOTS.to_string()));
    if kind == ShaderKind::Textured {
        source.push_str(TEXTURE_BINDINGS);
    }

    source.push_str("\nstruct VertexInput {\n");
    for slot in AttributeSlot::ALL {
        if layout.is_bound(slot) {
            let _ = writeln!(
                source,
                "    @location({}) {}: {},",
                slot.location(),
                field_name(slot),
                wgsl_type(slot)
            );
        }
    }
    source.push_str("}\n");
    source.push_str(VERTEX_OUTPUT);

    let input = |slot: AttributeSlot| {
        if layout.is_bound(slot) {
            format!("input.{}", field_name(slot))
        } else {
            default_value(slot).to_string()
        }
    };
    let _ = write!(
        source,
        r#"
@vertex
fn {VERTEX_ENTRY}(input: VertexInput) -> VertexOutput {{
    var out: VertexOutput;
    let world = uniforms.model * vec4<f32>(input.position, 1.0);
    out.clip_position = uniforms.projection * uniforms.view * world;
    out.world_position = world.xyz;
    let rotated = (uniforms.rotation * vec4<f32>({normal}, 0.0)).xyz;
    out.normal = (uniforms.normal_matrix * vec4<f32>(rotated, 0.0)).xyz;
    out.color = {color};
    out.uv = {uv};
    return out;
}}
"#,
        normal = input(AttributeSlot::Normal),
        color = input(AttributeSlot::Color),
        uv = input(AttributeSlot::TexCoord),
    );

    let base_color = match kind {
        ShaderKind::Textured => "textureSample(base_texture, base_sampler, input.uv).rgb",
        ShaderKind::Untextured => "input.color.rgb",
    };
    let _ = write!(
        source,
        "\n@fragment\nfn {FRAGMENT_ENTRY}(input: VertexOutput) -> @location(0) vec4<f32> {{\n    let base_color = {base_color};"
    );
    source.push_str(
        &FRAGMENT_BODY
            .replace("LIGHT_SLOTS", &LIGHT_SLOTS.to_string())
            .replace("HIGHLIGHT", &wgsl_float(HIGHLIGHT_EXPONENT))
            .replace("SPECULAR", &wgsl_float(SPECULAR_STRENGTH))
            .replace("AMBIENT", &wgsl_float(AMBIENT_STRENGTH)),
    );
    source
}

fn field_name(slot: AttributeSlot) -> &'static str {
    match slot {
        AttributeSlot::Position => "position",
        AttributeSlot::Color => "color",
        AttributeSlot::TexCoord => "uv",
        AttributeSlot::Normal => "normal",
    }
}

fn wgsl_type(slot: AttributeSlot) -> &'static str {
    match slot.canonical_count() {
        2 => "vec2<f32>",
        3 => "vec3<f32>",
        _ => "vec4<f32>",
    }
}

fn default_value(slot: AttributeSlot) -> &'static str {
    match slot {
        AttributeSlot::Position => "vec3<f32>(0.0)",
        AttributeSlot::Color => "vec4<f32>(1.0)",
        AttributeSlot::TexCoord => "vec2<f32>(0.0)",
        AttributeSlot::Normal => "vec3<f32>(0.0)",
    }
}

fn wgsl_float(value: f32) -> String {
    format!("{value:?}")
}
