//! Shader text assembly and front-end validation.
//!
//! User sources are ShaderToy-style bodies that define `mainImage`. Each one is
//! wrapped into a standalone Vulkan-flavoured GLSL 450 fragment shader:
//!
//! 1. `#version` and `precision` lines are dropped, together with any
//!    `uniform` line that redeclares a built-in (`iTime`, `iChannel2`, ...).
//! 2. The prelude declares the `PassParams` uniform block, the four channel
//!    texture/sampler pairs (set 1) and the shared asset pairs (set 2), and maps
//!    the familiar names onto them with `#define`.
//! 3. The epilogue computes `fragCoord` from the interpolated UV and calls
//!    `mainImage`, writing to `outColor`.

use std::borrow::Cow;

use thiserror::Error;
use wgpu::naga::front::glsl::{Frontend, Options};
use wgpu::naga::ShaderStage;

use crate::types::{CHANNEL_COUNT, MAX_TEXTURES};

#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("GLSL compilation failed:\n{0}")]
    Parse(String),
}

const BUILTIN_UNIFORMS: [&str; 7] = [
    "iResolution",
    "iTimeDelta",
    "iTime",
    "iFrame",
    "iMouse",
    "iDate",
    "iChannel",
];

const UNIFORM_PRELUDE: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 outColor;

layout(std140, set = 0, binding = 0) uniform PassParams {
    vec3 _iResolution;
    float _iTime;
    float _iTimeDelta;
    int _iFrame;
    float _targetFlip;
    float _padding0;
    vec4 _iMouse;
    vec4 _iDate;
} ubo;

#define iResolution ubo._iResolution
#define iTime ubo._iTime
#define iTimeDelta ubo._iTimeDelta
#define iFrame ubo._iFrame
#define iMouse ubo._iMouse
#define iDate ubo._iDate

";

const ENTRY_WRAPPER: &str = r"
void main() {
    vec2 uv = v_uv;
    if (ubo._targetFlip > 0.5) {
        uv.y = 1.0 - uv.y;
    }
    vec4 color = vec4(0.0);
    mainImage(color, uv * iResolution.xy);
    outColor = color;
}
";

/// Full-screen triangle; `v_uv` is 0..1 with y pointing up.
pub(crate) const VERTEX_SHADER_GLSL: &str = r"#version 450
layout(location = 0) out vec2 v_uv;

const vec2 positions[3] = vec2[3](
    vec2(-1.0, -3.0),
    vec2(3.0, 1.0),
    vec2(-1.0, 1.0)
);

void main() {
    uint vertex_index = uint(gl_VertexIndex);
    vec2 pos = positions[vertex_index];
    v_uv = pos * 0.5 + vec2(0.5, 0.5);
    gl_Position = vec4(pos, 0.0, 1.0);
}
";

/// Produces the complete fragment shader for a pass source.
pub fn assemble_fragment(source: &str) -> String {
    let mut assembled = String::from(UNIFORM_PRELUDE);
    for index in 0..CHANNEL_COUNT {
        declare_sampler(&mut assembled, 1, index, "iChannel", "channel");
    }
    for index in 0..MAX_TEXTURES {
        declare_sampler(&mut assembled, 2, index, "iTexChannel", "asset");
    }
    assembled.push('\n');

    for line in source.lines() {
        if is_redundant_declaration(line) {
            continue;
        }
        assembled.push_str(line);
        assembled.push('\n');
    }

    assembled.push_str(ENTRY_WRAPPER);
    assembled
}

/// Runs the naga GLSL front end over an assembled fragment shader.
pub fn validate_fragment(assembled: &str) -> Result<(), ShaderError> {
    let mut frontend = Frontend::default();
    frontend
        .parse(&Options::from(ShaderStage::Fragment), assembled)
        .map(|_| ())
        .map_err(|errors| ShaderError::Parse(errors.emit_to_string(assembled)))
}

pub(crate) fn fragment_module_source(assembled: &str) -> wgpu::ShaderSource<'_> {
    wgpu::ShaderSource::Glsl {
        shader: Cow::Borrowed(assembled),
        stage: ShaderStage::Fragment,
        defines: &[],
    }
}

pub(crate) fn vertex_module_source() -> wgpu::ShaderSource<'static> {
    wgpu::ShaderSource::Glsl {
        shader: Cow::Borrowed(VERTEX_SHADER_GLSL),
        stage: ShaderStage::Vertex,
        defines: &[],
    }
}

fn declare_sampler(out: &mut String, set: u32, index: usize, alias: &str, prefix: &str) {
    let texture_binding = index * 2;
    let sampler_binding = texture_binding + 1;
    out.push_str(&format!(
        "layout(set = {set}, binding = {texture_binding}) uniform texture2D multipass_{prefix}{index}_texture;\n"
    ));
    out.push_str(&format!(
        "layout(set = {set}, binding = {sampler_binding}) uniform sampler multipass_{prefix}{index}_sampler;\n"
    ));
    out.push_str(&format!(
        "#define {alias}{index} sampler2D(multipass_{prefix}{index}_texture, multipass_{prefix}{index}_sampler)\n"
    ));
}

fn is_redundant_declaration(line: &str) -> bool {
    let trimmed = line.trim_start();
    if trimmed.starts_with("#version") || trimmed.starts_with("precision ") {
        return true;
    }
    // `iChannel` also covers `iTexChannel`.
    trimmed.starts_with("uniform ")
        && BUILTIN_UNIFORMS
            .iter()
            .any(|name| trimmed.contains(name))
}
