//! Built-in shader sources.
//!
//! Filter programs are GLSL fragment shaders compiled through naga at
//! startup. Each declares the source texture at binding 0 and its sampler at
//! binding 1; programs with parameters additionally declare the `Params`
//! uniform block at binding 2. The vertex stage and the identity fragment
//! used when no filter is active are fixed WGSL.

use crate::filter::FilterKind;

/// Vertex shader for the full-screen quad, in WGSL.
pub const VERTEX_SHADER: &str = r#"
struct VertexInput {
    @location(0) position: vec2<f32>,
    @location(1) tex_coords: vec2<f32>,
}

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) tex_coords: vec2<f32>,
}

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = vec4<f32>(in.position, 0.0, 1.0);
    out.tex_coords = in.tex_coords;
    return out;
}
"#;

/// Identity fragment shader in WGSL, rendered when no filter is selected.
pub const IDENTITY_FRAGMENT_SHADER: &str = r#"
@group(0) @binding(0) var t_texture: texture_2d<f32>;
@group(0) @binding(1) var s_sampler: sampler;

@fragment
fn fs_main(@location(0) tex_coords: vec2<f32>) -> @location(0) vec4<f32> {
    return textureSample(t_texture, s_sampler, tex_coords);
}
"#;

/// Sepia tone: fixed mix of the input channels, output forced opaque.
pub const SEPIA_SHADER: &str = r#"
#version 450

layout(location = 0) in vec2 tex_coords;
layout(location = 0) out vec4 out_color;

layout(set = 0, binding = 0) uniform texture2D t_input;
layout(set = 0, binding = 1) uniform sampler s_input;

void main() {
    vec4 color = texture(sampler2D(t_input, s_input), tex_coords);
    float r = dot(color.rgb, vec3(0.393, 0.769, 0.189));
    float g = dot(color.rgb, vec3(0.349, 0.686, 0.168));
    float b = dot(color.rgb, vec3(0.272, 0.534, 0.131));
    out_color = vec4(r, g, b, 1.0);
}
"#;

/// Black and white: plain channel average, output forced opaque.
pub const BLACK_AND_WHITE_SHADER: &str = r#"
#version 450

layout(location = 0) in vec2 tex_coords;
layout(location = 0) out vec4 out_color;

layout(set = 0, binding = 0) uniform texture2D t_input;
layout(set = 0, binding = 1) uniform sampler s_input;

void main() {
    vec4 color = texture(sampler2D(t_input, s_input), tex_coords);
    float avg = (color.r + color.g + color.b) / 3.0;
    out_color = vec4(avg, avg, avg, 1.0);
}
"#;

/// Contrast: scales the distance from mid-gray by the strength uniform.
/// Alpha passes through.
pub const CONTRAST_SHADER: &str = r#"
#version 450

layout(location = 0) in vec2 tex_coords;
layout(location = 0) out vec4 out_color;

layout(set = 0, binding = 0) uniform texture2D t_input;
layout(set = 0, binding = 1) uniform sampler s_input;

layout(set = 0, binding = 2) uniform Params {
    float strength;
    float width;
    float height;
    float reserved;
};

void main() {
    vec4 color = texture(sampler2D(t_input, s_input), tex_coords);
    vec3 adjusted = (color.rgb - 0.5) * strength + 0.5;
    out_color = vec4(clamp(adjusted, 0.0, 1.0), color.a);
}
"#;

/// Box blur: 9x9 unweighted neighborhood, one sample every 1/512 of
/// texture space. All four channels are averaged, so alpha is blurred
/// along with the colors.
pub const BLUR_SHADER: &str = r#"
#version 450

layout(location = 0) in vec2 tex_coords;
layout(location = 0) out vec4 out_color;

layout(set = 0, binding = 0) uniform texture2D t_input;
layout(set = 0, binding = 1) uniform sampler s_input;

void main() {
    vec4 sum = vec4(0.0);
    for (int x = -4; x <= 4; x++) {
        for (int y = -4; y <= 4; y++) {
            vec2 offset = vec2(float(x), float(y)) / 512.0;
            sum += texture(sampler2D(t_input, s_input), tex_coords + offset);
        }
    }
    out_color = sum / 81.0;
}
"#;

/// The built-in filter programs compiled by the registry at startup.
pub const BUILTIN_SHADERS: [(FilterKind, &str, &str); 4] = [
    (FilterKind::Sepia, "sepia", SEPIA_SHADER),
    (FilterKind::BlackAndWhite, "black_and_white", BLACK_AND_WHITE_SHADER),
    (FilterKind::Contrast, "contrast", CONTRAST_SHADER),
    (FilterKind::Blur, "blur", BLUR_SHADER),
];
