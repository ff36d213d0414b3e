//! Shader compilation tests.
//!
//! The built-in GLSL filter programs go through the real naga pipeline here,
//! so a shader edit that breaks parsing, validation, or the binding contract
//! fails in CI instead of at app startup.

use iris::filter::FilterKind;
use iris::shader::{
    sources, CompileError, ShaderProgram, ShaderRegistry, SlotKind,
};

/// Validates a WGSL source with naga, panicking with the shader name on
/// failure.
fn validate_wgsl(name: &str, source: &str) {
    match naga::front::wgsl::parse_str(source) {
        Ok(module) => {
            let result = naga::valid::Validator::new(
                naga::valid::ValidationFlags::all(),
                naga::valid::Capabilities::all(),
            )
            .validate(&module);
            if let Err(e) = result {
                panic!("shader '{}' validation failed: {:?}", name, e);
            }
        }
        Err(e) => {
            panic!("shader '{}' parse failed: {:?}", name, e);
        }
    }
}

#[test]
fn test_vertex_shader_validates() {
    validate_wgsl("vertex", sources::VERTEX_SHADER);
}

#[test]
fn test_identity_fragment_shader_validates() {
    validate_wgsl("identity", sources::IDENTITY_FRAGMENT_SHADER);
}

#[test]
fn test_builtin_filter_shaders_compile() {
    for (kind, name, glsl) in sources::BUILTIN_SHADERS {
        let program = ShaderProgram::compile(kind, name, glsl)
            .unwrap_or_else(|e| panic!("builtin '{}' failed to compile: {}", name, e));
        assert_eq!(program.kind, kind);
        assert_eq!(program.entry_point, "main");
    }
}

#[test]
fn test_emitted_wgsl_is_valid() {
    // What the registry hands to wgpu must itself be a valid WGSL module.
    let registry = ShaderRegistry::with_builtin();
    for program in registry.programs() {
        validate_wgsl(&program.name, &program.wgsl);
    }
}

#[test]
fn test_filter_shaders_declare_texture_and_sampler() {
    let registry = ShaderRegistry::with_builtin();
    for (kind, name, _) in sources::BUILTIN_SHADERS {
        let program = registry.get(kind).unwrap();
        let has = |binding: u32, slot: SlotKind| {
            program.slots.iter().any(|s| s.binding == binding && s.kind == slot)
        };
        assert!(has(0, SlotKind::Texture), "{} misses the texture at binding 0", name);
        assert!(has(1, SlotKind::Sampler), "{} misses the sampler at binding 1", name);
    }
}

#[test]
fn test_params_block_is_contrast_only() {
    let registry = ShaderRegistry::with_builtin();
    for (kind, name, _) in sources::BUILTIN_SHADERS {
        let program = registry.get(kind).unwrap();
        let expect_params = kind == FilterKind::Contrast;
        assert_eq!(
            program.uses_params(),
            expect_params,
            "{} params block mismatch",
            name
        );
    }
}

#[test]
fn test_broken_glsl_reports_parse_error() {
    let err = ShaderProgram::compile(FilterKind::Sepia, "broken", "void main( {")
        .unwrap_err();
    assert!(matches!(err, CompileError::Parse { .. }));
}

#[test]
fn test_missing_sampler_reports_missing_binding() {
    let glsl = r#"
#version 450

layout(location = 0) in vec2 tex_coords;
layout(location = 0) out vec4 out_color;

layout(set = 0, binding = 0) uniform texture2D t_input;

void main() {
    out_color = vec4(tex_coords, 0.0, 1.0);
}
"#;
    let err = ShaderProgram::compile(FilterKind::Sepia, "no_sampler", glsl).unwrap_err();
    assert!(matches!(err, CompileError::MissingBinding { binding: 1, .. }));
}
