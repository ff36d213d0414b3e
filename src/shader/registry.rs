//! Filter program compilation and the startup program table.

use std::collections::HashMap;

use naga::front::glsl::{Frontend, Options};
use naga::valid::{Capabilities, ValidationFlags, Validator};
use naga::ShaderStage;
use tracing::{info, warn};

use super::{sources, CompileError};
use crate::filter::FilterKind;

/// Binding index of the source texture every program must declare.
pub const SOURCE_TEXTURE_BINDING: u32 = 0;
/// Binding index of the source sampler every program must declare.
pub const SOURCE_SAMPLER_BINDING: u32 = 1;
/// Binding index of the params uniform block, for programs that take one.
pub const PARAMS_BINDING: u32 = 2;

/// What a reflected binding slot holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Texture,
    Sampler,
    Uniform,
}

/// One binding declared by a compiled program.
#[derive(Debug, Clone)]
pub struct BindingSlot {
    pub name: String,
    pub binding: u32,
    pub kind: SlotKind,
}

/// A compiled fragment program: validated WGSL plus its binding interface.
///
/// Programs are immutable once compiled and live for the process lifetime.
#[derive(Debug, Clone)]
pub struct ShaderProgram {
    pub kind: FilterKind,
    pub name: String,
    pub wgsl: String,
    pub entry_point: &'static str,
    pub slots: Vec<BindingSlot>,
}

impl ShaderProgram {
    /// Compiles a GLSL fragment source: parse, reflect the binding slots,
    /// validate, emit WGSL.
    pub fn compile(kind: FilterKind, name: &str, glsl: &str) -> Result<ShaderProgram, CompileError> {
        let mut frontend = Frontend::default();
        let options = Options::from(ShaderStage::Fragment);
        let module = frontend
            .parse(&options, glsl)
            .map_err(|e| CompileError::Parse {
                name: name.to_string(),
                message: format!("{:?}", e),
            })?;

        let slots = reflect_slots(&module);

        let mut validator = Validator::new(ValidationFlags::all(), Capabilities::all());
        let module_info = validator
            .validate(&module)
            .map_err(|e| CompileError::Validation {
                name: name.to_string(),
                message: format!("{:?}", e),
            })?;
        let wgsl = naga::back::wgsl::write_string(
            &module,
            &module_info,
            naga::back::wgsl::WriterFlags::empty(),
        )
        .map_err(|e| CompileError::Emit {
            name: name.to_string(),
            message: format!("{:?}", e),
        })?;

        // Every program samples the source, so the texture and sampler slots
        // are mandatory. The params block is only required to be declared by
        // programs that read it.
        for (binding, slot_kind) in [
            (SOURCE_TEXTURE_BINDING, SlotKind::Texture),
            (SOURCE_SAMPLER_BINDING, SlotKind::Sampler),
        ] {
            if !slots.iter().any(|s| s.binding == binding && s.kind == slot_kind) {
                return Err(CompileError::MissingBinding {
                    name: name.to_string(),
                    binding,
                });
            }
        }

        Ok(ShaderProgram {
            kind,
            name: name.to_string(),
            wgsl,
            // naga's GLSL frontend keeps the GLSL entry point name
            entry_point: "main",
            slots,
        })
    }

    /// Whether this program declares the params uniform block.
    pub fn uses_params(&self) -> bool {
        self.slots
            .iter()
            .any(|s| s.binding == PARAMS_BINDING && s.kind == SlotKind::Uniform)
    }
}

/// Collects the group-0 bindings a parsed module declares.
fn reflect_slots(module: &naga::Module) -> Vec<BindingSlot> {
    let mut slots = Vec::new();
    for (_, var) in module.global_variables.iter() {
        let Some(binding) = &var.binding else {
            continue;
        };
        if binding.group != 0 {
            continue;
        }
        let kind = match module.types[var.ty].inner {
            naga::TypeInner::Image { .. } => SlotKind::Texture,
            naga::TypeInner::Sampler { .. } => SlotKind::Sampler,
            _ => SlotKind::Uniform,
        };
        slots.push(BindingSlot {
            name: var.name.clone().unwrap_or_default(),
            binding: binding.binding,
            kind,
        });
    }
    slots.sort_by_key(|s| s.binding);
    slots
}

/// The filter program table, keyed by filter kind.
///
/// Built once at startup. A program that fails to compile is recorded as
/// unavailable; lookups for that kind return `None` and every other filter
/// keeps working.
#[derive(Debug, Default)]
pub struct ShaderRegistry {
    programs: HashMap<FilterKind, ShaderProgram>,
    failures: HashMap<FilterKind, CompileError>,
}

impl ShaderRegistry {
    /// An empty table with nothing registered.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Compiles and registers the built-in filter set.
    pub fn with_builtin() -> Self {
        let mut registry = Self::empty();
        for (kind, name, glsl) in sources::BUILTIN_SHADERS {
            registry.register(kind, name, glsl);
        }
        registry
    }

    /// Compiles one source and records the outcome for its kind.
    pub fn register(&mut self, kind: FilterKind, name: &str, glsl: &str) {
        match ShaderProgram::compile(kind, name, glsl) {
            Ok(program) => {
                info!(
                    "compiled filter shader {} ({} bindings)",
                    program.name,
                    program.slots.len()
                );
                self.failures.remove(&kind);
                self.programs.insert(kind, program);
            }
            Err(err) => {
                warn!("filter {} unavailable: {}", name, err);
                self.programs.remove(&kind);
                self.failures.insert(kind, err);
            }
        }
    }

    /// The compiled program for a kind, if it is available.
    pub fn get(&self, kind: FilterKind) -> Option<&ShaderProgram> {
        self.programs.get(&kind)
    }

    /// Whether a kind can be rendered. `FilterKind::None` needs no program
    /// and is always available.
    pub fn is_available(&self, kind: FilterKind) -> bool {
        kind == FilterKind::None || self.programs.contains_key(&kind)
    }

    /// The recorded compile failure for a kind, if any.
    pub fn compile_error(&self, kind: FilterKind) -> Option<&CompileError> {
        self.failures.get(&kind)
    }

    /// All available programs, in no particular order.
    pub fn programs(&self) -> impl Iterator<Item = &ShaderProgram> {
        self.programs.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_compiles_every_filter() {
        let registry = ShaderRegistry::with_builtin();
        for (kind, _, _) in sources::BUILTIN_SHADERS {
            assert!(registry.is_available(kind), "{:?} should compile", kind);
            let program = registry.get(kind).unwrap();
            assert_eq!(program.kind, kind);
            assert!(program.wgsl.contains("fn main"));
        }
        assert!(registry.is_available(FilterKind::None));
    }

    #[test]
    fn test_programs_declare_source_bindings() {
        let registry = ShaderRegistry::with_builtin();
        for program in registry.programs() {
            assert!(program
                .slots
                .iter()
                .any(|s| s.binding == SOURCE_TEXTURE_BINDING && s.kind == SlotKind::Texture));
            assert!(program
                .slots
                .iter()
                .any(|s| s.binding == SOURCE_SAMPLER_BINDING && s.kind == SlotKind::Sampler));
        }
    }

    #[test]
    fn test_only_contrast_takes_params() {
        let registry = ShaderRegistry::with_builtin();
        assert!(registry.get(FilterKind::Contrast).unwrap().uses_params());
        assert!(!registry.get(FilterKind::Sepia).unwrap().uses_params());
        assert!(!registry.get(FilterKind::Blur).unwrap().uses_params());
    }

    #[test]
    fn test_broken_source_disables_only_its_kind() {
        let mut registry = ShaderRegistry::with_builtin();
        registry.register(FilterKind::Blur, "blur", "void main() {");

        assert!(!registry.is_available(FilterKind::Blur));
        assert!(matches!(
            registry.compile_error(FilterKind::Blur),
            Some(CompileError::Parse { .. })
        ));
        assert!(registry.is_available(FilterKind::Sepia));
        assert!(registry.is_available(FilterKind::Contrast));
    }

    #[test]
    fn test_shader_without_source_texture_is_rejected() {
        let glsl = r#"
#version 450
layout(location = 0) out vec4 out_color;
void main() {
    out_color = vec4(1.0);
}
"#;
        let err = ShaderProgram::compile(FilterKind::Sepia, "flat", glsl).unwrap_err();
        assert!(matches!(
            err,
            CompileError::MissingBinding { binding: SOURCE_TEXTURE_BINDING, .. }
        ));
    }
}
