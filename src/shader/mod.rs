//! Shader compilation and the filter program table.

mod node;
mod registry;
pub mod sources;

pub use node::{FilterNode, FilterParams};
pub use registry::{BindingSlot, ShaderProgram, ShaderRegistry, SlotKind};

use thiserror::Error;

/// Failure while compiling one fragment program.
///
/// Compilation happens once at startup; a failed program disables its own
/// filter and nothing else.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("GLSL parse error in {name}: {message}")]
    Parse { name: String, message: String },
    #[error("validation error in {name}: {message}")]
    Validation { name: String, message: String },
    #[error("WGSL generation error in {name}: {message}")]
    Emit { name: String, message: String },
    #[error("shader {name} does not declare required binding {binding}")]
    MissingBinding { name: String, binding: u32 },
}
