//! The renderable unit: a compiled program bound to its uniform values.

use bytemuck::{Pod, Zeroable};

use super::registry::{ShaderProgram, ShaderRegistry};
use crate::filter::{Filter, FilterKind};
use crate::render::RenderError;

/// Uniform values handed to a filter program.
///
/// Matches the `Params` block layout declared by the GLSL sources.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct FilterParams {
    /// Filter strength; read by contrast, ignored by the rest
    pub strength: f32,
    /// Source width in pixels
    pub width: f32,
    /// Source height in pixels
    pub height: f32,
    /// Pads the block to 16 bytes
    pub reserved: f32,
}

impl FilterParams {
    /// Params for an identity render of the given source size.
    pub fn identity(width: u32, height: u32) -> Self {
        Self {
            strength: 0.0,
            width: width as f32,
            height: height as f32,
            reserved: 0.0,
        }
    }
}

/// A filter made renderable: the compiled program plus the uniform values
/// this invocation requires.
#[derive(Debug, Clone, Copy)]
pub struct FilterNode<'a> {
    pub program: &'a ShaderProgram,
    pub params: FilterParams,
}

impl<'a> FilterNode<'a> {
    /// Binds a filter selection to its compiled program.
    ///
    /// `Filter::None` is the identity unit and binds to no program. A filter
    /// whose program failed to compile yields `RenderError::Unavailable`, and
    /// the caller decides how to degrade.
    pub fn bind(
        filter: Filter,
        registry: &'a ShaderRegistry,
        source_width: u32,
        source_height: u32,
    ) -> Result<Option<FilterNode<'a>>, RenderError> {
        let kind = filter.kind();
        if kind == FilterKind::None {
            return Ok(None);
        }
        let program = registry
            .get(kind)
            .ok_or(RenderError::Unavailable(kind))?;
        let strength = match filter {
            Filter::Contrast { strength } => strength,
            _ => 0.0,
        };
        Ok(Some(FilterNode {
            program,
            params: FilterParams {
                strength,
                width: source_width as f32,
                height: source_height as f32,
                reserved: 0.0,
            },
        }))
    }
}
