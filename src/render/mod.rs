//! Render surfaces: where a filter node meets a source image.

mod gpu;
mod software;

pub use gpu::GpuSurface;
pub use software::SoftwareSurface;

use thiserror::Error;

use crate::filter::FilterKind;
use crate::frame::{ImageFrame, SourceImage};
use crate::shader::FilterNode;

/// Failure while binding or rendering a filter.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The selected filter's program failed to compile at startup. The
    /// caller renders the identity pass-through instead.
    #[error("filter '{}' is unavailable, its shader failed to compile", .0.id())]
    Unavailable(FilterKind),
    /// Flatten was requested before anything was rendered.
    #[error("no frame has been rendered yet")]
    NoFrame,
    #[error("GPU error: {0}")]
    Gpu(String),
    #[error("readback failed: {0}")]
    Readback(String),
}

/// A canvas that renders one filter node (or the identity) against a source
/// image and can flatten the result into static pixels.
///
/// A surface owns its render target exclusively. Repeated renders replace
/// the target; `flatten` always reflects the most recent one.
pub trait RenderSurface {
    /// Renders the source through the node's program into the owned target.
    /// A `None` node renders the identity pass-through.
    fn render(&mut self, node: Option<&FilterNode>, source: &SourceImage)
        -> Result<(), RenderError>;

    /// Waits for the most recent render to complete and returns the target
    /// as tightly packed RGBA pixels.
    fn flatten(&mut self) -> Result<ImageFrame, RenderError>;
}
