//! Renderer trait abstraction.

use inkroom_core::overlay::Overlay;
use inkroom_core::shapes::{Element, SerializableColor};
use kurbo::Point;
use thiserror::Error;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("Invalid surface size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },
    #[error("Image encoding failed: {0}")]
    Encode(String),
    #[error("Image decoding failed: {0}")]
    Decode(String),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RendererError>;

/// Context for a single render frame.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    /// Committed elements in z-order.
    pub elements: &'a [Element],
    /// Transient visuals drawn after the elements.
    pub overlay: &'a Overlay,
}

impl<'a> RenderContext<'a> {
    pub fn new(elements: &'a [Element], overlay: &'a Overlay) -> Self {
        Self { elements, overlay }
    }
}

/// Trait for rendering backends.
pub trait Renderer {
    /// Redraw the whole surface.
    fn render(&mut self, ctx: &RenderContext);

    /// Draw one stroke segment on top of what is already there.
    fn draw_segment(&mut self, from: Point, to: Point, color: SerializableColor, width: f64);

    /// Change the surface size and redraw the board onto it.
    fn resize(&mut self, width: u32, height: u32, ctx: &RenderContext) -> RenderResult<()>;

    /// Surface size in pixels.
    fn size(&self) -> (u32, u32);
}
