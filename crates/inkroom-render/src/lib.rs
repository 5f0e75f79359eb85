//! Inkroom Render Library
//!
//! Renderer abstraction and the tiny-skia raster implementation for Inkroom,
//! plus [`Whiteboard`], the handle that ties a session to its surface.

mod board;
mod fonts;
mod raster;
mod renderer;
mod text;

pub use board::Whiteboard;
pub use fonts::TextFace;
pub use raster::{PNG_DATA_URL_PREFIX, RasterRenderer, decode_data_url};
pub use renderer::{RenderContext, RenderResult, Renderer, RendererError};
pub use text::{TextLayout, TextLine, wrap_words};
