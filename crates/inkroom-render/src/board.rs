//! The whiteboard handle: a session paired with its rendering surface.

use crate::raster::RasterRenderer;
use crate::renderer::{RenderContext, RenderResult, Renderer};
use inkroom_core::document::StackState;
use inkroom_core::session::{BoardOps, Redraw, Session};
use inkroom_core::shapes::{Element, SerializableColor};
use inkroom_core::shortcuts::Modifiers;
use inkroom_core::storage::{BoardSnapshot, BoardStore, StorageResult};
use inkroom_core::tools::{TextFormat, ToolKind};
use inkroom_core::transport::Transport;
use kurbo::Point;

/// A session and the surface it draws on.
///
/// Pointer input is ignored while no surface is attached. Remote changes are
/// still applied to the document and shown once a surface is attached.
pub struct Whiteboard<T: Transport> {
    session: Session<T>,
    surface: Option<RasterRenderer>,
    /// Saved board image loaded before a surface existed.
    pending_image: Option<String>,
}

impl<T: Transport> Whiteboard<T> {
    pub fn new(session: Session<T>) -> Self {
        Self {
            session,
            surface: None,
            pending_image: None,
        }
    }

    pub fn session(&self) -> &Session<T> {
        &self.session
    }

    pub fn surface(&self) -> Option<&RasterRenderer> {
        self.surface.as_ref()
    }

    /// Create the rendering surface and draw the current board.
    pub fn attach_surface(&mut self, width: u32, height: u32) -> RenderResult<()> {
        if self.session.is_torn_down() {
            log::debug!("Ignoring surface attach after teardown");
            return Ok(());
        }
        self.surface = Some(RasterRenderer::new(width, height)?);
        self.present(Redraw::Full);
        if let Some(url) = self.pending_image.take() {
            self.paint_image(&url);
        }
        Ok(())
    }

    pub fn detach_surface(&mut self) -> Option<RasterRenderer> {
        self.surface.take()
    }

    /// Resize the surface, keeping its content. No-op without a surface.
    pub fn resize(&mut self, width: u32, height: u32) -> RenderResult<()> {
        let overlay = self.session.overlay();
        match &mut self.surface {
            Some(surface) => surface.resize(width, height, &RenderContext::new(self.session.elements(), &overlay)),
            None => Ok(()),
        }
    }

    /// Draw what changed.
    fn present(&mut self, redraw: Redraw) {
        let Some(surface) = &mut self.surface else {
            return;
        };
        match redraw {
            Redraw::None => {}
            Redraw::Segment { from, to, color, width } => surface.draw_segment(from, to, color, width),
            Redraw::Full => {
                let overlay = self.session.overlay();
                surface.render(&RenderContext::new(self.session.elements(), &overlay));
            }
        }
    }

    // --- Input ---

    pub fn pointer_down(&mut self, point: Point) {
        if self.surface.is_some() {
            let redraw = self.session.pointer_down(point);
            self.present(redraw);
        }
    }

    pub fn pointer_move(&mut self, point: Point) {
        if self.surface.is_some() {
            let redraw = self.session.pointer_move(point);
            self.present(redraw);
        }
    }

    pub fn pointer_up(&mut self, point: Point) {
        if self.surface.is_some() {
            let redraw = self.session.pointer_up(point);
            self.present(redraw);
        }
    }

    pub fn pointer_leave(&mut self, point: Point) {
        if self.surface.is_some() {
            let redraw = self.session.pointer_leave(point);
            self.present(redraw);
        }
    }

    /// Returns true if the key triggered a shortcut.
    pub fn key_down(&mut self, key: &str, modifiers: Modifiers) -> bool {
        match self.session.key_down(key, modifiers) {
            Some(redraw) => {
                self.present(redraw);
                true
            }
            None => false,
        }
    }

    pub fn set_tool(&mut self, tool: ToolKind) {
        let redraw = self.session.set_tool(tool);
        self.present(redraw);
    }

    pub fn set_color(&mut self, color: SerializableColor) {
        self.session.set_color(color);
    }

    pub fn set_width(&mut self, width: f64) {
        self.session.set_width(width);
    }

    pub fn set_text(&mut self, text: &str) {
        let redraw = self.session.set_text(text);
        self.present(redraw);
    }

    pub fn set_text_format(&mut self, format: TextFormat) {
        let redraw = self.session.set_text_format(format);
        self.present(redraw);
    }

    pub fn finish_text(&mut self) {
        let redraw = self.session.finish_text();
        self.present(redraw);
    }

    // --- Remote ---

    pub fn join(&mut self) {
        self.session.join();
    }

    /// Apply pending remote messages and redraw.
    pub fn poll_remote(&mut self) {
        let redraw = self.session.poll_remote();
        self.present(redraw);
    }

    /// The undo/redo state, if it changed since the last call.
    pub fn take_stack_change(&mut self) -> Option<StackState> {
        self.session.take_stack_change()
    }

    // --- Persistence ---

    /// Install a saved board. Its image is painted once over the first
    /// render and replaced by the next full redraw.
    pub fn load(&mut self, snapshot: BoardSnapshot) {
        let image_data = self.session.load(snapshot);
        self.present(Redraw::Full);
        match image_data {
            Some(url) if self.surface.is_some() => self.paint_image(&url),
            image_data => self.pending_image = image_data,
        }
    }

    fn paint_image(&mut self, url: &str) {
        if let Some(surface) = &mut self.surface {
            if let Err(e) = surface.paint_data_url(url) {
                log::warn!("Ignoring unreadable board image: {}", e);
            }
        }
    }

    /// The board in its persisted form, with the rendered image.
    pub fn snapshot(&self) -> BoardSnapshot {
        self.session.snapshot(self.image_data())
    }

    pub async fn save_to(&self, store: &dyn BoardStore) -> StorageResult<()> {
        let snapshot = self.snapshot();
        store.save(self.session.bridge().room_id(), &snapshot).await
    }

    pub async fn load_from(&mut self, store: &dyn BoardStore) -> StorageResult<()> {
        let room_id = self.session.bridge().room_id().to_string();
        let snapshot = store.load(&room_id).await?;
        self.load(snapshot);
        Ok(())
    }

    /// PNG of the board over a white background. `None` without a surface.
    pub fn download_png(&self) -> Option<RenderResult<Vec<u8>>> {
        self.surface
            .as_ref()
            .map(|surface| surface.export_png(SerializableColor::white()))
    }

    /// Detach from the room, disable shortcuts and drop the surface.
    pub fn teardown(&mut self) {
        self.session.teardown();
        self.surface = None;
        self.pending_image = None;
    }
}

impl<T: Transport> BoardOps for Whiteboard<T> {
    fn clear(&mut self) {
        let redraw = self.session.clear_board();
        self.pending_image = None;
        self.present(redraw);
    }

    fn elements(&self) -> &[Element] {
        self.session.elements()
    }

    fn undo(&mut self) -> bool {
        let done = self.session.undo();
        self.present(Redraw::Full);
        done
    }

    fn redo(&mut self) -> bool {
        let done = self.session.redo();
        self.present(Redraw::Full);
        done
    }

    fn image_data(&self) -> Option<String> {
        let surface = self.surface.as_ref()?;
        match surface.to_data_url() {
            Ok(url) => Some(url),
            Err(e) => {
                log::warn!("Failed to encode board image: {}", e);
                None
            }
        }
    }

    fn stack_state(&self) -> StackState {
        self.session.stack_state()
    }
}
