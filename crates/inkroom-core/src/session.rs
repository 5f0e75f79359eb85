//! The engine facade for one board.
//!
//! A [`Session`] owns the document, the tool manager and the sync bridge. UI
//! events go in; each handler applies the resulting tool actions (commits,
//! broadcasts) and reports how much of the surface must be redrawn.

use crate::collaboration::{RemoteChange, SyncBridge};
use crate::config::EngineConfig;
use crate::document::{DocumentStore, StackState};
use crate::overlay::Overlay;
use crate::shapes::{Element, ElementId, SerializableColor};
use crate::shortcuts::{Modifiers, ShortcutAction, ShortcutRegistry};
use crate::storage::BoardSnapshot;
use crate::sync::RoomUser;
use crate::tools::{TextFormat, ToolAction, ToolKind, ToolManager};
use crate::transport::Transport;
use kurbo::Point;

/// Imperative handle exposed to the surrounding UI.
pub trait BoardOps {
    /// Clear the board locally and tell peers.
    fn clear(&mut self);

    /// Committed elements in z-order.
    fn elements(&self) -> &[Element];

    /// Returns true if undo was performed.
    fn undo(&mut self) -> bool;

    /// Returns true if redo was performed.
    fn redo(&mut self) -> bool;

    /// The rendered board as a PNG data URL.
    fn image_data(&self) -> Option<String>;

    fn stack_state(&self) -> StackState;
}

/// How much of the surface changed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Redraw {
    None,
    /// Only a stroke segment was added; it can be drawn on top.
    Segment {
        from: Point,
        to: Point,
        color: SerializableColor,
        width: f64,
    },
    /// Re-render elements and overlay.
    Full,
}

impl Redraw {
    /// Combine two requests. Anything beyond one segment needs a full redraw.
    pub fn merge(self, other: Redraw) -> Redraw {
        match (self, other) {
            (Redraw::None, other) | (other, Redraw::None) => other,
            _ => Redraw::Full,
        }
    }
}

/// Drawing state and collaboration for one room.
pub struct Session<T: Transport> {
    config: EngineConfig,
    document: DocumentStore,
    tools: ToolManager,
    bridge: SyncBridge<T>,
    /// Last state handed out by [`Session::take_stack_change`].
    reported_stack: StackState,
    /// Remote notices for the UI (presence, clears, relay errors).
    notices: Vec<RemoteChange>,
    shortcuts_enabled: bool,
    torn_down: bool,
}

impl<T: Transport> Session<T> {
    pub fn new(config: EngineConfig, transport: T, room_id: impl Into<String>, user: RoomUser) -> Self {
        Self {
            document: DocumentStore::with_history_limit(config.history_limit),
            tools: ToolManager::new(&config),
            bridge: SyncBridge::new(transport, room_id, user),
            config,
            reported_stack: StackState::default(),
            notices: Vec::new(),
            shortcuts_enabled: true,
            torn_down: false,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn document(&self) -> &DocumentStore {
        &self.document
    }

    pub fn elements(&self) -> &[Element] {
        self.document.elements()
    }

    pub fn tools(&self) -> &ToolManager {
        &self.tools
    }

    pub fn bridge(&self) -> &SyncBridge<T> {
        &self.bridge
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Announce this client to the room.
    pub fn join(&mut self) {
        if !self.torn_down {
            self.bridge.join();
        }
    }

    // --- Tool settings ---

    pub fn set_tool(&mut self, tool: ToolKind) -> Redraw {
        let actions = self.tools.set_tool(tool);
        self.apply(actions)
    }

    pub fn set_color(&mut self, color: SerializableColor) {
        self.tools.color = color;
    }

    pub fn set_width(&mut self, width: f64) {
        if width.is_finite() && width > 0.0 {
            self.tools.width = width;
        } else {
            log::warn!("Ignoring invalid stroke width {}", width);
        }
    }

    // --- Pointer input ---

    pub fn pointer_down(&mut self, point: Point) -> Redraw {
        if self.torn_down {
            return Redraw::None;
        }
        let actions = self.tools.pointer_down(point, self.document.elements());
        self.apply(actions)
    }

    pub fn pointer_move(&mut self, point: Point) -> Redraw {
        if self.torn_down {
            return Redraw::None;
        }
        let actions = self.tools.pointer_move(point);
        self.apply(actions)
    }

    pub fn pointer_up(&mut self, point: Point) -> Redraw {
        if self.torn_down {
            return Redraw::None;
        }
        let actions = self.tools.pointer_up(point, self.document.elements());
        self.apply(actions)
    }

    pub fn pointer_leave(&mut self, point: Point) -> Redraw {
        if self.torn_down {
            return Redraw::None;
        }
        let actions = self.tools.pointer_leave(point, self.document.elements());
        self.apply(actions)
    }

    // --- Keyboard ---

    /// Handle a key press. Returns `None` when no shortcut matched.
    pub fn key_down(&mut self, key: &str, modifiers: Modifiers) -> Option<Redraw> {
        if self.torn_down || !self.shortcuts_enabled {
            return None;
        }
        let action = ShortcutRegistry::lookup(key, modifiers)?;
        log::debug!("Shortcut {:?}", action);
        Some(match action {
            ShortcutAction::Undo => self.undo_redraw(),
            ShortcutAction::Redo => self.redo_redraw(),
            ShortcutAction::Dismiss => {
                let actions = self.tools.cancel_text();
                self.apply(actions)
            }
        })
    }

    pub fn set_shortcuts_enabled(&mut self, enabled: bool) {
        self.shortcuts_enabled = enabled && !self.torn_down;
    }

    // --- Text editing ---

    /// Open an edit session for a committed text element.
    pub fn edit_text(&mut self, id: &ElementId) -> Redraw {
        if self.torn_down {
            return Redraw::None;
        }
        match self.document.get(id) {
            Some(Element::Text(text)) => {
                let actions = self.tools.edit_text(text.clone());
                self.apply(actions)
            }
            _ => {
                log::debug!("No text element {} to edit", id);
                Redraw::None
            }
        }
    }

    pub fn set_text(&mut self, text: &str) -> Redraw {
        let actions = self.tools.set_text(text);
        self.apply(actions)
    }

    pub fn set_text_format(&mut self, format: TextFormat) -> Redraw {
        let actions = self.tools.set_text_format(format);
        self.apply(actions)
    }

    /// Close text editing and commit ("Done").
    pub fn finish_text(&mut self) -> Redraw {
        let actions = self.tools.finish_text();
        self.apply(actions)
    }

    // --- History ---

    fn undo_redraw(&mut self) -> Redraw {
        if self.undo() { Redraw::Full } else { Redraw::None }
    }

    fn redo_redraw(&mut self) -> Redraw {
        if self.redo() { Redraw::Full } else { Redraw::None }
    }

    /// Close open gestures so history steps see settled state.
    fn settle(&mut self) {
        let mut actions = self.tools.finish_text();
        actions.extend(self.tools.cancel());
        self.apply(actions);
    }

    /// Undo the last local change and resync peers.
    pub fn undo(&mut self) -> bool {
        if self.torn_down {
            return false;
        }
        self.settle();
        if !self.document.undo() {
            return false;
        }
        self.bridge.elements_synced(self.document.elements());
        self.tools.forget_missing_text(self.document.elements());
        true
    }

    /// Redo the last undone change and resync peers.
    pub fn redo(&mut self) -> bool {
        if self.torn_down {
            return false;
        }
        self.settle();
        if !self.document.redo() {
            return false;
        }
        self.bridge.elements_synced(self.document.elements());
        true
    }

    pub fn stack_state(&self) -> StackState {
        self.document.stack_state()
    }

    /// The undo/redo state, if it changed since the last call.
    pub fn take_stack_change(&mut self) -> Option<StackState> {
        let current = self.document.stack_state();
        if current == self.reported_stack {
            return None;
        }
        self.reported_stack = current;
        Some(current)
    }

    /// Clear the board locally and notify peers.
    pub fn clear_board(&mut self) -> Redraw {
        if self.torn_down {
            return Redraw::None;
        }
        let actions = self.tools.cancel();
        self.apply(actions);
        self.tools.discard_text();
        self.document.clear();
        self.bridge.board_cleared();
        Redraw::Full
    }

    // --- Remote ---

    /// Apply everything received from peers since the last poll.
    pub fn poll_remote(&mut self) -> Redraw {
        if self.torn_down {
            return Redraw::None;
        }
        let changes = self.bridge.poll(&mut self.document);
        if changes.is_empty() {
            return Redraw::None;
        }
        self.tools.forget_missing_text(self.document.elements());

        let mut redraw = Redraw::None;
        for change in changes {
            redraw = redraw.merge(match &change {
                RemoteChange::StrokeSegment { from, to, color, width } => Redraw::Segment {
                    from: *from,
                    to: *to,
                    color: *color,
                    width: *width,
                },
                change if change.needs_redraw() => Redraw::Full,
                _ => Redraw::None,
            });
            if matches!(
                change,
                RemoteChange::Cleared { .. }
                    | RemoteChange::Users(_)
                    | RemoteChange::UserJoined(_)
                    | RemoteChange::UserLeft(_)
                    | RemoteChange::Error(_)
            ) {
                self.notices.push(change);
            }
        }
        redraw
    }

    /// Presence, clear and error notices received since the last call.
    pub fn take_notices(&mut self) -> Vec<RemoteChange> {
        std::mem::take(&mut self.notices)
    }

    // --- Persistence ---

    /// Install a saved board. History is cleared; returns the raster base
    /// layer for the renderer.
    pub fn load(&mut self, snapshot: BoardSnapshot) -> Option<String> {
        if self.torn_down {
            return None;
        }
        let actions = self.tools.cancel();
        self.apply(actions);
        self.tools.discard_text();
        log::info!("Loaded board {} with {} elements", self.bridge.room_id(), snapshot.elements.len());
        self.document.apply_remote(snapshot.elements);
        snapshot.image_data
    }

    /// The board in its persisted form.
    pub fn snapshot(&self, image_data: Option<String>) -> BoardSnapshot {
        BoardSnapshot {
            image_data,
            elements: self.document.elements().to_vec(),
        }
    }

    // --- Rendering ---

    /// Transient visuals above the committed elements.
    pub fn overlay(&self) -> Overlay {
        let mut overlay = self.tools.overlay();
        overlay.remote_strokes.extend(self.bridge.remote_stroke().cloned());
        overlay
    }

    /// Detach from the room and stop reacting to input. Idempotent.
    ///
    /// An open gesture is settled first so peers are not left with live
    /// previews: drags snap back, strokes end and text edits close as with
    /// Escape.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        log::info!("Tearing down session for room {}", self.bridge.room_id());
        let mut actions = self.tools.cancel();
        actions.extend(self.tools.cancel_text());
        self.apply(actions);
        self.bridge.detach();
        self.shortcuts_enabled = false;
        self.torn_down = true;
    }

    /// Execute tool actions against the document and the bridge.
    fn apply(&mut self, actions: Vec<ToolAction>) -> Redraw {
        actions
            .into_iter()
            .fold(Redraw::None, |redraw, action| redraw.merge(self.apply_one(action)))
    }

    fn apply_one(&mut self, action: ToolAction) -> Redraw {
        match action {
            ToolAction::Redraw => Redraw::Full,
            ToolAction::StrokeBegan { point, color, width } => {
                self.bridge.stroke_began(point, color, width);
                Redraw::None
            }
            ToolAction::StrokeExtended { from, to } => {
                self.bridge.stroke_extended(to);
                Redraw::Segment {
                    from,
                    to,
                    color: self.tools.color,
                    width: self.tools.width,
                }
            }
            ToolAction::StrokeEnded => {
                self.bridge.stroke_ended();
                Redraw::None
            }
            ToolAction::Add(element) => {
                match self.document.add(element.clone()) {
                    Ok(_) => self.bridge.element_added(&element),
                    Err(e) => log::warn!("Rejected {}: {}", element.kind(), e),
                }
                Redraw::Full
            }
            ToolAction::Replace { element, raise } => {
                match self.document.replace(element.clone(), raise) {
                    Ok(Some(_)) => self.bridge.element_updated(&element),
                    Ok(None) => log::debug!("Element {} is gone, dropping edit", element.id()),
                    Err(e) => log::warn!("Rejected update of {}: {}", element.id(), e),
                }
                Redraw::Full
            }
            ToolAction::Preview(element) => {
                self.bridge.element_updated(&element);
                Redraw::Full
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry;
    use crate::shapes::Rectangle;
    use crate::transport::{MemoryHub, MemoryTransport};
    use kurbo::Vec2;

    fn pair() -> (Session<MemoryTransport>, Session<MemoryTransport>) {
        let hub = MemoryHub::new();
        let mut a = Session::new(EngineConfig::default(), hub.connect(), "room", RoomUser::new("a", "Ada"));
        let mut b = Session::new(EngineConfig::default(), hub.connect(), "room", RoomUser::new("b", "Bo"));
        a.join();
        b.join();
        (a, b)
    }

    fn drag(session: &mut Session<MemoryTransport>, from: Point, to: Point) -> Redraw {
        session.pointer_down(from);
        let mid = from.midpoint(to);
        session.pointer_move(mid);
        session.pointer_move(to);
        session.pointer_up(to)
    }

    #[test]
    fn test_rectangle_then_drag_converges() {
        let (mut a, mut b) = pair();

        a.set_tool(ToolKind::Rectangle);
        assert_eq!(drag(&mut a, Point::new(10.0, 10.0), Point::new(110.0, 60.0)), Redraw::Full);
        assert_eq!(b.poll_remote(), Redraw::Full);
        assert_eq!(a.elements(), b.elements());
        let r1 = a.elements()[0].clone();

        a.set_tool(ToolKind::Drag);
        drag(&mut a, Point::new(50.0, 30.0), Point::new(70.0, 35.0));
        assert_eq!(a.elements()[0], geometry::translate(&r1, Vec2::new(20.0, 5.0)));
        // Rectangle commit plus one drag commit
        assert!(a.undo());
        assert!(a.undo());
        assert!(!a.undo());
        assert!(a.redo());
        assert!(a.redo());

        b.poll_remote();
        assert_eq!(a.elements(), b.elements());
        // Remote edits never enter history
        assert!(!b.stack_state().can_undo);
    }

    #[test]
    fn test_pen_stroke_broadcast() {
        let (mut a, mut b) = pair();
        a.pointer_down(Point::new(0.0, 0.0));
        b.poll_remote();
        assert_eq!(b.overlay().remote_strokes.len(), 1);

        let redraw = a.pointer_move(Point::new(10.0, 0.0));
        assert!(matches!(redraw, Redraw::Segment { .. }));
        assert!(matches!(b.poll_remote(), Redraw::Segment { .. }));

        a.pointer_up(Point::new(10.0, 0.0));
        b.poll_remote();
        assert!(b.overlay().remote_strokes.is_empty());
        assert_eq!(b.elements(), a.elements());
        assert_eq!(b.elements()[0].kind(), "path");
    }

    #[test]
    fn test_undo_new_stroke_redo_is_noop() {
        let (mut a, _b) = pair();
        drag(&mut a, Point::new(0.0, 0.0), Point::new(20.0, 20.0));
        assert!(a.undo());
        drag(&mut a, Point::new(5.0, 5.0), Point::new(25.0, 25.0));
        let before = a.elements().to_vec();
        assert!(!a.redo());
        assert_eq!(a.elements(), before.as_slice());
    }

    #[test]
    fn test_undo_resyncs_peers() {
        let (mut a, mut b) = pair();
        a.set_tool(ToolKind::Circle);
        drag(&mut a, Point::new(0.0, 0.0), Point::new(20.0, 20.0));
        drag(&mut a, Point::new(50.0, 50.0), Point::new(70.0, 70.0));
        b.poll_remote();
        assert_eq!(b.elements().len(), 2);

        assert_eq!(a.key_down("z", Modifiers::CTRL), Some(Redraw::Full));
        b.poll_remote();
        assert_eq!(b.elements(), a.elements());
        assert_eq!(b.elements().len(), 1);
    }

    #[test]
    fn test_text_edit_is_one_commit() {
        let (mut a, mut b) = pair();
        a.set_tool(ToolKind::Text);
        drag(&mut a, Point::new(0.0, 0.0), Point::new(120.0, 40.0));
        let id = a.elements()[0].id().clone();

        for typed in ["h", "he", "hel", "hello"] {
            a.set_text(typed);
        }
        // Peers see live text before the commit
        b.poll_remote();
        assert!(matches!(b.document().get(&id), Some(Element::Text(t)) if t.text == "hello"));

        a.finish_text();
        assert!(matches!(a.document().get(&id), Some(Element::Text(t)) if t.text == "hello"));
        assert!(a.undo());
        assert!(matches!(a.document().get(&id), Some(Element::Text(t)) if t.text.is_empty()));
    }

    #[test]
    fn test_escape_keeps_existing_text() {
        let (mut a, _b) = pair();
        a.set_tool(ToolKind::Text);
        drag(&mut a, Point::new(0.0, 0.0), Point::new(120.0, 40.0));
        a.set_text("kept");
        a.key_down("Escape", Modifiers::NONE);
        assert!(!a.tools().is_editing_text());
        assert!(matches!(&a.elements()[0], Element::Text(t) if t.text == "kept"));
    }

    #[test]
    fn test_stack_change_polling() {
        let (mut a, _b) = pair();
        assert_eq!(a.take_stack_change(), None);
        a.set_tool(ToolKind::Line);
        drag(&mut a, Point::new(0.0, 0.0), Point::new(10.0, 10.0));
        assert_eq!(
            a.take_stack_change(),
            Some(StackState {
                can_undo: true,
                can_redo: false
            })
        );
        assert_eq!(a.take_stack_change(), None);
    }

    #[test]
    fn test_clear_board_propagates() {
        let (mut a, mut b) = pair();
        drag(&mut a, Point::new(0.0, 0.0), Point::new(20.0, 20.0));
        b.poll_remote();

        assert_eq!(a.clear_board(), Redraw::Full);
        assert!(a.elements().is_empty());
        assert!(!a.stack_state().can_undo);

        assert_eq!(b.poll_remote(), Redraw::Full);
        assert!(b.elements().is_empty());
        assert_eq!(
            b.take_notices(),
            vec![RemoteChange::Cleared {
                username: Some("Ada".to_string())
            }]
        );
    }

    #[test]
    fn test_load_snapshot() {
        let (mut a, _b) = pair();
        let rect: Element = Rectangle::new(Point::ZERO, 10.0, 10.0, SerializableColor::black(), 2.0).into();
        let image = a.load(BoardSnapshot::new(vec![rect.clone()]).with_image_data("data:image/png;base64,AA=="));
        assert_eq!(image.as_deref(), Some("data:image/png;base64,AA=="));
        assert_eq!(a.elements(), &[rect.clone()]);
        assert!(!a.stack_state().can_undo);
        assert_eq!(a.snapshot(None).elements, vec![rect]);
    }

    #[test]
    fn test_teardown_ignores_everything() {
        let (mut a, mut b) = pair();
        b.teardown();
        b.teardown();

        drag(&mut a, Point::new(0.0, 0.0), Point::new(20.0, 20.0));
        assert_eq!(b.poll_remote(), Redraw::None);
        assert!(b.elements().is_empty());
        assert_eq!(b.pointer_down(Point::ZERO), Redraw::None);
        assert_eq!(b.key_down("z", Modifiers::CTRL), None);
        assert!(!b.undo());
    }

    #[test]
    fn test_teardown_mid_drag_restores_peers() {
        let (mut a, mut b) = pair();
        a.set_tool(ToolKind::Rectangle);
        drag(&mut a, Point::new(10.0, 10.0), Point::new(30.0, 30.0));

        a.set_tool(ToolKind::Drag);
        a.pointer_down(Point::new(20.0, 20.0));
        a.pointer_move(Point::new(120.0, 120.0));
        b.poll_remote();
        assert_ne!(a.elements(), b.elements());

        a.teardown();
        b.poll_remote();
        assert_eq!(a.elements(), b.elements());
        assert!(!a.stack_state().can_redo);
    }

    #[test]
    fn test_teardown_mid_stroke_ends_remote_preview() {
        let (mut a, mut b) = pair();
        a.pointer_down(Point::new(0.0, 0.0));
        a.pointer_move(Point::new(10.0, 0.0));
        b.poll_remote();
        assert_eq!(b.overlay().remote_strokes.len(), 1);

        a.teardown();
        b.poll_remote();
        assert!(b.overlay().remote_strokes.is_empty());
        assert!(a.elements().is_empty());
    }

    #[test]
    fn test_teardown_mid_text_edit_keeps_peers_in_step() {
        let (mut a, mut b) = pair();
        a.set_tool(ToolKind::Text);
        drag(&mut a, Point::new(0.0, 0.0), Point::new(120.0, 40.0));
        a.set_text("draft");
        b.poll_remote();

        a.teardown();
        b.poll_remote();
        assert!(matches!(&a.elements()[0], Element::Text(t) if t.text == "draft"));
        assert_eq!(a.elements(), b.elements());
    }

    #[test]
    fn test_redraw_merge() {
        let segment = Redraw::Segment {
            from: Point::ZERO,
            to: Point::new(1.0, 1.0),
            color: SerializableColor::black(),
            width: 1.0,
        };
        assert_eq!(Redraw::None.merge(segment), segment);
        assert_eq!(segment.merge(Redraw::None), segment);
        assert_eq!(segment.merge(segment), Redraw::Full);
    }
}
