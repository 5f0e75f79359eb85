//! Bridge between local document changes and the relay protocol.
//!
//! Outbound: the session reports each local change and the bridge queues the
//! matching [`SyncMessage`] on its transport. Inbound: frames are decoded and
//! routed to the document's `apply_remote*` operations. Nothing is
//! acknowledged or retried.

use crate::document::DocumentStore;
use crate::overlay::StrokePreview;
use crate::shapes::{Element, SerializableColor};
use crate::sync::{RoomUser, SyncMessage};
use crate::transport::Transport;
use kurbo::Point;

/// What an inbound message changed.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteChange {
    /// Nothing visible changed.
    None,
    /// The element sequence changed.
    Document,
    /// A peer's stroke grew by one segment.
    StrokeSegment {
        from: Point,
        to: Point,
        color: SerializableColor,
        width: f64,
    },
    /// A peer's stroke preview started or ended.
    StrokePreview,
    /// A peer cleared the board.
    Cleared { username: Option<String> },
    Users(Vec<RoomUser>),
    UserJoined(RoomUser),
    UserLeft(RoomUser),
    /// The relay reported an error.
    Error(String),
}

impl RemoteChange {
    /// Whether the surface needs a full redraw.
    pub fn needs_redraw(&self) -> bool {
        matches!(
            self,
            RemoteChange::Document | RemoteChange::StrokePreview | RemoteChange::Cleared { .. }
        )
    }
}

/// Synchronizes one room over a transport.
pub struct SyncBridge<T: Transport> {
    transport: T,
    room_id: String,
    user: RoomUser,
    /// Cleared on teardown; inbound and outbound traffic stops.
    attached: bool,
    /// In-progress stroke announced by a peer.
    remote_stroke: Option<StrokePreview>,
}

impl<T: Transport> SyncBridge<T> {
    /// Create a bridge for `room_id`. Nothing is sent until [`join`](Self::join).
    pub fn new(transport: T, room_id: impl Into<String>, user: RoomUser) -> Self {
        Self {
            transport,
            room_id: room_id.into(),
            user,
            attached: true,
            remote_stroke: None,
        }
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn user(&self) -> &RoomUser {
        &self.user
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// The stroke a peer is currently drawing.
    pub fn remote_stroke(&self) -> Option<&StrokePreview> {
        self.remote_stroke.as_ref()
    }

    fn send(&mut self, msg: SyncMessage) {
        if !self.attached {
            log::debug!("Bridge detached, dropping {}", msg.event_name());
            return;
        }
        match msg.to_json() {
            Ok(json) => {
                if let Err(e) = self.transport.send_text(json) {
                    log::warn!("Failed to send {}: {}", msg.event_name(), e);
                }
            }
            Err(e) => log::warn!("Failed to encode {}: {}", msg.event_name(), e),
        }
    }

    // --- Outbound ---

    pub fn join(&mut self) {
        let room_id = self.room_id.clone();
        self.send(SyncMessage::JoinRoom { room_id });
    }

    pub fn leave(&mut self) {
        let room_id = self.room_id.clone();
        self.send(SyncMessage::LeaveRoom { room_id });
    }

    /// A local commit appended `element`.
    pub fn element_added(&mut self, element: &Element) {
        let room_id = self.room_id.clone();
        self.send(SyncMessage::AddElement {
            room_id,
            element: element.clone(),
        });
    }

    /// `element` changed locally, either live during a gesture or committed.
    pub fn element_updated(&mut self, element: &Element) {
        let room_id = self.room_id.clone();
        self.send(SyncMessage::UpdateElement {
            room_id,
            element: element.clone(),
        });
    }

    /// Broadcast the whole sequence after undo or redo.
    pub fn elements_synced(&mut self, elements: &[Element]) {
        let room_id = self.room_id.clone();
        self.send(SyncMessage::SyncElements {
            room_id,
            elements: elements.to_vec(),
        });
    }

    pub fn stroke_began(&mut self, point: Point, color: SerializableColor, width: f64) {
        let room_id = self.room_id.clone();
        self.send(SyncMessage::DrawStart {
            room_id,
            x: point.x,
            y: point.y,
            color,
            width,
        });
    }

    pub fn stroke_extended(&mut self, to: Point) {
        let room_id = self.room_id.clone();
        self.send(SyncMessage::DrawMove {
            room_id,
            x: to.x,
            y: to.y,
        });
    }

    pub fn stroke_ended(&mut self) {
        let room_id = self.room_id.clone();
        self.send(SyncMessage::DrawEnd { room_id });
    }

    pub fn board_cleared(&mut self) {
        let room_id = self.room_id.clone();
        let msg = SyncMessage::ClearBoard {
            room_id,
            user_id: Some(self.user.user_id.clone()),
            username: Some(self.user.username.clone()),
        };
        self.send(msg);
    }

    // --- Inbound ---

    /// Drain the transport and apply every frame to `doc`.
    pub fn poll(&mut self, doc: &mut DocumentStore) -> Vec<RemoteChange> {
        if !self.attached {
            return Vec::new();
        }
        let frames = self.transport.poll_incoming();
        frames
            .iter()
            .map(|text| self.handle_text(text, doc))
            .filter(|change| *change != RemoteChange::None)
            .collect()
    }

    /// Decode and apply one frame. Malformed frames are logged and ignored.
    pub fn handle_text(&mut self, text: &str, doc: &mut DocumentStore) -> RemoteChange {
        match SyncMessage::from_json(text) {
            Ok(msg) => self.handle_message(msg, doc),
            Err(e) => {
                log::warn!("Ignoring malformed sync message: {}", e);
                RemoteChange::None
            }
        }
    }

    /// Apply one decoded message.
    pub fn handle_message(&mut self, msg: SyncMessage, doc: &mut DocumentStore) -> RemoteChange {
        if !self.attached {
            log::debug!("Bridge detached, ignoring {}", msg.event_name());
            return RemoteChange::None;
        }
        if let Some(room_id) = msg.room_id().filter(|room| *room != self.room_id) {
            log::debug!("Ignoring {} for room {}", msg.event_name(), room_id);
            return RemoteChange::None;
        }

        match msg {
            SyncMessage::DrawStart { x, y, color, width, .. } => {
                self.remote_stroke = Some(StrokePreview::new(Point::new(x, y), color, width));
                RemoteChange::StrokePreview
            }
            SyncMessage::DrawMove { x, y, .. } => {
                let to = Point::new(x, y);
                match self.remote_stroke.as_mut() {
                    Some(stroke) => {
                        let from = stroke.points.last().copied().unwrap_or(to);
                        stroke.points.push(to);
                        RemoteChange::StrokeSegment {
                            from,
                            to,
                            color: stroke.color,
                            width: stroke.width,
                        }
                    }
                    None => {
                        log::debug!("Ignoring draw-move without draw-start");
                        RemoteChange::None
                    }
                }
            }
            SyncMessage::DrawEnd { .. } => {
                if self.remote_stroke.take().is_some() {
                    RemoteChange::StrokePreview
                } else {
                    RemoteChange::None
                }
            }
            SyncMessage::AddElement { element, .. } => {
                if doc.apply_remote_element_add(element) {
                    RemoteChange::Document
                } else {
                    RemoteChange::None
                }
            }
            SyncMessage::UpdateElement { element, .. } => {
                if doc.apply_remote_element_update(element) {
                    RemoteChange::Document
                } else {
                    RemoteChange::None
                }
            }
            SyncMessage::SyncElements { elements, .. } => {
                doc.apply_remote(elements);
                RemoteChange::Document
            }
            SyncMessage::ClearBoard { user_id, username, .. } => {
                if user_id.as_deref() == Some(self.user.user_id.as_str()) {
                    return RemoteChange::None;
                }
                log::info!("Board cleared by {}", username.as_deref().unwrap_or("another user"));
                doc.clear();
                self.remote_stroke = None;
                RemoteChange::Cleared { username }
            }
            SyncMessage::RoomUsers { users, .. } => RemoteChange::Users(users),
            SyncMessage::UserConnected { user_id, username } => {
                RemoteChange::UserJoined(RoomUser { user_id, username })
            }
            SyncMessage::UserDisconnected { user_id, username } => {
                RemoteChange::UserLeft(RoomUser { user_id, username })
            }
            SyncMessage::Error { message } => {
                log::warn!("Relay error: {}", message);
                RemoteChange::Error(message)
            }
            SyncMessage::JoinRoom { .. } | SyncMessage::LeaveRoom { .. } => RemoteChange::None,
        }
    }

    /// Leave the room and stop all traffic. Later calls are no-ops.
    pub fn detach(&mut self) {
        if !self.attached {
            return;
        }
        self.leave();
        self.attached = false;
        self.remote_stroke = None;
        self.transport.close();
    }
}
