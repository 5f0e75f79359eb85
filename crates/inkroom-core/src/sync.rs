//! Wire protocol shared by clients and the relay server.
//!
//! Every frame is a JSON text message of the form
//! `{"event": "<name>", "data": {...}}`.

use crate::shapes::{Element, SerializableColor};
use serde::{Deserialize, Serialize};

/// A user present in a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomUser {
    pub user_id: String,
    pub username: String,
}

impl RoomUser {
    pub fn new(user_id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            username: username.into(),
        }
    }
}

/// Messages exchanged with the relay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum SyncMessage {
    /// Join a room
    JoinRoom { room_id: String },
    /// Leave the current room
    LeaveRoom { room_id: String },
    /// A peer started a pen stroke
    DrawStart {
        room_id: String,
        x: f64,
        y: f64,
        color: SerializableColor,
        width: f64,
    },
    /// A peer extended its pen stroke
    DrawMove { room_id: String, x: f64, y: f64 },
    /// A peer finished its pen stroke
    DrawEnd { room_id: String },
    AddElement { room_id: String, element: Element },
    UpdateElement { room_id: String, element: Element },
    /// Full element sequence, sent after undo/redo
    SyncElements { room_id: String, elements: Vec<Element> },
    /// Board cleared. The relay stamps the identity of the sender.
    ClearBoard {
        room_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        username: Option<String>,
    },
    /// Presence list, sent to a client when it joins
    RoomUsers { room_id: String, users: Vec<RoomUser> },
    UserConnected { user_id: String, username: String },
    UserDisconnected { user_id: String, username: String },
    /// Relay-side error notice
    Error { message: String },
}

impl SyncMessage {
    /// The room a message is scoped to, if any.
    pub fn room_id(&self) -> Option<&str> {
        match self {
            SyncMessage::JoinRoom { room_id }
            | SyncMessage::LeaveRoom { room_id }
            | SyncMessage::DrawStart { room_id, .. }
            | SyncMessage::DrawMove { room_id, .. }
            | SyncMessage::DrawEnd { room_id }
            | SyncMessage::AddElement { room_id, .. }
            | SyncMessage::UpdateElement { room_id, .. }
            | SyncMessage::SyncElements { room_id, .. }
            | SyncMessage::ClearBoard { room_id, .. }
            | SyncMessage::RoomUsers { room_id, .. } => Some(room_id),
            SyncMessage::UserConnected { .. } | SyncMessage::UserDisconnected { .. } | SyncMessage::Error { .. } => {
                None
            }
        }
    }

    /// Wire name of the message.
    pub fn event_name(&self) -> &'static str {
        match self {
            SyncMessage::JoinRoom { .. } => "join-room",
            SyncMessage::LeaveRoom { .. } => "leave-room",
            SyncMessage::DrawStart { .. } => "draw-start",
            SyncMessage::DrawMove { .. } => "draw-move",
            SyncMessage::DrawEnd { .. } => "draw-end",
            SyncMessage::AddElement { .. } => "add-element",
            SyncMessage::UpdateElement { .. } => "update-element",
            SyncMessage::SyncElements { .. } => "sync-elements",
            SyncMessage::ClearBoard { .. } => "clear-board",
            SyncMessage::RoomUsers { .. } => "room-users",
            SyncMessage::UserConnected { .. } => "user-connected",
            SyncMessage::UserDisconnected { .. } => "user-disconnected",
            SyncMessage::Error { .. } => "error",
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::Rectangle;
    use kurbo::Point;

    #[test]
    fn test_envelope_shape() {
        let msg = SyncMessage::DrawMove {
            room_id: "room-1".to_string(),
            x: 4.0,
            y: 5.5,
        };
        let value: serde_json::Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(value["event"], "draw-move");
        assert_eq!(value["data"]["roomId"], "room-1");
        assert_eq!(value["data"]["y"], 5.5);
    }

    #[test]
    fn test_add_element_from_browser_payload() {
        let json = r##"{
            "event": "add-element",
            "data": {
                "roomId": "abc",
                "element": {
                    "type": "rectangle",
                    "id": 1700000000000,
                    "x": 10, "y": 10, "width": 100, "height": 50,
                    "color": "#ff0000", "lineWidth": 3
                }
            }
        }"##;
        match SyncMessage::from_json(json).unwrap() {
            SyncMessage::AddElement { room_id, element } => {
                assert_eq!(room_id, "abc");
                assert_eq!(element.id().as_str(), "1700000000000");
                assert_eq!(element.kind(), "rectangle");
            }
            other => panic!("Wrong message type: {other:?}"),
        }
    }

    #[test]
    fn test_clear_board_identity_optional() {
        let msg = SyncMessage::from_json(r#"{"event":"clear-board","data":{"roomId":"r"}}"#).unwrap();
        assert_eq!(
            msg,
            SyncMessage::ClearBoard {
                room_id: "r".to_string(),
                user_id: None,
                username: None
            }
        );
        assert!(!msg.to_json().unwrap().contains("userId"));
    }

    #[test]
    fn test_unknown_event_rejected() {
        assert!(SyncMessage::from_json(r#"{"event":"teleport","data":{}}"#).is_err());
        assert!(SyncMessage::from_json(r#"{"event":"draw-move","data":{"roomId":"r"}}"#).is_err());
    }

    #[test]
    fn test_room_scope() {
        let element = Rectangle::new(Point::ZERO, 1.0, 1.0, SerializableColor::black(), 1.0).into();
        let msg = SyncMessage::UpdateElement {
            room_id: "r".to_string(),
            element,
        };
        assert_eq!(msg.room_id(), Some("r"));
        assert_eq!(msg.event_name(), "update-element");

        let notice = SyncMessage::UserConnected {
            user_id: "u".to_string(),
            username: "Ada".to_string(),
        };
        assert_eq!(notice.room_id(), None);
    }
}
