//! Room membership and message routing.

use dashmap::DashMap;
use inkroom_core::sync::{RoomUser, SyncMessage};
use std::collections::HashMap;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Per-room broadcast channel capacity.
pub const CHANNEL_CAPACITY: usize = 256;

/// A message fanned out to the members of a room.
#[derive(Debug, Clone)]
pub struct Broadcast {
    /// Connection that sent it, or `None` for server notices meant for everyone.
    pub from: Option<String>,
    pub message: SyncMessage,
}

impl Broadcast {
    /// Whether the connection `peer_id` should receive this message.
    pub fn is_for(&self, peer_id: &str) -> bool {
        self.from.as_deref() != Some(peer_id)
    }
}

/// Room state
struct Room {
    tx: broadcast::Sender<Broadcast>,
    /// Members by connection id, in join order.
    members: Vec<(String, RoomUser)>,
}

impl Room {
    fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            tx,
            members: Vec::new(),
        }
    }

    fn users(&self) -> Vec<RoomUser> {
        self.members.iter().map(|(_, user)| user.clone()).collect()
    }
}

/// One WebSocket connection.
#[derive(Debug, Clone)]
pub struct Peer {
    pub id: String,
    pub user: RoomUser,
    pub room: Option<String>,
}

impl Peer {
    pub fn new(id: impl Into<String>, user: RoomUser) -> Self {
        Self {
            id: id.into(),
            user,
            room: None,
        }
    }
}

/// What the connection loop should do after a client message.
#[derive(Debug)]
pub enum Outcome {
    /// Subscribed to a room; switch to this receiver.
    Joined(broadcast::Receiver<Broadcast>),
    /// Left the current room; drop the receiver.
    Left,
    /// Handled, nothing to send back.
    Done,
    /// Send this message back to the client only.
    Reply(SyncMessage),
}

/// Shared application state
pub struct AppState {
    rooms: DashMap<String, Room>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self { rooms: DashMap::new() }
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Users currently in a room.
    pub fn users(&self, room_id: &str) -> Vec<RoomUser> {
        self.rooms.get(room_id).map(|room| room.users()).unwrap_or_default()
    }

    /// Add a peer to a room and announce it.
    pub fn join_room(&self, room_id: &str, peer: &Peer) -> broadcast::Receiver<Broadcast> {
        let (rx, users) = {
            let mut room = self.rooms.entry(room_id.to_string()).or_insert_with(Room::new);
            room.members.retain(|(id, _)| id != &peer.id);
            room.members.push((peer.id.clone(), peer.user.clone()));
            (room.tx.subscribe(), room.users())
        };

        self.broadcast(
            room_id,
            Some(&peer.id),
            SyncMessage::UserConnected {
                user_id: peer.user.user_id.clone(),
                username: peer.user.username.clone(),
            },
        );
        self.broadcast(
            room_id,
            None,
            SyncMessage::RoomUsers {
                room_id: room_id.to_string(),
                users,
            },
        );
        info!("{} ({}) joined room {}", peer.user.username, peer.id, room_id);
        rx
    }

    /// Remove a peer from a room and announce it. Empty rooms are dropped.
    pub fn leave_room(&self, room_id: &str, peer: &Peer) {
        let remaining = match self.rooms.get_mut(room_id) {
            Some(mut room) => {
                room.members.retain(|(id, _)| id != &peer.id);
                room.users()
            }
            None => return,
        };

        if remaining.is_empty() {
            self.rooms.remove_if(room_id, |_, room| room.members.is_empty());
            debug!("Room {} is empty, removed", room_id);
        } else {
            self.broadcast(
                room_id,
                Some(&peer.id),
                SyncMessage::UserDisconnected {
                    user_id: peer.user.user_id.clone(),
                    username: peer.user.username.clone(),
                },
            );
            self.broadcast(
                room_id,
                None,
                SyncMessage::RoomUsers {
                    room_id: room_id.to_string(),
                    users: remaining,
                },
            );
        }
        info!("{} ({}) left room {}", peer.user.username, peer.id, room_id);
    }

    /// Broadcast to a room. Returns the number of receivers.
    pub fn broadcast(&self, room_id: &str, from: Option<&str>, message: SyncMessage) -> usize {
        match self.rooms.get(room_id) {
            Some(room) => room
                .tx
                .send(Broadcast {
                    from: from.map(str::to_string),
                    message,
                })
                .unwrap_or(0),
            None => 0,
        }
    }

    /// Route one message from a client.
    pub fn dispatch(&self, peer: &mut Peer, message: SyncMessage) -> Outcome {
        match message {
            SyncMessage::JoinRoom { room_id } => {
                if let Some(old) = peer.room.take() {
                    self.leave_room(&old, peer);
                }
                let rx = self.join_room(&room_id, peer);
                peer.room = Some(room_id);
                Outcome::Joined(rx)
            }
            SyncMessage::LeaveRoom { room_id } => match peer.room.take() {
                Some(current) if current == room_id => {
                    self.leave_room(&current, peer);
                    Outcome::Left
                }
                other => {
                    peer.room = other;
                    Outcome::Reply(error(format!("Not in room {}", room_id)))
                }
            },
            SyncMessage::RoomUsers { .. }
            | SyncMessage::UserConnected { .. }
            | SyncMessage::UserDisconnected { .. }
            | SyncMessage::Error { .. } => {
                warn!("{} sent server-only event {}", peer.id, message.event_name());
                Outcome::Reply(error(format!("Event {} cannot be sent by clients", message.event_name())))
            }
            SyncMessage::ClearBoard { room_id, .. } => {
                // Identity is stamped here, never trusted from the client
                let stamped = SyncMessage::ClearBoard {
                    room_id,
                    user_id: Some(peer.user.user_id.clone()),
                    username: Some(peer.user.username.clone()),
                };
                self.relay(peer, stamped)
            }
            message => self.relay(peer, message),
        }
    }

    /// Forward a room-scoped message to the other members.
    fn relay(&self, peer: &Peer, message: SyncMessage) -> Outcome {
        let target = message.room_id().map(str::to_string);
        match (&peer.room, target) {
            (Some(current), Some(target)) if *current == target => {
                self.broadcast(current, Some(&peer.id), message);
                Outcome::Done
            }
            (_, target) => {
                let room = target.unwrap_or_default();
                debug!("{} sent {} for room {} without joining it", peer.id, message.event_name(), room);
                Outcome::Reply(error(format!("Not in room {}", room)))
            }
        }
    }
}

fn error(message: String) -> SyncMessage {
    SyncMessage::Error { message }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(id: &str) -> Peer {
        Peer::new(id, RoomUser::new(format!("u-{id}"), format!("user {id}")))
    }

    fn join(state: &AppState, peer: &mut Peer, room: &str) -> broadcast::Receiver<Broadcast> {
        match state.dispatch(peer, SyncMessage::JoinRoom { room_id: room.to_string() }) {
            Outcome::Joined(rx) => rx,
            other => panic!("expected join, got {:?}", other),
        }
    }

    /// Drain everything addressed to `peer_id`.
    fn received(rx: &mut broadcast::Receiver<Broadcast>, peer_id: &str) -> Vec<SyncMessage> {
        let mut out = Vec::new();
        while let Ok(b) = rx.try_recv() {
            if b.is_for(peer_id) {
                out.push(b.message);
            }
        }
        out
    }

    #[tokio::test]
    async fn test_join_announces_presence() {
        let state = AppState::new();
        let mut a = peer("a");
        let mut b = peer("b");
        let mut rx_a = join(&state, &mut a, "room");
        let _ = received(&mut rx_a, "a");

        let mut rx_b = join(&state, &mut b, "room");
        let for_a = received(&mut rx_a, "a");
        assert!(matches!(&for_a[0], SyncMessage::UserConnected { user_id, .. } if user_id == "u-b"));
        assert!(matches!(&for_a[1], SyncMessage::RoomUsers { users, .. } if users.len() == 2));

        let for_b = received(&mut rx_b, "b");
        assert_eq!(for_b.len(), 1);
        assert_eq!(for_b[0].event_name(), "room-users");
        assert_eq!(state.users("room").len(), 2);
    }

    #[tokio::test]
    async fn test_relay_skips_sender() {
        let state = AppState::new();
        let mut a = peer("a");
        let mut b = peer("b");
        let mut rx_a = join(&state, &mut a, "room");
        let mut rx_b = join(&state, &mut b, "room");
        received(&mut rx_a, "a");
        received(&mut rx_b, "b");

        let msg = SyncMessage::DrawEnd { room_id: "room".to_string() };
        assert!(matches!(state.dispatch(&mut a, msg.clone()), Outcome::Done));
        assert!(received(&mut rx_a, "a").is_empty());
        assert_eq!(received(&mut rx_b, "b"), vec![msg]);
    }

    #[tokio::test]
    async fn test_clear_board_is_stamped() {
        let state = AppState::new();
        let mut a = peer("a");
        let mut b = peer("b");
        join(&state, &mut a, "room");
        let mut rx_b = join(&state, &mut b, "room");
        received(&mut rx_b, "b");

        let forged = SyncMessage::ClearBoard {
            room_id: "room".to_string(),
            user_id: Some("u-b".to_string()),
            username: Some("someone else".to_string()),
        };
        state.dispatch(&mut a, forged);
        let got = received(&mut rx_b, "b");
        assert_eq!(
            got,
            vec![SyncMessage::ClearBoard {
                room_id: "room".to_string(),
                user_id: Some("u-a".to_string()),
                username: Some("user a".to_string()),
            }]
        );
    }

    #[tokio::test]
    async fn test_other_room_rejected() {
        let state = AppState::new();
        let mut a = peer("a");
        join(&state, &mut a, "room");
        let outcome = state.dispatch(&mut a, SyncMessage::DrawEnd { room_id: "elsewhere".to_string() });
        assert!(matches!(outcome, Outcome::Reply(SyncMessage::Error { .. })));

        let mut lone = peer("c");
        let outcome = state.dispatch(&mut lone, SyncMessage::DrawEnd { room_id: "room".to_string() });
        assert!(matches!(outcome, Outcome::Reply(SyncMessage::Error { .. })));
    }

    #[tokio::test]
    async fn test_server_events_rejected() {
        let state = AppState::new();
        let mut a = peer("a");
        let outcome = state.dispatch(&mut a, SyncMessage::Error { message: "x".to_string() });
        assert!(matches!(outcome, Outcome::Reply(SyncMessage::Error { .. })));
    }

    #[tokio::test]
    async fn test_leave_and_switch_rooms() {
        let state = AppState::new();
        let mut a = peer("a");
        let mut b = peer("b");
        join(&state, &mut a, "one");
        let mut rx_b = join(&state, &mut b, "one");
        received(&mut rx_b, "b");

        join(&state, &mut a, "two");
        assert_eq!(a.room.as_deref(), Some("two"));
        let got = received(&mut rx_b, "b");
        assert_eq!(got[0].event_name(), "user-disconnected");
        assert_eq!(state.users("one").len(), 1);

        let outcome = state.dispatch(&mut a, SyncMessage::LeaveRoom { room_id: "one".to_string() });
        assert!(matches!(outcome, Outcome::Reply(_)));
        assert_eq!(a.room.as_deref(), Some("two"));

        let outcome = state.dispatch(&mut a, SyncMessage::LeaveRoom { room_id: "two".to_string() });
        assert!(matches!(outcome, Outcome::Left));
        assert!(a.room.is_none());
        assert_eq!(state.room_count(), 1);
    }
}
