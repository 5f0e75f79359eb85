//! Inkroom Core Library
//!
//! Element model, tools, undo history and room synchronization for the
//! Inkroom shared whiteboard. Rendering lives in `inkroom-render`.

pub mod collaboration;
pub mod config;
pub mod document;
pub mod geometry;
pub mod overlay;
pub mod session;
pub mod shapes;
pub mod shortcuts;
pub mod storage;
pub mod sync;
pub mod tools;
pub mod transport;

pub use collaboration::{RemoteChange, SyncBridge};
pub use config::{ConfigError, EngineConfig};
pub use document::{DocumentError, DocumentStore, StackState};
pub use overlay::Overlay;
pub use session::{BoardOps, Redraw, Session};
pub use shapes::{Element, ElementId, SerializableColor};
pub use shortcuts::{Modifiers, ShortcutRegistry};
pub use storage::{BoardSnapshot, BoardStore, StorageError};
pub use sync::{RoomUser, SyncMessage};
pub use tools::{ToolKind, ToolManager};
pub use transport::{ConnectionState, MemoryHub, Transport, TransportError};

#[cfg(not(target_arch = "wasm32"))]
pub use transport::WebSocketTransport;
