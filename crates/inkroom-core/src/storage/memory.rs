//! In-memory board storage.

use super::{BoardSnapshot, BoardStore, BoxFuture, StorageError, StorageResult};
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory storage for testing and ephemeral use.
#[derive(Default)]
pub struct MemoryBoardStore {
    boards: RwLock<HashMap<String, BoardSnapshot>>,
}

impl MemoryBoardStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_error(e: impl std::fmt::Display) -> StorageError {
    StorageError::Other(format!("Lock error: {}", e))
}

impl BoardStore for MemoryBoardStore {
    fn save(&self, room_id: &str, snapshot: &BoardSnapshot) -> BoxFuture<'_, StorageResult<()>> {
        let room_id = room_id.to_string();
        let snapshot = snapshot.clone();
        Box::pin(async move {
            let mut boards = self.boards.write().map_err(lock_error)?;
            boards.insert(room_id, snapshot);
            Ok(())
        })
    }

    fn load(&self, room_id: &str) -> BoxFuture<'_, StorageResult<BoardSnapshot>> {
        let room_id = room_id.to_string();
        Box::pin(async move {
            let boards = self.boards.read().map_err(lock_error)?;
            boards.get(&room_id).cloned().ok_or(StorageError::NotFound(room_id))
        })
    }

    fn delete(&self, room_id: &str) -> BoxFuture<'_, StorageResult<()>> {
        let room_id = room_id.to_string();
        Box::pin(async move {
            let mut boards = self.boards.write().map_err(lock_error)?;
            boards.remove(&room_id);
            Ok(())
        })
    }

    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>> {
        Box::pin(async move {
            let boards = self.boards.read().map_err(lock_error)?;
            Ok(boards.keys().cloned().collect())
        })
    }

    fn exists(&self, room_id: &str) -> BoxFuture<'_, StorageResult<bool>> {
        let room_id = room_id.to_string();
        Box::pin(async move {
            let boards = self.boards.read().map_err(lock_error)?;
            Ok(boards.contains_key(&room_id))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{Element, Rectangle, SerializableColor};
    use crate::storage::block_on;
    use kurbo::Point;

    fn snapshot() -> BoardSnapshot {
        let rect: Element = Rectangle::new(Point::new(1.0, 2.0), 3.0, 4.0, SerializableColor::black(), 2.0).into();
        BoardSnapshot::new(vec![rect])
    }

    #[test]
    fn test_save_and_load() {
        let store = MemoryBoardStore::new();
        let board = snapshot();

        block_on(store.save("room", &board)).unwrap();
        let loaded = block_on(store.load("room")).unwrap();
        assert_eq!(loaded, board);
    }

    #[test]
    fn test_not_found() {
        let store = MemoryBoardStore::new();
        let result = block_on(store.load("nonexistent"));
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_exists_and_delete() {
        let store = MemoryBoardStore::new();
        assert!(!block_on(store.exists("room")).unwrap());

        block_on(store.save("room", &snapshot())).unwrap();
        assert!(block_on(store.exists("room")).unwrap());

        block_on(store.delete("room")).unwrap();
        assert!(!block_on(store.exists("room")).unwrap());
    }

    #[test]
    fn test_list() {
        let store = MemoryBoardStore::new();
        block_on(store.save("a", &snapshot())).unwrap();
        block_on(store.save("b", &snapshot())).unwrap();

        let mut ids = block_on(store.list()).unwrap();
        ids.sort();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
