//! File-based board storage for native platforms.

use super::{BoardSnapshot, BoardStore, BoxFuture, StorageError, StorageResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Stores each board as a JSON file in a directory.
pub struct FileBoardStore {
    base_path: PathBuf,
}

impl FileBoardStore {
    /// Create a store in `base_path`, creating the directory if needed.
    pub fn new(base_path: PathBuf) -> StorageResult<Self> {
        if !base_path.exists() {
            fs::create_dir_all(&base_path)
                .map_err(|e| StorageError::Io(format!("Failed to create storage directory: {}", e)))?;
        }
        Ok(Self { base_path })
    }

    /// Create a store in the platform data directory.
    ///
    /// On Linux: `~/.local/share/inkroom/boards/`
    /// On Windows: `%LOCALAPPDATA%\inkroom\boards\`
    pub fn default_location() -> StorageResult<Self> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| StorageError::Io("Could not determine home directory".to_string()))?;
        Self::new(base.join("inkroom").join("boards"))
    }

    fn board_path(&self, room_id: &str) -> PathBuf {
        let safe_id: String = room_id
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.base_path.join(format!("{}.json", safe_id))
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

impl BoardStore for FileBoardStore {
    fn save(&self, room_id: &str, snapshot: &BoardSnapshot) -> BoxFuture<'_, StorageResult<()>> {
        let path = self.board_path(room_id);
        let json = snapshot.to_json();
        Box::pin(async move {
            let json = json.map_err(|e| StorageError::Serialization(e.to_string()))?;
            fs::write(&path, json).map_err(|e| StorageError::Io(format!("Failed to write {}: {}", path.display(), e)))
        })
    }

    fn load(&self, room_id: &str) -> BoxFuture<'_, StorageResult<BoardSnapshot>> {
        let path = self.board_path(room_id);
        let room_id = room_id.to_string();
        Box::pin(async move {
            if !path.exists() {
                return Err(StorageError::NotFound(room_id));
            }
            let json = fs::read_to_string(&path)
                .map_err(|e| StorageError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
            BoardSnapshot::from_json(&json)
                .map_err(|e| StorageError::Serialization(format!("Failed to parse {}: {}", path.display(), e)))
        })
    }

    fn delete(&self, room_id: &str) -> BoxFuture<'_, StorageResult<()>> {
        let path = self.board_path(room_id);
        Box::pin(async move {
            if path.exists() {
                fs::remove_file(&path)
                    .map_err(|e| StorageError::Io(format!("Failed to delete {}: {}", path.display(), e)))?;
            }
            Ok(())
        })
    }

    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>> {
        let base = self.base_path.clone();
        Box::pin(async move {
            if !base.exists() {
                return Ok(vec![]);
            }
            let entries = fs::read_dir(&base).map_err(|e| StorageError::Io(format!("Failed to read directory: {}", e)))?;

            let ids = entries
                .flatten()
                .map(|entry| entry.path())
                .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
                .filter_map(|path| path.file_stem().and_then(|stem| stem.to_str()).map(str::to_string))
                .collect();
            Ok(ids)
        })
    }

    fn exists(&self, room_id: &str) -> BoxFuture<'_, StorageResult<bool>> {
        let path = self.board_path(room_id);
        Box::pin(async move { Ok(path.exists()) })
    }
}
