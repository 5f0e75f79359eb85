//! Board persistence.
//!
//! A board is saved as a [`BoardSnapshot`]: the element sequence plus an
//! optional raster base layer encoded as a PNG data URL.

mod memory;

#[cfg(not(target_arch = "wasm32"))]
mod file;

pub use memory::MemoryBoardStore;

#[cfg(not(target_arch = "wasm32"))]
pub use file::FileBoardStore;

use crate::shapes::Element;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Board not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Boxed future for async operations (compatible with WASM).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Persisted state of one board.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardSnapshot {
    /// `data:image/png;base64,...` drawn beneath the elements on load.
    #[serde(default)]
    pub image_data: Option<String>,
    #[serde(default)]
    pub elements: Vec<Element>,
}

impl BoardSnapshot {
    pub fn new(elements: Vec<Element>) -> Self {
        Self {
            image_data: None,
            elements,
        }
    }

    pub fn with_image_data(mut self, image_data: impl Into<String>) -> Self {
        self.image_data = Some(image_data.into());
        self
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Trait for board storage backends.
///
/// On native platforms implementations must be Send + Sync.
#[cfg(not(target_arch = "wasm32"))]
pub trait BoardStore: Send + Sync {
    /// Save the board of a room.
    fn save(&self, room_id: &str, snapshot: &BoardSnapshot) -> BoxFuture<'_, StorageResult<()>>;

    /// Load the board of a room.
    fn load(&self, room_id: &str) -> BoxFuture<'_, StorageResult<BoardSnapshot>>;

    /// Delete the board of a room.
    fn delete(&self, room_id: &str) -> BoxFuture<'_, StorageResult<()>>;

    /// List all saved room ids.
    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>>;

    /// Check if a room has a saved board.
    fn exists(&self, room_id: &str) -> BoxFuture<'_, StorageResult<bool>>;
}

/// Trait for board storage backends (WASM version without Send + Sync).
#[cfg(target_arch = "wasm32")]
pub trait BoardStore {
    fn save(&self, room_id: &str, snapshot: &BoardSnapshot) -> BoxFuture<'_, StorageResult<()>>;
    fn load(&self, room_id: &str) -> BoxFuture<'_, StorageResult<BoardSnapshot>>;
    fn delete(&self, room_id: &str) -> BoxFuture<'_, StorageResult<()>>;
    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>>;
    fn exists(&self, room_id: &str) -> BoxFuture<'_, StorageResult<bool>>;
}

/// Simple blocking executor for tests.
#[cfg(test)]
pub(crate) fn block_on<F: Future>(f: F) -> F::Output {
    use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

    fn dummy_raw_waker() -> RawWaker {
        fn no_op(_: *const ()) {}
        fn clone(_: *const ()) -> RawWaker {
            dummy_raw_waker()
        }
        static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, no_op, no_op, no_op);
        RawWaker::new(std::ptr::null(), &VTABLE)
    }

    let waker = unsafe { Waker::from_raw(dummy_raw_waker()) };
    let mut cx = Context::from_waker(&waker);
    let mut f = std::pin::pin!(f);

    loop {
        if let Poll::Ready(result) = f.as_mut().poll(&mut cx) {
            return result;
        }
    }
}
