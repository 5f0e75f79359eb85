//! The canonical element sequence of a room, with undo/redo history.

use crate::shapes::{Element, ElementId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Document mutation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    #[error("Duplicate element id: {0}")]
    DuplicateId(ElementId),
}

/// Undo/redo availability, reported to the surrounding UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackState {
    pub can_undo: bool,
    pub can_redo: bool,
}

/// Ordered element sequence plus full-snapshot undo and redo stacks.
///
/// The position of an element in the sequence is its z-order (later is on
/// top). Local edits go through [`DocumentStore::commit`]; everything arriving
/// from peers uses the `apply_remote*` family, which never records history.
#[derive(Debug, Clone, Default)]
pub struct DocumentStore {
    elements: Vec<Element>,
    /// Prior snapshots, most recent last.
    undo_stack: Vec<Vec<Element>>,
    /// Snapshots superseded by undo, most recent last.
    redo_stack: Vec<Vec<Element>>,
    /// Oldest snapshots are dropped beyond this depth. `None` keeps all.
    history_limit: Option<usize>,
}

impl DocumentStore {
    /// Create an empty document with unbounded history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty document that keeps at most `limit` undo snapshots.
    pub fn with_history_limit(limit: Option<usize>) -> Self {
        Self {
            history_limit: limit,
            ..Self::default()
        }
    }

    /// Elements in z-order (back to front).
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn get(&self, id: &ElementId) -> Option<&Element> {
        self.elements.iter().find(|e| e.id() == id)
    }

    pub fn contains(&self, id: &ElementId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Check if undo is available.
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Check if redo is available.
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn stack_state(&self) -> StackState {
        StackState {
            can_undo: self.can_undo(),
            can_redo: self.can_redo(),
        }
    }

    /// Apply a local mutation as one undoable step.
    ///
    /// The mutation runs on a copy of the sequence. If the result would hold
    /// two elements with the same id nothing changes and an error is
    /// returned; otherwise the previous sequence is pushed onto the undo
    /// stack, the redo stack is cleared and the new sequence installed.
    pub fn commit<F>(&mut self, mutation: F) -> Result<&[Element], DocumentError>
    where
        F: FnOnce(&mut Vec<Element>),
    {
        let mut next = self.elements.clone();
        mutation(&mut next);
        if let Some(id) = first_duplicate(&next) {
            return Err(DocumentError::DuplicateId(id));
        }

        let previous = std::mem::replace(&mut self.elements, next);
        self.undo_stack.push(previous);
        self.redo_stack.clear();
        if let Some(limit) = self.history_limit {
            while self.undo_stack.len() > limit {
                self.undo_stack.remove(0);
            }
        }
        Ok(&self.elements)
    }

    /// Commit appending a new element on top.
    pub fn add(&mut self, element: Element) -> Result<&[Element], DocumentError> {
        self.commit(|elements| elements.push(element))
    }

    /// Commit replacing the element with the same id. With `raise` the
    /// replacement moves to the top of the z-order.
    ///
    /// Returns `Ok(None)` without touching history when the id is absent.
    pub fn replace(&mut self, element: Element, raise: bool) -> Result<Option<&[Element]>, DocumentError> {
        let Some(index) = self.position(element.id()) else {
            return Ok(None);
        };
        self.commit(|elements| {
            if raise {
                elements.remove(index);
                elements.push(element);
            } else {
                elements[index] = element;
            }
        })
        .map(Some)
    }

    /// Undo the last change.
    /// Returns true if undo was performed, false if nothing to undo.
    pub fn undo(&mut self) -> bool {
        if let Some(snapshot) = self.undo_stack.pop() {
            let current = std::mem::replace(&mut self.elements, snapshot);
            self.redo_stack.push(current);
            true
        } else {
            false
        }
    }

    /// Redo the last undone change.
    /// Returns true if redo was performed, false if nothing to redo.
    pub fn redo(&mut self) -> bool {
        if let Some(snapshot) = self.redo_stack.pop() {
            let current = std::mem::replace(&mut self.elements, snapshot);
            self.undo_stack.push(current);
            true
        } else {
            false
        }
    }

    /// Install a full sequence received from a peer and forget all history.
    ///
    /// Duplicate ids keep their first occurrence.
    pub fn apply_remote(&mut self, elements: Vec<Element>) {
        let mut seen = HashSet::with_capacity(elements.len());
        let before = elements.len();
        let elements: Vec<Element> = elements
            .into_iter()
            .filter(|e| seen.insert(e.id().clone()))
            .collect();
        if elements.len() != before {
            log::warn!("Dropped {} duplicate elements from remote sync", before - elements.len());
        }

        self.elements = elements;
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    /// Append an element received from a peer unless its id is already known.
    /// Returns true if the element was added.
    pub fn apply_remote_element_add(&mut self, element: Element) -> bool {
        if self.contains(element.id()) {
            log::debug!("Ignoring remote add of known element {}", element.id());
            return false;
        }
        self.elements.push(element);
        true
    }

    /// Replace an element in place with a peer's version.
    /// Returns true if an element with that id existed.
    pub fn apply_remote_element_update(&mut self, element: Element) -> bool {
        match self.position(element.id()) {
            Some(index) => {
                self.elements[index] = element;
                true
            }
            None => {
                log::debug!("Ignoring remote update of unknown element {}", element.id());
                false
            }
        }
    }

    /// Remove every element and both history stacks.
    pub fn clear(&mut self) {
        self.elements.clear();
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    fn position(&self, id: &ElementId) -> Option<usize> {
        self.elements.iter().position(|e| e.id() == id)
    }
}

fn first_duplicate(elements: &[Element]) -> Option<ElementId> {
    let mut seen = HashSet::with_capacity(elements.len());
    elements
        .iter()
        .map(Element::id)
        .find(|id| !seen.insert(*id))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{Path, Rectangle, SerializableColor};
    use kurbo::Point;

    fn rect_at(x: f64) -> Element {
        Element::from(Rectangle::new(Point::new(x, 0.0), 10.0, 10.0, SerializableColor::black(), 2.0))
    }

    fn stroke() -> Element {
        Element::from(Path::new(
            vec![Point::new(0.0, 0.0), Point::new(5.0, 5.0)],
            SerializableColor::black(),
            3.0,
        ))
    }

    #[test]
    fn test_commit_records_undo() {
        let mut doc = DocumentStore::new();
        assert!(!doc.can_undo());

        doc.add(rect_at(0.0)).unwrap();
        assert_eq!(doc.len(), 1);
        assert!(doc.can_undo());
        assert!(!doc.can_redo());
    }

    #[test]
    fn test_undo_then_redo_restores_sequence() {
        let mut doc = DocumentStore::new();
        doc.add(rect_at(0.0)).unwrap();
        doc.add(stroke()).unwrap();
        let moved = crate::geometry::translate(&doc.elements()[0], kurbo::Vec2::new(20.0, 5.0));
        doc.replace(moved, true).unwrap();
        let expected = doc.elements().to_vec();

        assert!(doc.undo());
        assert_ne!(doc.elements(), expected.as_slice());
        assert!(doc.redo());
        assert_eq!(doc.elements(), expected.as_slice());
    }

    #[test]
    fn test_new_commit_after_undo_clears_redo() {
        let mut doc = DocumentStore::new();
        doc.add(rect_at(0.0)).unwrap();
        assert!(doc.undo());
        assert!(doc.can_redo());

        doc.add(stroke()).unwrap();
        assert!(!doc.can_redo());
        assert!(!doc.redo());
        assert_eq!(doc.len(), 1);
    }

    #[test]
    fn test_undo_empty_stack() {
        let mut doc = DocumentStore::new();
        assert!(!doc.undo());
        assert!(!doc.redo());
        assert!(doc.is_empty());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut doc = DocumentStore::new();
        let rect = rect_at(0.0);
        doc.add(rect.clone()).unwrap();

        let result = doc.add(rect.clone());
        assert_eq!(result, Err(DocumentError::DuplicateId(rect.id().clone())));
        assert_eq!(doc.len(), 1);
        // Rejected commits leave history alone
        assert!(doc.undo());
        assert!(!doc.can_undo());
    }

    #[test]
    fn test_replace_raises_to_top() {
        let mut doc = DocumentStore::new();
        let bottom = rect_at(0.0);
        doc.add(bottom.clone()).unwrap();
        doc.add(rect_at(50.0)).unwrap();

        let moved = crate::geometry::translate(&bottom, kurbo::Vec2::new(1.0, 1.0));
        doc.replace(moved.clone(), true).unwrap();
        assert_eq!(doc.elements().last(), Some(&moved));

        let missing = rect_at(99.0);
        assert_eq!(doc.replace(missing, false), Ok(None));
    }

    #[test]
    fn test_history_limit() {
        let mut doc = DocumentStore::with_history_limit(Some(2));
        for i in 0..5 {
            doc.add(rect_at(i as f64 * 20.0)).unwrap();
        }
        assert!(doc.undo());
        assert!(doc.undo());
        assert!(!doc.undo());
        assert_eq!(doc.len(), 3);
    }

    #[test]
    fn test_remote_add_is_idempotent() {
        let mut doc = DocumentStore::new();
        let rect = rect_at(0.0);
        assert!(doc.apply_remote_element_add(rect.clone()));
        assert!(!doc.apply_remote_element_add(rect.clone()));
        assert_eq!(doc.elements(), &[rect]);
        assert!(!doc.can_undo());
    }

    #[test]
    fn test_remote_update_absent_is_noop() {
        let mut doc = DocumentStore::new();
        doc.apply_remote_element_add(rect_at(0.0));
        let before = doc.elements().to_vec();

        assert!(!doc.apply_remote_element_update(rect_at(10.0)));
        assert_eq!(doc.elements(), before.as_slice());
    }

    #[test]
    fn test_remote_update_in_place() {
        let mut doc = DocumentStore::new();
        let first = rect_at(0.0);
        doc.apply_remote_element_add(first.clone());
        doc.apply_remote_element_add(rect_at(50.0));

        let moved = crate::geometry::translate(&first, kurbo::Vec2::new(5.0, 5.0));
        assert!(doc.apply_remote_element_update(moved.clone()));
        assert_eq!(doc.elements()[0], moved);
    }

    #[test]
    fn test_apply_remote_clears_history_and_dedups() {
        let mut doc = DocumentStore::new();
        doc.add(rect_at(0.0)).unwrap();
        doc.add(rect_at(10.0)).unwrap();
        doc.undo();

        let dup = rect_at(30.0);
        doc.apply_remote(vec![dup.clone(), stroke(), dup.clone()]);
        assert_eq!(doc.len(), 2);
        assert_eq!(doc.elements()[0], dup);
        assert_eq!(doc.stack_state(), StackState::default());
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut doc = DocumentStore::new();
        doc.add(rect_at(0.0)).unwrap();
        doc.add(rect_at(10.0)).unwrap();
        doc.undo();

        doc.clear();
        assert!(doc.is_empty());
        assert!(!doc.can_undo());
        assert!(!doc.can_redo());
    }
}
