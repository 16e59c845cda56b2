//! Undo/redo history of the flow model.
//!
//! The history keeps whole-model snapshots encoded with bincode rather than inverse
//! commands. Restoring a snapshot replaces the model wholesale.

use crate::definition::FlowSnapshot;
use crate::error::HistoryError;
use crate::model::FlowModel;
use std::collections::VecDeque;

/// Bounded stack of encoded model snapshots with a cursor.
pub struct UndoStack {
    snapshots: VecDeque<Vec<u8>>,
    /// Position of the snapshot matching the current model
    current: usize,
    max_snapshots: usize,
}

impl UndoStack {
    pub fn new(max_snapshots: usize) -> Self {
        Self {
            snapshots: VecDeque::new(),
            current: 0,
            max_snapshots: max_snapshots.max(1),
        }
    }

    /// Records `model` as the newest state. Anything that could have been redone is dropped.
    pub fn push(&mut self, model: &FlowModel) -> Result<(), HistoryError> {
        let bytes = FlowSnapshot::from_model(model).to_bytes()?;

        while self.snapshots.len() > self.current + 1 {
            self.snapshots.pop_back();
        }

        self.snapshots.push_back(bytes);
        self.current = self.snapshots.len() - 1;

        while self.snapshots.len() > self.max_snapshots {
            self.snapshots.pop_front();
            self.current = self.current.saturating_sub(1);
        }
        Ok(())
    }

    /// Steps back one snapshot. `None` at the oldest state.
    pub fn undo(&mut self) -> Option<Result<FlowModel, HistoryError>> {
        self.step_back().then(|| self.restore(self.current))
    }

    /// Steps forward one snapshot. `None` at the newest state.
    pub fn redo(&mut self) -> Option<Result<FlowModel, HistoryError>> {
        self.step_forward().then(|| self.restore(self.current))
    }

    /// Moves the cursor back without decoding a snapshot. Returns whether it moved.
    pub fn step_back(&mut self) -> bool {
        if self.current > 0 {
            self.current -= 1;
            true
        } else {
            false
        }
    }

    /// Moves the cursor forward without decoding a snapshot. Returns whether it moved.
    pub fn step_forward(&mut self) -> bool {
        if self.current + 1 < self.snapshots.len() {
            self.current += 1;
            true
        } else {
            false
        }
    }

    pub fn current(&self) -> Option<Result<FlowModel, HistoryError>> {
        if self.snapshots.is_empty() {
            None
        } else {
            Some(self.restore(self.current))
        }
    }

    pub fn can_undo(&self) -> bool {
        self.current > 0
    }

    pub fn can_redo(&self) -> bool {
        self.current + 1 < self.snapshots.len()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
        self.current = 0;
    }

    /// Total encoded size of all snapshots in bytes.
    pub fn encoded_size(&self) -> usize {
        self.snapshots.iter().map(Vec::len).sum()
    }

    fn restore(&self, index: usize) -> Result<FlowModel, HistoryError> {
        let bytes = self
            .snapshots
            .get(index)
            .ok_or_else(|| HistoryError::Snapshot(format!("No snapshot at {}", index)))?;
        FlowSnapshot::from_bytes(bytes).map(FlowSnapshot::into_model)
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Element, ElementType};

    fn make_model(label: &str) -> FlowModel {
        FlowModel::new(Element::new("start", ElementType::Start, label))
    }

    fn root_label(model: &FlowModel) -> String {
        model.root_element().unwrap().label.clone()
    }

    #[test]
    fn test_cursor_steps_without_restoring() {
        let mut stack = UndoStack::new(10);
        assert!(!stack.step_back());
        stack.push(&make_model("first")).unwrap();
        stack.push(&make_model("second")).unwrap();

        assert!(!stack.step_forward());
        assert!(stack.step_back());
        assert!(!stack.step_back());
        assert!(stack.can_redo());
        assert_eq!(root_label(&stack.current().unwrap().unwrap()), "first");

        assert!(stack.step_forward());
        assert!(!stack.can_redo());
        assert_eq!(root_label(&stack.current().unwrap().unwrap()), "second");
    }

    #[test]
    fn test_push_and_undo() {
        let mut stack = UndoStack::new(10);
        stack.push(&make_model("first")).unwrap();
        stack.push(&make_model("second")).unwrap();
        stack.push(&make_model("third")).unwrap();

        assert_eq!(root_label(&stack.current().unwrap().unwrap()), "third");
        assert_eq!(root_label(&stack.undo().unwrap().unwrap()), "second");
        assert_eq!(root_label(&stack.undo().unwrap().unwrap()), "first");
        assert!(stack.undo().is_none());
    }

    #[test]
    fn test_redo() {
        let mut stack = UndoStack::new(10);
        stack.push(&make_model("first")).unwrap();
        stack.push(&make_model("second")).unwrap();

        stack.undo();
        assert_eq!(root_label(&stack.redo().unwrap().unwrap()), "second");
        assert!(stack.redo().is_none());
    }

    #[test]
    fn test_push_truncates_redo() {
        let mut stack = UndoStack::new(10);
        stack.push(&make_model("first")).unwrap();
        stack.push(&make_model("second")).unwrap();
        stack.undo();
        stack.push(&make_model("third")).unwrap();

        assert!(!stack.can_redo());
        assert_eq!(stack.len(), 2);
        assert_eq!(root_label(&stack.undo().unwrap().unwrap()), "first");
    }

    #[test]
    fn test_max_snapshots() {
        let mut stack = UndoStack::new(3);
        for label in ["a", "b", "c", "d", "e"] {
            stack.push(&make_model(label)).unwrap();
        }

        assert_eq!(stack.len(), 3);
        assert_eq!(root_label(&stack.current().unwrap().unwrap()), "e");
        stack.undo();
        stack.undo();
        assert!(!stack.can_undo());
        assert_eq!(root_label(&stack.current().unwrap().unwrap()), "c");
    }

    #[test]
    fn test_snapshot_restores_equal_model() {
        let mut model = make_model("Start");
        let a = Element::new("a", ElementType::Decision, "Check");
        model.get_mut("start").unwrap().next = Some("a".to_string());
        model.insert(a);

        let mut stack = UndoStack::default();
        stack.push(&model).unwrap();
        assert_eq!(stack.current().unwrap().unwrap(), model);
        assert!(stack.encoded_size() > 0);
    }
}
